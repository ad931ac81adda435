//! Layout and drawing: front and side views of the tower, sidebar, fade overlay.

use crate::camera::Camera;
use crate::game::block::Block as TowerBlock;
use crate::game::{Engine, GameState, MAX_MOVE_BOUNDS, Placement};
use crate::hud::ScoreHud;
use crate::theme::{Theme, to_color, to_rgba};
use glam::Vec3;
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Widget};

const SIDEBAR_WIDTH: u16 = 26;

/// World units visible across each view: swing amplitude plus half a full footprint, both sides.
const VIEW_SPAN: f32 = 2.0 * (MAX_MOVE_BOUNDS + MAX_MOVE_BOUNDS / 2.0) + 2.0;

/// World units shown above the rig origin.
const VIEW_HEADROOM: f32 = 6.0;

/// Side faces are drawn darker than front faces.
const SIDE_SHADE: f32 = 0.75;

/// Everything a frame needs to read.
pub struct Scene<'a> {
    pub engine: &'a Engine,
    pub hud: &'a ScoreHud,
    pub camera: &'a Camera,
    pub theme: &'a Theme,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    /// Looking down -Z: horizontal is X.
    Front,
    /// Looking down +X: horizontal is Z.
    Side,
}

impl View {
    fn horizontal(self, v: Vec3) -> f32 {
        match self {
            Self::Front => v.x,
            Self::Side => v.z,
        }
    }

    fn title(self) -> &'static str {
        match self {
            Self::Front => " Front ",
            Self::Side => " Side ",
        }
    }
}

/// World to pixel mapping for one view. Pixels are half-block cells: one column wide,
/// half a row tall, so both axes share one scale.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Projection {
    center_x: f32,
    top: f32,
    scale: f32,
}

impl Projection {
    fn fit(width: usize) -> Self {
        Self {
            center_x: width as f32 / 2.0,
            top: VIEW_HEADROOM,
            scale: (width as f32 / VIEW_SPAN).max(1.0),
        }
    }

    fn x(&self, world: f32) -> f32 {
        self.center_x + world * self.scale
    }

    fn y(&self, world: f32) -> f32 {
        (self.top - world) * self.scale
    }
}

/// Pixel grid rendered two pixels per cell with "▀".
struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<Color>,
}

impl Canvas {
    fn new(width: usize, height: usize, bg: Color) -> Self {
        Self {
            width,
            height,
            pixels: vec![bg; width * height],
        }
    }

    /// Fill pixel-space rectangle [x0, x1) x [y0, y1); always at least one pixel on
    /// each axis so thin slices stay visible.
    fn fill_rect(&mut self, x0: f32, x1: f32, y0: f32, y1: f32, color: Color) {
        let span = |a: f32, b: f32, max: usize| {
            let lo = a.min(b).round() as i64;
            let hi = (a.max(b).round() as i64).max(lo + 1);
            (lo.clamp(0, max as i64) as usize, hi.clamp(0, max as i64) as usize)
        };
        let (cx0, cx1) = span(x0, x1, self.width);
        let (cy0, cy1) = span(y0, y1, self.height);
        for y in cy0..cy1 {
            for x in cx0..cx1 {
                self.pixels[y * self.width + x] = color;
            }
        }
    }

    fn get(&self, x: usize, y: usize) -> Option<Color> {
        (x < self.width && y < self.height).then(|| self.pixels[y * self.width + x])
    }

    fn render(&self, area: Rect, buf: &mut Buffer) {
        for row in 0..area.height {
            for col in 0..area.width {
                let (x, y) = (col as usize, row as usize * 2);
                let (Some(top), Some(bottom)) = (self.get(x, y), self.get(x, y + 1)) else {
                    continue;
                };
                buf[(area.x + col, area.y + row)]
                    .set_symbol("▀")
                    .set_style(Style::default().fg(top).bg(bottom));
            }
        }
    }
}

fn shade(color: Color, factor: f32) -> Color {
    match color {
        Color::Rgb(r, g, b) => {
            let f = |c: u8| (c as f32 * factor).round().clamp(0.0, 255.0) as u8;
            Color::Rgb(f(r), f(g), f(b))
        }
        other => other,
    }
}

pub fn draw(frame: &mut Frame, scene: &Scene) {
    let area = frame.area();
    render(scene, area, frame.buffer_mut());
}

/// Draw the whole screen into `buf`.
pub fn render(scene: &Scene, area: Rect, buf: &mut Buffer) {
    let theme = scene.theme;
    Block::default().style(Style::default().bg(theme.bg)).render(area, buf);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Fill(1),
            Constraint::Length(SIDEBAR_WIDTH),
        ])
        .split(area);

    draw_view(scene, View::Front, columns[0], buf);
    draw_view(scene, View::Side, columns[1], buf);
    draw_sidebar(scene, columns[2], buf);
    draw_fade(scene.hud, area, buf);
}

fn draw_view(scene: &Scene, view: View, area: Rect, buf: &mut Buffer) {
    let theme = scene.theme;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(view.title(), theme.title));
    let inner = block.inner(area);
    block.render(area, buf);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let engine = scene.engine;
    let width = inner.width as usize;
    let height = inner.height as usize * 2;
    let proj = Projection::fit(width);
    let mut canvas = Canvas::new(width, height, theme.bg);
    let shake = scene.camera.offset();
    let bg = to_rgba(theme.bg);

    // Far-to-near so the swinging block ends up on top.
    let mut blocks: Vec<_> = engine.blocks().collect();
    blocks.sort_by(|a, b| {
        let depth = |blk: &TowerBlock| match view {
            View::Front => -blk.position().z,
            View::Side => blk.position().x,
        };
        depth(*a).total_cmp(&depth(*b))
    });
    for blk in blocks {
        let pos = blk.world_position(engine.rig()) - shake;
        let half = blk.scale() * 0.5;
        let mut color = to_color(blk.mesh().color());
        if view == View::Side {
            color = shade(color, SIDE_SHADE);
        }
        let cx = view.horizontal(pos);
        let hw = view.horizontal(half);
        canvas.fill_rect(
            proj.x(cx - hw),
            proj.x(cx + hw),
            proj.y(pos.y + half.y),
            proj.y(pos.y - half.y),
            color,
        );
    }

    // Placement pulses: a flat, fading footprint at the placed block's base.
    for effect in engine.effects() {
        let pos = effect.pose().position - shake;
        let size = effect.size();
        let half = match view {
            View::Front => size.x,
            View::Side => size.y,
        } * 0.5;
        let cx = view.horizontal(pos);
        let y = proj.y(pos.y - 0.5);
        let tint = effect.tint().over(bg);
        canvas.fill_rect(proj.x(cx - half), proj.x(cx + half), y, y + 1.0, to_color(tint));
    }

    canvas.render(inner, buf);

    if view == View::Front && scene.hud.score_visible() {
        let score = Paragraph::new(Line::from(
            Span::styled(scene.hud.score().to_string(), theme.title).bold(),
        ))
        .alignment(Alignment::Center);
        score.render(Rect { height: 1, ..inner }, buf);
    }
}

fn draw_sidebar(scene: &Scene, area: Rect, buf: &mut Buffer) {
    let theme = scene.theme;
    let engine = scene.engine;
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Stats (border + score, best, combo)
            Constraint::Length(1), // gap
            Constraint::Length(6), // Footprint (border + title + two gauges)
            Constraint::Length(1), // gap
            Constraint::Length(4), // Colours (border + title + strip)
            Constraint::Length(1), // gap
            Constraint::Min(3),    // Hint
        ])
        .split(area);

    // --- Stats ---
    let stats_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let stats_inner = stats_block.inner(chunks[0]);
    stats_block.render(chunks[0], buf);
    let combo = if engine.combo() > 0 {
        format!("x{}", engine.combo())
    } else {
        "-".to_string()
    };
    let last = match engine.last_placement() {
        Some(Placement::Perfect) => "  perfect",
        Some(Placement::Sliced) => "  sliced",
        None => "",
    };
    let stats_lines = vec![
        Line::from(vec![
            Span::styled("Score: ", title_style),
            Span::styled(engine.display_score().max(0).to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Best: ", title_style),
            Span::styled(scene.hud.best().to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Combo: ", title_style),
            Span::styled(combo, fg_style),
            Span::styled(last, Style::default().fg(theme.inactive_fg)),
        ]),
    ];
    Paragraph::new(ratatui::text::Text::from(stats_lines)).render(stats_inner, buf);

    // --- Footprint ---
    let foot_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let foot_inner = foot_block.inner(chunks[2]);
    foot_block.render(chunks[2], buf);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(foot_inner);
    Paragraph::new(Line::from(Span::styled("Footprint", title_style))).render(rows[0], buf);
    let bounds = engine.bounds();
    let dead = engine.config().dead_threshold;
    for (row, label, extent) in [(rows[1], "X", bounds.x), (rows[2], "Z", bounds.y)] {
        let ratio = f64::from((extent / MAX_MOVE_BOUNDS).clamp(0.0, 1.0));
        let bar_color = if extent > MAX_MOVE_BOUNDS * 0.6 {
            Color::Green
        } else if extent > dead * 4.0 {
            Color::Yellow
        } else {
            Color::Red
        };
        Gauge::default()
            .ratio(ratio)
            .label(format!("{label} {extent:.2}"))
            .gauge_style(Style::default().fg(bar_color).bg(theme.bg))
            .render(row, buf);
    }
    let axis = format!("Swing: {:?}", engine.axis());
    Paragraph::new(Line::from(Span::styled(axis, fg_style))).render(rows[3], buf);

    // --- Colours ---
    let colours_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let colours_inner = colours_block.inner(chunks[4]);
    colours_block.render(chunks[4], buf);
    let strip = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(colours_inner);
    Paragraph::new(Line::from(Span::styled("Colours", title_style))).render(strip[0], buf);
    let current = to_color(engine.current_block().mesh().color());
    let mut spans: Vec<Span> = theme
        .gradient
        .iter()
        .map(|&c| Span::styled("██", Style::default().fg(c)))
        .collect();
    spans.push(Span::raw("  "));
    spans.push(Span::styled("██", Style::default().fg(current)));
    Paragraph::new(Line::from(spans)).render(strip[1], buf);

    // --- Hint ---
    let hint = match engine.state() {
        GameState::Waiting => "Click or press Space to start",
        GameState::Running => "Click / Space to drop",
        GameState::Ending => "Tower down!",
        GameState::Restarting => "Restarting...",
    };
    let hint_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let hint_inner = hint_block.inner(chunks[6]);
    hint_block.render(chunks[6], buf);
    Paragraph::new(vec![
        Line::from(Span::styled(hint, fg_style)),
        Line::from(Span::styled("q / Esc to quit", Style::default().fg(theme.inactive_fg))),
    ])
    .render(hint_inner, buf);
}

fn draw_fade(hud: &ScoreHud, area: Rect, buf: &mut Buffer) {
    if hud.fill() <= 0.0 {
        return;
    }
    let overlay = Style::default().fg(Color::Black).bg(Color::Black);
    for row in 0..area.height {
        for col in 0..area.width {
            if hud.covers(col, row, area.width, area.height) {
                buf[(area.x + col, area.y + row)].set_symbol(" ").set_style(overlay);
            }
        }
    }
}
