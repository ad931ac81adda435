//! App: terminal init, main loop, session rebuilds.

use crate::audio::TerminalAudio;
use crate::camera::Camera;
use crate::game::{Collaborators, ConfigError, Engine, EngineConfig, KeyValueStore, Session};
use crate::hud::ScoreHud;
use crate::input::{Action, PointerInput};
use crate::theme::Theme;
use crate::ui::{self, Scene};
use crate::Args;
use anyhow::Result;
use crossterm::event::{self, Event};
use ratatui::DefaultTerminal;
use std::io::Write;
use std::time::{Duration, Instant};

/// Longest step fed to the engine; a stalled terminal must not teleport blocks.
const MAX_FRAME_SECS: f32 = 0.1;

/// Set by the engine when the round is over and everything should be rebuilt.
#[derive(Debug, Default)]
struct ReloadRequest(bool);

impl Session for ReloadRequest {
    fn reload(&mut self) {
        self.0 = true;
    }
}

/// Everything that lives for one round; rebuilt on reload.
struct Round {
    engine: Engine,
    input: PointerInput,
    hud: ScoreHud,
    camera: Camera,
    audio: TerminalAudio,
    reload: ReloadRequest,
}

impl Round {
    fn new(
        config: &EngineConfig,
        store: &mut dyn KeyValueStore,
        bell: bool,
    ) -> Result<Self, ConfigError> {
        let mut round = Self {
            engine: Engine::new(config.clone(), &*store)?,
            input: PointerInput::new(),
            hud: ScoreHud::new(),
            camera: Camera::new(),
            audio: TerminalAudio::new(bell),
            reload: ReloadRequest::default(),
        };
        round.engine.start(&mut Collaborators {
            input: &round.input,
            hud: &mut round.hud,
            camera: &mut round.camera,
            audio: &mut round.audio,
            store,
            session: &mut round.reload,
        });
        Ok(round)
    }

    fn tick(&mut self, dt: f32, store: &mut dyn KeyValueStore) {
        self.engine.tick(
            dt,
            &mut Collaborators {
                input: &self.input,
                hud: &mut self.hud,
                camera: &mut self.camera,
                audio: &mut self.audio,
                store,
                session: &mut self.reload,
            },
        );
        self.input.end_tick();
        self.hud.update(dt);
        self.camera.update(dt);
    }

    fn scene<'a>(&'a self, theme: &'a Theme) -> Scene<'a> {
        Scene {
            engine: &self.engine,
            hud: &self.hud,
            camera: &self.camera,
            theme,
        }
    }
}

pub struct App {
    args: Args,
    config: EngineConfig,
    theme: Theme,
    store: Box<dyn KeyValueStore>,
    rounds: u32,
}

impl App {
    pub fn new(
        args: Args,
        config: EngineConfig,
        theme: Theme,
        store: Box<dyn KeyValueStore>,
    ) -> Self {
        Self {
            args,
            config,
            theme,
            store,
            rounds: 0,
        }
    }

    fn new_round(&mut self) -> Result<Round> {
        self.rounds += 1;
        tracing::info!(round = self.rounds, blocks = self.config.block_count, "starting round");
        Ok(Round::new(&self.config, self.store.as_mut(), self.args.bell)?)
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{
                DisableMouseCapture, EnableMouseCapture, KeyboardEnhancementFlags,
                PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
            },
            execute,
            terminal::{
                EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
            },
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

        // Release events for Space/Enter; terminals without the protocol fall back to a
        // synthesised release.
        let _ = execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        );

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        execute!(std::io::stdout(), DisableMouseCapture, LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.args.frame_rate.max(1.0));
        let mut round = self.new_round()?;
        let mut last_tick = Instant::now();
        loop {
            let now = Instant::now();
            terminal.draw(|f| ui::draw(f, &round.scene(&self.theme)))?;

            let timeout = frame_duration.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    let action = match event::read()? {
                        Event::Key(key) => round.input.handle_key(key),
                        Event::Mouse(mouse) => round.input.handle_mouse(mouse),
                        _ => Action::None,
                    };
                    if action == Action::Quit {
                        tracing::info!(score = round.engine.display_score(), "quit");
                        return Ok(());
                    }
                }
            }

            let dt = last_tick.elapsed().as_secs_f32().min(MAX_FRAME_SECS);
            last_tick = Instant::now();
            round.tick(dt, self.store.as_mut());

            let bells = round.audio.take_bells();
            if bells > 0 {
                let mut out = std::io::stdout();
                for _ in 0..bells {
                    out.write_all(b"\x07")?;
                }
                out.flush()?;
            }

            if round.reload.0 {
                round = self.new_round()?;
            }
        }
    }
}
