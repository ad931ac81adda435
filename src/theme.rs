//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::game::Rgba;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// One Dark palette and UI colours loaded from a theme file.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Block gradient stops, low score phase to high.
    pub gradient: [Color; 4],
    /// Playfield background.
    pub bg: Color,
    /// Grid / border.
    pub div_line: Color,
    /// Text (score, combo).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Hints and the placement pulse.
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("reading theme file: {0}")]
    Read(#[from] std::io::Error),
    #[error("not a hex colour: {0:?}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

const GREEN: Color = Color::Rgb(0x98, 0xC3, 0x79);
const YELLOW: Color = Color::Rgb(0xE5, 0xC0, 0x7B);
const RED: Color = Color::Rgb(0xE0, 0x6C, 0x75);
const BLUE: Color = Color::Rgb(0x61, 0xAF, 0xEF);
const METER_BG: Color = Color::Rgb(0x31, 0x35, 0x3F);
const DIV_LINE: Color = Color::Rgb(0x3F, 0x44, 0x4F);
const MAIN_FG: Color = Color::Rgb(0xAB, 0xB2, 0xBF);
const INACTIVE_FG: Color = Color::Rgb(0x5C, 0x63, 0x70);

impl Theme {
    /// Hardcoded One Dark defaults: exact hex values from onedark.theme.
    pub fn onedark_default() -> Self {
        Self {
            gradient: [GREEN, YELLOW, RED, BLUE],
            bg: METER_BG,
            div_line: DIV_LINE,
            main_fg: MAIN_FG,
            title: YELLOW,
            inactive_fg: INACTIVE_FG,
        }
    }

    /// Theme from an optional btop-style file, then recoloured for `palette`.
    /// A missing file is not an error: the One Dark colours are used instead.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => {
                let text = std::fs::read_to_string(p)?;
                Self::from_map(&parse_theme_file(&text))
            }
            Some(p) => {
                tracing::warn!(path = %p.display(), "theme file not found, using defaults");
                Self::onedark_default()
            }
            None => Self::onedark_default(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    /// Override the gradient for high-contrast or colorblind.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.gradient = [
                    Color::Rgb(0x00, 0xFF, 0x00),
                    Color::Rgb(0xFF, 0xFF, 0x00),
                    Color::Rgb(0xFF, 0x00, 0x00),
                    Color::Rgb(0x00, 0x88, 0xFF),
                ];
            }
            crate::Palette::Colorblind => {
                // blue/orange/teal/magenta: no red-green pair next to each other
                self.gradient = [
                    Color::Rgb(0x00, 0x77, 0xBB),
                    Color::Rgb(0xEE, 0x77, 0x33),
                    Color::Rgb(0x00, 0x99, 0x88),
                    Color::Rgb(0xEE, 0x33, 0x77),
                ];
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        // First key that holds a valid colour wins.
        let pick = |keys: &[&str], fallback: Color| {
            keys.iter()
                .find_map(|key| map.get(*key).and_then(|v| parse_hex(v).ok()))
                .unwrap_or(fallback)
        };
        // gradient_N keys, else the btop cpu/temp meter gradient.
        Self {
            gradient: [
                pick(&["gradient_0", "cpu_start"], GREEN),
                pick(&["gradient_1", "cpu_mid"], YELLOW),
                pick(&["gradient_2", "cpu_end"], RED),
                pick(&["gradient_3", "temp_end", "cpu_box"], BLUE),
            ],
            bg: pick(&["meter_bg"], METER_BG),
            div_line: pick(&["div_line"], DIV_LINE),
            main_fg: pick(&["main_fg"], MAIN_FG),
            title: pick(&["title"], YELLOW),
            inactive_fg: pick(&["inactive_fg"], INACTIVE_FG),
        }
    }

    /// Gradient stops as engine colours.
    pub fn gradient_rgba(&self) -> [Rgba; 4] {
        self.gradient.map(to_rgba)
    }
}

/// Opaque engine colour for a ratatui colour. Only RGB colours carry components;
/// anything else maps to white.
pub fn to_rgba(color: Color) -> Rgba {
    match color {
        Color::Rgb(r, g, b) => Rgba::rgb(r, g, b),
        _ => Rgba::WHITE,
    }
}

/// Terminal colour for an engine colour (alpha ignored).
pub fn to_color(color: Rgba) -> Color {
    Color::Rgb(color.r, color.g, color.b)
}

/// `theme[key]="value"` (or single-quoted) lines as a key -> value map.
/// Comments, blank lines and anything else are skipped.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    s.lines()
        .filter_map(|line| {
            let (key, rest) = line.trim().strip_prefix("theme[")?.split_once(']')?;
            let (_, value) = rest.split_once('=')?;
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            (!value.is_empty()).then(|| (key.trim().to_string(), value.to_string()))
        })
        .collect()
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let digit = |range: std::ops::Range<usize>| {
        s.get(range)
            .and_then(|d| u8::from_str_radix(d, 16).ok())
            .ok_or_else(|| ThemeError::InvalidHex(s.to_string()))
    };
    let (r, g, b) = match s.len() {
        6 => (digit(0..2)?, digit(2..4)?, digit(4..6)?),
        3 => (digit(0..1)? * 17, digit(1..2)? * 17, digit(2..3)? * 17),
        _ => return Err(ThemeError::InvalidHex(s.to_string())),
    };
    Ok(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#98C379").unwrap();
        assert!(matches!(c, Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("#GG0000").is_err());
        assert!(parse_hex("#é12").is_err());
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(r##"theme[meter_bg]="#31353F""##);
        assert_eq!(map.get("meter_bg"), Some(&"#31353F".to_string()));
    }

    #[test]
    fn test_parse_theme_skips_noise() {
        let map = parse_theme_file(
            "# comment\n\ntheme[title]=\"\"\nnot a line\ntheme[main_fg] = '#ABB2BF'",
        );
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("main_fg").map(String::as_str), Some("#ABB2BF"));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let theme = Theme::load(Some(&dir.path().join("nope.theme")), crate::Palette::Colorblind)
            .unwrap();
        assert_eq!(theme.bg, METER_BG);
        assert_eq!(theme.gradient[0], Color::Rgb(0x00, 0x77, 0xBB));
    }

    #[test]
    fn test_gradient_keys_fall_back_to_cpu_meter() {
        let map = parse_theme_file(
            r##"
theme[gradient_0]="#010203"
theme[cpu_start]="#FFFFFF"
theme[cpu_mid]='#0A0B0C'
"##,
        );
        let theme = Theme::from_map(&map);
        assert_eq!(theme.gradient[0], Color::Rgb(1, 2, 3));
        assert_eq!(theme.gradient[1], Color::Rgb(10, 11, 12));
        assert_eq!(theme.gradient[2], RED);
        assert_eq!(theme.gradient[3], BLUE);
    }

    #[test]
    fn test_palette_overrides_gradient_only() {
        let mut theme = Theme::onedark_default();
        theme.apply_palette(crate::Palette::HighContrast);
        assert_eq!(theme.gradient[0], Color::Rgb(0, 255, 0));
        assert_eq!(theme.bg, METER_BG);
    }

    #[test]
    fn test_rgba_conversion() {
        let theme = Theme::onedark_default();
        assert_eq!(theme.gradient_rgba()[0], Rgba::rgb(0x98, 0xC3, 0x79));
        assert_eq!(to_rgba(Color::Reset), Rgba::WHITE);
        assert_eq!(to_color(Rgba::rgb(1, 2, 3)), Color::Rgb(1, 2, 3));
    }
}
