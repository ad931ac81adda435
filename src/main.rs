//! Stackertui: tap-to-stack tower game in the terminal.

mod app;
mod audio;
mod camera;
mod game;
mod highscores;
mod hud;
mod input;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use game::{EngineConfig, KeyValueStore};
use highscores::{FileStore, MemoryStore};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Engine options derived from CLI and theme.
fn engine_config(args: &Args, theme: &theme::Theme) -> EngineConfig {
    EngineConfig {
        block_count: args.blocks,
        dead_threshold: args.dead_threshold,
        color_multiplier: args.color_multiplier,
        colors: theme.gradient_rgba(),
        effect_tint: theme::to_rgba(theme.inactive_fg),
        ..EngineConfig::default()
    }
}

/// Theme from `--theme`, or the defaults when it cannot be read. The palette applies
/// either way.
fn load_theme(path: Option<&Path>, palette: Palette) -> theme::Theme {
    theme::Theme::load(path, palette).unwrap_or_else(|err| {
        tracing::warn!(%err, "failed to load theme, using defaults");
        let mut theme = theme::Theme::default();
        theme.apply_palette(palette);
        theme
    })
}

fn default_log_path() -> PathBuf {
    highscores::config_path().with_file_name("stackertui.log")
}

/// Log to a file; stdout belongs to the TUI. `RUST_LOG` overrides the `info` default.
fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating log file {}", path.display()))?;
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Put the terminal back before a panic message is printed.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = crossterm::terminal::disable_raw_mode();
        let _ = crossterm::execute!(
            std::io::stdout(),
            crossterm::event::DisableMouseCapture,
            crossterm::terminal::LeaveAlternateScreen
        );
        original_hook(panic_info);
    }));
}

fn main() -> Result<()> {
    let args = Args::parse();
    let log_path = args.log_file.clone().unwrap_or_else(default_log_path);
    init_logging(&log_path)?;
    install_panic_hook();

    let theme = load_theme(args.theme.as_deref(), args.palette);
    let config = engine_config(&args, &theme);
    config.validate()?;

    let store: Box<dyn KeyValueStore> = if args.no_save {
        Box::new(MemoryStore::default())
    } else {
        let path = args.store.clone().unwrap_or_else(highscores::config_path);
        let store = FileStore::open(path);
        tracing::info!(path = %store.path().display(), "best score file");
        Box::new(store)
    };

    tracing::info!(?config, "starting");
    let mut app = App::new(args, config, theme, store);
    app.run()?;
    Ok(())
}

/// Tap-to-stack tower game in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "stackertui",
    version,
    about = "Stack swinging blocks as high as you can. Overhangs are sliced off.",
    long_about = "Stackertui is a terminal take on the one-button stacking game.\n\n\
        A block swings across the top of the tower, alternating between the X and Z axes. \
        Drop it onto the block below: anything hanging over the edge is sliced off and \
        falls away, and the next block is only as large as what is left. Land a run of \
        perfect drops to grow the footprint back.\n\n\
        CONTROLS:\n  Left click / Space / Enter  Drop (release to start)\n\
        \x20 Q / Esc                     Quit\n\n\
        The tower is drawn from the front (X) and the side (Z). Use --theme to load a \
        btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Blocks in the tower ring (recycled as the tower grows).
    #[arg(long, default_value = "8", value_name = "N")]
    pub blocks: usize,

    /// The round ends when a slice leaves the footprint at or below this width.
    #[arg(long, default_value = "0.5", value_name = "UNITS")]
    pub dead_threshold: f32,

    /// Score-to-colour phase factor for the block gradient.
    #[arg(long, default_value = "250", value_name = "F")]
    pub color_multiplier: f32,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Target frames per second.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Ring the terminal bell on perfect drops.
    #[arg(long)]
    pub bell: bool,

    /// Best-score file. Defaults to $XDG_CONFIG_HOME/stackertui/highscores.
    #[arg(long, value_name = "FILE")]
    pub store: Option<PathBuf>,

    /// Keep the best score in memory only.
    #[arg(long, conflicts_with = "store")]
    pub no_save: bool,

    /// Log file. Defaults to stackertui.log next to the best-score file.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}

#[cfg(test)]
mod tests {
    use super::*;
    use game::ConfigError;

    #[test]
    fn test_defaults_build_valid_config() {
        let args = Args::parse_from(["stackertui"]);
        let config = engine_config(&args, &theme::Theme::default());
        assert_eq!(config.block_count, 8);
        assert_eq!(config.dead_threshold, 0.5);
        assert_eq!(config.color_multiplier, 250.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_blocks_rejected() {
        let args = Args::parse_from(["stackertui", "--blocks", "0"]);
        let config = engine_config(&args, &theme::Theme::default());
        assert_eq!(config.validate(), Err(ConfigError::BlockCount(0)));
    }

    #[test]
    fn test_palette_aliases() {
        let args = Args::parse_from(["stackertui", "--palette", "colourblind"]);
        assert_eq!(args.palette, Palette::Colorblind);
    }

    #[test]
    fn test_unreadable_theme_keeps_palette() {
        // a directory exists but cannot be read as a theme file
        let dir = tempfile::tempdir().unwrap();
        let theme = load_theme(Some(dir.path()), Palette::Colorblind);
        let mut expected = theme::Theme::default();
        expected.apply_palette(Palette::Colorblind);
        assert_eq!(theme.gradient, expected.gradient);
        assert_ne!(theme.gradient, theme::Theme::default().gradient);
    }

    #[test]
    fn test_store_and_no_save_conflict() {
        assert!(Args::try_parse_from(["stackertui", "--store", "x", "--no-save"]).is_err());
    }
}
