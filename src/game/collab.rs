//! Interfaces the engine drives: input, HUD, camera, audio, persistence, session.
//!
//! Implementations are constructed by the app and lent to the engine for each tick
//! through [`Collaborators`].

use thiserror::Error;

/// Key of the persisted best score.
pub const BEST_SCORE_KEY: &str = "BestScore";

/// Single binary pointer control, sampled once per tick.
pub trait InputSource {
    /// The pointer went down this tick.
    fn pointer_down(&self) -> bool;
    /// The pointer was released this tick.
    fn pointer_up(&self) -> bool;
}

/// Score labels and the full-screen fade overlay.
pub trait Hud {
    fn update_score(&mut self, score: i64);
    fn update_best_score(&mut self, best: i64);
    /// Animate the overlay from its opposite end toward `target_fill` at `speed`.
    fn fade(&mut self, to_opaque: bool, target_fill: f32, speed: f32);
}

pub trait CameraShake {
    fn shake(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    /// A block was committed.
    Place,
    /// A perfectly aligned block.
    Perfect,
}

pub trait Audio {
    fn play_ambient(&mut self);
    fn stop_ambient(&mut self);
    fn play(&mut self, cue: Cue, pitch: f32);
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed entry on line {line}: {content}")]
    Malformed { line: usize, content: String },
}

/// Named integer persistence.
pub trait KeyValueStore {
    fn get_int(&self, key: &str, default: i64) -> i64;
    fn set_int(&mut self, key: &str, value: i64) -> Result<(), StoreError>;
}

/// Tears down and rebuilds the running session.
pub trait Session {
    fn reload(&mut self);
}

/// Everything the engine talks to during a tick.
pub struct Collaborators<'a> {
    pub input: &'a dyn InputSource,
    pub hud: &'a mut dyn Hud,
    pub camera: &'a mut dyn CameraShake,
    pub audio: &'a mut dyn Audio,
    pub store: &'a mut dyn KeyValueStore,
    pub session: &'a mut dyn Session,
}
