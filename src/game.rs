//! Game core: tower entities, pooling, scheduling and the lifecycle engine.
//!
//! Nothing in here touches the terminal. The app lends the engine its collaborators
//! (input, HUD, camera, audio, store, session) for every tick.

pub mod block;
pub mod collab;
pub mod color;
pub mod effect;
pub mod engine;
pub mod physics;
pub mod pool;
pub mod task;

pub use collab::{
    Audio, CameraShake, Collaborators, Cue, Hud, InputSource, KeyValueStore, Session, StoreError,
};
pub use color::Rgba;
pub use engine::{ConfigError, Engine, EngineConfig, GameState, MAX_MOVE_BOUNDS, Placement};
