//! Lifecycle and placement engine.
//!
//! The engine owns the tower (a ring of moving blocks under a rig that follows the top),
//! the play-bounds, score and combo, and one task slot per lifecycle state. Every
//! transition goes through [`Engine::change_state`], which restarts that state's task and
//! drives it immediately with the current frame's `dt`.

use super::block::{ActiveBlocks, Block};
use super::collab::{Audio, BEST_SCORE_KEY, Collaborators, Cue, KeyValueStore};
use super::color::{Rgba, color_for_score};
use super::effect::{Effect, SoundClip};
use super::physics::Pose;
use super::pool::{Handle, ObjectPool, Prefab};
use super::task::{Flow, TaskSlot};
use glam::{Vec2, Vec3};
use rand::Rng;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Largest footprint on either axis, and the swing amplitude.
pub const MAX_MOVE_BOUNDS: f32 = 10.0;

/// Misalignment up to this is treated as a perfect placement.
pub const ERROR_MARGIN: f32 = 0.25;

/// Footprint growth per placement once the combo passes [`COMBO_START_LIMIT`].
pub const BLOCK_BOUNDS_BONUS: f32 = 0.25;

pub const COMBO_START_LIMIT: u32 = 3;

/// Delay between releasing consecutive tower blocks at game over.
pub const DROP_STAGGER_SECS: f32 = 0.1;

/// Time between the closing fade and the session reload.
pub const RESTART_DELAY_SECS: f32 = 2.0;

const SWING_SPEED: f32 = 2.5;
const RIG_FOLLOW_SPEED: f32 = 2.0;
const BLOCK_HEIGHT: f32 = 1.0;
const FADE_IN_SPEED: f32 = 0.12;
const FADE_OUT_SPEED: f32 = 2.0;
const EFFECT_ROTATION: Vec3 = Vec3::new(90.0, 0.0, 0.0);

const BLOCK_PREFAB: &str = "Block";
const EFFECT_PREFAB: &str = "Effect";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Waiting,
    Running,
    Ending,
    Restarting,
}

/// Horizontal axis the current block swings along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Z,
}

impl Axis {
    pub fn flip(self) -> Self {
        match self {
            Self::X => Self::Z,
            Self::Z => Self::X,
        }
    }

    pub fn component(self, v: Vec3) -> f32 {
        match self {
            Self::X => v.x,
            Self::Z => v.z,
        }
    }

    fn with(self, v: Vec3, value: f32) -> Vec3 {
        match self {
            Self::X => Vec3::new(value, v.y, v.z),
            Self::Z => Vec3::new(v.x, v.y, value),
        }
    }
}

/// Outcome of the last committed placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Perfect,
    Sliced,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("block count must be at least 1 (got {0})")]
    BlockCount(usize),
    #[error("dead threshold must be a positive number (got {0})")]
    DeadThreshold(f32),
    #[error("colour multiplier must be a positive number (got {0})")]
    ColorMultiplier(f32),
    #[error("effect sound length must be a finite, non-negative number (got {0})")]
    EffectSound(f32),
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Blocks in the tower ring.
    pub block_count: usize,
    /// A slice that leaves the footprint at or below this ends the game.
    pub dead_threshold: f32,
    /// Score-to-phase factor for the colour gradient.
    pub color_multiplier: f32,
    /// Gradient stops.
    pub colors: [Rgba; 4],
    pub effect_tint: Rgba,
    /// Length of the sound attached to the placement pulse.
    pub effect_sound_secs: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            block_count: 8,
            dead_threshold: 0.5,
            color_multiplier: 250.0,
            colors: [
                Rgba::rgb(0x98, 0xc3, 0x79),
                Rgba::rgb(0xe5, 0xc0, 0x7b),
                Rgba::rgb(0xe0, 0x6c, 0x75),
                Rgba::rgb(0x61, 0xaf, 0xef),
            ],
            effect_tint: Rgba::WHITE,
            effect_sound_secs: 0.3,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_count < 1 {
            return Err(ConfigError::BlockCount(self.block_count));
        }
        if !(self.dead_threshold.is_finite() && self.dead_threshold > 0.0) {
            return Err(ConfigError::DeadThreshold(self.dead_threshold));
        }
        if !(self.color_multiplier.is_finite() && self.color_multiplier > 0.0) {
            return Err(ConfigError::ColorMultiplier(self.color_multiplier));
        }
        if !(self.effect_sound_secs.is_finite() && self.effect_sound_secs >= 0.0) {
            return Err(ConfigError::EffectSound(self.effect_sound_secs));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitStep {
    Reset,
    AwaitInit,
    FadeIn,
    AwaitRelease,
    Begin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunStep {
    Enter,
    Play,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndStep {
    Collapse,
    /// Release the tower block at this index (ascending by height).
    Release(usize),
    Drain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RestartStep {
    FadeOut,
    Reload,
}

pub struct Engine {
    config: EngineConfig,
    state: GameState,
    frame: u64,
    initialized: bool,

    blocks: ObjectPool<Block>,
    effects: ObjectPool<Effect>,
    block_prefab: Prefab<Block>,
    effect_prefab: Prefab<Effect>,
    active_blocks: ActiveBlocks,

    moving: Vec<Handle<Block>>,
    block_index: usize,
    previous_position: Vec3,
    bounds: Vec2,
    axis: Axis,
    secondary_position: f32,
    swing_phase: f32,
    rig: Vec3,
    rig_target: Vec3,

    score: u32,
    combo: u32,
    best_score: i64,
    last_placement: Option<Placement>,

    waiting: TaskSlot<WaitStep>,
    running: TaskSlot<RunStep>,
    ending: TaskSlot<EndStep>,
    restarting: TaskSlot<RestartStep>,
}

impl Engine {
    /// Validate `config`, read the best score and build the tower ring.
    pub fn new(config: EngineConfig, store: &dyn KeyValueStore) -> Result<Self, ConfigError> {
        config.validate()?;
        let active_blocks = ActiveBlocks::new();
        let block_prefab = Prefab::new(BLOCK_PREFAB, Block::new(active_blocks.clone()));
        let effect_prefab = Prefab::new(
            EFFECT_PREFAB,
            Effect::new(config.effect_tint, SoundClip::new(config.effect_sound_secs)),
        );
        let best_score = store.get_int(BEST_SCORE_KEY, 0);
        let mut engine = Self {
            config,
            state: GameState::Waiting,
            frame: 0,
            initialized: false,
            blocks: ObjectPool::new(),
            effects: ObjectPool::new(),
            block_prefab,
            effect_prefab,
            active_blocks,
            moving: Vec::new(),
            block_index: 0,
            previous_position: Vec3::ZERO,
            bounds: Vec2::splat(MAX_MOVE_BOUNDS),
            axis: Axis::Z,
            secondary_position: 0.0,
            swing_phase: 0.0,
            rig: Vec3::ZERO,
            rig_target: Vec3::ZERO,
            score: 0,
            combo: 0,
            best_score,
            last_placement: None,
            waiting: TaskSlot::new(),
            running: TaskSlot::new(),
            ending: TaskSlot::new(),
            restarting: TaskSlot::new(),
        };
        engine.create_moving_blocks();
        engine.initialized = true;
        Ok(engine)
    }

    fn create_moving_blocks(&mut self) {
        let count = self.config.block_count;
        let color = self.current_color();
        let scale = self.footprint_scale();
        for i in 0..count {
            let pose = Pose::at(Vec3::new(0.0, -(i as f32) * BLOCK_HEIGHT, 0.0), Vec3::ZERO);
            let handle = self.blocks.spawn(&self.block_prefab, pose, &());
            let block = &mut self.blocks[handle];
            block.set_parented(true);
            block.set_scale(scale);
            block.lock();
            block.mesh_mut().fill(color);
            self.moving.push(handle);
        }
        self.block_index = count - 1;
    }

    /// Show the stored best score and enter Waiting.
    pub fn start(&mut self, c: &mut Collaborators<'_>) {
        c.hud.update_best_score(c.store.get_int(BEST_SCORE_KEY, 0));
        self.change_state(GameState::Waiting, 0.0, c);
    }

    /// Advance one frame: drive the current state's task, then the entities.
    pub fn tick(&mut self, dt: f32, c: &mut Collaborators<'_>) {
        self.frame += 1;
        self.poll(self.state, dt, c);
        self.update_blocks(dt);
        self.update_effects(dt);
    }

    fn change_state(&mut self, next: GameState, dt: f32, c: &mut Collaborators<'_>) {
        info!(from = ?self.state, to = ?next, score = self.score, "game state changed");
        self.state = next;
        match next {
            GameState::Waiting => {
                self.waiting.start(WaitStep::Reset);
            }
            GameState::Running => {
                self.running.start(RunStep::Enter);
            }
            GameState::Ending => {
                self.ending.start(EndStep::Collapse);
            }
            GameState::Restarting => {
                self.restarting.start(RestartStep::FadeOut);
            }
        }
        self.poll(next, dt, c);
    }

    fn poll(&mut self, state: GameState, dt: f32, c: &mut Collaborators<'_>) {
        let frame = self.frame;
        match state {
            GameState::Waiting => {
                let Some(mut task) = self.waiting.take() else {
                    return;
                };
                let status = task.drive(dt, frame, |step| self.waiting_step(step, dt, c));
                self.waiting.restore(task, status);
            }
            GameState::Running => {
                let Some(mut task) = self.running.take() else {
                    return;
                };
                let status = task.drive(dt, frame, |step| self.running_step(step, dt, c));
                self.running.restore(task, status);
            }
            GameState::Ending => {
                let Some(mut task) = self.ending.take() else {
                    return;
                };
                let status = task.drive(dt, frame, |step| self.ending_step(step, dt, c));
                self.ending.restore(task, status);
            }
            GameState::Restarting => {
                let Some(mut task) = self.restarting.take() else {
                    return;
                };
                let status = task.drive(dt, frame, |step| self.restarting_step(step, c));
                self.restarting.restore(task, status);
            }
        }
    }

    fn waiting_step(
        &mut self,
        step: WaitStep,
        dt: f32,
        c: &mut Collaborators<'_>,
    ) -> Flow<WaitStep> {
        match step {
            WaitStep::Reset => {
                self.score = 0;
                Flow::Next(WaitStep::AwaitInit)
            }
            WaitStep::AwaitInit if !self.initialized => Flow::Yield(WaitStep::AwaitInit),
            WaitStep::AwaitInit => Flow::Next(WaitStep::FadeIn),
            WaitStep::FadeIn => {
                c.hud.fade(false, 0.0, FADE_IN_SPEED);
                self.bounds = Vec2::splat(MAX_MOVE_BOUNDS);
                Flow::Next(WaitStep::AwaitRelease)
            }
            WaitStep::AwaitRelease if c.input.pointer_up() => Flow::Next(WaitStep::Begin),
            WaitStep::AwaitRelease => Flow::Yield(WaitStep::AwaitRelease),
            WaitStep::Begin => {
                self.add_score(1, c);
                self.change_state(GameState::Running, dt, c);
                Flow::Done
            }
        }
    }

    fn running_step(
        &mut self,
        step: RunStep,
        dt: f32,
        c: &mut Collaborators<'_>,
    ) -> Flow<RunStep> {
        if step == RunStep::Enter {
            c.audio.play_ambient();
        }
        if self.state != GameState::Running {
            return Flow::Done;
        }
        if c.input.pointer_down() {
            if self.try_place(&mut *c.audio) {
                self.replace_block();
                self.add_score(1, c);
            } else {
                self.change_state(GameState::Ending, dt, c);
                return Flow::Done;
            }
        }
        self.move_block(dt);
        self.ease_rig(dt);
        Flow::Yield(RunStep::Play)
    }

    fn ending_step(
        &mut self,
        step: EndStep,
        dt: f32,
        c: &mut Collaborators<'_>,
    ) -> Flow<EndStep> {
        match step {
            EndStep::Collapse => {
                let score = i64::from(self.score);
                if score > self.best_score {
                    if let Err(err) = c.store.set_int(BEST_SCORE_KEY, score) {
                        warn!(%err, score, "failed to persist best score");
                    }
                    self.best_score = score;
                }
                c.audio.stop_ambient();
                c.camera.shake();
                let current = self.moving[self.block_index];
                self.blocks[current].unlock();
                let blocks = &self.blocks;
                self.moving
                    .sort_by(|a, b| blocks[*a].position().y.total_cmp(&blocks[*b].position().y));
                Flow::Next(EndStep::Release(0))
            }
            EndStep::Release(i) if i + 1 < self.moving.len() => {
                self.block_index = i;
                let handle = self.moving[i];
                self.blocks[handle].unlock();
                Flow::Sleep(EndStep::Release(i + 1), DROP_STAGGER_SECS)
            }
            EndStep::Release(_) => Flow::Next(EndStep::Drain),
            EndStep::Drain if self.active_blocks.count() == 0 => {
                self.change_state(GameState::Restarting, dt, c);
                Flow::Done
            }
            EndStep::Drain => Flow::Yield(EndStep::Drain),
        }
    }

    fn restarting_step(
        &mut self,
        step: RestartStep,
        c: &mut Collaborators<'_>,
    ) -> Flow<RestartStep> {
        match step {
            RestartStep::FadeOut => {
                c.hud.fade(true, 1.0, FADE_OUT_SPEED);
                Flow::Sleep(RestartStep::Reload, RESTART_DELAY_SECS)
            }
            RestartStep::Reload => {
                info!(score = self.score, "reloading session");
                c.session.reload();
                Flow::Done
            }
        }
    }

    /// Commit the current block against the previous one. Returns `false` when the
    /// remaining footprint is too small to continue. A perfect drop plays the pulse's
    /// sound at the pulse's pitch.
    fn try_place(&mut self, audio: &mut dyn Audio) -> bool {
        let handle = self.moving[self.block_index];
        let axis = self.axis;
        let previous = self.previous_position;
        let current = self.blocks[handle].position();
        let along = axis.component(current);
        let delta = axis.component(previous) - along;
        let midpoint = (axis.component(previous) + along) * 0.5;

        if delta.abs() > ERROR_MARGIN {
            self.combo = 0;
            let remaining = self.bounds_on(axis) - delta.abs();
            self.set_bounds_on(axis, remaining);
            if remaining - self.config.dead_threshold <= 0.0 {
                debug!(?axis, delta, remaining, "placement missed");
                return false;
            }

            let scale = self.footprint_scale();
            let half = axis.component(scale) * 0.5;
            let offset = if along > 0.0 { along + half } else { along - half };
            let world = self.blocks[handle].world_position(self.rig);
            self.spawn_falling_block(axis.with(world, offset), axis.with(scale, delta.abs()));

            let recentred = self.recentred(axis, midpoint, previous);
            let block = &mut self.blocks[handle];
            block.set_scale(scale);
            block.set_position(recentred);
            self.last_placement = Some(Placement::Sliced);
            debug!(?axis, delta, remaining, score = self.score, "placement sliced");
        } else {
            if self.combo > COMBO_START_LIMIT {
                let grown = (self.bounds_on(axis) + BLOCK_BOUNDS_BONUS).min(MAX_MOVE_BOUNDS);
                self.set_bounds_on(axis, grown);
                let scale = self.footprint_scale();
                let recentred = self.recentred(axis, midpoint, previous);
                let block = &mut self.blocks[handle];
                block.set_scale(scale);
                block.set_position(recentred);
            }
            let at = self.blocks[handle].world_position(self.rig);
            let pulse = self
                .effects
                .spawn(&self.effect_prefab, Pose::at(at, EFFECT_ROTATION), &self.bounds);
            audio.play(Cue::Perfect, self.effects[pulse].pitch());
            self.combo += 1;
            let snapped = Vec3::new(previous.x, self.score as f32, previous.z);
            self.blocks[handle].set_position(snapped);
            self.last_placement = Some(Placement::Perfect);
            debug!(?axis, delta, combo = self.combo, score = self.score, "placement perfect");
        }

        self.secondary_position = axis.component(self.blocks[handle].position());
        self.axis = axis.flip();
        true
    }

    fn spawn_falling_block(&mut self, position: Vec3, scale: Vec3) {
        let color = self.current_color();
        let handle = self
            .blocks
            .spawn(&self.block_prefab, Pose::at(position, Vec3::ZERO), &());
        let block = &mut self.blocks[handle];
        block.set_parented(false);
        block.set_scale(scale);
        block.mesh_mut().fill(color);
        block.unlock();
    }

    /// Move to the next block of the ring and stack it on the one just placed.
    fn replace_block(&mut self) {
        self.previous_position = self.blocks[self.moving[self.block_index]].position();
        let count = self.moving.len();
        self.block_index = (self.block_index + count - 1) % count;
        self.rig_target = Vec3::new(0.0, -(self.score as f32), 0.0);

        let previous = self.previous_position;
        let color = self.current_color();
        let scale = self.footprint_scale();
        let block = &mut self.blocks[self.moving[self.block_index]];
        block.set_position(Vec3::new(previous.x, self.score as f32, previous.z));
        block.set_scale(scale);
        block.mesh_mut().fill(color);
    }

    fn add_score(&mut self, value: u32, c: &mut Collaborators<'_>) {
        self.score += value;
        c.hud.update_score(self.display_score());
        c.audio.play(Cue::Place, random_pitch());
    }

    fn move_block(&mut self, dt: f32) {
        self.swing_phase += SWING_SPEED * dt;
        let swing = self.swing_phase.sin() * MAX_MOVE_BOUNDS;
        let y = self.score as f32;
        let position = match self.axis {
            Axis::X => Vec3::new(swing, y, self.secondary_position),
            Axis::Z => Vec3::new(self.secondary_position, y, swing),
        };
        let handle = self.moving[self.block_index];
        self.blocks[handle].set_position(position);
    }

    fn ease_rig(&mut self, dt: f32) {
        self.rig = self.rig.lerp(self.rig_target, (RIG_FOLLOW_SPEED * dt).min(1.0));
    }

    fn update_blocks(&mut self, dt: f32) {
        let rig = self.rig;
        let fallen: Vec<_> = self
            .blocks
            .active_mut()
            .filter_map(|(handle, block)| block.update(dt, rig).then_some(handle))
            .collect();
        for handle in fallen {
            self.blocks.despawn(handle, &());
        }
    }

    fn update_effects(&mut self, dt: f32) {
        let finished: Vec<_> = self
            .effects
            .active_mut()
            .filter_map(|(handle, effect)| effect.update(dt).then_some(handle))
            .collect();
        for handle in finished {
            self.effects.despawn(handle, &self.bounds);
        }
    }

    fn recentred(&self, axis: Axis, centre: f32, previous: Vec3) -> Vec3 {
        let y = self.score as f32;
        match axis {
            Axis::X => Vec3::new(centre, y, previous.z),
            Axis::Z => Vec3::new(previous.x, y, centre),
        }
    }

    fn bounds_on(&self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.bounds.x,
            Axis::Z => self.bounds.y,
        }
    }

    fn set_bounds_on(&mut self, axis: Axis, value: f32) {
        match axis {
            Axis::X => self.bounds.x = value,
            Axis::Z => self.bounds.y = value,
        }
    }

    fn footprint_scale(&self) -> Vec3 {
        Vec3::new(self.bounds.x, BLOCK_HEIGHT, self.bounds.y)
    }

    fn current_color(&self) -> Rgba {
        color_for_score(&self.config.colors, self.score, self.config.color_multiplier)
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    #[cfg(test)]
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Score as shown to the player: the start bonus is not counted.
    pub fn display_score(&self) -> i64 {
        i64::from(self.score) - 1
    }

    #[cfg(test)]
    pub fn best_score(&self) -> i64 {
        self.best_score
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    /// Footprint (x width, z depth).
    pub fn bounds(&self) -> Vec2 {
        self.bounds
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn rig(&self) -> Vec3 {
        self.rig
    }

    pub fn last_placement(&self) -> Option<Placement> {
        self.last_placement
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn current_block(&self) -> &Block {
        &self.blocks[self.moving[self.block_index]]
    }

    /// Blocks that are live in the world, tower and falling pieces alike.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.active().map(|(_, block)| block)
    }

    pub fn effects(&self) -> impl Iterator<Item = &Effect> {
        self.effects.active().map(|(_, effect)| effect)
    }

    #[cfg(test)]
    pub fn active_block_count(&self) -> usize {
        self.active_blocks.count()
    }
}

fn random_pitch() -> f32 {
    rand::thread_rng().gen_range(0.9..1.1)
}
