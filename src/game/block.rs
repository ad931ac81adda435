//! Block entity: one box of the tower or a sliced-off piece.

use super::color::Rgba;
use super::physics::{Body, BodyMode, Pose};
use super::pool::Poolable;
use glam::Vec3;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// World height at which a falling block removes itself.
pub const FALL_DESPAWN_Y: f32 = -30.0;

/// Vertices in a box mesh (4 per face, 6 faces).
const BOX_VERTICES: usize = 24;

/// Shared count of blocks that are currently live in the world.
#[derive(Debug, Clone, Default)]
pub struct ActiveBlocks(Arc<AtomicUsize>);

impl ActiveBlocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn unregister(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-vertex colours of a block.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    colors: Vec<Rgba>,
}

impl Default for Mesh {
    fn default() -> Self {
        Self {
            colors: vec![Rgba::WHITE; BOX_VERTICES],
        }
    }
}

impl Mesh {
    #[cfg(test)]
    pub fn vertex_count(&self) -> usize {
        self.colors.len()
    }

    #[cfg(test)]
    pub fn colors(&self) -> &[Rgba] {
        &self.colors
    }

    /// Overwrite every vertex with `color`.
    pub fn fill(&mut self, color: Rgba) {
        self.colors.fill(color);
    }

    /// Colour of the first vertex; meshes are always filled uniformly.
    pub fn color(&self) -> Rgba {
        self.colors.first().copied().unwrap_or(Rgba::WHITE)
    }
}

#[derive(Debug, Clone)]
pub struct Block {
    pose: Pose,
    default_pose: Pose,
    body: Body,
    mesh: Mesh,
    /// Child of the tower rig; world position is rig + local.
    parented: bool,
    /// Height watch started on enable, cleared on disable.
    watching: bool,
    tracker: ActiveBlocks,
}

impl Block {
    pub fn new(tracker: ActiveBlocks) -> Self {
        Self {
            pose: Pose::default(),
            default_pose: Pose::default(),
            body: Body::default(),
            mesh: Mesh::default(),
            parented: false,
            watching: false,
            tracker,
        }
    }

    #[cfg(test)]
    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn position(&self) -> Vec3 {
        self.pose.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.pose.position = position;
    }

    pub fn scale(&self) -> Vec3 {
        self.pose.scale
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.pose.scale = scale;
    }

    #[cfg(test)]
    pub fn default_pose(&self) -> &Pose {
        &self.default_pose
    }

    #[cfg(test)]
    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn mesh_mut(&mut self) -> &mut Mesh {
        &mut self.mesh
    }

    #[cfg(test)]
    pub fn is_parented(&self) -> bool {
        self.parented
    }

    pub fn set_parented(&mut self, parented: bool) {
        self.parented = parented;
    }

    pub fn is_locked(&self) -> bool {
        !self.body.is_dynamic()
    }

    pub fn world_position(&self, rig: Vec3) -> Vec3 {
        if self.parented {
            rig + self.pose.position
        } else {
            self.pose.position
        }
    }

    /// Kinematic, gravity off, all motion frozen.
    pub fn lock(&mut self) {
        self.body.mode = BodyMode::Kinematic;
        self.body.use_gravity = false;
        self.body.frozen = true;
    }

    /// Dynamic, gravity on, unconstrained.
    pub fn unlock(&mut self) {
        self.body.mode = BodyMode::Dynamic;
        self.body.use_gravity = true;
        self.body.frozen = false;
    }

    /// Integrate physics and run the height watch. Returns `true` once an unlocked
    /// block has fallen far enough to be despawned; locked tower blocks never are.
    pub fn update(&mut self, dt: f32, rig: Vec3) -> bool {
        self.body.step(&mut self.pose, dt);
        self.watching && !self.is_locked() && self.world_position(rig).y <= FALL_DESPAWN_Y
    }
}

impl Poolable for Block {
    type Context = ();

    fn on_create(&mut self) {
        self.default_pose = self.pose;
    }

    fn set_pose(&mut self, pose: Pose) {
        self.pose.position = pose.position;
        self.pose.rotation = pose.rotation;
    }

    fn on_enable(&mut self, _ctx: &()) {
        self.tracker.register();
        self.watching = true;
    }

    fn on_disable(&mut self, _ctx: &()) {
        self.tracker.unregister();
        self.watching = false;
        self.body.stop();
        self.pose = self.default_pose;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::pool::{ObjectPool, Prefab};

    #[test]
    fn test_tracker_counts_enable_and_disable() {
        let tracker = ActiveBlocks::new();
        let mut pool = ObjectPool::new();
        let prefab = Prefab::new("Block", Block::new(tracker.clone()));
        let a = pool.spawn(&prefab, Pose::default(), &());
        let b = pool.spawn(&prefab, Pose::default(), &());
        assert_eq!(tracker.count(), 2);
        pool.despawn(a, &());
        assert_eq!(tracker.count(), 1);
        pool.despawn(b, &());
        assert_eq!(tracker.count(), 0);
    }

    #[test]
    fn test_unregister_never_underflows() {
        let tracker = ActiveBlocks::new();
        tracker.unregister();
        assert_eq!(tracker.count(), 0);
    }

    #[test]
    fn test_lock_and_unlock_toggle_body() {
        let mut block = Block::new(ActiveBlocks::new());
        block.unlock();
        assert!(!block.is_locked());
        assert!(block.body().use_gravity);
        block.lock();
        assert!(block.is_locked());
        assert!(block.body().frozen);
    }

    #[test]
    fn test_disable_restores_default_pose_and_stops_body() {
        let tracker = ActiveBlocks::new();
        let mut pool = ObjectPool::new();
        let prefab = Prefab::new("Block", Block::new(tracker));
        let h = pool.spawn(&prefab, Pose::at(Vec3::new(0.0, 2.0, 0.0), Vec3::ZERO), &());
        {
            let block = pool.get_mut(h).unwrap();
            block.set_scale(Vec3::new(3.0, 1.0, 4.0));
            block.unlock();
            block.update(0.5, Vec3::ZERO);
            assert!(block.position().y < 2.0);
        }
        pool.despawn(h, &());
        let block = pool.get(h).unwrap();
        assert_eq!(block.position(), Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(block.scale(), Vec3::ONE);
        assert_eq!(block.body().velocity, Vec3::ZERO);
    }

    #[test]
    fn test_unlocked_block_eventually_falls_off() {
        let mut block = Block::new(ActiveBlocks::new());
        block.on_enable(&());
        block.unlock();
        let mut fell = false;
        for _ in 0..600 {
            if block.update(1.0 / 60.0, Vec3::ZERO) {
                fell = true;
                break;
            }
        }
        assert!(fell);
        assert!(block.position().y <= FALL_DESPAWN_Y);
    }

    #[test]
    fn test_locked_block_below_floor_stays() {
        let mut block = Block::new(ActiveBlocks::new());
        block.on_enable(&());
        block.set_position(Vec3::new(0.0, -45.0, 0.0));
        block.lock();
        assert!(!block.update(0.1, Vec3::ZERO));
        block.unlock();
        assert!(block.update(0.1, Vec3::ZERO));
    }

    #[test]
    fn test_parented_block_uses_rig_offset() {
        let mut block = Block::new(ActiveBlocks::new());
        block.set_position(Vec3::new(1.0, 2.0, 3.0));
        block.set_parented(true);
        let world = block.world_position(Vec3::new(0.0, -5.0, 0.0));
        assert_eq!(world, Vec3::new(1.0, -3.0, 3.0));
    }

    #[test]
    fn test_mesh_fill_overwrites_every_vertex() {
        let mut mesh = Mesh::default();
        let c = Rgba::rgb(1, 2, 3);
        mesh.fill(c);
        assert!(mesh.colors().iter().all(|&v| v == c));
        assert_eq!(mesh.vertex_count(), BOX_VERTICES);
        assert_eq!(mesh.color(), c);
    }
}
