//! Placement pulse: a flat footprint that grows to twice the stack size and fades out.

use super::color::Rgba;
use super::physics::Pose;
use super::pool::Poolable;
use glam::Vec2;
use rand::Rng;

/// Scale/tint easing speed (units per second along the growth path).
const LERP_SPEED: f32 = 10.0;

/// An attached one-shot sound, tracked only by its remaining play time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SoundClip {
    length: f32,
    remaining: f32,
}

impl SoundClip {
    pub fn new(length: f32) -> Self {
        Self {
            length: length.max(0.0),
            remaining: 0.0,
        }
    }

    pub fn play(&mut self) {
        self.remaining = self.length;
    }

    pub fn is_playing(&self) -> bool {
        self.remaining > 0.0
    }

    fn advance(&mut self, dt: f32) {
        self.remaining = (self.remaining - dt).max(0.0);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Growing,
    AwaitSound,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pulse {
    elapsed: f32,
    journey: f32,
    phase: Phase,
}

#[derive(Debug, Clone)]
pub struct Effect {
    pose: Pose,
    size: Vec2,
    target_size: Vec2,
    tint: Rgba,
    default_tint: Rgba,
    pitch: f32,
    sound: SoundClip,
    pulse: Option<Pulse>,
}

impl Effect {
    pub fn new(tint: Rgba, sound: SoundClip) -> Self {
        Self {
            pose: Pose::default(),
            size: Vec2::ONE,
            target_size: Vec2::ONE,
            tint,
            default_tint: tint,
            pitch: 1.0,
            sound,
            pulse: None,
        }
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    /// Footprint size (x width, z depth).
    pub fn size(&self) -> Vec2 {
        self.size
    }

    #[cfg(test)]
    pub fn target_size(&self) -> Vec2 {
        self.target_size
    }

    pub fn tint(&self) -> Rgba {
        self.tint
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    #[cfg(test)]
    pub fn is_pulsing(&self) -> bool {
        self.pulse.is_some()
    }

    /// Advance the pulse. Returns `true` when the effect has finished and should be
    /// returned to the pool.
    pub fn update(&mut self, dt: f32) -> bool {
        self.sound.advance(dt);
        let Some(mut pulse) = self.pulse else {
            return false;
        };
        if pulse.phase == Phase::Growing {
            if self.size.length_squared() < self.target_size.length_squared() {
                pulse.elapsed += dt;
                let fraction = if pulse.journey > 0.0 {
                    (pulse.elapsed * LERP_SPEED / pulse.journey).min(1.0)
                } else {
                    1.0
                };
                self.size = if fraction >= 1.0 {
                    self.target_size
                } else {
                    self.size.lerp(self.target_size, fraction)
                };
                self.tint = self.tint.lerp(self.default_tint.with_alpha(0), fraction);
                self.pulse = Some(pulse);
                return false;
            }
            pulse.phase = Phase::AwaitSound;
        }
        if self.sound.is_playing() {
            self.pulse = Some(pulse);
            return false;
        }
        self.pulse = None;
        true
    }
}

impl Poolable for Effect {
    /// Current play-bounds of the stack.
    type Context = Vec2;

    fn set_pose(&mut self, pose: Pose) {
        self.pose.position = pose.position;
        self.pose.rotation = pose.rotation;
    }

    fn on_enable(&mut self, bounds: &Vec2) {
        self.size = *bounds;
        self.target_size = *bounds * 2.0;
        self.pitch = rand::thread_rng().gen_range(0.9..1.1);
        self.tint = self.default_tint;
        if self.pulse.is_none() {
            self.pulse = Some(Pulse {
                elapsed: 0.0,
                journey: self.size.distance(self.target_size),
                phase: Phase::Growing,
            });
            self.sound.play();
        }
    }

    fn on_disable(&mut self, _bounds: &Vec2) {
        self.pulse = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::pool::{ObjectPool, Prefab};

    fn effect(sound: f32) -> Effect {
        Effect::new(Rgba::WHITE, SoundClip::new(sound))
    }

    #[test]
    fn test_enable_snaps_to_bounds() {
        let mut e = effect(0.0);
        e.on_enable(&Vec2::new(4.0, 6.0));
        assert_eq!(e.size(), Vec2::new(4.0, 6.0));
        assert_eq!(e.target_size(), Vec2::new(8.0, 12.0));
        assert_eq!(e.tint(), Rgba::WHITE);
        assert!(e.is_pulsing());
        assert!((0.9..1.1).contains(&e.pitch()));
    }

    #[test]
    fn test_second_enable_does_not_restart_pulse() {
        let mut e = effect(0.0);
        e.on_enable(&Vec2::new(4.0, 4.0));
        e.update(0.1);
        let before = e.pulse;
        e.on_enable(&Vec2::new(4.0, 4.0));
        assert_eq!(e.pulse, before);
    }

    #[test]
    fn test_pulse_grows_fades_then_finishes() {
        let mut e = effect(0.0);
        e.on_enable(&Vec2::new(10.0, 10.0));
        let mut finished = false;
        for _ in 0..200 {
            if e.update(1.0 / 60.0) {
                finished = true;
                break;
            }
        }
        assert!(finished);
        assert_eq!(e.size(), Vec2::new(20.0, 20.0));
        assert_eq!(e.tint().a, 0);
        assert!(!e.is_pulsing());
    }

    #[test]
    fn test_pulse_waits_for_sound() {
        let mut e = effect(5.0);
        e.on_enable(&Vec2::new(1.0, 1.0));
        for _ in 0..120 {
            assert!(!e.update(1.0 / 60.0));
        }
        assert_eq!(e.size(), Vec2::new(2.0, 2.0));
        let mut finished = false;
        for _ in 0..300 {
            if e.update(1.0 / 60.0) {
                finished = true;
                break;
            }
        }
        assert!(finished);
    }

    #[test]
    fn test_disable_cancels_pulse() {
        let mut pool = ObjectPool::new();
        let prefab = Prefab::new("Effect", effect(1.0));
        let h = pool.spawn(&prefab, Pose::default(), &Vec2::new(2.0, 2.0));
        assert!(pool.get(h).unwrap().is_pulsing());
        pool.despawn(h, &Vec2::ZERO);
        assert!(!pool.get(h).unwrap().is_pulsing());
    }
}
