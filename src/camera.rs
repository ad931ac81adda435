//! Camera shake: a short random jitter around the rest position.

use crate::game::CameraShake;
use glam::Vec3;
use rand::Rng;

/// Offset radius in world units.
pub const SHAKE_POWER: f32 = 0.25;
pub const SHAKE_SECS: f32 = 2.0;

#[derive(Debug, Clone, Default)]
pub struct Camera {
    remaining: f32,
    offset: Vec3,
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, dt: f32) {
        if self.remaining > 0.0 {
            self.offset = random_in_unit_sphere(&mut rand::thread_rng()) * SHAKE_POWER;
            self.remaining -= dt;
        } else {
            self.remaining = 0.0;
            self.offset = Vec3::ZERO;
        }
    }

    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    #[cfg(test)]
    pub fn is_shaking(&self) -> bool {
        self.remaining > 0.0
    }
}

impl CameraShake for Camera {
    fn shake(&mut self) {
        self.remaining = SHAKE_SECS;
    }
}

fn random_in_unit_sphere(rng: &mut impl Rng) -> Vec3 {
    loop {
        let p = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        if p.length_squared() <= 1.0 {
            return p;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_camera_stays_put() {
        let mut cam = Camera::new();
        cam.update(0.1);
        assert_eq!(cam.offset(), Vec3::ZERO);
        assert!(!cam.is_shaking());
    }

    #[test]
    fn test_shake_is_bounded_and_ends() {
        let mut cam = Camera::new();
        cam.shake();
        for _ in 0..39 {
            cam.update(0.05);
            assert!(cam.offset().length() <= SHAKE_POWER + 1e-6);
        }
        assert!(cam.is_shaking());
        for _ in 0..3 {
            cam.update(0.05);
        }
        assert!(!cam.is_shaking());
        assert_eq!(cam.offset(), Vec3::ZERO);
    }

    #[test]
    fn test_retrigger_restarts_duration() {
        let mut cam = Camera::new();
        cam.shake();
        cam.update(1.5);
        cam.shake();
        cam.update(1.5);
        assert!(cam.is_shaking());
    }
}
