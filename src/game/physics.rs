//! Poses and a minimal rigid body: gravity integration for released blocks.
//!
//! There are no collisions. A dynamic body only falls, which is all the stack needs
//! to clear released pieces off the screen.

use glam::Vec3;

/// Gravity in world units per second squared.
pub const GRAVITY: f32 = -9.81;

/// Position, Euler rotation (degrees) and scale of an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Pose {
    pub fn at(position: Vec3, rotation: Vec3) -> Self {
        Self {
            position,
            rotation,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyMode {
    /// Moved only by code; ignores gravity and velocity.
    Kinematic,
    /// Integrated every step.
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub mode: BodyMode,
    pub use_gravity: bool,
    /// All motion frozen (position and rotation constraints).
    pub frozen: bool,
    pub velocity: Vec3,
    /// Degrees per second around each axis.
    pub angular_velocity: Vec3,
}

impl Default for Body {
    fn default() -> Self {
        Self {
            mode: BodyMode::Kinematic,
            use_gravity: false,
            frozen: true,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
        }
    }
}

impl Body {
    pub fn is_dynamic(&self) -> bool {
        self.mode == BodyMode::Dynamic
    }

    pub fn stop(&mut self) {
        self.velocity = Vec3::ZERO;
        self.angular_velocity = Vec3::ZERO;
    }

    /// Advance `pose` by one explicit Euler step.
    pub fn step(&mut self, pose: &mut Pose, dt: f32) {
        if !self.is_dynamic() || self.frozen {
            return;
        }
        if self.use_gravity {
            self.velocity.y += GRAVITY * dt;
        }
        pose.position += self.velocity * dt;
        pose.rotation += self.angular_velocity * dt;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinematic_body_does_not_move() {
        let mut body = Body::default();
        let mut pose = Pose::default();
        body.step(&mut pose, 1.0);
        assert_eq!(pose.position, Vec3::ZERO);
    }

    #[test]
    fn test_dynamic_body_falls() {
        let mut body = Body {
            mode: BodyMode::Dynamic,
            use_gravity: true,
            frozen: false,
            ..Body::default()
        };
        let mut pose = Pose::default();
        body.step(&mut pose, 0.5);
        body.step(&mut pose, 0.5);
        assert!(pose.position.y < 0.0);
        assert!(body.velocity.y < 0.0);
        body.stop();
        assert_eq!(body.velocity, Vec3::ZERO);
    }
}
