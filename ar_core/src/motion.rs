//! Buffered motion.
//!
//! A target value is set immediately; the actual value converges toward it
//! over subsequent update ticks. The per-tick step covers
//! `min(1, speed * dt)` of the remaining distance, so convergence is
//! monotone and never overshoots. Setting a new target before convergence
//! just moves the goal; there is no waypoint queue.

use serde::{Deserialize, Serialize};

use crate::math::Vec3;

/// How close to the target a value must be before it counts as arrived.
const SETTLE_EPSILON: f32 = 1e-4;

/// Per-frame tick contract shared by the camera and movable objects.
///
/// Returns whether anything is still in motion. The driving loop must
/// call this exactly once per frame in a stable order.
pub trait Updateable {
    fn update(&mut self, dt: f32) -> bool;
}

/// A value plus the target it converges toward.
///
/// With no target set, the buffer is idle. The current value starts at
/// zero and can be seeded explicitly where the owner has a better start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionBuffer {
    current: Vec3,
    target: Option<Vec3>,
    speed: f32,
}

impl MotionBuffer {
    pub fn new(speed: f32) -> Self {
        Self {
            current: Vec3::ZERO,
            target: None,
            speed,
        }
    }

    pub fn current(&self) -> Vec3 {
        self.current
    }

    pub fn target(&self) -> Option<Vec3> {
        self.target
    }

    pub fn set_current(&mut self, v: Vec3) {
        self.current = v;
    }

    /// Sets the convergence target, replacing any previous one.
    pub fn set_target(&mut self, v: Vec3) {
        self.target = Some(v);
    }

    /// Moves the target by a delta, seeding it from the current value on
    /// first use.
    pub fn nudge_target(&mut self, dx: f32, dy: f32, dz: f32) {
        let t = self.target.get_or_insert(self.current);
        t.add_xyz(dx, dy, dz);
    }

    /// One morph step. Returns whether motion is still ongoing.
    pub fn step(&mut self, dt: f32) -> bool {
        let Some(target) = self.target else {
            return false;
        };
        self.current.morph_toward(target, self.speed * dt);
        if self.current.distance_to(target) < SETTLE_EPSILON {
            self.current = target;
            return false;
        }
        true
    }

    /// Like [`MotionBuffer::step`] but treats components as angles in
    /// degrees, morphing the short way around the circle. Settling is
    /// judged by angular distance, since the morph may converge onto a
    /// full-turn alias of the target.
    pub fn step_angles(&mut self, dt: f32) -> bool {
        let Some(target) = self.target else {
            return false;
        };
        self.current.morph_angles_toward(target, self.speed * dt);
        if self.current.angular_distance_to(target) < SETTLE_EPSILON {
            self.current = target;
            return false;
        }
        true
    }
}

impl Updateable for MotionBuffer {
    fn update(&mut self, dt: f32) -> bool {
        self.step(dt)
    }
}

/// Generic per-object move component: buffers a target position for a
/// position owned by someone else (the camera, a world object).
///
/// Input actions nudge the target; the owner's position only changes on
/// the next update tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveComp {
    target: Option<Vec3>,
    speed: f32,
}

impl MoveComp {
    pub fn new(speed: f32) -> Self {
        Self {
            target: None,
            speed,
        }
    }

    pub fn target(&self) -> Option<Vec3> {
        self.target
    }

    pub fn set_target(&mut self, v: Vec3) {
        self.target = Some(v);
    }

    pub fn clear_target(&mut self) {
        self.target = None;
    }

    /// Moves the target by a delta. When no target exists yet it is seeded
    /// from `seed` (the owner's current position), so the first nudge moves
    /// relative to where the object actually is.
    pub fn nudge(&mut self, dx: f32, dy: f32, dz: f32, seed: Vec3) {
        let t = self.target.get_or_insert(seed);
        t.add_xyz(dx, dy, dz);
    }

    /// Morphs `position` one step toward the target. Returns whether
    /// motion is still ongoing.
    pub fn update(&mut self, position: &mut Vec3, dt: f32) -> bool {
        let Some(target) = self.target else {
            return false;
        };
        position.morph_toward(target, self.speed * dt);
        if position.distance_to(target) < SETTLE_EPSILON {
            *position = target;
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_target_means_no_motion() {
        let mut buf = MotionBuffer::new(3.0);
        buf.set_current(Vec3::new(1.0, 2.0, 3.0));
        assert!(!buf.step(0.016));
        assert_eq!(buf.current(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn converges_and_settles_on_target() {
        let mut buf = MotionBuffer::new(3.0);
        buf.set_target(Vec3::new(4.0, 0.0, 0.0));
        let mut moving = true;
        for _ in 0..500 {
            moving = buf.step(0.016);
            if !moving {
                break;
            }
        }
        assert!(!moving, "must settle within 500 ticks");
        assert_eq!(buf.current(), Vec3::new(4.0, 0.0, 0.0));
        // Arrived state is stable, not an error.
        assert!(!buf.step(0.016));
    }

    #[test]
    fn retargeting_moves_the_goalpost() {
        let mut buf = MotionBuffer::new(3.0);
        buf.set_target(Vec3::new(10.0, 0.0, 0.0));
        buf.step(0.016);
        buf.set_target(Vec3::new(-10.0, 0.0, 0.0));
        for _ in 0..500 {
            if !buf.step(0.016) {
                break;
            }
        }
        assert_eq!(buf.current(), Vec3::new(-10.0, 0.0, 0.0));
    }

    #[test]
    fn move_comp_seeds_target_from_owner_position() {
        let mut pos = Vec3::new(5.0, 5.0, 0.0);
        let mut comp = MoveComp::new(3.0);
        comp.nudge(1.0, 0.0, 0.0, pos);
        assert_eq!(comp.target(), Some(Vec3::new(6.0, 5.0, 0.0)));
        while comp.update(&mut pos, 0.05) {}
        assert_eq!(pos, Vec3::new(6.0, 5.0, 0.0));
    }

    #[test]
    fn oversized_tick_never_overshoots() {
        let mut pos = Vec3::ZERO;
        let mut comp = MoveComp::new(3.0);
        comp.set_target(Vec3::new(1.0, 0.0, 0.0));
        comp.update(&mut pos, 10.0);
        assert_eq!(pos, Vec3::new(1.0, 0.0, 0.0));
    }
}
