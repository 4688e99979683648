//! Input events.
//!
//! The host input layer (touch, trackball, sensor fusion, location
//! service) produces events; the update loop drains them once per frame
//! and applies them to the camera, all on one thread. The sensor
//! matrix path may bypass the queue and call
//! [`Camera::set_rotation_matrix`] directly from its callback thread;
//! that write is protected by the camera's internal lock.

use std::collections::VecDeque;

use tracing::warn;

use crate::camera::Camera;
use crate::config::CoreConfig;
use crate::geo::{GeoPoint, LocationSource};

/// One input event from the host platform.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Finger drag on the screen, deltas in pixels (y grows downward).
    TouchDrag { dx: f32, dy: f32 },
    /// Trackball movement, small normalized deltas.
    Trackball { dx: f32, dy: f32 },
    /// Orientation matrix from sensor fusion, 16 floats at `offset`.
    OrientationMatrix { values: Vec<f32>, offset: usize },
    /// A new GPS fix for the device.
    LocationFix(GeoPoint),
}

/// FIFO queue of pending input events.
#[derive(Debug, Default)]
pub struct EventQueue {
    queue: VecDeque<InputEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: InputEvent) {
        self.queue.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drains all pending events into the camera. Touch and trackball
    /// deltas become buffered camera-relative moves (screen-y down maps to
    /// forward), orientation matrices replace the sensor rotation, and
    /// location fixes re-anchor the camera via the zero reference.
    ///
    /// Events that cannot be applied yet (malformed matrix, no zero
    /// reference) are logged and skipped; input glue must not take the
    /// session down.
    pub fn drain_into(
        &mut self,
        camera: &mut Camera,
        cfg: &CoreConfig,
        source: &dyn LocationSource,
    ) {
        while let Some(event) = self.queue.pop_front() {
            match event {
                InputEvent::TouchDrag { dx, dy } => {
                    camera
                        .change_xy_position_buffered(dx / cfg.touch_factor, -dy / cfg.touch_factor);
                }
                InputEvent::Trackball { dx, dy } => {
                    camera.change_xy_position_buffered(
                        dx * cfg.trackball_factor,
                        -dy * cfg.trackball_factor,
                    );
                }
                InputEvent::OrientationMatrix { values, offset } => {
                    if let Err(e) = camera.set_rotation_matrix(&values, offset) {
                        warn!(error = %e, "dropping bad orientation matrix");
                    }
                }
                InputEvent::LocationFix(fix) => {
                    if let Err(e) = camera.set_gps_position(&fix, source) {
                        warn!(error = %e, "dropping location fix");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Viewport;
    use crate::geo::FixedLocation;
    use crate::math::{RotationMatrix, Vec3};
    use crate::motion::Updateable;

    fn settle(cam: &mut Camera) {
        for _ in 0..1000 {
            if !cam.update(0.016) {
                break;
            }
        }
    }

    #[test]
    fn touch_drag_moves_the_buffered_target() {
        let mut cam = Camera::new(Viewport::default());
        let cfg = CoreConfig::default();
        let mut queue = EventQueue::new();
        // Drag down by one touch factor: camera moves backward one meter.
        queue.push(InputEvent::TouchDrag {
            dx: 0.0,
            dy: cfg.touch_factor,
        });
        queue.drain_into(&mut cam, &cfg, &FixedLocation::default());
        assert!(queue.is_empty());
        settle(&mut cam);
        assert!((cam.position().y + 1.0).abs() < 1e-3);
    }

    #[test]
    fn orientation_event_replaces_the_sensor_matrix() {
        let mut cam = Camera::new(Viewport::default());
        let cfg = CoreConfig::default();
        let mut queue = EventQueue::new();
        let m = RotationMatrix::rotation_z(45.0);
        queue.push(InputEvent::OrientationMatrix {
            values: m.m.to_vec(),
            offset: 0,
        });
        queue.drain_into(&mut cam, &cfg, &FixedLocation::default());
        assert_eq!(cam.rotation_matrix(), m);
    }

    #[test]
    fn bad_events_are_skipped_not_fatal() {
        let mut cam = Camera::new(Viewport::default());
        let cfg = CoreConfig::default();
        let mut queue = EventQueue::new();
        queue.push(InputEvent::OrientationMatrix {
            values: vec![0.0; 4],
            offset: 0,
        });
        // No zero reference yet: the fix cannot be applied.
        queue.push(InputEvent::LocationFix(GeoPoint::new(50.0, 6.0, 200.0)));
        queue.drain_into(&mut cam, &cfg, &FixedLocation::default());
        assert_eq!(cam.rotation_matrix(), RotationMatrix::identity());
        assert_eq!(cam.position(), Vec3::ZERO);
    }

    #[test]
    fn location_fix_reanchors_the_camera() {
        let mut cam = Camera::new(Viewport::default());
        let cfg = CoreConfig::default();
        let zero = GeoPoint::new(50.7753, 6.0839, 266.0);
        let source = FixedLocation::at(zero);
        let mut queue = EventQueue::new();
        queue.push(InputEvent::LocationFix(GeoPoint::new(
            50.7754, 6.0839, 266.0,
        )));
        queue.drain_into(&mut cam, &cfg, &source);
        settle(&mut cam);
        assert!(cam.position().y > 5.0, "one ten-thousandth of a degree north");
    }
}
