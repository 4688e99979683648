//! The virtual camera.
//!
//! One instance per AR session. Three properties matter to callers: the
//! position, the rotation, and the offset. Position changes come either
//! unbuffered (immediate) or buffered (a target converged toward on each
//! update tick). Rotation has two mutually exclusive modes:
//!
//! - `SensorDriven`: the fusion feed owns the rotation and pushes 4x4
//!   matrices from its callback thread. The matrix is the only field
//!   shared between threads and sits behind a dedicated lock, held just
//!   long enough to copy the value in or out.
//! - `Manual`: explicit Euler angles (applied y, x, z) own the rotation;
//!   used for games and scripted movement through a virtual world, at the
//!   cost of the AR impression.
//!
//! Switching modes resets state, so the two representations can never go
//! stale against each other.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tracing::{debug, warn};

use crate::config::CoreConfig;
use crate::geo::{GeoError, GeoFrame, GeoPoint, LocationSource};
use crate::math::{rotation_around_z_axis, GeometryError, RotationMatrix, Vec3};
use crate::motion::{MotionBuffer, MoveComp, Updateable};

/// Screen-space constants consumed by picking: the physical surface size,
/// vertical field of view, and near-plane distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub fov_y_degrees: f32,
    pub near: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 480.0,
            fov_y_degrees: 45.0,
            near: 0.1,
        }
    }
}

impl Viewport {
    pub fn half_width(&self) -> f32 {
        self.width / 2.0
    }

    pub fn half_height(&self) -> f32 {
        self.height / 2.0
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width / self.height
    }

    /// Half-height of the near plane in world units.
    pub fn near_plane_height(&self) -> f32 {
        (self.fov_y_degrees / 2.0).to_radians().tan() * self.near
    }
}

/// A world-space ray: origin plus (unnormalized) direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

/// Which representation owns the camera rotation.
#[derive(Debug)]
pub enum RotationState {
    /// The sensor matrix is authoritative.
    SensorDriven,
    /// Buffered Euler angles are authoritative; x/y/z in degrees, z is the
    /// compass angle (0 north, 90 east).
    Manual { angles: MotionBuffer },
}

/// Everything the render pass needs from the camera, copied out in one
/// call so the rotation lock is taken exactly once per frame.
///
/// Apply as: translate by `-offset`, multiply `rotation`, translate by
/// `-position`.
#[derive(Debug, Clone, Copy)]
pub struct ViewParams {
    pub offset: Vec3,
    pub rotation: RotationMatrix,
    pub position: Vec3,
}

/// The virtual camera of an AR session.
pub struct Camera {
    position: Vec3,
    mover: MoveComp,
    offset: MotionBuffer,
    rotation: RotationState,
    /// Written by the sensor callback thread, read by the render/update
    /// thread. The only shared field; everything else is owned by the
    /// update loop.
    matrix: Mutex<RotationMatrix>,
    rotation_speed: f32,
    viewport: Viewport,
}

impl Camera {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            position: Vec3::ZERO,
            mover: MoveComp::new(3.0),
            offset: MotionBuffer::new(3.0),
            rotation: RotationState::SensorDriven,
            matrix: Mutex::new(RotationMatrix::identity()),
            rotation_speed: 5.0,
            viewport,
        }
    }

    pub fn from_config(cfg: &CoreConfig) -> Self {
        let mut cam = Self::new(cfg.viewport());
        cam.mover = MoveComp::new(cfg.camera_move_speed);
        cam.offset = MotionBuffer::new(cfg.camera_move_speed);
        cam.rotation_speed = cfg.rotation_speed;
        cam
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    // ─── Position ───

    /// The true current location in the virtual world. x positive is east
    /// of the zero position, y positive is north, z is the height.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Unbuffered: the camera jumps immediately.
    pub fn set_position(&mut self, v: Vec3) {
        self.position = v;
    }

    /// Buffered: the camera converges toward `v` on subsequent ticks.
    pub fn set_new_position(&mut self, v: Vec3) {
        self.mover.set_target(v);
    }

    /// The position the camera currently moves toward, if a buffered move
    /// was ever requested.
    pub fn new_position(&self) -> Option<Vec3> {
        self.mover.target()
    }

    /// Moves the buffered target by a delta in world space.
    pub fn change_new_position(&mut self, dx: f32, dy: f32, dz: f32) {
        self.mover.nudge(dx, dy, dz, self.position);
    }

    /// Buffered horizontal move in the camera coordinate system: `dx` is
    /// right, `dy` is forward, rotated by the compass (z) angle only.
    /// Device pitch or roll never bends the movement direction.
    pub fn change_xy_position_buffered(&mut self, dx: f32, dy: f32) {
        let a = self.z_angle_degrees().to_radians();
        let (s, c) = a.sin_cos();
        let world_dx = dx * c + dy * s;
        let world_dy = dy * c - dx * s;
        self.mover.nudge(world_dx, world_dy, 0.0, self.position);
    }

    /// Unbuffered horizontal move in world space by the given deltas.
    pub fn change_position_unbuffered(&mut self, dx: f32, dy: f32) {
        self.position.add_xyz(dx, dy, 0.0);
    }

    /// Buffered height change, e.g. `-10.0` moves the camera 10 meters
    /// down over the next ticks.
    pub fn change_z_position_buffered(&mut self, dz: f32) {
        self.mover.nudge(0.0, 0.0, dz, self.position);
    }

    /// Resets position and buffered target to the origin. With
    /// `reset_z_too` false the heights survive.
    pub fn reset_position(&mut self, reset_z_too: bool) {
        let pz = self.position.z;
        let tz = self.mover.target().map(|t| t.z);
        self.position = Vec3::ZERO;
        self.mover.set_target(Vec3::ZERO);
        if !reset_z_too {
            self.position.z = pz;
            self.mover
                .set_target(Vec3::new(0.0, 0.0, tz.unwrap_or(pz)));
        }
    }

    // ─── Offset ───

    /// The offset moves the rotation center away from the camera.
    pub fn offset(&self) -> Vec3 {
        self.offset.current()
    }

    /// Buffered offset target.
    pub fn set_new_offset(&mut self, v: Vec3) {
        self.offset.set_target(v);
    }

    pub fn new_offset(&self) -> Option<Vec3> {
        self.offset.target()
    }

    // ─── Rotation ───

    pub fn is_sensor_input_enabled(&self) -> bool {
        matches!(self.rotation, RotationState::SensorDriven)
    }

    /// Chooses the rotation authority. Disabling sensor input switches to
    /// manual Euler rotation and resets the shared matrix to identity at
    /// that moment, whatever the sensors last wrote.
    pub fn set_sensor_input_enabled(&mut self, enabled: bool) {
        if enabled {
            debug!("camera rotation now sensor driven");
            self.rotation = RotationState::SensorDriven;
        } else {
            debug!("camera rotation now manual, sensor matrix reset");
            *self.matrix.lock() = RotationMatrix::identity();
            self.rotation = RotationState::Manual {
                angles: MotionBuffer::new(self.rotation_speed),
            };
        }
    }

    /// Replaces the sensor rotation matrix. Called from the sensor fusion
    /// callback thread, hence `&self`; the swap is atomic under the
    /// internal lock and the parse happens before the lock is taken.
    pub fn set_rotation_matrix(&self, values: &[f32], offset: usize) -> Result<(), GeometryError> {
        let m = RotationMatrix::from_slice(values, offset)?;
        *self.matrix.lock() = m;
        Ok(())
    }

    /// Copy of the current sensor matrix.
    pub fn rotation_matrix(&self) -> RotationMatrix {
        *self.matrix.lock()
    }

    /// Current manual Euler angles, if in manual mode.
    pub fn manual_rotation(&self) -> Option<Vec3> {
        match &self.rotation {
            RotationState::SensorDriven => None,
            RotationState::Manual { angles } => Some(angles.current()),
        }
    }

    /// Buffered rotation target (manual mode only).
    pub fn set_new_rotation(&mut self, v: Vec3) {
        match &mut self.rotation {
            RotationState::Manual { angles } => angles.set_target(v),
            RotationState::SensorDriven => {
                warn!("set_new_rotation ignored while sensor input is enabled");
            }
        }
    }

    /// Immediate compass-angle change (manual mode only).
    pub fn change_z_angle_unbuffered(&mut self, dz: f32) {
        match &mut self.rotation {
            RotationState::Manual { angles } => {
                let mut cur = angles.current();
                cur.z += dz;
                angles.set_current(cur);
            }
            RotationState::SensorDriven => {
                warn!("change_z_angle_unbuffered ignored while sensor input is enabled");
            }
        }
    }

    /// Buffered compass-angle change (manual mode only).
    pub fn change_z_angle_buffered(&mut self, dz: f32) {
        match &mut self.rotation {
            RotationState::Manual { angles } => angles.nudge_target(0.0, 0.0, dz),
            RotationState::SensorDriven => {
                warn!("change_z_angle_buffered ignored while sensor input is enabled");
            }
        }
    }

    /// Clears the buffered rotation back toward zero (manual mode only).
    pub fn reset_buffered_angle(&mut self) {
        if let RotationState::Manual { angles } = &mut self.rotation {
            debug!("resetting buffered camera rotation");
            angles.set_target(Vec3::ZERO);
        }
    }

    /// The rotation the render pass applies, from whichever representation
    /// is authoritative. Copies the matrix out under the lock; the math
    /// runs lock-free.
    pub fn view_rotation(&self) -> RotationMatrix {
        match &self.rotation {
            RotationState::SensorDriven => *self.matrix.lock(),
            RotationState::Manual { angles } => RotationMatrix::from_euler_yxz(angles.current()),
        }
    }

    /// Everything the render pass needs, in one copy.
    pub fn view_params(&self) -> ViewParams {
        ViewParams {
            offset: self.offset.current(),
            rotation: self.view_rotation(),
            position: self.position,
        }
    }

    /// Compass angle the camera horizontally faces, used to keep touch
    /// movement camera-relative. Looking straight down or up has no
    /// compass direction; that degenerate case maps to north.
    fn z_angle_degrees(&self) -> f32 {
        match &self.rotation {
            RotationState::Manual { angles } => angles.current().z,
            RotationState::SensorDriven => self.azimuth_degrees().unwrap_or(0.0),
        }
    }

    // ─── Picking ───

    /// The world-space ray through a screen pixel. `x` runs 0..width from
    /// the left, `y` runs 0..height from the top, exactly as touch events
    /// report them.
    pub fn picking_ray(&self, x: f32, y: f32) -> Ray {
        let vp = &self.viewport;
        let ndc_x = (x - vp.half_width()) / vp.half_width();
        let ndc_y = (vp.height - y - vp.half_height()) / vp.half_height();
        let init_dir = Vec3::new(
            ndc_x * vp.near_plane_height() * vp.aspect_ratio(),
            ndc_y * vp.near_plane_height(),
            -vp.near,
        );
        self.ray_through(init_dir)
    }

    /// The ray out of the screen center.
    pub fn view_direction_ray(&self) -> Ray {
        self.ray_through(Vec3::new(0.0, 0.0, -self.viewport.near))
    }

    fn ray_through(&self, init_dir: Vec3) -> Ray {
        let inv = self.view_rotation().inverted();
        // With a marker-driven matrix the translation lands in the origin;
        // a pure sensor rotation leaves it at the camera position.
        let origin = inv.apply_to_point(Vec3::ZERO).plus(self.position);
        let dir = inv.apply_to_direction(init_dir);
        Ray { origin, dir }
    }

    /// Where the view ray meets the ground plane (z = 0), solved
    /// analytically as `t = -origin.z / dir.z`. A ray parallel to the
    /// ground has no such point and is reported, not silently infinite.
    pub fn ground_intersection(&self) -> Result<Vec3, GeometryError> {
        let ray = self.view_direction_ray();
        if ray.dir.z == 0.0 {
            return Err(GeometryError::RayParallelToGround);
        }
        let t = -ray.origin.z / ray.dir.z;
        Ok(Vec3::new(
            t * ray.dir.x + ray.origin.x,
            t * ray.dir.y + ray.origin.y,
            0.0,
        ))
    }

    /// Compass angle of the view direction (0 north, 90 east). Undefined
    /// while the camera looks straight along the z axis.
    pub fn azimuth_degrees(&self) -> Result<f32, GeometryError> {
        let dir = self.view_direction_ray().dir;
        rotation_around_z_axis(dir.y, dir.x)
    }

    // ─── GPS ───

    /// Maps the current virtual position back to GPS using the zero
    /// reference looked up from the location service at call time. The
    /// result can differ from the device fix if the camera was moved by
    /// hand (e.g. via trackball) instead of following GPS input.
    pub fn gps_position(&self, source: &dyn LocationSource) -> Result<GeoPoint, GeoError> {
        let frame = GeoFrame::from_source(source)?;
        Ok(frame.to_gps(self.position))
    }

    /// Buffered move to a GPS position, converted through the zero
    /// reference looked up at call time.
    pub fn set_gps_position(
        &mut self,
        pos: &GeoPoint,
        source: &dyn LocationSource,
    ) -> Result<(), GeoError> {
        let frame = GeoFrame::from_source(source)?;
        self.set_new_position(frame.to_local(pos));
        Ok(())
    }

    // ─── Diagnostics ───

    /// Diagnostic listing of the camera internals.
    pub fn debug_dump(&self) -> String {
        let mut out = String::from("camera state:\n");
        let _ = writeln!(out, "  position      = {}", self.position);
        let _ = writeln!(
            out,
            "  target pos    = {}",
            self.mover
                .target()
                .map_or_else(|| "unset".to_string(), |t| t.to_string())
        );
        let _ = writeln!(out, "  offset        = {}", self.offset.current());
        let _ = writeln!(
            out,
            "  target offset = {}",
            self.offset
                .target()
                .map_or_else(|| "unset".to_string(), |t| t.to_string())
        );
        match &self.rotation {
            RotationState::SensorDriven => {
                let _ = writeln!(out, "  rotation      = sensor driven");
            }
            RotationState::Manual { angles } => {
                let _ = writeln!(out, "  rotation      = manual {}", angles.current());
            }
        }
        let _ = writeln!(out, "  matrix        = {:?}", self.matrix.lock().m);
        out
    }
}

impl Updateable for Camera {
    /// Advances buffered rotation, offset, and position by one morph step
    /// each. Call exactly once per frame from the owning update loop; not
    /// reentrant-safe without external serialization.
    fn update(&mut self, dt: f32) -> bool {
        let rotating = match &mut self.rotation {
            RotationState::SensorDriven => false,
            RotationState::Manual { angles } => angles.step_angles(dt),
        };
        let offsetting = self.offset.step(dt);
        let moving = self.mover.update(&mut self.position, dt);
        rotating || offsetting || moving
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::FixedLocation;

    fn camera() -> Camera {
        Camera::new(Viewport::default())
    }

    fn settle(cam: &mut Camera) {
        for _ in 0..1000 {
            if !cam.update(0.016) {
                break;
            }
        }
    }

    #[test]
    fn buffered_position_only_moves_on_update() {
        let mut cam = camera();
        cam.set_new_position(Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(cam.position(), Vec3::ZERO);
        cam.update(0.016);
        assert!(cam.position().x > 0.0);
        settle(&mut cam);
        assert_eq!(cam.position(), Vec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn unbuffered_position_is_immediate() {
        let mut cam = camera();
        cam.change_position_unbuffered(2.0, -3.0);
        assert_eq!(cam.position(), Vec3::new(2.0, -3.0, 0.0));
    }

    #[test]
    fn looking_straight_down_hits_the_origin() {
        let mut cam = camera();
        cam.set_position(Vec3::new(0.0, 0.0, 10.0));
        // Initial sensor matrix is identity: view direction (0, 0, -1).
        let hit = cam.ground_intersection().unwrap();
        assert!(hit.x.abs() < 1e-4 && hit.y.abs() < 1e-4);
        assert_eq!(hit.z, 0.0);
    }

    #[test]
    fn horizontal_view_never_hits_the_ground() {
        let mut cam = camera();
        cam.set_position(Vec3::new(0.0, 0.0, 1.8));
        // Exact 90-degree pitch up to the horizon: view dir becomes +y
        // with a z component of exactly zero.
        let m = [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, -1.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ];
        cam.set_rotation_matrix(&m, 0).unwrap();
        assert_eq!(
            cam.ground_intersection(),
            Err(GeometryError::RayParallelToGround)
        );
    }

    #[test]
    fn center_picking_ray_matches_view_direction() {
        let cam = camera();
        let vp = cam.viewport();
        let pick = cam.picking_ray(vp.half_width(), vp.half_height());
        let view = cam.view_direction_ray();
        assert_eq!(pick, view);
    }

    #[test]
    fn picking_ray_flips_screen_y() {
        let cam = camera();
        // A pixel in the top half of the screen must look upward (+y in
        // near-plane space, here +y before rotation is identity-mapped).
        let ray = cam.picking_ray(400.0, 0.0);
        assert!(ray.dir.y > 0.0);
        let ray = cam.picking_ray(400.0, 480.0);
        assert!(ray.dir.y < 0.0);
    }

    #[test]
    fn azimuth_tracks_the_sensor_matrix() {
        let cam = camera();
        // Pitch to horizon then yaw 90 degrees: camera faces east.
        let m = RotationMatrix::from_euler_yxz(Vec3::new(-90.0, 0.0, 90.0));
        cam.set_rotation_matrix(&m.m, 0).unwrap();
        let az = cam.azimuth_degrees().unwrap();
        assert!((az - 90.0).abs() < 1e-3, "azimuth was {az}");
    }

    #[test]
    fn azimuth_undefined_looking_straight_down() {
        let cam = camera();
        assert_eq!(
            cam.azimuth_degrees(),
            Err(GeometryError::DegenerateVector)
        );
    }

    #[test]
    fn disabling_sensor_input_resets_the_matrix() {
        let mut cam = camera();
        let m = RotationMatrix::rotation_z(33.0);
        cam.set_rotation_matrix(&m.m, 0).unwrap();
        assert_ne!(cam.rotation_matrix(), RotationMatrix::identity());

        cam.set_sensor_input_enabled(false);
        assert_eq!(cam.rotation_matrix(), RotationMatrix::identity());
        assert!(!cam.is_sensor_input_enabled());

        cam.set_sensor_input_enabled(true);
        assert!(cam.is_sensor_input_enabled());
        assert_eq!(cam.rotation_matrix(), RotationMatrix::identity());
    }

    #[test]
    fn camera_relative_movement_follows_the_compass() {
        let mut cam = camera();
        cam.set_sensor_input_enabled(false);
        cam.set_new_rotation(Vec3::new(0.0, 0.0, 90.0));
        settle(&mut cam);
        // Facing east: "forward" is +x.
        cam.change_xy_position_buffered(0.0, 1.0);
        settle(&mut cam);
        assert!((cam.position().x - 1.0).abs() < 1e-3);
        assert!(cam.position().y.abs() < 1e-3);
    }

    #[test]
    fn device_pitch_does_not_bend_horizontal_movement() {
        let mut cam = camera();
        // Sensor mode, camera pitched toward the horizon facing north.
        let m = RotationMatrix::rotation_x(-90.0);
        cam.set_rotation_matrix(&m.m, 0).unwrap();
        cam.change_xy_position_buffered(0.0, 1.0);
        settle(&mut cam);
        assert!(cam.position().x.abs() < 1e-3);
        assert!((cam.position().y - 1.0).abs() < 1e-3);
    }

    #[test]
    fn gps_position_requires_a_zero_reference() {
        let cam = camera();
        let unset = FixedLocation::default();
        assert_eq!(
            cam.gps_position(&unset).unwrap_err(),
            GeoError::ZeroReferenceUnset
        );
    }

    #[test]
    fn gps_round_trip_through_the_camera() {
        let mut cam = camera();
        let zero = GeoPoint::new(50.7753, 6.0839, 266.0);
        let source = FixedLocation::at(zero);
        let there = GeoPoint::new(50.7760, 6.0850, 270.0);
        cam.set_gps_position(&there, &source).unwrap();
        settle(&mut cam);
        let back = cam.gps_position(&source).unwrap();
        assert!((back.latitude - there.latitude).abs() < 1e-5);
        assert!((back.longitude - there.longitude).abs() < 1e-5);
    }

    #[test]
    fn nudging_the_buffered_target_seeds_from_the_position() {
        let mut cam = camera();
        cam.set_position(Vec3::new(1.0, 1.0, 0.0));
        cam.change_new_position(2.0, 0.0, 0.0);
        assert_eq!(cam.new_position(), Some(Vec3::new(3.0, 1.0, 0.0)));
        cam.change_z_position_buffered(-0.5);
        assert_eq!(cam.new_position(), Some(Vec3::new(3.0, 1.0, -0.5)));
        settle(&mut cam);
        assert_eq!(cam.position(), Vec3::new(3.0, 1.0, -0.5));
    }

    #[test]
    fn z_angle_mutators_only_act_in_manual_mode() {
        let mut cam = camera();
        // Sensor driven: all three mutators are ignored.
        cam.change_z_angle_unbuffered(45.0);
        cam.change_z_angle_buffered(45.0);
        cam.set_new_rotation(Vec3::new(0.0, 0.0, 90.0));
        assert!(cam.manual_rotation().is_none());
        assert!(!cam.update(0.016));

        cam.set_sensor_input_enabled(false);
        cam.change_z_angle_unbuffered(30.0);
        assert_eq!(cam.manual_rotation(), Some(Vec3::new(0.0, 0.0, 30.0)));
        cam.change_z_angle_buffered(60.0);
        settle(&mut cam);
        assert_eq!(cam.manual_rotation(), Some(Vec3::new(0.0, 0.0, 90.0)));
    }

    #[test]
    fn reset_buffered_angle_morphs_back_to_zero() {
        let mut cam = camera();
        cam.set_sensor_input_enabled(false);
        cam.change_z_angle_unbuffered(120.0);
        cam.reset_buffered_angle();
        settle(&mut cam);
        assert_eq!(cam.manual_rotation(), Some(Vec3::ZERO));
    }

    #[test]
    fn reset_position_can_keep_height() {
        let mut cam = camera();
        cam.set_position(Vec3::new(4.0, 5.0, 6.0));
        cam.reset_position(false);
        assert_eq!(cam.position(), Vec3::new(0.0, 0.0, 6.0));
        cam.reset_position(true);
        assert_eq!(cam.position(), Vec3::ZERO);
    }

    #[test]
    fn debug_dump_lists_the_state() {
        let mut cam = camera();
        cam.set_new_position(Vec3::new(1.0, 2.0, 3.0));
        let dump = cam.debug_dump();
        assert!(dump.contains("position"));
        assert!(dump.contains("(1, 2, 3)"));
        assert!(dump.contains("sensor driven"));
    }
}
