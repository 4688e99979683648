//! Configuration system.
//!
//! Loads session configuration from JSON strings (file IO left to app).

use serde::{Deserialize, Serialize};

use crate::camera::Viewport;

/// Root configuration for an AR session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Render surface width in pixels.
    pub screen_width: f32,
    /// Render surface height in pixels.
    pub screen_height: f32,
    /// Vertical field of view in degrees.
    #[serde(default = "default_fov_y")]
    pub fov_y_degrees: f32,
    /// Near-plane distance in world units.
    #[serde(default = "default_near")]
    pub near: f32,
    /// Morph speed for buffered camera movement, per second.
    #[serde(default = "default_move_speed")]
    pub camera_move_speed: f32,
    /// Morph speed for buffered camera rotation, per second.
    #[serde(default = "default_rotation_speed")]
    pub rotation_speed: f32,
    /// Touch drag divisor; higher values mean slower movement.
    #[serde(default = "default_touch_factor")]
    pub touch_factor: f32,
    /// Trackball multiplier; sensible values are around 2 to 15.
    #[serde(default = "default_trackball_factor")]
    pub trackball_factor: f32,
    /// New waypoints land in this ring around the camera (meters).
    #[serde(default = "default_waypoint_min_radius")]
    pub waypoint_min_radius: f32,
    #[serde(default = "default_waypoint_max_radius")]
    pub waypoint_max_radius: f32,
    /// Fixed update rate of the demo loop.
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,
}

fn default_fov_y() -> f32 {
    45.0
}

fn default_near() -> f32 {
    0.1
}

fn default_move_speed() -> f32 {
    3.0
}

fn default_rotation_speed() -> f32 {
    5.0
}

fn default_touch_factor() -> f32 {
    25.0
}

fn default_trackball_factor() -> f32 {
    5.0
}

fn default_waypoint_min_radius() -> f32 {
    5.0
}

fn default_waypoint_max_radius() -> f32 {
    20.0
}

fn default_tick_hz() -> u32 {
    30
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            screen_width: 800.0,
            screen_height: 480.0,
            fov_y_degrees: default_fov_y(),
            near: default_near(),
            camera_move_speed: default_move_speed(),
            rotation_speed: default_rotation_speed(),
            touch_factor: default_touch_factor(),
            trackball_factor: default_trackball_factor(),
            waypoint_min_radius: default_waypoint_min_radius(),
            waypoint_max_radius: default_waypoint_max_radius(),
            tick_hz: default_tick_hz(),
        }
    }
}

impl CoreConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    pub fn viewport(&self) -> Viewport {
        Viewport {
            width: self.screen_width,
            height: self.screen_height,
            fov_y_degrees: self.fov_y_degrees,
            near: self.near,
        }
    }
}
