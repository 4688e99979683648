//! Geo-coordinate conversion.
//!
//! GPS coordinates (lat/long/alt, degrees and meters, f64) convert to and
//! from a local Cartesian frame anchored at a zero-reference location:
//! x east, y north, z up, in meters. The conversion is the equirectangular
//! approximation, which is exact enough at waypoint scale.
//!
//! The zero reference is explicit context: callers obtain a [`GeoFrame`]
//! from the host's [`LocationSource`] at call time instead of reading a
//! process-wide singleton.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::math::Vec3;

/// Mean earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.785;

/// A GPS position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
        }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lat={:.6} lon={:.6} alt={:.1}",
            self.latitude, self.longitude, self.altitude
        )
    }
}

/// Local tangent frame anchored at a zero-reference GPS position, which
/// maps to local `(0, 0, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoFrame {
    zero: GeoPoint,
}

impl GeoFrame {
    pub fn new(zero: GeoPoint) -> Self {
        Self { zero }
    }

    /// Looks the zero reference up from the host location service at call
    /// time, never cached: the service may re-anchor the frame when the
    /// device moves far from the origin.
    pub fn from_source(source: &dyn LocationSource) -> Result<Self, GeoError> {
        source
            .zero_reference()
            .map(Self::new)
            .ok_or(GeoError::ZeroReferenceUnset)
    }

    pub fn zero(&self) -> GeoPoint {
        self.zero
    }

    /// GPS to local Cartesian, relative to the zero reference.
    pub fn to_local(&self, p: &GeoPoint) -> Vec3 {
        let lat0 = self.zero.latitude.to_radians();
        let x = (p.longitude - self.zero.longitude).to_radians() * EARTH_RADIUS_M * lat0.cos();
        let y = (p.latitude - self.zero.latitude).to_radians() * EARTH_RADIUS_M;
        let z = p.altitude - self.zero.altitude;
        Vec3::new(x as f32, y as f32, z as f32)
    }

    /// Local Cartesian back to GPS. Exact inverse of [`GeoFrame::to_local`]
    /// up to float rounding.
    pub fn to_gps(&self, v: Vec3) -> GeoPoint {
        let lat0 = self.zero.latitude.to_radians();
        GeoPoint {
            latitude: self.zero.latitude + (v.y as f64 / EARTH_RADIUS_M).to_degrees(),
            longitude: self.zero.longitude
                + (v.x as f64 / (EARTH_RADIUS_M * lat0.cos())).to_degrees(),
            altitude: self.zero.altitude + v.z as f64,
        }
    }
}

/// Seam for the host platform's location service.
///
/// Both values may be absent until the device has a first GPS fix.
pub trait LocationSource {
    /// The GPS position treated as local origin for all conversions.
    fn zero_reference(&self) -> Option<GeoPoint>;
    /// The most recent device fix.
    fn current_fix(&self) -> Option<GeoPoint>;
}

/// Fixed location source for headless runs and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedLocation {
    pub zero: Option<GeoPoint>,
    pub fix: Option<GeoPoint>,
}

impl FixedLocation {
    pub fn at(zero: GeoPoint) -> Self {
        Self {
            zero: Some(zero),
            fix: Some(zero),
        }
    }
}

impl LocationSource for FixedLocation {
    fn zero_reference(&self) -> Option<GeoPoint> {
        self.zero
    }

    fn current_fix(&self) -> Option<GeoPoint> {
        self.fix
    }
}

/// Missing-context failures for GPS conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoError {
    /// No zero-reference location exists yet (no GPS fix).
    ZeroReferenceUnset,
}

impl fmt::Display for GeoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeoError::ZeroReferenceUnset => {
                write!(f, "zero-reference location is not initialized")
            }
        }
    }
}

impl std::error::Error for GeoError {}
