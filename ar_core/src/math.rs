//! Math types.
//!
//! Plain scalar implementations, no SIMD or unsafe.
//!
//! Angles are degrees throughout; the compass convention is 0 = north
//! (+y), 90 = east (+x). NaN or infinite inputs propagate unguarded,
//! callers are responsible for feeding finite values.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 3D vector in the local Cartesian frame (x east, y north, z up, meters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn add(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }

    pub fn add_xyz(&mut self, dx: f32, dy: f32, dz: f32) {
        self.x += dx;
        self.y += dy;
        self.z += dz;
    }

    pub fn sub(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
        self.z -= rhs.z;
    }

    pub fn scale(&mut self, factor: f32) {
        self.x *= factor;
        self.y *= factor;
        self.z *= factor;
    }

    pub fn set_to(&mut self, other: Self) {
        *self = other;
    }

    pub fn set_zero(&mut self) {
        *self = Self::ZERO;
    }

    pub fn dot(self, rhs: Self) -> f32 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn length_sq(self) -> f32 {
        self.dot(self)
    }

    pub fn length(self) -> f32 {
        self.length_sq().sqrt()
    }

    pub fn distance_to(self, other: Self) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn plus(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    pub fn scaled(self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }

    /// One linear step toward `target` by `fraction` of the remaining
    /// distance. `fraction` is clamped to $[0,1]$, so a single well-formed
    /// step never overshoots; `fraction >= 1` snaps exactly onto the target.
    pub fn morph_toward(&mut self, target: Self, fraction: f32) {
        let fraction = fraction.clamp(0.0, 1.0);
        self.x += (target.x - self.x) * fraction;
        self.y += (target.y - self.y) * fraction;
        self.z += (target.z - self.z) * fraction;
    }

    /// Angle-vector variant of [`Vec3::morph_toward`]: each component is an
    /// angle in degrees and the step takes the shortest way around the
    /// circle, so morphing from 350 to 10 passes through 0 rather than 180.
    pub fn morph_angles_toward(&mut self, target: Self, fraction: f32) {
        let fraction = fraction.clamp(0.0, 1.0);
        self.x += shortest_angle_delta(self.x, target.x) * fraction;
        self.y += shortest_angle_delta(self.y, target.y) * fraction;
        self.z += shortest_angle_delta(self.z, target.z) * fraction;
        if fraction >= 1.0 {
            *self = target;
        }
    }

    /// Largest per-component angular distance to `target`, in degrees,
    /// measuring the short way around the circle. Zero iff the two angle
    /// vectors describe the same rotation up to full turns.
    pub fn angular_distance_to(self, target: Self) -> f32 {
        shortest_angle_delta(self.x, target.x)
            .abs()
            .max(shortest_angle_delta(self.y, target.y).abs())
            .max(shortest_angle_delta(self.z, target.z).abs())
    }

    /// Random point in the xy-plane ring around `center`: uniform angle,
    /// radius uniform in `[min_radius, max_radius]`, z taken from `center`.
    pub fn random_in_ring<R: Rng>(
        center: Self,
        min_radius: f32,
        max_radius: f32,
        rng: &mut R,
    ) -> Self {
        let angle = rng.gen_range(0.0..std::f32::consts::TAU);
        let radius = rng.gen_range(min_radius..=max_radius);
        Self::new(
            center.x + radius * angle.cos(),
            center.y + radius * angle.sin(),
            center.z,
        )
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Shortest signed angular distance from `from` to `to`, in `(-180, 180]`.
fn shortest_angle_delta(from: f32, to: f32) -> f32 {
    let mut delta = (to - from) % 360.0;
    if delta > 180.0 {
        delta -= 360.0;
    } else if delta <= -180.0 {
        delta += 360.0;
    }
    delta
}

/// Compass angle of the planar vector `(x, y)` in degrees `[0, 360)`,
/// 0 = north (+y), 90 = east (+x).
///
/// A zero-length input has no defined direction and is reported as
/// [`GeometryError::DegenerateVector`] instead of a silent NaN.
pub fn rotation_around_z_axis(y: f32, x: f32) -> Result<f32, GeometryError> {
    if x == 0.0 && y == 0.0 {
        return Err(GeometryError::DegenerateVector);
    }
    let mut deg = x.atan2(y).to_degrees();
    if deg < 0.0 {
        deg += 360.0;
    }
    Ok(deg)
}

/// 4x4 column-major rotation matrix, the layout sensor fusion delivers.
///
/// The sensor feed may hand over a larger backing array with the matrix
/// starting at an offset; [`RotationMatrix::from_slice`] captures that
/// convention. Matrices here are rigid transforms (rotation plus an
/// optional translation when a visual marker moves the camera).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationMatrix {
    pub m: [f32; 16],
}

impl Default for RotationMatrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl RotationMatrix {
    pub const fn identity() -> Self {
        Self {
            m: [
                1.0, 0.0, 0.0, 0.0, //
                0.0, 1.0, 0.0, 0.0, //
                0.0, 0.0, 1.0, 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ],
        }
    }

    /// Copies 16 floats starting at `offset` out of a backing slice.
    pub fn from_slice(values: &[f32], offset: usize) -> Result<Self, GeometryError> {
        let end = offset.checked_add(16).ok_or(GeometryError::InvalidMatrixSlice)?;
        if values.len() < end {
            return Err(GeometryError::InvalidMatrixSlice);
        }
        let mut m = [0.0; 16];
        m.copy_from_slice(&values[offset..end]);
        Ok(Self { m })
    }

    /// Rotation about the x axis (counterclockwise, degrees).
    pub fn rotation_x(degrees: f32) -> Self {
        let (s, c) = degrees.to_radians().sin_cos();
        let mut out = Self::identity();
        out.m[5] = c;
        out.m[6] = s;
        out.m[9] = -s;
        out.m[10] = c;
        out
    }

    /// Rotation about the y axis (counterclockwise, degrees).
    pub fn rotation_y(degrees: f32) -> Self {
        let (s, c) = degrees.to_radians().sin_cos();
        let mut out = Self::identity();
        out.m[0] = c;
        out.m[2] = -s;
        out.m[8] = s;
        out.m[10] = c;
        out
    }

    /// Rotation about the z axis (counterclockwise, degrees).
    pub fn rotation_z(degrees: f32) -> Self {
        let (s, c) = degrees.to_radians().sin_cos();
        let mut out = Self::identity();
        out.m[0] = c;
        out.m[1] = s;
        out.m[4] = -s;
        out.m[5] = c;
        out
    }

    /// Euler angles applied in y, then x, then z order — the order needed
    /// so angles extracted from a sensor orientation matrix reproduce the
    /// same rotation.
    pub fn from_euler_yxz(angles_deg: Vec3) -> Self {
        Self::rotation_y(angles_deg.y)
            .mul(&Self::rotation_x(angles_deg.x))
            .mul(&Self::rotation_z(angles_deg.z))
    }

    pub fn mul(&self, rhs: &Self) -> Self {
        let mut m = [0.0; 16];
        for col in 0..4 {
            for row in 0..4 {
                let mut acc = 0.0;
                for k in 0..4 {
                    acc += self.m[k * 4 + row] * rhs.m[col * 4 + k];
                }
                m[col * 4 + row] = acc;
            }
        }
        Self { m }
    }

    /// Rigid-transform inverse: the rotation block transposed, the
    /// translation column rotated back and negated.
    pub fn inverted(&self) -> Self {
        let mut out = Self::identity();
        for col in 0..3 {
            for row in 0..3 {
                out.m[col * 4 + row] = self.m[row * 4 + col];
            }
        }
        let t = Vec3::new(self.m[12], self.m[13], self.m[14]);
        out.m[12] = -(out.m[0] * t.x + out.m[4] * t.y + out.m[8] * t.z);
        out.m[13] = -(out.m[1] * t.x + out.m[5] * t.y + out.m[9] * t.z);
        out.m[14] = -(out.m[2] * t.x + out.m[6] * t.y + out.m[10] * t.z);
        out
    }

    /// Applies the matrix to a direction (w = 0): translation is ignored.
    pub fn apply_to_direction(&self, v: Vec3) -> Vec3 {
        Vec3::new(
            self.m[0] * v.x + self.m[4] * v.y + self.m[8] * v.z,
            self.m[1] * v.x + self.m[5] * v.y + self.m[9] * v.z,
            self.m[2] * v.x + self.m[6] * v.y + self.m[10] * v.z,
        )
    }

    /// Applies the matrix to a point (w = 1): translation included.
    pub fn apply_to_point(&self, v: Vec3) -> Vec3 {
        Vec3::new(
            self.m[0] * v.x + self.m[4] * v.y + self.m[8] * v.z + self.m[12],
            self.m[1] * v.x + self.m[5] * v.y + self.m[9] * v.z + self.m[13],
            self.m[2] * v.x + self.m[6] * v.y + self.m[10] * v.z + self.m[14],
        )
    }
}

/// Degenerate-geometry conditions reported to the immediate caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    /// A zero-length vector has no direction to extract an angle from.
    DegenerateVector,
    /// The view ray never meets the ground plane.
    RayParallelToGround,
    /// A matrix slice shorter than offset + 16 floats.
    InvalidMatrixSlice,
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryError::DegenerateVector => write!(f, "zero-length vector has no direction"),
            GeometryError::RayParallelToGround => {
                write!(f, "view ray is parallel to the ground plane")
            }
            GeometryError::InvalidMatrixSlice => {
                write!(f, "matrix slice shorter than offset + 16 floats")
            }
        }
    }
}

impl std::error::Error for GeometryError {}
