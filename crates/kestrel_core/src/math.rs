//! Mathematical types shared between the scheduler and the position engine.
//!
//! Positions are homogeneous: points carry `w = 1`, velocities and other
//! directions carry `w = 0`. Arithmetic operates on `x/y/z` only and keeps the
//! left-hand side's `w`.

use bytemuck::{Pod, Zeroable};
use std::f32::consts::{PI, TAU};

/// Homogeneous 3D vector - position, velocity, target point.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vec4 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
    /// Homogeneous component (1 = point, 0 = direction)
    pub w: f32,
}

impl Vec4 {
    /// Creates a new Vec4
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Creates a point (`w = 1`)
    #[must_use]
    pub const fn point(x: f32, y: f32, z: f32) -> Self {
        Self::new(x, y, z, 1.0)
    }

    /// Creates a direction (`w = 0`)
    #[must_use]
    pub const fn direction(x: f32, y: f32, z: f32) -> Self {
        Self::new(x, y, z, 0.0)
    }

    /// Zero direction
    pub const ZERO: Self = Self::direction(0.0, 0.0, 0.0);

    /// Origin point `(0, 0, 0, 1)`
    pub const ORIGIN: Self = Self::point(0.0, 0.0, 0.0);

    /// Converts to array
    #[must_use]
    pub const fn to_array(self) -> [f32; 4] {
        [self.x, self.y, self.z, self.w]
    }

    /// Creates from array
    #[must_use]
    pub const fn from_array(arr: [f32; 4]) -> Self {
        Self::new(arr[0], arr[1], arr[2], arr[3])
    }

    /// Dot product of the spatial part
    #[must_use]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Length squared (avoids sqrt)
    #[must_use]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    /// Length
    #[must_use]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Distance to another point
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }

    /// Unit-length copy; zero vectors are returned unchanged.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len > f32::EPSILON {
            Self::new(self.x / len, self.y / len, self.z / len, self.w)
        } else {
            self
        }
    }

    /// Linear blend of every component, `w` included.
    #[must_use]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self::new(
            lerp(self.x, other.x, t),
            lerp(self.y, other.y, t),
            lerp(self.z, other.z, t),
            lerp(self.w, other.w, t),
        )
    }

    /// True if all spatial components are zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    /// True if every component is finite.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.w.is_finite()
    }
}

impl std::ops::Add for Vec4 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z, self.w)
    }
}

impl std::ops::Sub for Vec4 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z, self.w)
    }
}

impl std::ops::Mul<f32> for Vec4 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs, self.w)
    }
}

/// Scalar linear interpolation.
#[inline]
#[must_use]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Clamps `value` into `[min, max]`.
#[inline]
#[must_use]
pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
    value.max(min).min(max)
}

/// Hermite smooth step on `[0, 1]`.
#[inline]
#[must_use]
pub fn smooth_step(t: f32) -> f32 {
    let t = clamp(t, 0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Ken Perlin's smoother step on `[0, 1]`.
#[inline]
#[must_use]
pub fn smoother_step(t: f32) -> f32 {
    let t = clamp(t, 0.0, 1.0);
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

/// Shortest signed angle from `from` to `to`, in radians, within `[-PI, PI]`.
#[must_use]
pub fn angle_difference(from: f32, to: f32) -> f32 {
    let diff = (to - from).rem_euclid(TAU);
    if diff > PI {
        diff - TAU
    } else {
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec4_operations() {
        let a = Vec4::point(1.0, 2.0, 3.0);
        let b = Vec4::direction(4.0, 5.0, 6.0);

        let sum = a + b;
        assert_eq!(sum, Vec4::point(5.0, 7.0, 9.0));

        let scaled = b * 2.0;
        assert_eq!(scaled, Vec4::direction(8.0, 10.0, 12.0));

        assert_eq!(a.dot(b), 32.0);
    }

    #[test]
    fn test_distance_ignores_w() {
        let a = Vec4::point(0.0, 0.0, 0.0);
        let b = Vec4::direction(3.0, 4.0, 0.0);
        assert!((a.distance(b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_lerp_midpoint() {
        let a = Vec4::point(0.0, 0.0, 0.0);
        let b = Vec4::point(10.0, -10.0, 2.0);
        let mid = a.lerp(b, 0.5);
        assert_eq!(mid, Vec4::point(5.0, -5.0, 1.0));
    }

    #[test]
    fn test_normalize_zero_is_stable() {
        assert_eq!(Vec4::ZERO.normalize(), Vec4::ZERO);
        let n = Vec4::direction(0.0, 3.0, 4.0).normalize();
        assert!((n.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_steps_are_clamped() {
        assert_eq!(smooth_step(-1.0), 0.0);
        assert_eq!(smooth_step(2.0), 1.0);
        assert!((smooth_step(0.5) - 0.5).abs() < 1e-6);
        assert!((smoother_step(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_angle_difference_wraps() {
        let d = angle_difference(0.1, TAU - 0.1);
        assert!((d + 0.2).abs() < 1e-5);
        let d = angle_difference(-PI + 0.1, PI - 0.1);
        assert!((d + 0.2).abs() < 1e-5);
    }
}
