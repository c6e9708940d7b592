//! Closed-form curve bases.
//!
//! Scalar versions take four control values and a parameter `t` in `[0, 1]`.
//! Vector versions apply the scalar basis per axis and keep the `w` of the
//! second control point, so points stay points.

use kestrel_core::Vec4;

/// Cubic through `p1` (t = 0) and `p2` (t = 1), shaped by `p0` and `p3`.
#[must_use]
pub fn cubic(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let t2 = t * t;
    let a0 = p3 - p2 - p0 + p1;
    let a1 = p0 - p1 - a0;
    let a2 = p2 - p0;
    a0 * t * t2 + a1 * t2 + a2 * t + p1
}

/// Hermite segment from `p0` to `p1` with tangents `m0`, `m1`.
#[must_use]
pub fn hermite(p0: f32, m0: f32, p1: f32, m1: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;
    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;
    h00 * p0 + h10 * m0 + h01 * p1 + h11 * m1
}

/// Uniform Catmull-Rom segment between `p1` and `p2`.
#[must_use]
pub fn catmull_rom(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * (2.0 * p1
        + (p2 - p0) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (3.0 * p1 - p0 - 3.0 * p2 + p3) * t3)
}

/// Cubic Bezier with control points `p0..p3`.
#[must_use]
pub fn bezier(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let u = 1.0 - t;
    u * u * u * p0 + 3.0 * u * u * t * p1 + 3.0 * u * t * t * p2 + t * t * t * p3
}

fn per_axis(points: [Vec4; 4], t: f32, basis: fn(f32, f32, f32, f32, f32) -> f32) -> Vec4 {
    let [a, b, c, d] = points;
    Vec4::new(
        basis(a.x, b.x, c.x, d.x, t),
        basis(a.y, b.y, c.y, d.y, t),
        basis(a.z, b.z, c.z, d.z, t),
        b.w,
    )
}

/// [`cubic`] per axis.
#[must_use]
pub fn cubic_vec(points: [Vec4; 4], t: f32) -> Vec4 {
    per_axis(points, t, cubic)
}

/// [`catmull_rom`] per axis.
#[must_use]
pub fn catmull_rom_vec(points: [Vec4; 4], t: f32) -> Vec4 {
    per_axis(points, t, catmull_rom)
}

/// [`bezier`] per axis.
#[must_use]
pub fn bezier_vec(points: [Vec4; 4], t: f32) -> Vec4 {
    per_axis(points, t, bezier)
}

/// [`hermite`] per axis; `w` comes from `p0`.
#[must_use]
pub fn hermite_vec(p0: Vec4, m0: Vec4, p1: Vec4, m1: Vec4, t: f32) -> Vec4 {
    Vec4::new(
        hermite(p0.x, m0.x, p1.x, m1.x, t),
        hermite(p0.y, m0.y, p1.y, m1.y, t),
        hermite(p0.z, m0.z, p1.z, m1.z, t),
        p0.w,
    )
}

/// Heading blend along the shortest arc.
#[must_use]
pub fn lerp_angle(from: f32, to: f32, t: f32) -> f32 {
    from + kestrel_core::angle_difference(from, to) * t
}
