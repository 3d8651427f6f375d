//! Precision policies.
//!
//! Float comparison helpers shared by the view bridge and the tests. Angles are
//! compared on the circle, never as raw numbers.

/// Canonicalize a floating-point value.
///
/// Rules:
/// - `-0.0` becomes `0.0`
/// - all NaNs become a single canonical NaN
pub fn canonical_f64(v: f64) -> f64 {
    if v == 0.0 {
        // Handles +0.0 and -0.0.
        0.0
    } else if v.is_nan() {
        f64::NAN
    } else {
        v
    }
}

/// Absolute-tolerance comparison. NaN never compares equal.
#[inline]
pub fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() <= eps
}

/// Normalize an angle in degrees into `(-180, 180]`.
pub fn normalize_degrees(deg: f64) -> f64 {
    let r = deg.rem_euclid(360.0);
    let out = if r > 180.0 { r - 360.0 } else { r };
    canonical_f64(out)
}

/// Normalize an angle in radians into `(-π, π]`.
pub fn normalize_radians(rad: f64) -> f64 {
    normalize_degrees(rad.to_degrees()).to_radians()
}

/// Smallest signed difference `b - a` between two angles, in degrees.
pub fn angle_delta_degrees(a: f64, b: f64) -> f64 {
    normalize_degrees(b - a)
}

/// True when two angles in degrees point the same way within `eps`.
pub fn angles_close_degrees(a: f64, b: f64, eps: f64) -> bool {
    angle_delta_degrees(a, b).abs() <= eps
}
