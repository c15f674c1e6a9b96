//! Math primitives: angle normalization and time conversion.

use std::f32::consts::PI;

/// Normalize angle to [-π, π].
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    let mut a = angle % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a < -PI {
        a += 2.0 * PI;
    }
    a
}

/// Shortest signed angular difference from `a` to `b`.
#[inline]
pub fn angle_diff(a: f32, b: f32) -> f32 {
    normalize_angle(b - a)
}

/// Interpolate between two angles along the shortest path.
///
/// `t` in [0, 1] where 0 returns `a` and 1 returns `b`.
#[inline]
pub fn angle_lerp(a: f32, b: f32, t: f32) -> f32 {
    normalize_angle(a + angle_diff(a, b) * t)
}

/// Convert a duration in seconds to microseconds.
///
/// Negative inputs clamp to zero; configuration validation rejects them
/// before they reach here, this only keeps the conversion total.
#[inline]
pub fn secs_to_us(seconds: f64) -> u64 {
    if seconds <= 0.0 {
        0
    } else {
        (seconds * 1_000_000.0).round() as u64
    }
}

/// Convert microseconds to seconds (for logging).
#[inline]
pub fn us_to_secs(us: u64) -> f64 {
    us as f64 / 1_000_000.0
}
