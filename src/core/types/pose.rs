//! Planar rigid transform.

use serde::{Deserialize, Serialize};

use super::cloud::Point3;
use super::timestamped::Timestamped;
use crate::core::math;

/// Planar rigid transform: translation (x, y) in meters plus rotation
/// about z (theta) in radians, normalized to [-π, π].
///
/// Used both as a robot pose and as a pose correction. Clouds stay 3D;
/// applying a `Pose2D` rotates x/y and passes z through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose2D {
    pub x: f32,
    pub y: f32,
    pub theta: f32,
}

impl Pose2D {
    /// Create a pose with theta normalized to [-π, π].
    #[inline]
    pub fn new(x: f32, y: f32, theta: f32) -> Self {
        Self {
            x,
            y,
            theta: math::normalize_angle(theta),
        }
    }

    /// Identity transform.
    #[inline]
    pub fn identity() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            theta: 0.0,
        }
    }

    /// Compose two transforms: `self ∘ other` (apply `other` in `self`'s frame).
    #[inline]
    pub fn compose(&self, other: &Pose2D) -> Pose2D {
        let (sin_t, cos_t) = self.theta.sin_cos();
        Pose2D::new(
            self.x + other.x * cos_t - other.y * sin_t,
            self.y + other.x * sin_t + other.y * cos_t,
            self.theta + other.theta,
        )
    }

    /// Inverse transform.
    #[inline]
    pub fn inverse(&self) -> Pose2D {
        let (sin_t, cos_t) = self.theta.sin_cos();
        Pose2D::new(
            -self.x * cos_t - self.y * sin_t,
            self.x * sin_t - self.y * cos_t,
            -self.theta,
        )
    }

    /// Apply the transform to a 3D point (planar rotation, z unchanged).
    #[inline]
    pub fn transform_point(&self, point: &Point3) -> Point3 {
        let (sin_t, cos_t) = self.theta.sin_cos();
        Point3::new(
            self.x + point.x * cos_t - point.y * sin_t,
            self.y + point.x * sin_t + point.y * cos_t,
            point.z,
        )
    }

    /// Euclidean norm of the translation component.
    #[inline]
    pub fn translation_norm(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Magnitude of the rotation component in radians, in [0, π].
    #[inline]
    pub fn rotation_angle(&self) -> f32 {
        math::normalize_angle(self.theta).abs()
    }

    /// Interpolate between two timestamped poses at `target_us`.
    ///
    /// Linear in x/y, shortest-path in theta. Returns `None` outside the
    /// [start, end] interval.
    pub fn interpolate(
        start: &Timestamped<Pose2D>,
        end: &Timestamped<Pose2D>,
        target_us: u64,
    ) -> Option<Pose2D> {
        if target_us < start.timestamp_us || target_us > end.timestamp_us {
            return None;
        }
        if start.timestamp_us == end.timestamp_us {
            return Some(start.data);
        }

        let t = (target_us - start.timestamp_us) as f32
            / (end.timestamp_us - start.timestamp_us) as f32;

        Some(Pose2D {
            x: start.data.x + t * (end.data.x - start.data.x),
            y: start.data.y + t * (end.data.y - start.data.y),
            theta: math::angle_lerp(start.data.theta, end.data.theta, t),
        })
    }
}

impl Default for Pose2D {
    fn default() -> Self {
        Self::identity()
    }
}
