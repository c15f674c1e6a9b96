//! Point cloud and scan types.

use serde::{Deserialize, Serialize};

use super::pose::Pose2D;

/// A 3D point in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    #[inline]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Squared distance to another point (avoids sqrt).
    #[inline]
    pub fn distance_squared(&self, other: &Point3) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    #[inline]
    pub fn distance(&self, other: &Point3) -> f32 {
        self.distance_squared(other).sqrt()
    }
}

/// An ordered set of 3D points.
///
/// Laser-derived clouds are 2.5D: planar transforms rotate x/y and carry
/// z through, and `set_height` collapses the cloud onto a nominal plane.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PointCloud {
    pub points: Vec<Point3>,
}

impl PointCloud {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    pub fn from_points(points: Vec<Point3>) -> Self {
        Self { points }
    }

    #[inline]
    pub fn push(&mut self, point: Point3) {
        self.points.push(point);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Point3> + '_ {
        self.points.iter()
    }

    /// Return a copy with the planar transform applied to every point.
    pub fn transform(&self, pose: &Pose2D) -> PointCloud {
        PointCloud {
            points: self.points.iter().map(|p| pose.transform_point(p)).collect(),
        }
    }

    /// Override every point's z coordinate with a nominal height.
    pub fn set_height(&mut self, height: f32) {
        for p in &mut self.points {
            p.z = height;
        }
    }
}

/// A single sensor observation: cloud, capture timestamp, source frame.
///
/// Created per callback and discarded after processing.
#[derive(Debug, Clone)]
pub struct ScanRecord {
    pub cloud: PointCloud,
    pub frame_id: String,
    pub stamp_us: u64,
}

impl ScanRecord {
    pub fn new(cloud: PointCloud, frame_id: impl Into<String>, stamp_us: u64) -> Self {
        Self {
            cloud,
            frame_id: frame_id.into(),
            stamp_us,
        }
    }
}
