//! Reference map model: the target cloud registration aligns against.

mod grid;

pub use grid::{OccupancyGridMap, DEFAULT_OCCUPIED_THRESHOLD};

use kiddo::float::kdtree::KdTree;
use kiddo::SquaredEuclidean;

use crate::core::types::{Point3, PointCloud};

/// Bucket capacity for the nearest-neighbor index.
///
/// kiddo's default (32) panics when more than that many points share a
/// coordinate on a split axis — which is guaranteed for planar scans
/// (every point shares `z = 0`). A larger bucket keeps construction
/// panic-free; it does not affect query results.
const INDEX_BUCKET: usize = 256;

/// Reference point cloud plus a nearest-neighbor index built over it.
///
/// Immutable between updates: a new reference cloud replaces the whole
/// model (index rebuilt), registration never observes a partial update.
pub struct ReferenceModel {
    cloud: PointCloud,
    index: KdTree<f32, u64, 3, INDEX_BUCKET, u32>,
}

impl ReferenceModel {
    /// Build a model from a cloud, indexing every point.
    pub fn from_cloud(cloud: PointCloud) -> Self {
        let mut index: KdTree<f32, u64, 3, INDEX_BUCKET, u32> = KdTree::new();
        for (i, p) in cloud.iter().enumerate() {
            index.add(&[p.x, p.y, p.z], i as u64);
        }
        Self { cloud, index }
    }

    pub fn cloud(&self) -> &PointCloud {
        &self.cloud
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cloud.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cloud.is_empty()
    }

    #[inline]
    pub fn point(&self, index: usize) -> Point3 {
        self.cloud.points[index]
    }

    /// k=1 query: index of the nearest reference point and the squared
    /// distance to it. `None` when the model is empty.
    pub fn nearest(&self, point: &Point3) -> Option<(usize, f32)> {
        if self.cloud.is_empty() {
            return None;
        }
        let hit = self
            .index
            .nearest_one::<SquaredEuclidean>(&[point.x, point.y, point.z]);
        Some((hit.item as usize, hit.distance))
    }

    /// Squared distance to the nearest reference point.
    pub fn nearest_distance_squared(&self, point: &Point3) -> Option<f32> {
        self.nearest(point).map(|(_, d)| d)
    }
}

impl std::fmt::Debug for ReferenceModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceModel")
            .field("points", &self.cloud.len())
            .finish()
    }
}
