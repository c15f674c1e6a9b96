//! Outlier extraction against the reference index.

use crate::core::types::PointCloud;
use crate::reference::ReferenceModel;

/// Outlier clouds with fewer points than this are not worth publishing.
pub const MIN_PUBLISHABLE_OUTLIERS: usize = 2;

/// Split the aligned cloud into the points far from the reference.
///
/// A point is an outlier iff its nearest-neighbor distance in the
/// reference strictly exceeds `max_inliers_distance` (a point exactly at
/// the bound is an inlier). Comparison happens in squared space, one k=1
/// index query per point: O(N log M). Point order is preserved.
///
/// With an empty reference every point is an outlier; in practice the
/// pipeline only gets here once a reference model exists.
pub fn extract_outliers(
    aligned: &PointCloud,
    reference: &ReferenceModel,
    max_inliers_distance: f32,
) -> PointCloud {
    let max_dist_sq = max_inliers_distance * max_inliers_distance;
    let mut outliers = PointCloud::new();
    for point in aligned.iter() {
        match reference.nearest_distance_squared(point) {
            Some(dist_sq) if dist_sq <= max_dist_sq => {}
            _ => outliers.push(*point),
        }
    }
    outliers
}
