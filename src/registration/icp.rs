//! Bundled point-to-point ICP engine.
//!
//! Iteratively matches source points to their nearest reference points
//! (through the reference model's kd-tree) and solves the closed-form
//! planar rigid update from correspondence centroids, until the
//! incremental transform or the residual change drops below the
//! configured epsilons.

use super::{RegistrationEngine, RegistrationResult, RegistrationTuning};
use crate::core::types::{PointCloud, Pose2D};
use crate::reference::ReferenceModel;

/// Fewer correspondences than this and the planar update is degenerate.
const MIN_CORRESPONDENCES: usize = 3;

/// Point-to-point ICP against the reference model's spatial index.
#[derive(Debug, Clone)]
pub struct IcpEngine {
    tuning: RegistrationTuning,
}

/// A matched pair: source point index, reference point index.
type Correspondence = (usize, usize);

impl IcpEngine {
    pub fn new(tuning: RegistrationTuning) -> Self {
        Self { tuning }
    }

    pub fn tuning(&self) -> &RegistrationTuning {
        &self.tuning
    }

    /// Match every transformed source point to its nearest reference
    /// point, keeping pairs within the correspondence distance bound.
    fn find_correspondences(
        &self,
        source: &PointCloud,
        reference: &ReferenceModel,
        transform: &Pose2D,
    ) -> Vec<Correspondence> {
        let max_dist_sq =
            self.tuning.max_correspondence_distance * self.tuning.max_correspondence_distance;
        let mut pairs = Vec::with_capacity(source.len());

        for (i, point) in source.iter().enumerate() {
            let moved = transform.transform_point(point);
            if let Some((ref_idx, dist_sq)) = reference.nearest(&moved) {
                if dist_sq <= max_dist_sq {
                    pairs.push((i, ref_idx));
                }
            }
        }
        pairs
    }

    /// Closed-form planar rigid transform minimizing the squared pair
    /// residuals, expressed in the reference frame (left-composed onto
    /// the current estimate).
    fn solve_update(
        source: &PointCloud,
        reference: &ReferenceModel,
        pairs: &[Correspondence],
        current: &Pose2D,
    ) -> Pose2D {
        let n = pairs.len() as f32;

        let mut sx = 0.0f32;
        let mut sy = 0.0f32;
        let mut rx = 0.0f32;
        let mut ry = 0.0f32;
        for &(si, ri) in pairs {
            let s = current.transform_point(&source.points[si]);
            let r = reference.point(ri);
            sx += s.x;
            sy += s.y;
            rx += r.x;
            ry += r.y;
        }
        sx /= n;
        sy /= n;
        rx /= n;
        ry /= n;

        // Cross-covariance of centered pairs; optimal planar rotation is
        // atan2 of its antisymmetric vs symmetric parts.
        let mut sum_cos = 0.0f32;
        let mut sum_sin = 0.0f32;
        for &(si, ri) in pairs {
            let s = current.transform_point(&source.points[si]);
            let r = reference.point(ri);
            let ax = s.x - sx;
            let ay = s.y - sy;
            let bx = r.x - rx;
            let by = r.y - ry;
            sum_cos += ax * bx + ay * by;
            sum_sin += ax * by - ay * bx;
        }
        let dtheta = sum_sin.atan2(sum_cos);

        let (sin_dt, cos_dt) = dtheta.sin_cos();
        let dx = rx - (sx * cos_dt - sy * sin_dt);
        let dy = ry - (sx * sin_dt + sy * cos_dt);

        Pose2D::new(dx, dy, dtheta)
    }

    /// Mean squared residual of the pairs under the given transform.
    fn mean_squared_residual(
        source: &PointCloud,
        reference: &ReferenceModel,
        pairs: &[Correspondence],
        transform: &Pose2D,
    ) -> f32 {
        if pairs.is_empty() {
            return f32::MAX;
        }
        let mut sum = 0.0f32;
        for &(si, ri) in pairs {
            let s = transform.transform_point(&source.points[si]);
            sum += s.distance_squared(&reference.point(ri));
        }
        sum / pairs.len() as f32
    }
}

impl Default for IcpEngine {
    fn default() -> Self {
        Self::new(RegistrationTuning::default())
    }
}

impl RegistrationEngine for IcpEngine {
    fn register(&self, source: &PointCloud, reference: &ReferenceModel) -> RegistrationResult {
        if source.is_empty() || reference.is_empty() {
            return RegistrationResult::none();
        }

        let mut current = Pose2D::identity();
        let mut last_residual = f32::MAX;

        for _ in 0..self.tuning.max_iterations {
            let pairs = self.find_correspondences(source, reference, &current);
            if pairs.len() < MIN_CORRESPONDENCES {
                return RegistrationResult::none();
            }

            let update = Self::solve_update(source, reference, &pairs, &current);
            current = update.compose(&current);

            let residual = Self::mean_squared_residual(source, reference, &pairs, &current);

            let converged = (update.translation_norm() < self.tuning.transformation_epsilon
                && update.rotation_angle() < self.tuning.transformation_epsilon)
                || (last_residual - residual).abs() < self.tuning.euclidean_fitness_epsilon;
            last_residual = residual;
            if converged {
                break;
            }
        }

        // Fitness is scored against the final pose, not the last update.
        let pairs = self.find_correspondences(source, reference, &current);
        if pairs.len() < MIN_CORRESPONDENCES {
            return RegistrationResult::none();
        }
        let fitness = Self::mean_squared_residual(source, reference, &pairs, &current);

        RegistrationResult {
            transform: current,
            fitness,
            aligned: source.transform(&current),
        }
    }

    fn apply_tuning(&mut self, tuning: &RegistrationTuning) {
        self.tuning = tuning.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Point3;
    use approx::assert_relative_eq;

    fn l_shape(n: usize, length: f32) -> PointCloud {
        let mut cloud = PointCloud::with_capacity(2 * n);
        for i in 0..n {
            let t = (i as f32 / (n - 1) as f32) * length;
            cloud.push(Point3::new(t, 0.0, 0.0));
        }
        for i in 1..n {
            let t = (i as f32 / (n - 1) as f32) * length;
            cloud.push(Point3::new(0.0, t, 0.0));
        }
        cloud
    }

    #[test]
    fn identity_alignment_converges_with_zero_fitness() {
        let cloud = l_shape(30, 2.0);
        let model = ReferenceModel::from_cloud(cloud.clone());
        let engine = IcpEngine::default();

        let result = engine.register(&cloud, &model);
        assert!(result.attempted());
        assert!(result.fitness < 1e-6);
        assert_relative_eq!(result.transform.x, 0.0, epsilon = 1e-4);
        assert_relative_eq!(result.transform.y, 0.0, epsilon = 1e-4);
        assert_relative_eq!(result.transform.theta, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn recovers_small_translation() {
        let reference = l_shape(50, 2.0);
        let model = ReferenceModel::from_cloud(reference.clone());
        // Scan displaced +x relative to the map: correction must be -x.
        let scan = reference.transform(&Pose2D::new(0.08, 0.0, 0.0));

        let engine = IcpEngine::default();
        let result = engine.register(&scan, &model);
        assert!(result.attempted());
        assert_relative_eq!(result.transform.x, -0.08, epsilon = 0.02);
        assert_relative_eq!(result.transform.y, 0.0, epsilon = 0.02);
    }

    #[test]
    fn recovers_small_rotation() {
        let reference = l_shape(50, 2.0);
        let model = ReferenceModel::from_cloud(reference.clone());
        let scan = reference.transform(&Pose2D::new(0.0, 0.0, 0.1));

        let engine = IcpEngine::default();
        let result = engine.register(&scan, &model);
        assert!(result.attempted());
        assert_relative_eq!(result.transform.theta, -0.1, epsilon = 0.02);
    }

    #[test]
    fn aligned_cloud_lands_on_reference() {
        let reference = l_shape(50, 2.0);
        let model = ReferenceModel::from_cloud(reference.clone());
        let scan = reference.transform(&Pose2D::new(0.05, -0.03, 0.04));

        let engine = IcpEngine::default();
        let result = engine.register(&scan, &model);
        assert!(result.attempted());
        assert_eq!(result.aligned.len(), scan.len());
        for p in result.aligned.iter() {
            let d = model.nearest_distance_squared(p).unwrap();
            assert!(d < 1e-3, "aligned point {:?} off reference ({})", p, d);
        }
    }

    #[test]
    fn empty_inputs_yield_sentinel() {
        let cloud = l_shape(10, 1.0);
        let model = ReferenceModel::from_cloud(cloud.clone());
        let engine = IcpEngine::default();

        assert!(!engine.register(&PointCloud::new(), &model).attempted());
        let empty_model = ReferenceModel::from_cloud(PointCloud::new());
        assert!(!engine.register(&cloud, &empty_model).attempted());
    }

    #[test]
    fn distant_clouds_yield_sentinel() {
        let model = ReferenceModel::from_cloud(l_shape(10, 1.0));
        let engine = IcpEngine::new(RegistrationTuning {
            max_correspondence_distance: 0.5,
            ..RegistrationTuning::default()
        });

        // Far outside the correspondence bound: no pairs at all.
        let far = l_shape(10, 1.0).transform(&Pose2D::new(100.0, 100.0, 0.0));
        assert!(!engine.register(&far, &model).attempted());
    }

    #[test]
    fn tuning_replacement_takes_effect() {
        let mut engine = IcpEngine::default();
        engine.apply_tuning(&RegistrationTuning {
            max_iterations: 7,
            ..RegistrationTuning::default()
        });
        assert_eq!(engine.tuning().max_iterations, 7);
    }
}
