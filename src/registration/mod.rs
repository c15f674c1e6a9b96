//! Cloud registration seam.
//!
//! Registration is a replaceable collaborator: any engine that can align
//! a source cloud to the reference model and report a fitness score fits
//! behind [`RegistrationEngine`]. The pipeline only consumes the trait;
//! [`IcpEngine`] is the bundled implementation.

mod icp;

pub use icp::IcpEngine;

use crate::core::types::{PointCloud, Pose2D};
use crate::reference::ReferenceModel;

/// Fitness sentinel: no registration was attempted or performed.
pub const NO_ALIGNMENT: f32 = -1.0;

/// Engine tuning options, copied from the live configuration.
///
/// The RANSAC fields apply to engines with a correspondence-rejection
/// pre-pass; engines without one retain them untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationTuning {
    /// Correspondences farther apart than this are discarded (meters).
    pub max_correspondence_distance: f32,
    /// Convergence bound on the incremental transform magnitude.
    pub transformation_epsilon: f32,
    /// Convergence bound on the change of mean squared residual.
    pub euclidean_fitness_epsilon: f32,
    pub max_iterations: u32,
    pub max_ransac_iterations: u32,
    pub ransac_outlier_rejection_threshold: f32,
}

impl Default for RegistrationTuning {
    fn default() -> Self {
        Self {
            max_correspondence_distance: 2.5,
            transformation_epsilon: 1e-8,
            euclidean_fitness_epsilon: 1e-6,
            max_iterations: 500,
            max_ransac_iterations: 500,
            ransac_outlier_rejection_threshold: 0.05,
        }
    }
}

/// Outcome of one registration attempt.
#[derive(Debug, Clone)]
pub struct RegistrationResult {
    /// Transform mapping source points onto the reference.
    pub transform: Pose2D,
    /// Mean squared alignment residual; lower is better; negative means
    /// no registration was performed.
    pub fitness: f32,
    /// Source cloud with the final transform applied.
    pub aligned: PointCloud,
}

impl RegistrationResult {
    /// Sentinel result: nothing was aligned.
    pub fn none() -> Self {
        Self {
            transform: Pose2D::identity(),
            fitness: NO_ALIGNMENT,
            aligned: PointCloud::new(),
        }
    }

    /// Whether an alignment was actually computed.
    #[inline]
    pub fn attempted(&self) -> bool {
        self.fitness >= 0.0
    }
}

/// An iterative point-set registration engine with a fitness score and a
/// final transform exposed.
pub trait RegistrationEngine: Send {
    /// Align `source` to the reference model.
    fn register(&self, source: &PointCloud, reference: &ReferenceModel) -> RegistrationResult;

    /// Replace the engine tuning (live reconfiguration). Takes effect on
    /// the next `register` call.
    fn apply_tuning(&mut self, tuning: &RegistrationTuning);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_result_is_not_attempted() {
        let r = RegistrationResult::none();
        assert!(!r.attempted());
        assert_eq!(r.fitness, NO_ALIGNMENT);
        assert!(r.aligned.is_empty());
    }

    #[test]
    fn zero_fitness_counts_as_attempted() {
        let r = RegistrationResult {
            fitness: 0.0,
            ..RegistrationResult::none()
        };
        assert!(r.attempted());
    }
}
