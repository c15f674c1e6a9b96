//! Plausibility bounds on pose corrections.

use crate::core::types::Pose2D;

/// A correction refused for exceeding the magnitude bounds.
///
/// Carries both measured values for logging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectionRejection {
    pub distance: f32,
    pub angle: f32,
}

/// Accepts or rejects a candidate correction transform.
///
/// Guards against divergent or falsely-converged registrations producing
/// physically implausible jumps. The whole transform is accepted or
/// rejected; there is no partial acceptance.
///
/// Boundary convention: a magnitude exactly at its bound passes;
/// rejection requires strictly exceeding it.
#[derive(Debug, Clone, Copy)]
pub struct PoseValidator {
    max_distance: f32,
    max_angle: f32,
}

impl PoseValidator {
    pub fn new(max_distance: f32, max_angle: f32) -> Self {
        Self {
            max_distance,
            max_angle,
        }
    }

    /// Replace the bounds (live reconfiguration).
    pub fn set_bounds(&mut self, max_distance: f32, max_angle: f32) {
        self.max_distance = max_distance;
        self.max_angle = max_angle;
    }

    pub fn validate(&self, correction: &Pose2D) -> Result<(), CorrectionRejection> {
        let distance = correction.translation_norm();
        let angle = correction.rotation_angle();
        if distance > self.max_distance || angle > self.max_angle {
            return Err(CorrectionRejection { distance, angle });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> PoseValidator {
        PoseValidator::new(2.5, 1.59)
    }

    #[test]
    fn small_correction_passes() {
        assert!(validator().validate(&Pose2D::new(0.1, -0.05, 0.02)).is_ok());
    }

    #[test]
    fn distance_boundary_is_inclusive() {
        let v = PoseValidator::new(2.5, 1.59);
        assert!(v.validate(&Pose2D::new(2.5, 0.0, 0.0)).is_ok());
        assert!(v.validate(&Pose2D::new(2.5 + 1e-3, 0.0, 0.0)).is_err());
    }

    #[test]
    fn angle_boundary_is_inclusive() {
        let v = PoseValidator::new(2.5, 0.5);
        assert!(v.validate(&Pose2D::new(0.0, 0.0, 0.5)).is_ok());
        assert!(v.validate(&Pose2D::new(0.0, 0.0, 0.501)).is_err());
    }

    #[test]
    fn rejection_reports_both_magnitudes() {
        let err = validator()
            .validate(&Pose2D::new(3.0, 4.0, 0.3))
            .unwrap_err();
        assert!((err.distance - 5.0).abs() < 1e-6);
        assert!((err.angle - 0.3).abs() < 1e-6);
    }

    #[test]
    fn either_bound_alone_rejects() {
        let v = PoseValidator::new(1.0, 0.1);
        assert!(v.validate(&Pose2D::new(2.0, 0.0, 0.0)).is_err());
        assert!(v.validate(&Pose2D::new(0.0, 0.0, 0.5)).is_err());
    }

    #[test]
    fn rotation_is_compared_by_magnitude() {
        let v = PoseValidator::new(1.0, 0.2);
        assert!(v.validate(&Pose2D::new(0.0, 0.0, -0.15)).is_ok());
        assert!(v.validate(&Pose2D::new(0.0, 0.0, -0.25)).is_err());
    }
}
