//! The localization decision pipeline.
//!
//! Per scan: gate → register → validate → compose pose → hand back for
//! publication → extract outliers. Every rejection aborts the current
//! scan only; the state carried across scans is the gate timestamps, the
//! reference model and the pose counter, all owned by [`PipelineState`].

pub mod gate;
pub mod outliers;
pub mod reconfigure;
pub mod validator;

pub use gate::{GateRejection, ScanGate};
pub use outliers::{extract_outliers, MIN_PUBLISHABLE_OUTLIERS};
pub use validator::{CorrectionRejection, PoseValidator};

use crate::config::LocalizationConfig;
use crate::core::math::{secs_to_us, us_to_secs};
use crate::core::types::{PointCloud, ScanRecord};
use crate::io::messages::PoseMsg;
use crate::reference::{OccupancyGridMap, ReferenceModel};
use crate::registration::RegistrationEngine;
use crate::sensors::TransformSource;

/// Height scans are flattened to when the reference is map-derived.
const NOMINAL_SCAN_HEIGHT: f32 = 0.0;

/// Which diagnostic clouds have a consumer right now.
///
/// Building and encoding them is skipped entirely when nobody listens.
#[derive(Debug, Clone, Copy, Default)]
pub struct SinkInterest {
    pub aligned: bool,
    pub outliers: bool,
}

/// Everything produced by one accepted scan.
#[derive(Debug)]
pub struct ScanSuccess {
    pub pose: PoseMsg,
    /// Aligned cloud, when requested via [`SinkInterest`].
    pub aligned: Option<PointCloud>,
    /// Outlier cloud, when requested and large enough to publish.
    pub outliers: Option<PointCloud>,
}

/// Mutable state threaded through the pipeline by exclusive ownership.
#[derive(Debug)]
pub struct PipelineState {
    pub gate: ScanGate,
    pub reference: Option<ReferenceModel>,
    pub last_map_update_us: Option<u64>,
    pub poses_published: u64,
}

impl PipelineState {
    pub fn new(config: &LocalizationConfig) -> Self {
        Self {
            gate: ScanGate::new(
                secs_to_us(config.min_seconds_between_scan_registration),
                secs_to_us(config.max_seconds_scan_age),
            ),
            reference: None,
            last_map_update_us: None,
            poses_published: 0,
        }
    }

    /// A reference model has been received at least once. Never reverts.
    #[inline]
    pub fn map_ready(&self) -> bool {
        self.reference.is_some()
    }
}

/// Orchestrates one registration attempt per admitted scan.
pub struct LocalizationPipeline {
    config: LocalizationConfig,
    engine: Box<dyn RegistrationEngine>,
    validator: PoseValidator,
    transforms: Box<dyn TransformSource>,
}

impl LocalizationPipeline {
    pub fn new(
        config: LocalizationConfig,
        engine: Box<dyn RegistrationEngine>,
        transforms: Box<dyn TransformSource>,
    ) -> Self {
        let validator = PoseValidator::new(
            config.max_transformation_distance as f32,
            config.max_transformation_angle as f32,
        );
        Self {
            config,
            engine,
            validator,
            transforms,
        }
    }

    pub fn config(&self) -> &LocalizationConfig {
        &self.config
    }

    /// Run one scan through the pipeline.
    ///
    /// Returns `None` on any rejection (gate, missing transform, bad
    /// fitness, implausible correction); details go to the debug log.
    pub fn process_scan(
        &self,
        state: &mut PipelineState,
        scan: &ScanRecord,
        now_us: u64,
        interest: SinkInterest,
    ) -> Option<ScanSuccess> {
        if let Err(reason) = state.gate.check(scan.stamp_us, now_us, state.map_ready()) {
            log::debug!("Discarded scan from '{}': {}", scan.frame_id, reason);
            return None;
        }
        state.gate.mark_admitted(now_us);

        let Some(sensor_to_body) = self.transforms.lookup(
            &scan.frame_id,
            &self.config.base_link_frame_id,
            scan.stamp_us,
        ) else {
            log::debug!(
                "Dropping scan: transform from '{}' to '{}' unavailable",
                scan.frame_id,
                self.config.base_link_frame_id
            );
            return None;
        };

        let reference = state.reference.as_ref()?;

        // Map-derived references are planar; collapse the scan onto the
        // same plane before matching.
        let flattened;
        let source = if self.config.flatten_scan_height() {
            let mut cloud = scan.cloud.clone();
            cloud.set_height(NOMINAL_SCAN_HEIGHT);
            flattened = cloud;
            &flattened
        } else {
            &scan.cloud
        };

        let result = self.engine.register(source, reference);
        if !result.attempted() || result.fitness as f64 >= self.config.max_alignment_fitness {
            log::debug!("Failed registration with fitness {}", result.fitness);
            return None;
        }

        if let Err(r) = self.validator.validate(&result.transform) {
            log::debug!(
                "Dropping scan: correction exceeded bounds (translation: {} | rotation: {})",
                r.distance,
                r.angle
            );
            return None;
        }

        let mut corrected = result.transform.compose(&sensor_to_body);

        let stamp_us = if self.config.add_odometry_displacement {
            // Dead-reckon forward from capture to publication time.
            match self.transforms.displacement(scan.stamp_us, now_us) {
                Some(d) => corrected = corrected.compose(&d),
                None => log::debug!(
                    "No odometry displacement available between {} and {}",
                    scan.stamp_us,
                    now_us
                ),
            }
            now_us
        } else {
            scan.stamp_us
        };

        let outliers = if interest.outliers {
            let cloud = extract_outliers(
                &result.aligned,
                reference,
                self.config.max_inliers_distance as f32,
            );
            (cloud.len() >= MIN_PUBLISHABLE_OUTLIERS).then_some(cloud)
        } else {
            None
        };
        let aligned = interest.aligned.then_some(result.aligned);

        let pose = PoseMsg {
            seq: state.poses_published,
            stamp_us,
            frame_id: scan.frame_id.clone(),
            pose: corrected,
        };
        state.poses_published += 1;

        Some(ScanSuccess {
            pose,
            aligned,
            outliers,
        })
    }

    /// Replace the reference model wholesale (cloud topic or file).
    pub fn update_reference_cloud(&self, state: &mut PipelineState, cloud: PointCloud) {
        log::info!("Reference model replaced ({} points)", cloud.len());
        state.reference = Some(ReferenceModel::from_cloud(cloud));
    }

    /// Replace the reference model from an occupancy map, subject to the
    /// update cooldown. Returns whether a replacement happened.
    ///
    /// Latest-wins: maps arriving inside the cooldown are dropped, not
    /// queued. The first map is never gated.
    pub fn update_reference_from_grid(
        &self,
        state: &mut PipelineState,
        grid: &OccupancyGridMap,
        now_us: u64,
    ) -> bool {
        if state.map_ready() {
            if let Some(last) = state.last_map_update_us {
                let cooldown_us = secs_to_us(self.config.min_seconds_between_map_update);
                let elapsed_us = now_us.saturating_sub(last);
                if elapsed_us <= cooldown_us {
                    log::debug!(
                        "Skipping map update: {:.3}s since last, cooldown {:.3}s",
                        us_to_secs(elapsed_us),
                        us_to_secs(cooldown_us)
                    );
                    return false;
                }
            }
        }
        state.last_map_update_us = Some(now_us);

        if let Err(e) = grid.validate() {
            log::warn!("Ignoring malformed occupancy map: {}", e);
            return false;
        }
        let cloud = grid.to_point_cloud(crate::reference::DEFAULT_OCCUPIED_THRESHOLD);
        if cloud.is_empty() {
            log::warn!("Occupancy map has no occupied cells; keeping previous reference");
            return false;
        }
        self.update_reference_cloud(state, cloud);
        true
    }

    /// Apply a replacement configuration snapshot to the live components.
    ///
    /// Topic rebinding is the endpoint's job (see [`reconfigure`]); this
    /// copies the numeric fields. Effective from the next scan.
    pub fn apply_config(&mut self, state: &mut PipelineState, new: &LocalizationConfig) {
        state.gate.set_limits(
            secs_to_us(new.min_seconds_between_scan_registration),
            secs_to_us(new.max_seconds_scan_age),
        );
        self.validator.set_bounds(
            new.max_transformation_distance as f32,
            new.max_transformation_angle as f32,
        );
        self.engine.apply_tuning(&new.registration_tuning());
        self.config = new.clone();
        log::info!("Applied configuration snapshot");
    }
}
