//! Configuration loading and validation.
//!
//! The configuration is an immutable value object: components receive
//! copies of the fields they need, and live reconfiguration swaps in a
//! whole new snapshot (see `pipeline::reconfigure`).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LocalizationError, Result};
use crate::registration::RegistrationTuning;

/// All recognized options, with the historical defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocalizationConfig {
    // Subscribe topic names.
    #[serde(default = "default_pointcloud_topic")]
    pub pointcloud_topic: String,
    #[serde(default = "default_costmap_topic")]
    pub costmap_topic: String,
    #[serde(default)]
    pub reference_cloud_topic: String,

    // Publish topic names.
    #[serde(default = "default_reference_map_pointcloud_publish_topic")]
    pub reference_map_pointcloud_publish_topic: String,
    #[serde(default = "default_aligned_pointcloud_publish_topic")]
    pub aligned_pointcloud_publish_topic: String,
    #[serde(default = "default_aligned_pointcloud_outliers_publish_topic")]
    pub aligned_pointcloud_outliers_publish_topic: String,
    #[serde(default = "default_pose_publish_topic")]
    pub pose_publish_topic: String,

    // Behavior switches.
    #[serde(default)]
    pub publish_tf_map_odom: bool,
    #[serde(default)]
    pub add_odometry_displacement: bool,

    // Reference source and frames.
    #[serde(default)]
    pub reference_cloud_file_name: String,
    #[serde(default = "default_map_frame_id")]
    pub map_frame_id: String,
    #[serde(default = "default_odom_frame_id")]
    pub odom_frame_id: String,
    #[serde(default = "default_base_link_frame_id")]
    pub base_link_frame_id: String,

    // Timing (seconds).
    #[serde(default = "default_max_seconds_scan_age")]
    pub max_seconds_scan_age: f64,
    #[serde(default = "default_min_seconds_between_scan_registration")]
    pub min_seconds_between_scan_registration: f64,
    #[serde(default = "default_min_seconds_between_map_update")]
    pub min_seconds_between_map_update: f64,
    #[serde(default = "default_tf_publish_rate_hz")]
    pub tf_publish_rate_hz: f64,

    // Acceptance bounds.
    #[serde(default = "default_max_alignment_fitness")]
    pub max_alignment_fitness: f64,
    /// Radians.
    #[serde(default = "default_max_transformation_angle")]
    pub max_transformation_angle: f64,
    /// Meters.
    #[serde(default = "default_max_transformation_distance")]
    pub max_transformation_distance: f64,
    /// Meters.
    #[serde(default = "default_max_inliers_distance")]
    pub max_inliers_distance: f64,

    // Registration engine tuning.
    #[serde(default = "default_max_correspondence_distance")]
    pub max_correspondence_distance: f64,
    #[serde(default = "default_transformation_epsilon")]
    pub transformation_epsilon: f64,
    #[serde(default = "default_euclidean_fitness_epsilon")]
    pub euclidean_fitness_epsilon: f64,
    #[serde(default = "default_max_number_of_registration_iterations")]
    pub max_number_of_registration_iterations: u32,
    #[serde(default = "default_max_number_of_ransac_iterations")]
    pub max_number_of_ransac_iterations: u32,
    #[serde(default = "default_ransac_outlier_rejection_threshold")]
    pub ransac_outlier_rejection_threshold: f64,
}

fn default_pointcloud_topic() -> String {
    "planar_pointcloud".to_string()
}
fn default_costmap_topic() -> String {
    "map".to_string()
}
fn default_reference_map_pointcloud_publish_topic() -> String {
    "reference_map_pointcloud".to_string()
}
fn default_aligned_pointcloud_publish_topic() -> String {
    "aligned_pointcloud".to_string()
}
fn default_aligned_pointcloud_outliers_publish_topic() -> String {
    "aligned_pointcloud_outliers".to_string()
}
fn default_pose_publish_topic() -> String {
    "initialpose".to_string()
}
fn default_map_frame_id() -> String {
    "map".to_string()
}
fn default_odom_frame_id() -> String {
    "odom".to_string()
}
fn default_base_link_frame_id() -> String {
    "base_link".to_string()
}
fn default_max_seconds_scan_age() -> f64 {
    0.5
}
fn default_min_seconds_between_scan_registration() -> f64 {
    0.05
}
fn default_min_seconds_between_map_update() -> f64 {
    5.0
}
fn default_tf_publish_rate_hz() -> f64 {
    10.0
}
fn default_max_alignment_fitness() -> f64 {
    1e-2
}
fn default_max_transformation_angle() -> f64 {
    1.59
}
fn default_max_transformation_distance() -> f64 {
    2.5
}
fn default_max_inliers_distance() -> f64 {
    0.01
}
fn default_max_correspondence_distance() -> f64 {
    2.5
}
fn default_transformation_epsilon() -> f64 {
    1e-8
}
fn default_euclidean_fitness_epsilon() -> f64 {
    1e-6
}
fn default_max_number_of_registration_iterations() -> u32 {
    500
}
fn default_max_number_of_ransac_iterations() -> u32 {
    500
}
fn default_ransac_outlier_rejection_threshold() -> f64 {
    0.05
}

impl Default for LocalizationConfig {
    fn default() -> Self {
        Self {
            pointcloud_topic: default_pointcloud_topic(),
            costmap_topic: default_costmap_topic(),
            reference_cloud_topic: String::new(),
            reference_map_pointcloud_publish_topic:
                default_reference_map_pointcloud_publish_topic(),
            aligned_pointcloud_publish_topic: default_aligned_pointcloud_publish_topic(),
            aligned_pointcloud_outliers_publish_topic:
                default_aligned_pointcloud_outliers_publish_topic(),
            pose_publish_topic: default_pose_publish_topic(),
            publish_tf_map_odom: false,
            add_odometry_displacement: false,
            reference_cloud_file_name: String::new(),
            map_frame_id: default_map_frame_id(),
            odom_frame_id: default_odom_frame_id(),
            base_link_frame_id: default_base_link_frame_id(),
            max_seconds_scan_age: default_max_seconds_scan_age(),
            min_seconds_between_scan_registration:
                default_min_seconds_between_scan_registration(),
            min_seconds_between_map_update: default_min_seconds_between_map_update(),
            tf_publish_rate_hz: default_tf_publish_rate_hz(),
            max_alignment_fitness: default_max_alignment_fitness(),
            max_transformation_angle: default_max_transformation_angle(),
            max_transformation_distance: default_max_transformation_distance(),
            max_inliers_distance: default_max_inliers_distance(),
            max_correspondence_distance: default_max_correspondence_distance(),
            transformation_epsilon: default_transformation_epsilon(),
            euclidean_fitness_epsilon: default_euclidean_fitness_epsilon(),
            max_number_of_registration_iterations:
                default_max_number_of_registration_iterations(),
            max_number_of_ransac_iterations: default_max_number_of_ransac_iterations(),
            ransac_outlier_rejection_threshold: default_ransac_outlier_rejection_threshold(),
        }
    }
}

/// Where the reference model comes from. Sources are mutually exclusive:
/// a configured file wins over a cloud topic, which wins over a costmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceSource {
    File(String),
    CloudTopic(String),
    Costmap(String),
    None,
}

impl LocalizationConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LocalizationConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Check the numeric invariants: durations and distance/angle
    /// thresholds must be non-negative, the TF rate positive.
    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("max_seconds_scan_age", self.max_seconds_scan_age),
            (
                "min_seconds_between_scan_registration",
                self.min_seconds_between_scan_registration,
            ),
            (
                "min_seconds_between_map_update",
                self.min_seconds_between_map_update,
            ),
            ("max_alignment_fitness", self.max_alignment_fitness),
            ("max_transformation_angle", self.max_transformation_angle),
            (
                "max_transformation_distance",
                self.max_transformation_distance,
            ),
            ("max_inliers_distance", self.max_inliers_distance),
            (
                "max_correspondence_distance",
                self.max_correspondence_distance,
            ),
            ("transformation_epsilon", self.transformation_epsilon),
            ("euclidean_fitness_epsilon", self.euclidean_fitness_epsilon),
            (
                "ransac_outlier_rejection_threshold",
                self.ransac_outlier_rejection_threshold,
            ),
        ];
        for (name, value) in non_negative {
            if value < 0.0 {
                return Err(LocalizationError::Config(format!(
                    "{} must be non-negative (got {})",
                    name, value
                )));
            }
        }
        if self.publish_tf_map_odom && self.tf_publish_rate_hz <= 0.0 {
            return Err(LocalizationError::Config(format!(
                "tf_publish_rate_hz must be positive (got {})",
                self.tf_publish_rate_hz
            )));
        }
        Ok(())
    }

    /// Resolve which reference source is active.
    pub fn reference_source(&self) -> ReferenceSource {
        if !self.reference_cloud_file_name.is_empty() {
            ReferenceSource::File(self.reference_cloud_file_name.clone())
        } else if !self.reference_cloud_topic.is_empty() {
            ReferenceSource::CloudTopic(self.reference_cloud_topic.clone())
        } else if !self.costmap_topic.is_empty() {
            ReferenceSource::Costmap(self.costmap_topic.clone())
        } else {
            ReferenceSource::None
        }
    }

    /// Whether incoming scans get their height reset to the nominal
    /// plane (only when the reference is map-derived).
    pub fn flatten_scan_height(&self) -> bool {
        self.reference_cloud_file_name.is_empty() && self.reference_cloud_topic.is_empty()
    }

    /// Engine tuning snapshot.
    pub fn registration_tuning(&self) -> RegistrationTuning {
        RegistrationTuning {
            max_correspondence_distance: self.max_correspondence_distance as f32,
            transformation_epsilon: self.transformation_epsilon as f32,
            euclidean_fitness_epsilon: self.euclidean_fitness_epsilon as f32,
            max_iterations: self.max_number_of_registration_iterations,
            max_ransac_iterations: self.max_number_of_ransac_iterations,
            ransac_outlier_rejection_threshold: self.ransac_outlier_rejection_threshold as f32,
        }
    }
}
