//! Live reconfiguration: diff a replacement configuration snapshot.
//!
//! Topic renames become explicit rebind actions for the endpoint to
//! execute; numeric fields are copied straight into the live components
//! (`LocalizationPipeline::apply_config`) and take effect on the next
//! scan. Unchanged or empty topic names produce no action, so applying
//! the same snapshot twice is a no-op.

use crate::config::LocalizationConfig;

/// One topic binding to tear down and re-establish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebindAction {
    ScanInput(String),
    ReferenceCloudInput(String),
    CostmapInput(String),
    PoseOutput(String),
    ReferenceCloudOutput(String),
    AlignedCloudOutput(String),
    OutlierCloudOutput(String),
}

/// Compare two configuration snapshots and list the topic rebinds the
/// endpoint must perform.
pub fn diff_topics(old: &LocalizationConfig, new: &LocalizationConfig) -> Vec<RebindAction> {
    let mut actions = Vec::new();
    let mut consider = |old_name: &str, new_name: &str, make: fn(String) -> RebindAction| {
        if !new_name.is_empty() && old_name != new_name {
            actions.push(make(new_name.to_string()));
        }
    };

    consider(
        &old.pointcloud_topic,
        &new.pointcloud_topic,
        RebindAction::ScanInput,
    );
    consider(
        &old.reference_cloud_topic,
        &new.reference_cloud_topic,
        RebindAction::ReferenceCloudInput,
    );
    consider(
        &old.costmap_topic,
        &new.costmap_topic,
        RebindAction::CostmapInput,
    );
    consider(
        &old.pose_publish_topic,
        &new.pose_publish_topic,
        RebindAction::PoseOutput,
    );
    consider(
        &old.reference_map_pointcloud_publish_topic,
        &new.reference_map_pointcloud_publish_topic,
        RebindAction::ReferenceCloudOutput,
    );
    consider(
        &old.aligned_pointcloud_publish_topic,
        &new.aligned_pointcloud_publish_topic,
        RebindAction::AlignedCloudOutput,
    );
    consider(
        &old.aligned_pointcloud_outliers_publish_topic,
        &new.aligned_pointcloud_outliers_publish_topic,
        RebindAction::OutlierCloudOutput,
    );
    actions
}
