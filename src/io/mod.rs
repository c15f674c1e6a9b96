//! I/O layer: wire messages, topic endpoint, reference cloud files.

mod bus;
mod cloud_file;
pub mod messages;

pub use bus::{BusPayload, LocalEndpoint, TopicBus, TF_TOPIC};
pub use cloud_file::load_cloud_file;
pub use messages::{PointCloudMsg, PointField, PoseMsg, TransformMsg};

use crate::pipeline::reconfigure::RebindAction;

/// Topic bindings collaborator.
///
/// Owns every publisher/subscription; told to rebind when a
/// reconfiguration changes a topic name. The pipeline itself never
/// touches transport: the worker thread publishes through this trait and
/// asks it whether diagnostic clouds have any consumer before building
/// them.
pub trait Endpoint: Send {
    fn publish_pose(&self, msg: PoseMsg);
    fn publish_reference_cloud(&self, msg: PointCloudMsg);
    fn publish_aligned_cloud(&self, msg: PointCloudMsg);
    fn publish_outlier_cloud(&self, msg: PointCloudMsg);
    fn publish_transform(&self, msg: TransformMsg);

    /// Whether anyone consumes the aligned cloud right now.
    fn aligned_cloud_wanted(&self) -> bool;

    /// Whether anyone consumes the outlier cloud right now.
    fn outlier_cloud_wanted(&self) -> bool;

    /// Tear down and re-establish one topic binding.
    fn rebind(&mut self, action: &RebindAction);
}
