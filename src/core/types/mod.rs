//! Shared data types: points, clouds, poses, timestamps.

mod cloud;
mod pose;
mod timestamped;

pub use cloud::{Point3, PointCloud, ScanRecord};
pub use pose::Pose2D;
pub use timestamped::Timestamped;
