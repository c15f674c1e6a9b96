//! Sensor-side collaborators: frame transforms and odometry history.

mod odometry;
mod transforms;

pub use odometry::OdometryBuffer;
pub use transforms::{StaticTransformSet, TransformSource};
