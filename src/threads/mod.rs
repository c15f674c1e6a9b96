//! Thread infrastructure: the localization worker and the transform
//! broadcast task.

mod tf_broadcast;
mod worker;

pub use tf_broadcast::TfBroadcastThread;
pub use worker::PipelineThread;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;

use crate::io::messages::PoseMsg;

/// Latest corrected pose, shared between the worker (writer) and the
/// transform broadcast thread (reader).
pub type SharedPose = Arc<RwLock<Option<PoseMsg>>>;

pub fn shared_pose() -> SharedPose {
    Arc::new(RwLock::new(None))
}

/// Wall clock in microseconds since the epoch.
pub(crate) fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
