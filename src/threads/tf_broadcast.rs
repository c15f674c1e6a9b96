//! Continuous map→odom transform broadcast.
//!
//! Periodic background task with its own cancellation flag, decoupled
//! from scan processing: it only takes a brief read of the shared pose
//! slot, never a lock the worker holds across registration.
//!
//! Without a live odometry source the odom frame sits at identity, so
//! the broadcast transform equals the latest corrected body pose; hosts
//! with real odometry compose their own odom→base before rebroadcast.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::{now_us, SharedPose};
use crate::io::messages::TransformMsg;
use crate::io::{BusPayload, TopicBus, TF_TOPIC};

/// Handle to the broadcast task.
pub struct TfBroadcastThread {
    handle: JoinHandle<()>,
}

impl TfBroadcastThread {
    pub fn spawn(
        bus: TopicBus,
        map_frame: String,
        odom_frame: String,
        rate_hz: f64,
        latest_pose: SharedPose,
        running: Arc<AtomicBool>,
    ) -> Self {
        let period = Duration::from_secs_f64(1.0 / rate_hz.max(0.1));
        let handle = thread::Builder::new()
            .name("tf-broadcast".into())
            .spawn(move || {
                log::info!(
                    "Broadcasting {} -> {} every {:?}",
                    map_frame,
                    odom_frame,
                    period
                );
                while running.load(Ordering::SeqCst) {
                    let latest = latest_pose.read().clone();
                    if let Some(pose) = latest {
                        bus.publish(
                            TF_TOPIC,
                            BusPayload::Transform(TransformMsg {
                                parent_frame: map_frame.clone(),
                                child_frame: odom_frame.clone(),
                                stamp_us: now_us(),
                                transform: pose.pose,
                            }),
                        );
                    }
                    thread::sleep(period);
                }
            })
            .expect("Failed to spawn tf broadcast thread");
        Self { handle }
    }

    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}
