//! In-process topic bus and the endpoint bound to it.
//!
//! The bus is the transport stand-in for the daemon and the tests:
//! named topics over crossbeam channels, one receiver per subscription.
//! A real transport implements [`Endpoint`](super::Endpoint) the same
//! way and replaces [`LocalEndpoint`] without touching the pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use super::messages::{PointCloudMsg, PoseMsg, TransformMsg};
use super::Endpoint;
use crate::config::{LocalizationConfig, ReferenceSource};
use crate::pipeline::reconfigure::RebindAction;
use crate::reference::OccupancyGridMap;

/// Topic the map→odom transform broadcast publishes on.
pub const TF_TOPIC: &str = "tf";

/// Any message the bus can carry.
#[derive(Debug, Clone)]
pub enum BusPayload {
    Cloud(PointCloudMsg),
    Pose(PoseMsg),
    Grid(OccupancyGridMap),
    Transform(TransformMsg),
    Config(Box<LocalizationConfig>),
}

/// Named-topic fanout over unbounded channels.
///
/// Cloning shares the topic registry. Disconnected subscribers are
/// pruned on the next publish to their topic.
#[derive(Debug, Clone, Default)]
pub struct TopicBus {
    topics: Arc<Mutex<HashMap<String, Vec<Sender<BusPayload>>>>>,
}

impl TopicBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a topic; every publish after this call is delivered.
    pub fn subscribe(&self, topic: &str) -> Receiver<BusPayload> {
        let (tx, rx) = unbounded();
        self.topics
            .lock()
            .entry(topic.to_string())
            .or_default()
            .push(tx);
        rx
    }

    /// Deliver a payload to every live subscriber. Returns how many
    /// received it.
    pub fn publish(&self, topic: &str, payload: BusPayload) -> usize {
        let mut topics = self.topics.lock();
        let Some(senders) = topics.get_mut(topic) else {
            return 0;
        };
        senders.retain(|tx| tx.send(payload.clone()).is_ok());
        senders.len()
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.lock().get(topic).map_or(0, |s| s.len())
    }
}

/// Endpoint backed by the in-process bus.
///
/// Owns the topic bindings: input receivers plus output topic names.
/// Only the reference source selected by configuration precedence is
/// actually subscribed; the other input receivers stay silent.
pub struct LocalEndpoint {
    bus: TopicBus,
    scan_topic: String,
    reference_cloud_topic: String,
    costmap_topic: String,
    pose_topic: String,
    reference_echo_topic: String,
    aligned_topic: String,
    outliers_topic: String,
    scan_rx: Receiver<BusPayload>,
    reference_rx: Receiver<BusPayload>,
    costmap_rx: Receiver<BusPayload>,
    // Keeps the senders of never-fired receivers alive so `select!`
    // sees them as open-but-empty rather than disconnected.
    _idle_tx: Vec<Sender<BusPayload>>,
}

impl LocalEndpoint {
    pub fn new(bus: TopicBus, config: &LocalizationConfig) -> Self {
        let mut idle_tx = Vec::new();
        let mut idle = || {
            let (tx, rx) = unbounded();
            idle_tx.push(tx);
            rx
        };

        let scan_rx = bus.subscribe(&config.pointcloud_topic);
        let (reference_rx, costmap_rx) = match config.reference_source() {
            ReferenceSource::CloudTopic(topic) => (bus.subscribe(&topic), idle()),
            ReferenceSource::Costmap(topic) => (idle(), bus.subscribe(&topic)),
            ReferenceSource::File(_) | ReferenceSource::None => (idle(), idle()),
        };

        Self {
            scan_topic: config.pointcloud_topic.clone(),
            reference_cloud_topic: config.reference_cloud_topic.clone(),
            costmap_topic: config.costmap_topic.clone(),
            pose_topic: config.pose_publish_topic.clone(),
            reference_echo_topic: config.reference_map_pointcloud_publish_topic.clone(),
            aligned_topic: config.aligned_pointcloud_publish_topic.clone(),
            outliers_topic: config.aligned_pointcloud_outliers_publish_topic.clone(),
            scan_rx,
            reference_rx,
            costmap_rx,
            _idle_tx: idle_tx,
            bus,
        }
    }

    pub fn bus(&self) -> &TopicBus {
        &self.bus
    }

    /// Current input bindings: (scan, reference cloud, costmap).
    pub fn input_topics(&self) -> (&str, &str, &str) {
        (
            &self.scan_topic,
            &self.reference_cloud_topic,
            &self.costmap_topic,
        )
    }

    pub fn scan_rx(&self) -> &Receiver<BusPayload> {
        &self.scan_rx
    }

    pub fn reference_rx(&self) -> &Receiver<BusPayload> {
        &self.reference_rx
    }

    pub fn costmap_rx(&self) -> &Receiver<BusPayload> {
        &self.costmap_rx
    }

    fn publish_if_bound(&self, topic: &str, payload: BusPayload) {
        if !topic.is_empty() {
            self.bus.publish(topic, payload);
        }
    }
}

impl Endpoint for LocalEndpoint {
    fn publish_pose(&self, msg: PoseMsg) {
        self.publish_if_bound(&self.pose_topic, BusPayload::Pose(msg));
    }

    fn publish_reference_cloud(&self, msg: PointCloudMsg) {
        self.publish_if_bound(&self.reference_echo_topic, BusPayload::Cloud(msg));
    }

    fn publish_aligned_cloud(&self, msg: PointCloudMsg) {
        self.publish_if_bound(&self.aligned_topic, BusPayload::Cloud(msg));
    }

    fn publish_outlier_cloud(&self, msg: PointCloudMsg) {
        self.publish_if_bound(&self.outliers_topic, BusPayload::Cloud(msg));
    }

    fn publish_transform(&self, msg: TransformMsg) {
        self.bus.publish(TF_TOPIC, BusPayload::Transform(msg));
    }

    fn aligned_cloud_wanted(&self) -> bool {
        !self.aligned_topic.is_empty() && self.bus.subscriber_count(&self.aligned_topic) > 0
    }

    fn outlier_cloud_wanted(&self) -> bool {
        !self.outliers_topic.is_empty() && self.bus.subscriber_count(&self.outliers_topic) > 0
    }

    fn rebind(&mut self, action: &RebindAction) {
        match action {
            RebindAction::ScanInput(topic) => {
                self.scan_topic = topic.clone();
                self.scan_rx = self.bus.subscribe(topic);
            }
            RebindAction::ReferenceCloudInput(topic) => {
                self.reference_cloud_topic = topic.clone();
                self.reference_rx = self.bus.subscribe(topic);
            }
            RebindAction::CostmapInput(topic) => {
                self.costmap_topic = topic.clone();
                self.costmap_rx = self.bus.subscribe(topic);
            }
            RebindAction::PoseOutput(topic) => self.pose_topic = topic.clone(),
            RebindAction::ReferenceCloudOutput(topic) => self.reference_echo_topic = topic.clone(),
            RebindAction::AlignedCloudOutput(topic) => self.aligned_topic = topic.clone(),
            RebindAction::OutlierCloudOutput(topic) => self.outliers_topic = topic.clone(),
        }
        log::info!("Rebound {:?}", action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PointCloud;

    #[test]
    fn publish_reaches_all_subscribers() {
        let bus = TopicBus::new();
        let rx1 = bus.subscribe("pose");
        let rx2 = bus.subscribe("pose");

        let msg = PoseMsg {
            seq: 1,
            stamp_us: 0,
            frame_id: "laser".to_string(),
            pose: Default::default(),
        };
        let delivered = bus.publish("pose", BusPayload::Pose(msg));
        assert_eq!(delivered, 2);
        assert!(matches!(rx1.try_recv(), Ok(BusPayload::Pose(_))));
        assert!(matches!(rx2.try_recv(), Ok(BusPayload::Pose(_))));
    }

    #[test]
    fn publish_without_subscribers_is_dropped() {
        let bus = TopicBus::new();
        assert_eq!(bus.publish("nobody", BusPayload::Pose(PoseMsg {
            seq: 0,
            stamp_us: 0,
            frame_id: String::new(),
            pose: Default::default(),
        })), 0);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let bus = TopicBus::new();
        let rx = bus.subscribe("t");
        drop(rx);
        bus.publish("t", BusPayload::Grid(OccupancyGridMap::new(0, 0, 1.0, 0.0, 0.0, vec![])));
        assert_eq!(bus.subscriber_count("t"), 0);
    }

    #[test]
    fn consumer_checks_follow_subscriptions() {
        let bus = TopicBus::new();
        let config = LocalizationConfig::default();
        let endpoint = LocalEndpoint::new(bus.clone(), &config);

        assert!(!endpoint.aligned_cloud_wanted());
        let _rx = bus.subscribe(&config.aligned_pointcloud_publish_topic);
        assert!(endpoint.aligned_cloud_wanted());
    }

    #[test]
    fn rebind_moves_output_topic() {
        let bus = TopicBus::new();
        let config = LocalizationConfig::default();
        let mut endpoint = LocalEndpoint::new(bus.clone(), &config);

        let old_rx = bus.subscribe("initialpose");
        let new_rx = bus.subscribe("pose_corrected");
        endpoint.rebind(&RebindAction::PoseOutput("pose_corrected".to_string()));

        endpoint.publish_pose(PoseMsg {
            seq: 0,
            stamp_us: 0,
            frame_id: String::new(),
            pose: Default::default(),
        });
        assert!(old_rx.try_recv().is_err());
        assert!(new_rx.try_recv().is_ok());
    }

    #[test]
    fn rebind_resubscribes_input() {
        let bus = TopicBus::new();
        let config = LocalizationConfig::default();
        let mut endpoint = LocalEndpoint::new(bus.clone(), &config);

        endpoint.rebind(&RebindAction::ScanInput("other_cloud".to_string()));
        assert_eq!(endpoint.input_topics().0, "other_cloud");
        bus.publish(
            "other_cloud",
            BusPayload::Cloud(PointCloudMsg::from_cloud(&PointCloud::new(), "laser", 0)),
        );
        assert!(endpoint.scan_rx().try_recv().is_ok());
    }
}
