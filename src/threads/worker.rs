//! Localization worker thread.
//!
//! A single worker processes one callback at a time: scans, reference
//! clouds, occupancy maps and configuration snapshots are drained from
//! their channels through one `select!`, so registration always sees one
//! consistent reference model without extra locks. A slow registration
//! simply delays the next admission.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{select, Receiver};

use super::{now_us, SharedPose};
use crate::config::{LocalizationConfig, ReferenceSource};
use crate::core::types::ScanRecord;
use crate::io::messages::PointCloudMsg;
use crate::io::{load_cloud_file, BusPayload, Endpoint, LocalEndpoint};
use crate::pipeline::reconfigure::diff_topics;
use crate::pipeline::{LocalizationPipeline, PipelineState, SinkInterest};

/// Handle to the spawned worker.
pub struct PipelineThread {
    handle: JoinHandle<()>,
}

impl PipelineThread {
    pub fn spawn(
        pipeline: LocalizationPipeline,
        state: PipelineState,
        endpoint: LocalEndpoint,
        reconfig_rx: Receiver<LocalizationConfig>,
        latest_pose: SharedPose,
        running: Arc<AtomicBool>,
    ) -> Self {
        let handle = thread::Builder::new()
            .name("localization".into())
            .spawn(move || {
                run_worker(pipeline, state, endpoint, reconfig_rx, latest_pose, running);
            })
            .expect("Failed to spawn localization thread");
        Self { handle }
    }

    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

fn run_worker(
    mut pipeline: LocalizationPipeline,
    mut state: PipelineState,
    mut endpoint: LocalEndpoint,
    reconfig_rx: Receiver<LocalizationConfig>,
    latest_pose: SharedPose,
    running: Arc<AtomicBool>,
) {
    log::info!("Localization worker starting");

    if let ReferenceSource::File(path) = pipeline.config().reference_source() {
        match load_cloud_file(std::path::Path::new(&path)) {
            Ok(cloud) => {
                pipeline.update_reference_cloud(&mut state, cloud);
                publish_reference_echo(&endpoint, &state, pipeline.config());
            }
            Err(e) => log::error!("Failed to load reference cloud '{}': {}", path, e),
        }
    }

    while running.load(Ordering::SeqCst) {
        // Clones are cheap channel handles; taking them fresh each turn
        // picks up input rebinds from the previous iteration.
        let scan_rx = endpoint.scan_rx().clone();
        let reference_rx = endpoint.reference_rx().clone();
        let costmap_rx = endpoint.costmap_rx().clone();

        select! {
            recv(scan_rx) -> msg => {
                if let Ok(BusPayload::Cloud(m)) = msg {
                    handle_scan(&pipeline, &mut state, &endpoint, &latest_pose, m);
                }
            }
            recv(reference_rx) -> msg => {
                if let Ok(BusPayload::Cloud(m)) = msg {
                    match m.to_cloud() {
                        Ok(cloud) => {
                            pipeline.update_reference_cloud(&mut state, cloud);
                            publish_reference_echo(&endpoint, &state, pipeline.config());
                        }
                        Err(e) => log::warn!("Ignoring malformed reference cloud: {}", e),
                    }
                }
            }
            recv(costmap_rx) -> msg => {
                if let Ok(BusPayload::Grid(grid)) = msg {
                    if pipeline.update_reference_from_grid(&mut state, &grid, now_us()) {
                        publish_reference_echo(&endpoint, &state, pipeline.config());
                    }
                }
            }
            recv(reconfig_rx) -> msg => {
                if let Ok(new_config) = msg {
                    for action in diff_topics(pipeline.config(), &new_config) {
                        endpoint.rebind(&action);
                    }
                    pipeline.apply_config(&mut state, &new_config);
                }
            }
            default(Duration::from_millis(100)) => {}
        }
    }

    log::info!("Localization worker stopped");
}

fn handle_scan(
    pipeline: &LocalizationPipeline,
    state: &mut PipelineState,
    endpoint: &LocalEndpoint,
    latest_pose: &SharedPose,
    msg: PointCloudMsg,
) {
    let scan_seq = msg.seq;
    let cloud = match msg.to_cloud() {
        Ok(cloud) => cloud,
        Err(e) => {
            log::warn!("Ignoring malformed scan cloud: {}", e);
            return;
        }
    };
    log::debug!(
        "Received scan with {} points stamped {}",
        cloud.len(),
        msg.stamp_us
    );

    let scan = ScanRecord::new(cloud, msg.frame_id, msg.stamp_us);
    let interest = SinkInterest {
        aligned: endpoint.aligned_cloud_wanted(),
        outliers: endpoint.outlier_cloud_wanted(),
    };

    let Some(success) = pipeline.process_scan(state, &scan, now_us(), interest) else {
        return;
    };

    *latest_pose.write() = Some(success.pose.clone());
    endpoint.publish_pose(success.pose);

    if let Some(aligned) = success.aligned {
        endpoint.publish_aligned_cloud(PointCloudMsg::from_cloud(
            &aligned,
            &scan.frame_id,
            scan.stamp_us,
        ));
    }
    if let Some(outliers) = success.outliers {
        let mut outlier_msg = PointCloudMsg::from_cloud(&outliers, &scan.frame_id, scan.stamp_us);
        outlier_msg.seq = scan_seq;
        endpoint.publish_outlier_cloud(outlier_msg);
    }
}

/// Republish the current reference cloud for diagnostics.
fn publish_reference_echo(
    endpoint: &LocalEndpoint,
    state: &PipelineState,
    config: &LocalizationConfig,
) {
    if let Some(reference) = &state.reference {
        endpoint.publish_reference_cloud(PointCloudMsg::from_cloud(
            reference.cloud(),
            &config.map_frame_id,
            now_us(),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::TopicBus;
    use crate::registration::IcpEngine;
    use crate::sensors::StaticTransformSet;

    fn spawn_worker(
        bus: &TopicBus,
        config: LocalizationConfig,
    ) -> (
        PipelineThread,
        crossbeam_channel::Sender<LocalizationConfig>,
        Arc<AtomicBool>,
    ) {
        let endpoint = LocalEndpoint::new(bus.clone(), &config);
        let engine = IcpEngine::new(config.registration_tuning());
        let transforms = StaticTransformSet::new().with_identity_fallback();
        let state = PipelineState::new(&config);
        let pipeline = LocalizationPipeline::new(config, Box::new(engine), Box::new(transforms));
        let (reconfig_tx, reconfig_rx) = crossbeam_channel::unbounded();
        let running = Arc::new(AtomicBool::new(true));
        let thread = PipelineThread::spawn(
            pipeline,
            state,
            endpoint,
            reconfig_rx,
            super::super::shared_pose(),
            running.clone(),
        );
        (thread, reconfig_tx, running)
    }

    #[test]
    fn worker_localizes_against_a_received_map() {
        let bus = TopicBus::new();
        let config = LocalizationConfig::default();
        let pose_rx = bus.subscribe(&config.pose_publish_topic);
        let echo_rx = bus.subscribe(&config.reference_map_pointcloud_publish_topic);

        let (thread, _reconfig_tx, running) = spawn_worker(&bus, config);

        // 4x4 fully occupied map.
        let grid = crate::reference::OccupancyGridMap::new(
            4,
            4,
            0.25,
            0.0,
            0.0,
            vec![100; 16],
        );
        bus.publish("map", BusPayload::Grid(grid.clone()));

        // Reference echo confirms the model was accepted.
        let echo = echo_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(matches!(echo, BusPayload::Cloud(_)));

        // A scan identical to the map's occupied-cell centers.
        let scan_cloud =
            grid.to_point_cloud(crate::reference::DEFAULT_OCCUPIED_THRESHOLD);
        let scan = PointCloudMsg::from_cloud(&scan_cloud, "laser", now_us());
        bus.publish("planar_pointcloud", BusPayload::Cloud(scan));

        let pose = pose_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        let BusPayload::Pose(pose) = pose else {
            panic!("expected pose payload");
        };
        assert_eq!(pose.seq, 0);
        assert!(pose.pose.translation_norm() < 0.05);

        running.store(false, Ordering::SeqCst);
        thread.join().unwrap();
    }
}
