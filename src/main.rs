//! Localization daemon entry point.
//!
//! Wires the pipeline to the in-process topic bus, loads the optional
//! reference cloud file, and runs until Ctrl-C. Transport adapters feed
//! the bus; nothing here talks to the network directly.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;

use planar_localization::config::LocalizationConfig;
use planar_localization::error::{LocalizationError, Result};
use planar_localization::io::{LocalEndpoint, TopicBus};
use planar_localization::pipeline::{LocalizationPipeline, PipelineState};
use planar_localization::registration::IcpEngine;
use planar_localization::sensors::StaticTransformSet;
use planar_localization::threads::{shared_pose, PipelineThread, TfBroadcastThread};

#[derive(Parser, Debug)]
#[command(
    name = "planar-localization",
    about = "Planar map-matching localization daemon"
)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "planar-localization.toml")]
    config: PathBuf,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        log::error!("Daemon error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = if args.config.exists() {
        let config = LocalizationConfig::load(&args.config)?;
        log::info!("Loaded config from {}", args.config.display());
        config
    } else {
        log::warn!(
            "Config {} not found, using defaults",
            args.config.display()
        );
        LocalizationConfig::default()
    };
    config.validate()?;

    log::info!("planar-localization starting");
    log::info!("  Scan input: {}", config.pointcloud_topic);
    log::info!("  Reference source: {:?}", config.reference_source());
    log::info!("  Pose output: {}", config.pose_publish_topic);

    let bus = TopicBus::new();
    let endpoint = LocalEndpoint::new(bus.clone(), &config);
    let engine = IcpEngine::new(config.registration_tuning());
    // No transform tree is wired into the bus daemon; assume the sensor
    // sits at the body origin.
    let transforms = StaticTransformSet::new().with_identity_fallback();
    let state = PipelineState::new(&config);
    let latest_pose = shared_pose();
    let (_reconfig_tx, reconfig_rx) = crossbeam_channel::unbounded();

    let running = setup_ctrl_c_handler()?;

    let tf_thread = config.publish_tf_map_odom.then(|| {
        TfBroadcastThread::spawn(
            bus.clone(),
            config.map_frame_id.clone(),
            config.odom_frame_id.clone(),
            config.tf_publish_rate_hz,
            latest_pose.clone(),
            running.clone(),
        )
    });

    let pipeline = LocalizationPipeline::new(config, Box::new(engine), Box::new(transforms));
    let worker = PipelineThread::spawn(
        pipeline,
        state,
        endpoint,
        reconfig_rx,
        latest_pose,
        running.clone(),
    );

    worker.join().ok();
    if let Some(tf) = tf_thread {
        tf.join().ok();
    }
    log::info!("planar-localization shutdown complete");
    Ok(())
}

/// Ctrl-C clears the returned flag; threads poll it and wind down.
fn setup_ctrl_c_handler() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })
    .map_err(|e| LocalizationError::Config(format!("signal handler: {}", e)))?;
    Ok(running)
}
