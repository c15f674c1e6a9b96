//! Planar map-matching localization for mobile robots.
//!
//! Aligns incoming laser-derived point clouds against a reference map
//! cloud and publishes a corrected pose whenever the alignment is both
//! good (fitness) and plausible (correction magnitude).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 threads/ + main                 │  ← Worker loop, TF broadcast
//! └─────────────────────────────────────────────────┘
//!                         │
//! ┌─────────────────────────────────────────────────┐
//! │                      io/                        │  ← Endpoint, bus, wire messages
//! └─────────────────────────────────────────────────┘
//!                         │
//! ┌─────────────────────────────────────────────────┐
//! │                   pipeline/                     │  ← Gate → register → validate →
//! │                                                 │    compose → outliers
//! └─────────────────────────────────────────────────┘
//!                         │
//! ┌─────────────────────────────────────────────────┐
//! │     registration/  reference/  sensors/         │  ← Engine seam, map model,
//! └─────────────────────────────────────────────────┘    transforms
//!                         │
//! ┌─────────────────────────────────────────────────┐
//! │                     core/                       │  ← Types, math
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! Every scan is independent: a rejection at any stage (admission gate,
//! transform lookup, fitness bound, magnitude bound) drops that scan and
//! nothing else. The only state carried across scans is the gate
//! timestamps, the reference model and the pose counter.

// Layer 1: Foundation (no internal deps)
pub mod core;

// Layer 2: Collaborator seams (depend on core)
pub mod reference;
pub mod registration;
pub mod sensors;

// Layer 3: Decision pipeline (depends on the seams)
pub mod pipeline;

// Layer 4: Configuration and errors
pub mod config;
pub mod error;

// Layer 5: I/O and thread infrastructure
pub mod io;
pub mod threads;

// Convenience re-exports.
pub use crate::core::types::{Point3, PointCloud, Pose2D, ScanRecord, Timestamped};
pub use config::{LocalizationConfig, ReferenceSource};
pub use error::{LocalizationError, Result};
pub use io::{Endpoint, LocalEndpoint, PointCloudMsg, PoseMsg, TopicBus, TransformMsg};
pub use pipeline::{
    extract_outliers, GateRejection, LocalizationPipeline, PipelineState, PoseValidator, ScanGate,
    ScanSuccess, SinkInterest,
};
pub use reference::{OccupancyGridMap, ReferenceModel};
pub use registration::{
    IcpEngine, RegistrationEngine, RegistrationResult, RegistrationTuning, NO_ALIGNMENT,
};
pub use sensors::{OdometryBuffer, StaticTransformSet, TransformSource};
pub use threads::{shared_pose, PipelineThread, TfBroadcastThread};
