//! End-to-end pipeline scenarios.
//!
//! Exercises the public API the way the daemon does: a reference model,
//! the bundled ICP engine, and the decision pipeline around them.
//!
//! Run with: `cargo test --test localization_pipeline`

use approx::assert_relative_eq;

use planar_localization::{
    extract_outliers, IcpEngine, LocalizationConfig, LocalizationPipeline, PipelineState, Point3,
    PointCloud, Pose2D, ReferenceModel, RegistrationEngine, RegistrationResult, RegistrationTuning,
    ScanRecord, SinkInterest, StaticTransformSet,
};

const SEC: u64 = 1_000_000;

/// 10x10 planar point grid (100 points, z = 0) spanning `side` meters.
///
/// The side is kept well above the test displacements so nearest-neighbor
/// correspondences are unambiguous (displacement < half the lattice
/// pitch).
fn grid_cloud(side: f32) -> PointCloud {
    let mut cloud = PointCloud::with_capacity(100);
    for i in 0..10 {
        for j in 0..10 {
            cloud.push(Point3::new(
                i as f32 / 9.0 * side,
                j as f32 / 9.0 * side,
                0.0,
            ));
        }
    }
    cloud
}

fn build_pipeline(engine: impl RegistrationEngine + 'static) -> LocalizationPipeline {
    LocalizationPipeline::new(
        LocalizationConfig::default(),
        Box::new(engine),
        Box::new(StaticTransformSet::new().with_identity_fallback()),
    )
}

fn ready_state(pipeline: &LocalizationPipeline, reference: PointCloud) -> PipelineState {
    let mut state = PipelineState::new(pipeline.config());
    state.reference = Some(ReferenceModel::from_cloud(reference));
    state
}

/// Engine returning a fixed correction regardless of input.
struct ShiftEngine {
    transform: Pose2D,
    fitness: f32,
}

impl RegistrationEngine for ShiftEngine {
    fn register(&self, source: &PointCloud, _reference: &ReferenceModel) -> RegistrationResult {
        RegistrationResult {
            transform: self.transform,
            fitness: self.fitness,
            aligned: source.transform(&self.transform),
        }
    }

    fn apply_tuning(&mut self, _tuning: &RegistrationTuning) {}
}

#[test]
fn translated_grid_scan_yields_matching_correction() {
    let reference = grid_cloud(10.0);
    let model = ReferenceModel::from_cloud(reference.clone());
    let engine = IcpEngine::new(RegistrationTuning::default());

    // Scan displaced +x relative to the map; the correction maps scan
    // points back onto the reference, so it comes out as -x.
    let scan_cloud = reference.transform(&Pose2D::new(0.1, 0.0, 0.0));
    let result = engine.register(&scan_cloud, &model);

    assert!(result.attempted());
    assert!(result.fitness < 1e-2, "fitness {}", result.fitness);
    assert_relative_eq!(result.transform.x, -0.1, epsilon = 1e-3);
    assert_relative_eq!(result.transform.y, 0.0, epsilon = 1e-3);
    assert_relative_eq!(result.transform.translation_norm(), 0.1, epsilon = 1e-3);

    // No aligned point strays from the reference.
    assert!(extract_outliers(&result.aligned, &model, 0.01).is_empty());
}

#[test]
fn translated_grid_scan_publishes_accepted_pose() {
    let reference = grid_cloud(10.0);
    let pipeline = build_pipeline(IcpEngine::new(RegistrationTuning::default()));
    let mut state = ready_state(&pipeline, reference.clone());

    let scan_cloud = reference.transform(&Pose2D::new(0.1, 0.0, 0.0));
    let scan = ScanRecord::new(scan_cloud, "laser", SEC);
    let success = pipeline
        .process_scan(
            &mut state,
            &scan,
            SEC,
            SinkInterest {
                aligned: true,
                outliers: true,
            },
        )
        .expect("scan should be accepted");

    assert_eq!(success.pose.seq, 0);
    assert_eq!(success.pose.stamp_us, SEC);
    assert_relative_eq!(success.pose.pose.translation_norm(), 0.1, epsilon = 1e-3);
    // All points land on the map: nothing to publish as outliers.
    assert!(success.outliers.is_none());
    assert!(success.aligned.is_some());
}

#[test]
fn stale_scan_publishes_nothing() {
    // max_seconds_scan_age defaults to 0.5; this scan is 2 s old.
    let reference = grid_cloud(10.0);
    let pipeline = build_pipeline(IcpEngine::new(RegistrationTuning::default()));
    let mut state = ready_state(&pipeline, reference.clone());

    let now = 10 * SEC;
    let scan = ScanRecord::new(reference, "laser", now - 2 * SEC);
    let out = pipeline.process_scan(&mut state, &scan, now, SinkInterest::default());

    assert!(out.is_none());
    assert_eq!(state.poses_published, 0);
    assert_eq!(state.gate.last_admitted_us(), None);
}

#[test]
fn five_meter_correction_is_rejected() {
    // max_transformation_distance defaults to 2.5 m.
    let reference = grid_cloud(10.0);
    let engine = ShiftEngine {
        transform: Pose2D::new(5.0, 0.0, 0.0),
        fitness: 1e-4,
    };
    let pipeline = build_pipeline(engine);
    let mut state = ready_state(&pipeline, reference.clone());

    let scan = ScanRecord::new(reference, "laser", SEC);
    let out = pipeline.process_scan(
        &mut state,
        &scan,
        SEC,
        SinkInterest {
            aligned: true,
            outliers: true,
        },
    );

    assert!(out.is_none());
    assert_eq!(state.poses_published, 0);
}

#[test]
fn failed_registration_never_publishes() {
    let reference = grid_cloud(10.0);
    let engine = ShiftEngine {
        transform: Pose2D::identity(),
        fitness: -1.0,
    };
    let pipeline = build_pipeline(engine);
    let mut state = ready_state(&pipeline, reference.clone());

    let scan = ScanRecord::new(reference, "laser", SEC);
    assert!(pipeline
        .process_scan(&mut state, &scan, SEC, SinkInterest::default())
        .is_none());
    assert_eq!(state.poses_published, 0);
}

#[test]
fn replaying_a_scan_is_deterministic() {
    let reference = grid_cloud(10.0);
    let model = ReferenceModel::from_cloud(reference.clone());
    let engine = IcpEngine::new(RegistrationTuning::default());
    let scan_cloud = reference.transform(&Pose2D::new(0.07, -0.04, 0.01));

    let first = engine.register(&scan_cloud, &model);
    let second = engine.register(&scan_cloud, &model);

    assert_eq!(first.transform, second.transform);
    assert_eq!(first.fitness, second.fitness);

    // Same accept/reject decision through the pipeline (fresh state per
    // run so the throttle is not part of the comparison).
    let pipeline = build_pipeline(IcpEngine::new(RegistrationTuning::default()));
    let scan = ScanRecord::new(scan_cloud, "laser", SEC);
    let mut state_a = ready_state(&pipeline, reference.clone());
    let mut state_b = ready_state(&pipeline, reference.clone());
    let out_a = pipeline.process_scan(&mut state_a, &scan, SEC, SinkInterest::default());
    let out_b = pipeline.process_scan(&mut state_b, &scan, SEC, SinkInterest::default());

    assert_eq!(out_a.is_some(), out_b.is_some());
    assert_eq!(
        out_a.unwrap().pose.pose,
        out_b.unwrap().pose.pose
    );
}

#[test]
fn throttled_scan_pair_admits_only_the_first() {
    let reference = grid_cloud(10.0);
    let pipeline = build_pipeline(IcpEngine::new(RegistrationTuning::default()));
    let mut state = ready_state(&pipeline, reference.clone());

    let scan = |stamp| ScanRecord::new(reference.clone(), "laser", stamp);
    assert!(pipeline
        .process_scan(&mut state, &scan(SEC), SEC, SinkInterest::default())
        .is_some());
    // 20 ms later: inside the default 50 ms throttle.
    assert!(pipeline
        .process_scan(
            &mut state,
            &scan(SEC + 20_000),
            SEC + 20_000,
            SinkInterest::default()
        )
        .is_none());
    assert_eq!(state.poses_published, 1);
}
