//! Frame transform lookup.

use std::collections::HashMap;

use crate::core::types::Pose2D;

/// Resolves rigid transforms between named frames, and optionally the
/// dead-reckoned body displacement between two timestamps.
///
/// The pipeline treats both lookups as fallible collaborator calls: a
/// `None` drops the current scan (transform) or skips the latency
/// correction (displacement); the next scan is evaluated independently.
pub trait TransformSource: Send {
    /// Transform taking points in `source_frame` to `target_frame` at
    /// the given timestamp.
    fn lookup(&self, source_frame: &str, target_frame: &str, stamp_us: u64) -> Option<Pose2D>;

    /// Body-frame displacement between two timestamps.
    fn displacement(&self, from_us: u64, to_us: u64) -> Option<Pose2D> {
        let _ = (from_us, to_us);
        None
    }
}

/// Fixed frame-pair transforms (sensor mounts and other static links).
///
/// Registering a pair also registers its inverse. Lookups ignore the
/// timestamp. Equal frames resolve to identity.
#[derive(Debug, Default)]
pub struct StaticTransformSet {
    transforms: HashMap<(String, String), Pose2D>,
    identity_fallback: bool,
}

impl StaticTransformSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve unknown frame pairs to identity instead of failing.
    ///
    /// For deployments where the sensor sits at the body origin and no
    /// transform tree is wired up.
    pub fn with_identity_fallback(mut self) -> Self {
        self.identity_fallback = true;
        self
    }

    pub fn insert(
        &mut self,
        source_frame: impl Into<String>,
        target_frame: impl Into<String>,
        transform: Pose2D,
    ) {
        let source = source_frame.into();
        let target = target_frame.into();
        self.transforms
            .insert((target.clone(), source.clone()), transform.inverse());
        self.transforms.insert((source, target), transform);
    }
}

impl TransformSource for StaticTransformSet {
    fn lookup(&self, source_frame: &str, target_frame: &str, _stamp_us: u64) -> Option<Pose2D> {
        if source_frame == target_frame {
            return Some(Pose2D::identity());
        }
        let key = (source_frame.to_string(), target_frame.to_string());
        match self.transforms.get(&key) {
            Some(t) => Some(*t),
            None if self.identity_fallback => Some(Pose2D::identity()),
            None => None,
        }
    }
}
