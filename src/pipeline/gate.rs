//! Scan admission gating: temporal debounce plus staleness filter.

use crate::core::math::us_to_secs;

/// Why a scan was refused admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRejection {
    /// No reference model has been received yet.
    MapNotReady,
    /// The previous registration is too recent.
    Throttled { elapsed_us: u64 },
    /// The scan is older than the age bound.
    Stale { age_us: u64 },
}

impl std::fmt::Display for GateRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateRejection::MapNotReady => write!(f, "no reference cloud to compare to"),
            GateRejection::Throttled { elapsed_us } => {
                write!(f, "only {:.3}s since last registration", us_to_secs(*elapsed_us))
            }
            GateRejection::Stale { age_us } => {
                write!(f, "scan age {:.3}s exceeds bound", us_to_secs(*age_us))
            }
        }
    }
}

/// Decides whether a scan is eligible for registration.
///
/// No state machine beyond two numbers: the admission interval bounds
/// and the timestamp of the last admitted scan. Admission is recorded by
/// the caller via [`mark_admitted`](ScanGate::mark_admitted), so a
/// rejected scan leaves the throttle untouched.
///
/// Boundary convention: the throttle admits at exactly the minimum
/// interval, and the age bound admits a scan exactly at the maximum age.
#[derive(Debug, Clone)]
pub struct ScanGate {
    min_interval_us: u64,
    max_age_us: u64,
    last_admitted_us: Option<u64>,
}

impl ScanGate {
    pub fn new(min_interval_us: u64, max_age_us: u64) -> Self {
        Self {
            min_interval_us,
            max_age_us,
            last_admitted_us: None,
        }
    }

    /// Replace the interval bounds (live reconfiguration).
    pub fn set_limits(&mut self, min_interval_us: u64, max_age_us: u64) {
        self.min_interval_us = min_interval_us;
        self.max_age_us = max_age_us;
    }

    /// Evaluate a scan stamped `stamp_us` at wall time `now_us`.
    ///
    /// Scans stamped in the future have age zero (saturating).
    pub fn check(&self, stamp_us: u64, now_us: u64, map_ready: bool) -> Result<(), GateRejection> {
        if !map_ready {
            return Err(GateRejection::MapNotReady);
        }
        if let Some(last) = self.last_admitted_us {
            let elapsed_us = now_us.saturating_sub(last);
            if elapsed_us < self.min_interval_us {
                return Err(GateRejection::Throttled { elapsed_us });
            }
        }
        let age_us = now_us.saturating_sub(stamp_us);
        if age_us > self.max_age_us {
            return Err(GateRejection::Stale { age_us });
        }
        Ok(())
    }

    /// Record an admission; starts the next throttle window.
    pub fn mark_admitted(&mut self, now_us: u64) {
        self.last_admitted_us = Some(now_us);
    }

    pub fn last_admitted_us(&self) -> Option<u64> {
        self.last_admitted_us
    }
}
