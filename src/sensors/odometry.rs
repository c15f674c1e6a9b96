//! Dead-reckoning pose history.

use std::collections::VecDeque;

use crate::core::types::{Pose2D, Timestamped};

/// Bounded history of timestamped odometry poses, interpolated to yield
/// the body-frame displacement between two instants.
///
/// Backs the `add_odometry_displacement` latency correction: the
/// displacement between the scan stamp and the publish stamp is composed
/// onto the corrected pose.
#[derive(Debug, Clone)]
pub struct OdometryBuffer {
    samples: VecDeque<Timestamped<Pose2D>>,
    capacity: usize,
}

impl OdometryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an odometry pose. Samples must arrive in timestamp order;
    /// out-of-order samples are dropped.
    pub fn push(&mut self, pose: Pose2D, stamp_us: u64) {
        if let Some(last) = self.samples.back() {
            if stamp_us < last.timestamp_us {
                log::debug!(
                    "Dropping out-of-order odometry sample ({} < {})",
                    stamp_us,
                    last.timestamp_us
                );
                return;
            }
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(Timestamped::new(pose, stamp_us));
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Interpolated odometry pose at `stamp_us`, if the history covers it.
    pub fn pose_at(&self, stamp_us: u64) -> Option<Pose2D> {
        let after = self
            .samples
            .iter()
            .position(|s| s.timestamp_us >= stamp_us)?;
        let end = &self.samples[after];
        if end.timestamp_us == stamp_us || after == 0 {
            // Exact hit, or a query at the very start of the history.
            return (end.timestamp_us == stamp_us).then_some(end.data);
        }
        Pose2D::interpolate(&self.samples[after - 1], end, stamp_us)
    }

    /// Body-frame displacement between two covered timestamps.
    pub fn displacement_between(&self, from_us: u64, to_us: u64) -> Option<Pose2D> {
        let start = self.pose_at(from_us)?;
        let end = self.pose_at(to_us)?;
        Some(start.inverse().compose(&end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn straight_line_buffer() -> OdometryBuffer {
        // 1 m/s along +x, samples every 100 ms.
        let mut buffer = OdometryBuffer::new(32);
        for i in 0..=10u64 {
            buffer.push(Pose2D::new(i as f32 * 0.1, 0.0, 0.0), i * 100_000);
        }
        buffer
    }

    #[test]
    fn pose_at_interpolates_between_samples() {
        let buffer = straight_line_buffer();
        let p = buffer.pose_at(150_000).unwrap();
        assert_relative_eq!(p.x, 0.15, epsilon = 1e-6);
    }

    #[test]
    fn pose_at_outside_history_is_none() {
        let buffer = straight_line_buffer();
        assert!(buffer.pose_at(1_100_000).is_none());
    }

    #[test]
    fn displacement_along_straight_line() {
        let buffer = straight_line_buffer();
        let d = buffer.displacement_between(200_000, 700_000).unwrap();
        assert_relative_eq!(d.x, 0.5, epsilon = 1e-6);
        assert_relative_eq!(d.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(d.theta, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn displacement_accounts_for_heading() {
        let mut buffer = OdometryBuffer::new(8);
        buffer.push(Pose2D::new(0.0, 0.0, std::f32::consts::FRAC_PI_2), 0);
        buffer.push(Pose2D::new(0.0, 1.0, std::f32::consts::FRAC_PI_2), 100);
        // World-frame +y motion is +x in the body frame.
        let d = buffer.displacement_between(0, 100).unwrap();
        assert_relative_eq!(d.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(d.y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn out_of_order_samples_are_dropped() {
        let mut buffer = OdometryBuffer::new(8);
        buffer.push(Pose2D::identity(), 1000);
        buffer.push(Pose2D::new(1.0, 0.0, 0.0), 500);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn capacity_evicts_oldest() {
        let mut buffer = OdometryBuffer::new(3);
        for i in 0..5u64 {
            buffer.push(Pose2D::identity(), i * 100);
        }
        assert_eq!(buffer.len(), 3);
        assert!(buffer.pose_at(0).is_none());
        assert!(buffer.pose_at(400).is_some());
    }
}
