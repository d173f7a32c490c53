//! Playback position tracking
//!
//! Recomputed from the media element on every position tick; nothing is
//! cached between calls.

use crate::format::format_time;

/// Clock text and progress fill for one position tick
#[derive(Debug, Clone, PartialEq)]
pub struct PositionReadout {
    pub elapsed: String,
    pub total: String,
    /// Always within `0..=100`
    pub progress_percent: f64,
}

impl PositionReadout {
    /// Readout shown right after a file is selected
    pub fn zero() -> Self {
        Self {
            elapsed: format_time(0.0),
            total: format_time(0.0),
            progress_percent: 0.0,
        }
    }

    /// Build a readout from the media element's position and duration.
    ///
    /// An unknown (NaN) or zero duration counts as zero. Progress is clamped
    /// because the position can briefly run past the reported duration.
    pub fn from_media(current_time: f64, duration: f64) -> Self {
        let total = if duration.is_nan() { 0.0 } else { duration };
        let progress_percent = if total > 0.0 {
            let percent = current_time / total * 100.0;
            if percent.is_finite() {
                percent.clamp(0.0, 100.0)
            } else {
                0.0
            }
        } else {
            0.0
        };

        Self {
            elapsed: format_time(current_time),
            total: format_time(total),
            progress_percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zero() {
        let readout = PositionReadout::zero();
        assert_eq!(readout.elapsed, "0:00");
        assert_eq!(readout.total, "0:00");
        assert_eq!(readout.progress_percent, 0.0);
    }

    #[test]
    fn test_halfway() {
        let readout = PositionReadout::from_media(112.5, 225.0);
        assert_eq!(readout.elapsed, "1:52");
        assert_eq!(readout.total, "3:45");
        assert_relative_eq!(readout.progress_percent, 50.0);
    }

    #[test]
    fn test_unknown_duration() {
        let readout = PositionReadout::from_media(3.0, f64::NAN);
        assert_eq!(readout.elapsed, "0:03");
        assert_eq!(readout.total, "0:00");
        assert_eq!(readout.progress_percent, 0.0);
    }

    #[test]
    fn test_infinite_duration_is_streaming() {
        let readout = PositionReadout::from_media(30.0, f64::INFINITY);
        assert_eq!(readout.total, "0:00");
        assert_eq!(readout.progress_percent, 0.0);
    }

    #[test]
    fn test_overshoot_clamped() {
        let readout = PositionReadout::from_media(226.3, 225.0);
        assert_eq!(readout.progress_percent, 100.0);
    }

    #[test]
    fn test_negative_position_clamped() {
        let readout = PositionReadout::from_media(-1.0, 225.0);
        assert_eq!(readout.progress_percent, 0.0);
        assert_eq!(readout.elapsed, "0:00");
    }

    #[test]
    fn test_progress_always_in_range() {
        for step in 0..=500 {
            let current = step as f64 * 0.5;
            let readout = PositionReadout::from_media(current, 200.0);
            assert!((0.0..=100.0).contains(&readout.progress_percent));
        }
    }
}
