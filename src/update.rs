//! Per-channel publication decision for one update tick.
//!
//! Every tick the driver asks, for CF and for the active CF1 channel,
//! whether the last measured period still describes reality. The answer is
//! a [`Decision`]:
//!
//! | Condition | Decision |
//! |-----------|----------|
//! | silent for more than 10 s | [`Decision::Zero`] |
//! | edge overdue by more than one update interval and the last period | [`Decision::Fade`] |
//! | otherwise | [`Decision::Period`] (CF1: only with a valid period) |
//!
//! CF1 without a valid period and without anything to fade yields
//! [`Decision::Hold`]: nothing is published and the scheduler waits.
//!
//! # Example
//!
//! ```rust
//! use rs_hlw8012::update::{evaluate, Channel, Decision};
//! use rs_hlw8012::CaptureSnapshot;
//!
//! let snap = CaptureSnapshot { last_rise_us: 1_000, last_period_us: 500_000, valid: true };
//!
//! // 1.5 s after the last edge with a 1 s update interval: fade down
//! let d = evaluate(Channel::Cf, snap.elapsed_us(1_501_000), &snap, 1_000_000, 120.0);
//! assert_eq!(d, Decision::Fade(1_500_000));
//! ```

use crate::capture::CaptureSnapshot;

/// Silence after which a line is considered dead.
pub const SILENCE_TIMEOUT_US: u32 = 10_000_000;

/// Which pulse line is being evaluated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    /// Power line. Always has a meaningful period.
    Cf,
    /// Voltage/current line. Its period is only trusted once `valid`.
    Cf1,
}

/// What to publish for one channel on this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Publish exactly zero.
    Zero,
    /// Publish the conversion of the given still-open period (µs).
    Fade(u32),
    /// Publish the conversion of the last complete period (µs).
    Period(u32),
    /// Publish nothing; wait for the first period on a fresh channel.
    Hold,
}

impl Decision {
    /// Whether this decision on CF1 must block a channel change.
    #[inline]
    pub fn defers_mode_change(&self) -> bool {
        matches!(self, Decision::Fade(_) | Decision::Hold)
    }

    /// Period to convert, if this decision publishes a measured value.
    ///
    /// `Zero` publishes `0.0` directly and `Hold` publishes nothing.
    #[inline]
    pub fn period_us(&self) -> Option<u32> {
        match *self {
            Decision::Fade(p) | Decision::Period(p) => Some(p),
            Decision::Zero | Decision::Hold => None,
        }
    }
}

/// Decide what one channel publishes.
///
/// - `elapsed_us`: time since the last rising edge (already wrap-corrected)
/// - `interval_us`: update interval in microseconds
/// - `last_published`: the sensor's current state, NaN if never published
///
/// A never-published CF sensor is initialised to zero. On CF1 that only
/// happens while no valid period exists, so a channel that is already
/// pulsing publishes its real value on the first tick.
pub fn evaluate(
    channel: Channel,
    elapsed_us: u32,
    snapshot: &CaptureSnapshot,
    interval_us: u32,
    last_published: f32,
) -> Decision {
    if elapsed_us > SILENCE_TIMEOUT_US {
        return Decision::Zero;
    }

    let unpublished = last_published.is_nan();
    let has_period = match channel {
        Channel::Cf => true,
        Channel::Cf1 => snapshot.valid,
    };

    if unpublished && (channel == Channel::Cf || !has_period) {
        return Decision::Zero;
    }

    let overdue = elapsed_us > interval_us && elapsed_us > snapshot.last_period_us;
    if overdue && last_published != 0.0 {
        return Decision::Fade(elapsed_us);
    }

    if has_period {
        Decision::Period(snapshot.last_period_us)
    } else {
        Decision::Hold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const U: u32 = 1_000_000;

    fn snap(period: u32, valid: bool) -> CaptureSnapshot {
        CaptureSnapshot {
            last_rise_us: 0,
            last_period_us: period,
            valid,
        }
    }

    #[test]
    fn silence_is_zero_on_both_channels() {
        let s = snap(200, true);
        assert_eq!(evaluate(Channel::Cf, 10_000_001, &s, U, 50.0), Decision::Zero);
        assert_eq!(evaluate(Channel::Cf1, 10_000_001, &s, U, 50.0), Decision::Zero);
    }

    #[test]
    fn exactly_ten_seconds_is_not_silence() {
        let s = snap(200, true);
        assert_eq!(
            evaluate(Channel::Cf, 10_000_000, &s, U, 50.0),
            Decision::Fade(10_000_000)
        );
    }

    #[test]
    fn unpublished_power_initialises_to_zero() {
        let s = snap(200, true);
        assert_eq!(evaluate(Channel::Cf, 100, &s, U, f32::NAN), Decision::Zero);
    }

    #[test]
    fn unpublished_cf1_with_valid_period_publishes_period() {
        let s = snap(200, true);
        assert_eq!(
            evaluate(Channel::Cf1, 100, &s, U, f32::NAN),
            Decision::Period(200)
        );
    }

    #[test]
    fn unpublished_cf1_without_period_is_zero() {
        let s = snap(0, false);
        assert_eq!(evaluate(Channel::Cf1, 100, &s, U, f32::NAN), Decision::Zero);
    }

    #[test]
    fn steady_period_publishes_period() {
        let s = snap(500_000, true);
        assert_eq!(
            evaluate(Channel::Cf, 400_000, &s, U, 10.0),
            Decision::Period(500_000)
        );
    }

    #[test]
    fn fade_requires_exceeding_interval_and_period() {
        let s = snap(2_000_000, true);
        // beyond interval but within the last period
        assert_eq!(
            evaluate(Channel::Cf, 1_500_000, &s, U, 10.0),
            Decision::Period(2_000_000)
        );
        // beyond both
        assert_eq!(
            evaluate(Channel::Cf, 2_500_000, &s, U, 10.0),
            Decision::Fade(2_500_000)
        );
    }

    #[test]
    fn fade_stops_at_zero() {
        let s = snap(500_000, true);
        assert_eq!(
            evaluate(Channel::Cf, 3_000_000, &s, U, 0.0),
            Decision::Period(500_000)
        );
    }

    #[test]
    fn fresh_cf1_holds() {
        let s = snap(0, false);
        let d = evaluate(Channel::Cf1, 300, &s, U, 230.0);
        assert_eq!(d, Decision::Hold);
        assert!(d.defers_mode_change());
        assert_eq!(d.period_us(), None);
    }

    #[test]
    fn fresh_cf1_fades_when_overdue() {
        let s = snap(0, false);
        let d = evaluate(Channel::Cf1, 1_200_000, &s, U, 2.0);
        assert_eq!(d, Decision::Fade(1_200_000));
        assert!(d.defers_mode_change());
    }

    #[test]
    fn fresh_cf1_at_zero_holds_instead_of_fading() {
        let s = snap(0, false);
        assert_eq!(evaluate(Channel::Cf1, 1_200_000, &s, U, 0.0), Decision::Hold);
    }

    #[test]
    fn period_and_zero_do_not_defer() {
        assert!(!Decision::Period(10).defers_mode_change());
        assert!(!Decision::Zero.defers_mode_change());
        assert_eq!(Decision::Period(10).period_us(), Some(10));
    }
}
