//! Energy accumulation from published power.
//!
//! The chip reports instantaneous power only. Each power publication is
//! treated as holding for one update interval, giving a left Riemann sum in
//! watt-hours. The total is kept in `f64` so that small increments still
//! register after months of accumulation.

/// Running watt-hour total.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EnergyAccumulator {
    total_wh: f64,
}

impl EnergyAccumulator {
    /// Creates an accumulator at zero.
    pub const fn new() -> Self {
        Self { total_wh: 0.0 }
    }

    /// Creates an accumulator resuming from a stored total.
    ///
    /// Negative or non-finite totals start from zero.
    pub fn starting_at(total_wh: f64) -> Self {
        if total_wh.is_finite() && total_wh > 0.0 {
            Self { total_wh }
        } else {
            Self::new()
        }
    }

    /// Add `power_w` held for `interval_ms`. Returns the new total.
    ///
    /// Negative, NaN and infinite power are ignored.
    ///
    /// ```
    /// use rs_hlw8012::EnergyAccumulator;
    ///
    /// let mut acc = EnergyAccumulator::new();
    /// acc.accumulate(1000.0, 3_600_000); // 1 kW for one hour
    /// assert_eq!(acc.total_wh(), 1000.0);
    /// ```
    pub fn accumulate(&mut self, power_w: f32, interval_ms: u32) -> f32 {
        if power_w.is_finite() && power_w > 0.0 {
            self.total_wh += f64::from(power_w) * f64::from(interval_ms) / 3_600_000.0;
        }
        self.total_wh()
    }

    /// Accumulated energy in watt-hours, as published.
    #[inline]
    pub fn total_wh(&self) -> f32 {
        self.total_wh as f32
    }

    /// Accumulated energy in watt-hours at full precision.
    #[inline]
    pub fn total_wh_f64(&self) -> f64 {
        self.total_wh
    }

    /// Restart from zero.
    pub fn reset(&mut self) {
        self.total_wh = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_over_intervals() {
        let mut acc = EnergyAccumulator::new();
        for _ in 0..60 {
            acc.accumulate(60.0, 60_000);
        }
        assert!((acc.total_wh() - 60.0).abs() < 0.01);
    }

    #[test]
    fn ignores_invalid_power() {
        let mut acc = EnergyAccumulator::new();
        acc.accumulate(f32::NAN, 1_000);
        acc.accumulate(-5.0, 1_000);
        acc.accumulate(f32::INFINITY, 1_000);
        assert_eq!(acc.total_wh(), 0.0);
    }

    #[test]
    fn small_increments_count_on_a_large_total() {
        let mut acc = EnergyAccumulator::starting_at(500_000.0);
        for _ in 0..3_600 {
            acc.accumulate(60.0, 1_000);
        }
        let delta = acc.total_wh_f64() - 500_000.0;
        assert!((delta - 60.0).abs() < 1e-4, "delta {}", delta);
        assert!((acc.total_wh() - 500_060.0).abs() < 0.1);
    }

    #[test]
    fn starting_at_rejects_invalid_totals() {
        assert_eq!(EnergyAccumulator::starting_at(-3.0).total_wh(), 0.0);
        assert_eq!(EnergyAccumulator::starting_at(f64::NAN).total_wh(), 0.0);
        assert_eq!(EnergyAccumulator::starting_at(12.5).total_wh(), 12.5);
    }

    #[test]
    fn reset_clears_total() {
        let mut acc = EnergyAccumulator::new();
        acc.accumulate(100.0, 36_000);
        assert!(acc.total_wh() > 0.0);
        acc.reset();
        assert_eq!(acc.total_wh(), 0.0);
    }
}
