//! Hardware abstraction traits for the metering front-end.
//!
//! The driver only needs two things from the board: a free-running
//! microsecond counter and the SEL output that multiplexes the CF1 line.
//! The CF and CF1 inputs are not abstracted here; the host wires their
//! rising-edge interrupts straight into [`PulseCapture`](crate::PulseCapture).
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`MicrosClock`] | Monotonic `u32` microsecond counter (`micros()`) |
//! | [`SelectPin`] | SEL output choosing what CF1 reports |
//!
//! # Implementation
//!
//! For testing and desktop development, use the mock implementations
//! from [`crate::hal::mock`]. For ESP32 hardware, use the
//! implementations from `hal::esp32` (requires `esp32` feature).
//!
//! # Example
//!
//! ```rust
//! use rs_hlw8012::traits::{MicrosClock, SelectPin};
//! use rs_hlw8012::hal::{MockClock, MockSelectPin};
//!
//! let clock = MockClock::new();
//! clock.advance(1_500);
//! assert_eq!(clock.now_us(), 1_500);
//!
//! let mut sel = MockSelectPin::new();
//! sel.set_level(true).unwrap();
//! assert_eq!(sel.level, Some(true));
//! ```

/// Monotonic microsecond time source.
///
/// Mirrors the `micros()` call found on most embedded frameworks. The
/// counter is 32 bits wide and wraps after roughly 71 minutes; callers
/// always compute elapsed time with [`u32::wrapping_sub`], so the wrap is
/// harmless for any interval shorter than that.
pub trait MicrosClock {
    /// Returns the current time in microseconds since an arbitrary epoch.
    fn now_us(&self) -> u32;
}

impl<T: MicrosClock + ?Sized> MicrosClock for &T {
    #[inline]
    fn now_us(&self) -> u32 {
        (**self).now_us()
    }
}

/// SEL output of the metering chip.
///
/// Driven high while CF1 reports current and low while it reports voltage.
/// Boards with inverted polarity must invert inside their implementation;
/// the scheduler always writes `true` for current mode.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use rs_hlw8012::traits::SelectPin;
///
/// struct BoardSel { /* gpio handle */ }
///
/// impl SelectPin for BoardSel {
///     type Error = ();
///
///     fn set_level(&mut self, high: bool) -> Result<(), ()> {
///         // Write the GPIO...
///         Ok(())
///     }
/// }
/// ```
pub trait SelectPin {
    /// Error type for pin writes.
    type Error;

    /// Drive the pin high (`true`) or low (`false`).
    fn set_level(&mut self, high: bool) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    struct StepClock {
        now: Cell<u32>,
    }

    impl MicrosClock for StepClock {
        fn now_us(&self) -> u32 {
            let t = self.now.get();
            self.now.set(t.wrapping_add(10));
            t
        }
    }

    #[test]
    fn clock_reference_forwards() {
        let clock = StepClock { now: Cell::new(0) };
        let by_ref = &clock;
        assert_eq!(by_ref.now_us(), 0);
        assert_eq!(by_ref.now_us(), 10);
        assert_eq!(clock.now_us(), 20);
    }

    struct FailingPin;

    impl SelectPin for FailingPin {
        type Error = &'static str;

        fn set_level(&mut self, _high: bool) -> Result<(), Self::Error> {
            Err("gpio busy")
        }
    }

    #[test]
    fn select_pin_error_propagates() {
        let mut pin = FailingPin;
        assert_eq!(pin.set_level(true), Err("gpio busy"));
    }
}
