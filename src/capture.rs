//! Rising-edge pulse capture for the CF and CF1 lines.
//!
//! One [`PulseCapture`] sits behind each pulse output. The interrupt handler
//! calls [`PulseCapture::on_rising_edge`] with the current `micros()` value;
//! the update task reads a [`CaptureSnapshot`] of all three fields at once.
//!
//! # Concurrency
//!
//! The fields live in a `critical_section::Mutex<Cell<_>>`. Both the ISR
//! write and the task read take the critical section only for the copy,
//! so a snapshot is always either entirely from before an edge or entirely
//! from after it. No floating-point work or logging happens inside.
//!
//! # Example
//!
//! ```rust
//! use rs_hlw8012::PulseCapture;
//!
//! static CF: PulseCapture = PulseCapture::new();
//!
//! // From the rising-edge interrupt:
//! CF.on_rising_edge(1_000);
//! CF.on_rising_edge(1_500);
//!
//! let snap = CF.snapshot();
//! assert!(snap.valid);
//! assert_eq!(snap.last_period_us, 500);
//! assert_eq!(snap.elapsed_us(1_700), 200);
//! ```

use core::cell::Cell;
use critical_section::Mutex;

/// Consistent copy of a capture's state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CaptureSnapshot {
    /// Timestamp of the most recent rising edge (µs, wrapping).
    pub last_rise_us: u32,
    /// Microseconds between the two most recent rising edges.
    pub last_period_us: u32,
    /// A full period has been observed since the last reset.
    pub valid: bool,
}

impl CaptureSnapshot {
    /// Microseconds since the last rising edge, modulo 2³².
    #[inline]
    pub fn elapsed_us(&self, now_us: u32) -> u32 {
        now_us.wrapping_sub(self.last_rise_us)
    }
}

#[derive(Clone, Copy)]
struct Edges {
    snap: CaptureSnapshot,
    // Set by `reset`: the next edge re-anchors instead of closing a period.
    rebase: bool,
}

/// Edge-timestamping store shared between one ISR and the update task.
pub struct PulseCapture {
    state: Mutex<Cell<Edges>>,
}

impl PulseCapture {
    /// Creates an empty capture. `const` so it can back a `static`.
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(Cell::new(Edges {
                snap: CaptureSnapshot {
                    last_rise_us: 0,
                    last_period_us: 0,
                    valid: false,
                },
                rebase: false,
            })),
        }
    }

    /// Interrupt body: record a rising edge seen at `now_us`.
    ///
    /// A zero `last_rise_us` means no edge has been seen yet, so the first
    /// edge only establishes the baseline. The same holds for the first
    /// edge after [`reset`](Self::reset).
    #[inline]
    pub fn on_rising_edge(&self, now_us: u32) {
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut e = cell.get();
            if e.snap.last_rise_us != 0 && !e.rebase {
                e.snap.last_period_us = now_us.wrapping_sub(e.snap.last_rise_us);
                e.snap.valid = true;
            }
            e.snap.last_rise_us = now_us;
            e.rebase = false;
            cell.set(e);
        });
    }

    /// Reads all three fields under one critical section.
    #[inline]
    pub fn snapshot(&self) -> CaptureSnapshot {
        critical_section::with(|cs| self.state.borrow(cs).get().snap)
    }

    /// Clears the period and validity flag.
    ///
    /// `last_rise_us` is kept so the time since the last edge stays
    /// meaningful for the fade-down logic after a channel flip. The next
    /// edge only re-anchors, so the first valid period lies entirely after
    /// the reset.
    pub fn reset(&self) {
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut e = cell.get();
            e.snap.last_period_us = 0;
            e.snap.valid = false;
            e.rebase = true;
            cell.set(e);
        });
    }

    /// Timestamp of the most recent rising edge.
    pub fn last_rise_us(&self) -> u32 {
        self.snapshot().last_rise_us
    }

    /// Duration of the most recent complete period.
    pub fn last_period_us(&self) -> u32 {
        self.snapshot().last_period_us
    }

    /// Whether a full period was observed since the last reset.
    pub fn is_valid(&self) -> bool {
        self.snapshot().valid
    }
}

impl Default for PulseCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for PulseCapture {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("PulseCapture").field(&self.snapshot()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_capture_is_empty() {
        let cap = PulseCapture::new();
        assert_eq!(cap.snapshot(), CaptureSnapshot::default());
        assert!(!cap.is_valid());
    }

    #[test]
    fn first_edge_sets_baseline_only() {
        let cap = PulseCapture::new();
        cap.on_rising_edge(5_000);
        assert_eq!(cap.last_rise_us(), 5_000);
        assert_eq!(cap.last_period_us(), 0);
        assert!(!cap.is_valid());
    }

    #[test]
    fn second_edge_forms_period() {
        let cap = PulseCapture::new();
        cap.on_rising_edge(5_000);
        cap.on_rising_edge(5_200);
        assert_eq!(cap.last_period_us(), 200);
        assert!(cap.is_valid());

        cap.on_rising_edge(5_450);
        assert_eq!(cap.last_period_us(), 250);
        assert_eq!(cap.last_rise_us(), 5_450);
    }

    #[test]
    fn reset_keeps_last_rise() {
        let cap = PulseCapture::new();
        cap.on_rising_edge(100);
        cap.on_rising_edge(300);
        cap.reset();

        let snap = cap.snapshot();
        assert_eq!(snap.last_rise_us, 300);
        assert_eq!(snap.last_period_us, 0);
        assert!(!snap.valid);
    }

    #[test]
    fn edge_after_reset_only_rebases() {
        let cap = PulseCapture::new();
        cap.on_rising_edge(100);
        cap.on_rising_edge(300);
        cap.reset();

        cap.on_rising_edge(700);
        assert!(!cap.is_valid());
        assert_eq!(cap.last_rise_us(), 700);
        assert_eq!(cap.last_period_us(), 0);

        cap.on_rising_edge(1_000);
        assert!(cap.is_valid());
        assert_eq!(cap.last_period_us(), 300);
    }

    #[test]
    fn period_survives_counter_wrap() {
        let cap = PulseCapture::new();
        cap.on_rising_edge(u32::MAX - 99);
        cap.on_rising_edge(100);
        assert_eq!(cap.last_period_us(), 200);
    }

    #[test]
    fn elapsed_wraps() {
        let snap = CaptureSnapshot {
            last_rise_us: u32::MAX - 9,
            last_period_us: 0,
            valid: false,
        };
        assert_eq!(snap.elapsed_us(10), 20);
    }

    #[test]
    fn debug_shows_snapshot() {
        let cap = PulseCapture::new();
        cap.on_rising_edge(42);
        let text = format!("{:?}", cap);
        assert!(text.contains("last_rise_us: 42"));
    }
}
