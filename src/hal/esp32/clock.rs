//! ESP32 microsecond clock using the ESP-IDF high-resolution timer.

use crate::traits::MicrosClock;

/// ESP32 clock backed by `esp_timer_get_time()`.
///
/// The 64-bit timer is truncated to 32 bits, so [`MicrosClock::now_us`]
/// wraps after about 71.6 minutes like a hardware `micros()` counter.
///
/// # Example
///
/// ```ignore
/// use rs_hlw8012::hal::esp32::Esp32Clock;
/// use rs_hlw8012::traits::MicrosClock;
///
/// let clock = Esp32Clock::new();
/// let start = clock.now_us();
/// // ... do work ...
/// let elapsed = clock.now_us().wrapping_sub(start);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Esp32Clock;

impl Esp32Clock {
    /// Creates a new ESP32 clock instance.
    #[inline]
    pub fn new() -> Self {
        Self
    }

    /// Milliseconds since boot, without wrapping.
    #[inline]
    pub fn now_ms(&self) -> u64 {
        (timer_us() / 1000) as u64
    }
}

#[inline]
pub(crate) fn timer_us() -> i64 {
    // Plain read of the system timer, callable from ISRs.
    unsafe { esp_idf_hal::sys::esp_timer_get_time() }
}

impl MicrosClock for Esp32Clock {
    #[inline]
    fn now_us(&self) -> u32 {
        timer_us() as u32
    }
}
