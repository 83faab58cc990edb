//! Sensor publication channel.
//!
//! Each measured quantity is handed to a [`Sensor`]. The driver reads the
//! last published value back through [`Sensor::state`] to decide whether a
//! fade-down is still worth publishing, so implementations must remember
//! what they were given.

/// Publication sink for one measured quantity.
///
/// # Implementation Notes
///
/// - `state()` must return `f32::NAN` until the first `publish_state` call
/// - `publish_state` is called from the update task, never from an ISR
pub trait Sensor {
    /// Publish a new value.
    fn publish_state(&mut self, value: f32);

    /// Last published value, or NaN if nothing was published yet.
    fn state(&self) -> f32;

    /// Returns true once at least one value has been published.
    fn has_state(&self) -> bool {
        !self.state().is_nan()
    }
}

/// Minimal [`Sensor`] that only keeps the latest value.
///
/// Used by firmware that polls the driver for readings instead of pushing
/// them somewhere on every publication.
///
/// # Example
///
/// ```rust
/// use rs_hlw8012::traits::{LatestValue, Sensor};
///
/// let mut sensor = LatestValue::new();
/// assert!(!sensor.has_state());
///
/// sensor.publish_state(230.4);
/// assert_eq!(sensor.state(), 230.4);
/// assert_eq!(sensor.publish_count(), 1);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct LatestValue {
    value: f32,
    count: u32,
}

impl LatestValue {
    /// Creates an empty sensor (state is NaN).
    pub const fn new() -> Self {
        Self {
            value: f32::NAN,
            count: 0,
        }
    }

    /// Number of publications so far.
    #[inline]
    pub fn publish_count(&self) -> u32 {
        self.count
    }
}

impl Default for LatestValue {
    fn default() -> Self {
        Self::new()
    }
}

impl Sensor for LatestValue {
    fn publish_state(&mut self, value: f32) {
        self.value = value;
        self.count = self.count.wrapping_add(1);
    }

    fn state(&self) -> f32 {
        self.value
    }
}
