//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for all hardware, sensor and network
//! traits, enabling development and testing on desktop without a chip.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockClock`] | [`MicrosClock`] | Controllable µs time source |
//! | [`MockSelectPin`] | [`SelectPin`] | Records SEL writes |
//! | [`MockSensor`] | [`Sensor`] | Records every publication |
//! | [`MockMqtt`] | [`MqttClient`] | Captures pub/sub operations |
//!
//! # Example
//!
//! ```rust
//! use rs_hlw8012::hal::{MockClock, MockSelectPin, MockSensor};
//! use rs_hlw8012::{Hlw8012, MeterConfig, PulseCapture};
//!
//! let cf = PulseCapture::new();
//! let cf1 = PulseCapture::new();
//! let clock = MockClock::new();
//!
//! let mut meter = Hlw8012::new(MeterConfig::default(), MockSelectPin::new(), &clock, &cf, &cf1)
//!     .unwrap()
//!     .with_power_sensor(MockSensor::new());
//!
//! // The first two ticks are warm-up
//! meter.update().unwrap();
//! meter.update().unwrap();
//! assert!(meter.power_sensor().unwrap().history.is_empty());
//! ```
//!
//! [`MicrosClock`]: crate::traits::MicrosClock
//! [`SelectPin`]: crate::traits::SelectPin
//! [`Sensor`]: crate::traits::Sensor
//! [`MqttClient`]: crate::traits::MqttClient

use core::cell::Cell;

use crate::traits::{MicrosClock, MqttClient, MqttMessage, SelectPin, Sensor};

extern crate alloc;
use alloc::string::String;
use alloc::vec::Vec;

// ============================================================================
// Hardware Mocks
// ============================================================================

/// Mock microsecond clock.
///
/// Interior mutability lets a test advance time while the meter holds a
/// shared reference to the clock.
///
/// # Example
///
/// ```rust
/// use rs_hlw8012::hal::MockClock;
/// use rs_hlw8012::traits::MicrosClock;
///
/// let clock = MockClock::new();
/// assert_eq!(clock.now_us(), 0);
///
/// clock.set(1_000);
/// clock.advance(500);
/// assert_eq!(clock.now_us(), 1_500);
///
/// // The counter wraps like a hardware timer
/// clock.set(u32::MAX);
/// clock.advance(2);
/// assert_eq!(clock.now_us(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockClock {
    current_us: Cell<u32>,
}

impl MockClock {
    /// Creates a new mock clock starting at 0 µs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock clock starting at the given time.
    pub fn starting_at(us: u32) -> Self {
        Self {
            current_us: Cell::new(us),
        }
    }

    /// Sets the current time in microseconds.
    pub fn set(&self, us: u32) {
        self.current_us.set(us);
    }

    /// Advances the clock, wrapping at 2³².
    pub fn advance(&self, us: u32) {
        self.current_us.set(self.current_us.get().wrapping_add(us));
    }

    /// Advances the clock by whole milliseconds.
    pub fn advance_ms(&self, ms: u32) {
        self.advance(ms.wrapping_mul(1000));
    }
}

impl MicrosClock for MockClock {
    fn now_us(&self) -> u32 {
        self.current_us.get()
    }
}

/// Mock SEL pin.
///
/// Records every level written so tests can check polarity and the number
/// of channel flips.
#[derive(Debug, Default)]
pub struct MockSelectPin {
    /// Current level, `None` until the first write.
    pub level: Option<bool>,
    /// Every level written, in order.
    pub writes: Vec<bool>,
    /// When set, writes fail and leave the level unchanged.
    pub fail: bool,
}

impl MockSelectPin {
    /// Creates a new mock pin that has never been written.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock pin whose writes always fail.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl SelectPin for MockSelectPin {
    type Error = ();

    fn set_level(&mut self, high: bool) -> Result<(), ()> {
        if self.fail {
            return Err(());
        }
        self.level = Some(high);
        self.writes.push(high);
        Ok(())
    }
}

/// Mock sensor recording every published value.
///
/// # Example
///
/// ```rust
/// use rs_hlw8012::hal::MockSensor;
/// use rs_hlw8012::traits::Sensor;
///
/// let mut sensor = MockSensor::new();
/// assert!(sensor.state().is_nan());
///
/// sensor.publish_state(12.0);
/// sensor.publish_state(0.0);
/// assert_eq!(sensor.history, vec![12.0, 0.0]);
/// assert_eq!(sensor.last(), Some(0.0));
/// ```
#[derive(Debug, Default)]
pub struct MockSensor {
    /// Every published value, in order.
    pub history: Vec<f32>,
}

impl MockSensor {
    /// Creates a sensor with no publications.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last published value.
    pub fn last(&self) -> Option<f32> {
        self.history.last().copied()
    }

    /// Number of publications.
    pub fn count(&self) -> usize {
        self.history.len()
    }
}

impl Sensor for MockSensor {
    fn publish_state(&mut self, value: f32) {
        self.history.push(value);
    }

    fn state(&self) -> f32 {
        self.last().unwrap_or(f32::NAN)
    }
}

// ============================================================================
// Network Mocks
// ============================================================================

/// Mock MQTT client for testing.
///
/// Records all publish/subscribe operations and allows injecting
/// incoming messages for testing message handling.
///
/// # Example
///
/// ```rust
/// use rs_hlw8012::hal::MockMqtt;
/// use rs_hlw8012::traits::MqttClient;
///
/// let mut mqtt = MockMqtt::new();
/// mqtt.publish("energy/power", b"42.0", true).unwrap();
/// assert_eq!(mqtt.published_to("energy/power").len(), 1);
/// assert_eq!(mqtt.payload_str("energy/power"), Some("42.0"));
/// ```
#[derive(Debug, Default)]
pub struct MockMqtt {
    /// Messages that have been published (topic, payload, retain).
    pub published: Vec<(String, Vec<u8>, bool)>,
    /// Topics that have been subscribed to.
    pub subscriptions: Vec<String>,
    /// Queue of incoming messages to be returned by `try_recv()`.
    pub incoming: Vec<MqttMessage>,
    /// Whether the client is connected.
    pub connected: bool,
}

impl MockMqtt {
    /// Creates a new mock MQTT client in connected state.
    pub fn new() -> Self {
        Self {
            connected: true,
            ..Default::default()
        }
    }

    /// Queue an incoming message
    pub fn queue_message(&mut self, topic: impl Into<String>, payload: impl Into<Vec<u8>>) {
        self.incoming.push(MqttMessage::new(topic, payload));
    }

    /// Check if a topic was subscribed to
    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.subscriptions.iter().any(|t| t == topic)
    }

    /// Get published messages for a topic
    pub fn published_to(&self, topic: &str) -> Vec<&(String, Vec<u8>, bool)> {
        self.published
            .iter()
            .filter(|(t, _, _)| t == topic)
            .collect()
    }

    /// Payload of the most recent publication to `topic`, as UTF-8.
    pub fn payload_str(&self, topic: &str) -> Option<&str> {
        self.published
            .iter()
            .rev()
            .find(|(t, _, _)| t == topic)
            .and_then(|(_, p, _)| core::str::from_utf8(p).ok())
    }
}

impl MqttClient for MockMqtt {
    type Error = ();

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), ()> {
        if !self.connected {
            return Err(());
        }
        self.published.push((topic.into(), payload.to_vec(), retain));
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), ()> {
        self.subscriptions.push(topic.into());
        Ok(())
    }

    fn try_recv(&mut self) -> Option<MqttMessage> {
        if self.incoming.is_empty() {
            None
        } else {
            Some(self.incoming.remove(0))
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_clock_starting_at() {
        let clock = MockClock::starting_at(42);
        assert_eq!(clock.now_us(), 42);
        clock.advance_ms(3);
        assert_eq!(clock.now_us(), 3_042);
    }

    #[test]
    fn mock_pin_records_writes() {
        let mut pin = MockSelectPin::new();
        assert_eq!(pin.level, None);
        pin.set_level(false).unwrap();
        pin.set_level(true).unwrap();
        assert_eq!(pin.level, Some(true));
        assert_eq!(pin.writes, vec![false, true]);
    }

    #[test]
    fn mock_pin_failing() {
        let mut pin = MockSelectPin::failing();
        assert_eq!(pin.set_level(true), Err(()));
        assert!(pin.writes.is_empty());
    }

    #[test]
    fn mock_sensor_state_tracks_last() {
        let mut sensor = MockSensor::new();
        assert_eq!(sensor.count(), 0);
        sensor.publish_state(3.0);
        assert_eq!(sensor.state(), 3.0);
        assert!(sensor.has_state());
    }

    #[test]
    fn mock_mqtt_queue_and_recv() {
        let mut mqtt = MockMqtt::new();
        mqtt.queue_message("energy/cmd", b"reset".to_vec());
        let msg = mqtt.try_recv().unwrap();
        assert_eq!(msg.payload_str(), Some("reset"));
        assert!(mqtt.try_recv().is_none());
    }

    #[test]
    fn mock_mqtt_subscribe() {
        let mut mqtt = MockMqtt::new();
        mqtt.subscribe("energy/#").unwrap();
        assert!(mqtt.is_subscribed("energy/#"));
        assert!(!mqtt.is_subscribed("other/#"));
    }

    #[test]
    fn mock_mqtt_disconnected_publish_fails() {
        let mut mqtt = MockMqtt::new();
        mqtt.connected = false;
        assert!(mqtt.publish("energy/power", b"1", false).is_err());
        assert!(mqtt.published.is_empty());
    }
}
