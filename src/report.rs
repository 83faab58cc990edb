//! Publishing readings over MQTT.
//!
//! Works with any [`MqttClient`], so the same code reports from the ESP32
//! and from desktop tests using [`MockMqtt`](crate::hal::MockMqtt).
//!
//! **Publish Topics:**
//! - `<prefix>/voltage` - Volts, one decimal (retained)
//! - `<prefix>/current` - Amperes, three decimals (retained)
//! - `<prefix>/power` - Watts, one decimal (retained)
//! - `<prefix>/energy` - Watt-hours, three decimals (retained)
//! - `<prefix>/state` - [`ReadingsMessage`] JSON (`serde-json-core` feature)
//!
//! **Subscribe Topics:**
//! - `<prefix>/energy/reset` - any payload clears the energy total ([`MeterCommand`])
//!
//! Quantities without a sensor, or without a finite value yet, are skipped.
//! Nothing is published before the meter has warmed up.
//!
//! # Example
//!
//! ```rust
//! use rs_hlw8012::hal::MockMqtt;
//! use rs_hlw8012::report::publish_readings;
//! use rs_hlw8012::{MeterState, MqttConfig};
//!
//! let state = MeterState {
//!     power: Some(42.0),
//!     warmed_up: true,
//!     ..MeterState::default()
//! };
//!
//! let mut mqtt = MockMqtt::new();
//! publish_readings(&mut mqtt, &MqttConfig::default(), &state).unwrap();
//! assert_eq!(mqtt.payload_str("energy/power"), Some("42.0"));
//! ```

use core::fmt::Write;

use heapless::String as HString;

use crate::config::MqttConfig;
use crate::meter::MeterState;
use crate::traits::{MqttClient, MqttMessage};

#[cfg(feature = "serde")]
use crate::scheduler::Cf1Mode;

/// Topic suffix for voltage.
pub const TOPIC_VOLTAGE: &str = "voltage";
/// Topic suffix for current.
pub const TOPIC_CURRENT: &str = "current";
/// Topic suffix for power.
pub const TOPIC_POWER: &str = "power";
/// Topic suffix for energy.
pub const TOPIC_ENERGY: &str = "energy";
/// Topic suffix for the JSON snapshot.
pub const TOPIC_STATE: &str = "state";
/// Inbound topic suffix that clears the energy total.
pub const TOPIC_RESET_ENERGY: &str = "energy/reset";

/// Buffer size for the JSON snapshot.
pub const STATE_JSON_CAPACITY: usize = 256;

// Enough for any finite f32 with three decimals.
type ValueString = HString<48>;

fn format_value(value: f32, decimals: usize) -> ValueString {
    let mut s = ValueString::new();
    let _ = write!(s, "{:.*}", decimals, value);
    s
}

fn finite(value: Option<f32>) -> Option<f32> {
    value.filter(|v| v.is_finite())
}

// ============================================================================
// State Message
// ============================================================================

/// JSON snapshot published on `<prefix>/state`.
///
/// Missing or not-yet-published quantities are `null`.
///
/// # JSON Example
///
/// ```json
/// {"voltage":230.1,"current":0.261,"power":58.2,"energy_wh":12.5,"mode":"current"}
/// ```
#[cfg(feature = "serde")]
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReadingsMessage {
    /// Volts
    pub voltage: Option<f32>,
    /// Amperes
    pub current: Option<f32>,
    /// Watts
    pub power: Option<f32>,
    /// Watt-hours
    pub energy_wh: Option<f32>,
    /// Active CF1 channel
    pub mode: Cf1Mode,
}

#[cfg(feature = "serde")]
impl ReadingsMessage {
    /// Build from a meter snapshot. NaN readings become `None`.
    pub fn from_state(state: &MeterState) -> Self {
        Self {
            voltage: finite(state.voltage),
            current: finite(state.current),
            power: finite(state.power),
            energy_wh: finite(state.energy_wh),
            mode: state.mode,
        }
    }
}

#[cfg(feature = "serde")]
impl From<&MeterState> for ReadingsMessage {
    fn from(state: &MeterState) -> Self {
        Self::from_state(state)
    }
}

#[cfg(feature = "serde-json-core")]
impl ReadingsMessage {
    /// Serialize into `buf`, returning the number of bytes written.
    ///
    /// Returns `None` if the buffer is too small.
    pub fn write_json(&self, buf: &mut [u8]) -> Option<usize> {
        serde_json_core::to_slice(self, buf).ok()
    }

    /// Parse a snapshot from JSON bytes.
    pub fn from_json(json: &[u8]) -> Option<Self> {
        serde_json_core::from_slice::<Self>(json)
            .ok()
            .map(|(msg, _)| msg)
    }
}

// ============================================================================
// Publishing
// ============================================================================

/// Publish one snapshot. Returns the number of messages sent.
///
/// Stops at the first publish error.
pub fn publish_readings<M: MqttClient>(
    client: &mut M,
    config: &MqttConfig,
    state: &MeterState,
) -> Result<usize, M::Error> {
    if !state.warmed_up {
        return Ok(0);
    }

    let values = [
        (TOPIC_VOLTAGE, state.voltage, 1),
        (TOPIC_CURRENT, state.current, 3),
        (TOPIC_POWER, state.power, 1),
        (TOPIC_ENERGY, state.energy_wh, 3),
    ];

    let mut sent = 0;
    for (suffix, value, decimals) in values {
        let Some(value) = finite(value) else {
            continue;
        };
        let payload = format_value(value, decimals);
        client.publish(config.topic(suffix).as_str(), payload.as_bytes(), true)?;
        sent += 1;
    }

    #[cfg(feature = "serde-json-core")]
    {
        let mut buf = [0u8; STATE_JSON_CAPACITY];
        match ReadingsMessage::from_state(state).write_json(&mut buf) {
            Some(len) => {
                client.publish(config.topic(TOPIC_STATE).as_str(), &buf[..len], false)?;
                sent += 1;
            }
            None => log::warn!("State JSON exceeds {} bytes", STATE_JSON_CAPACITY),
        }
    }

    Ok(sent)
}

// ============================================================================
// Commands
// ============================================================================

/// Remote request addressed to the meter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeterCommand {
    /// Clear the accumulated energy.
    ResetEnergy,
}

impl MeterCommand {
    /// Recognise a command among inbound messages for this prefix.
    pub fn from_message(config: &MqttConfig, msg: &MqttMessage) -> Option<Self> {
        if msg.topic.as_str() == config.topic(TOPIC_RESET_ENERGY).as_str() {
            Some(MeterCommand::ResetEnergy)
        } else {
            None
        }
    }
}

/// Heartbeat-driven publisher for polling main loops.
///
/// # Example
///
/// ```rust
/// use rs_hlw8012::hal::MockMqtt;
/// use rs_hlw8012::report::Reporter;
/// use rs_hlw8012::{MeterState, MqttConfig};
///
/// let config = MqttConfig::default().with_heartbeat_ms(1_000);
/// let mut reporter = Reporter::new(MockMqtt::new(), config);
/// let state = MeterState { power: Some(5.0), warmed_up: true, ..MeterState::default() };
///
/// assert!(reporter.poll(0, &state).unwrap());      // first call publishes
/// assert!(!reporter.poll(500, &state).unwrap());   // too early
/// assert!(reporter.poll(1_000, &state).unwrap());
/// ```
pub struct Reporter<C: MqttClient> {
    client: C,
    config: MqttConfig,
    last_publish_ms: Option<u64>,
}

impl<C: MqttClient> Reporter<C> {
    /// Wrap a connected client.
    pub fn new(client: C, config: MqttConfig) -> Self {
        Self {
            client,
            config,
            last_publish_ms: None,
        }
    }

    /// Publish `state` if a heartbeat is due. Returns whether it published.
    ///
    /// A disconnected client is skipped without error; the next due poll
    /// tries again.
    pub fn poll(&mut self, now_ms: u64, state: &MeterState) -> Result<bool, C::Error> {
        let due = match self.last_publish_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= u64::from(self.config.heartbeat_ms),
        };
        if !due || !self.client.is_connected() {
            return Ok(false);
        }
        publish_readings(&mut self.client, &self.config, state)?;
        self.last_publish_ms = Some(now_ms);
        Ok(true)
    }

    /// Publish immediately, regardless of the heartbeat.
    pub fn publish_now(&mut self, now_ms: u64, state: &MeterState) -> Result<usize, C::Error> {
        let sent = publish_readings(&mut self.client, &self.config, state)?;
        self.last_publish_ms = Some(now_ms);
        Ok(sent)
    }

    /// Subscribe to the command topics under the configured prefix.
    pub fn subscribe_commands(&mut self) -> Result<(), C::Error> {
        self.client
            .subscribe(self.config.topic(TOPIC_RESET_ENERGY).as_str())
    }

    /// Next recognised command. Unrelated messages are dropped.
    pub fn next_command(&mut self) -> Option<MeterCommand> {
        while let Some(msg) = self.client.try_recv() {
            match MeterCommand::from_message(&self.config, &msg) {
                Some(cmd) => return Some(cmd),
                None => log::debug!("Ignoring message on {}", msg.topic),
            }
        }
        None
    }

    /// Get a reference to the MQTT client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Get a mutable reference to the MQTT client.
    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockMqtt;
    use crate::scheduler::Cf1Mode;

    fn warmed(voltage: Option<f32>, current: Option<f32>, power: Option<f32>) -> MeterState {
        MeterState {
            voltage,
            current,
            power,
            energy_wh: None,
            mode: Cf1Mode::Voltage,
            warmed_up: true,
        }
    }

    #[test]
    fn nothing_before_warm_up() {
        let mut mqtt = MockMqtt::new();
        let state = MeterState {
            power: Some(10.0),
            ..MeterState::default()
        };
        assert_eq!(publish_readings(&mut mqtt, &MqttConfig::default(), &state), Ok(0));
        assert!(mqtt.published.is_empty());
    }

    #[test]
    fn scalar_topics_are_retained_and_formatted() {
        let mut mqtt = MockMqtt::new();
        let config = MqttConfig::default().with_topic_prefix("home/plug");
        let state = warmed(Some(230.04), Some(0.2614), Some(58.24));
        publish_readings(&mut mqtt, &config, &state).unwrap();

        assert_eq!(mqtt.payload_str("home/plug/voltage"), Some("230.0"));
        assert_eq!(mqtt.payload_str("home/plug/current"), Some("0.261"));
        assert_eq!(mqtt.payload_str("home/plug/power"), Some("58.2"));
        assert!(mqtt.published_to("home/plug/energy").is_empty());
        assert!(mqtt.published_to("home/plug/power")[0].2);
    }

    #[test]
    fn nan_and_missing_are_skipped() {
        let mut mqtt = MockMqtt::new();
        let state = warmed(Some(f32::NAN), None, Some(0.0));
        publish_readings(&mut mqtt, &MqttConfig::default(), &state).unwrap();

        assert!(mqtt.published_to("energy/voltage").is_empty());
        assert!(mqtt.published_to("energy/current").is_empty());
        assert_eq!(mqtt.payload_str("energy/power"), Some("0.0"));
    }

    #[test]
    fn publish_error_propagates() {
        let mut mqtt = MockMqtt::new();
        mqtt.connected = false;
        let state = warmed(Some(230.0), None, None);
        assert_eq!(publish_readings(&mut mqtt, &MqttConfig::default(), &state), Err(()));
    }

    #[test]
    fn reporter_skips_while_disconnected() {
        let mut mqtt = MockMqtt::new();
        mqtt.connected = false;
        let mut reporter = Reporter::new(mqtt, MqttConfig::default());
        let state = warmed(None, None, Some(1.0));

        assert_eq!(reporter.poll(0, &state), Ok(false));
        reporter.client_mut().connected = true;
        assert_eq!(reporter.poll(1, &state), Ok(true));
        assert_eq!(reporter.client().payload_str("energy/power"), Some("1.0"));
    }

    #[test]
    fn reporter_publish_now_resets_heartbeat() {
        let config = MqttConfig::default().with_heartbeat_ms(1_000);
        let mut reporter = Reporter::new(MockMqtt::new(), config);
        let state = warmed(None, None, Some(1.0));

        reporter.publish_now(5_000, &state).unwrap();
        assert_eq!(reporter.poll(5_500, &state), Ok(false));
        assert_eq!(reporter.poll(6_000, &state), Ok(true));
    }

    #[test]
    fn reset_command_under_prefix() {
        let config = MqttConfig::default().with_topic_prefix("home/plug");
        let mut reporter = Reporter::new(MockMqtt::new(), config);
        reporter.subscribe_commands().unwrap();
        assert!(reporter.client().is_subscribed("home/plug/energy/reset"));

        let mqtt = reporter.client_mut();
        mqtt.queue_message("home/plug/power", b"1".to_vec());
        mqtt.queue_message("other/energy/reset", b"".to_vec());
        mqtt.queue_message("home/plug/energy/reset", b"".to_vec());

        assert_eq!(reporter.next_command(), Some(MeterCommand::ResetEnergy));
        assert_eq!(reporter.next_command(), None);
        assert!(reporter.client().incoming.is_empty());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn readings_message_drops_nan() {
        let state = warmed(Some(f32::NAN), Some(0.5), None);
        let msg = ReadingsMessage::from(&state);
        assert_eq!(msg.voltage, None);
        assert_eq!(msg.current, Some(0.5));
        assert_eq!(msg.power, None);
    }

    #[cfg(feature = "serde-json-core")]
    #[test]
    fn state_json_is_published() {
        let mut mqtt = MockMqtt::new();
        let mut state = warmed(Some(230.0), None, Some(60.0));
        state.mode = Cf1Mode::Current;
        let sent = publish_readings(&mut mqtt, &MqttConfig::default(), &state).unwrap();
        assert_eq!(sent, 3);

        let json = mqtt.payload_str("energy/state").unwrap();
        assert!(json.contains("\"mode\":\"current\""));
        assert!(json.contains("\"current\":null"));

        let parsed = ReadingsMessage::from_json(json.as_bytes()).unwrap();
        assert_eq!(parsed.voltage, Some(230.0));
        assert_eq!(parsed.mode, Cf1Mode::Current);
    }

    #[cfg(feature = "serde-json-core")]
    #[test]
    fn write_json_reports_small_buffer() {
        let msg = ReadingsMessage::from_state(&warmed(Some(1.0), Some(1.0), Some(1.0)));
        let mut tiny = [0u8; 8];
        assert_eq!(msg.write_json(&mut tiny), None);
    }
}
