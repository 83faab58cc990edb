//! Meter calibration plus the optional WiFi and MQTT settings.
//!
//! Only [`MeterConfig`] matters to the driver; the rest is read by the
//! firmware binary and the reporting layer. Strings are `heapless`, so the
//! whole tree works without an allocator.
//!
//! # Example
//!
//! ```rust
//! use rs_hlw8012::config::{Config, MeterConfig, MqttConfig};
//! use rs_hlw8012::SensorModel;
//!
//! // Use defaults
//! let config = Config::default();
//! assert!(config.meter.validate().is_ok());
//!
//! // Or customize
//! let config = Config::default()
//!     .with_meter(
//!         MeterConfig::default()
//!             .with_model(SensorModel::Bl0937)
//!             .with_update_interval_ms(10_000),
//!     )
//!     .with_mqtt(MqttConfig::default().with_host("192.168.1.100"));
//! assert_eq!(config.meter.update_interval_ms, 10_000);
//! ```

use core::fmt;

use heapless::String as HString;

use crate::calibration::{Multipliers, SensorModel};
use crate::scheduler::Cf1Mode;

/// Maximum length for short config strings (hostnames, client IDs)
pub const MAX_SHORT_STRING: usize = 64;

/// Maximum length for longer config strings (topic prefixes, paths)
pub const MAX_LONG_STRING: usize = 128;

/// Type alias for short config strings
pub type ShortString = HString<MAX_SHORT_STRING>;

/// Type alias for longer config strings
pub type LongString = HString<MAX_LONG_STRING>;

// ============================================================================
// Helper for creating heapless strings
// ============================================================================

fn truncated<const N: usize>(s: &str) -> HString<N> {
    let mut end = s.len().min(N);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    let mut hs = HString::new();
    // Cannot fail: `end <= N`.
    let _ = hs.push_str(&s[..end]);
    hs
}

/// Create a ShortString from a &str, truncating at a char boundary if too long
pub fn short_string(s: &str) -> ShortString {
    truncated(s)
}

/// Create a LongString from a &str, truncating at a char boundary if too long
pub fn long_string(s: &str) -> LongString {
    truncated(s)
}

// ============================================================================
// Main Config
// ============================================================================

/// Complete application configuration
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Meter calibration and scheduling
    pub meter: MeterConfig,
    /// WiFi connection configuration
    pub wifi: WifiConfig,
    /// MQTT reporting configuration
    pub mqtt: MqttConfig,
}

impl Config {
    /// Set meter configuration
    pub fn with_meter(mut self, meter: MeterConfig) -> Self {
        self.meter = meter;
        self
    }

    /// Set WiFi configuration
    pub fn with_wifi(mut self, wifi: WifiConfig) -> Self {
        self.wifi = wifi;
        self
    }

    /// Set MQTT configuration
    pub fn with_mqtt(mut self, mqtt: MqttConfig) -> Self {
        self.mqtt = mqtt;
        self
    }
}

// ============================================================================
// Meter Config
// ============================================================================

/// Why a [`MeterConfig`] was rejected.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ConfigError {
    /// Shunt resistor must be finite and greater than zero (ohms).
    CurrentResistor(f32),
    /// Voltage divider must be finite and greater than zero.
    VoltageDivider(f32),
    /// At least one update tick per channel is required.
    ChangeModeEvery,
    /// Update interval must be at least 1 ms.
    UpdateInterval,
    /// Resistor and divider combine into an infinite or zero multiplier.
    Multipliers,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::CurrentResistor(v) => {
                write!(f, "current resistor must be a positive number of ohms, got {}", v)
            }
            ConfigError::VoltageDivider(v) => {
                write!(f, "voltage divider must be a positive ratio, got {}", v)
            }
            ConfigError::ChangeModeEvery => f.write_str("change_mode_every must be at least 1"),
            ConfigError::UpdateInterval => f.write_str("update interval must be at least 1 ms"),
            ConfigError::Multipliers => {
                f.write_str("calibration gives non-finite or zero multipliers")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

/// Meter calibration and scheduling parameters.
///
/// Immutable once handed to [`Hlw8012::new`](crate::Hlw8012::new).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeterConfig {
    /// Chip variant
    pub model: SensorModel,
    /// Shunt resistor on the current-sense leg, in ohms
    pub current_resistor: f32,
    /// Ratio of the voltage-sense divider
    pub voltage_divider: f32,
    /// Update ticks spent on each CF1 channel before flipping
    pub change_mode_every: u32,
    /// Milliseconds between update ticks
    pub update_interval_ms: u32,
    /// CF1 channel selected at setup
    pub initial_mode: Cf1Mode,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            model: SensorModel::Hlw8012,
            current_resistor: 0.001,
            voltage_divider: 2351.0,
            change_mode_every: 8,
            update_interval_ms: 60_000,
            initial_mode: Cf1Mode::Voltage,
        }
    }
}

impl MeterConfig {
    /// Set the chip variant
    pub fn with_model(mut self, model: SensorModel) -> Self {
        self.model = model;
        self
    }

    /// Set the shunt resistor (ohms)
    pub fn with_current_resistor(mut self, ohms: f32) -> Self {
        self.current_resistor = ohms;
        self
    }

    /// Set the voltage divider ratio
    pub fn with_voltage_divider(mut self, ratio: f32) -> Self {
        self.voltage_divider = ratio;
        self
    }

    /// Set the ticks per CF1 channel
    pub fn with_change_mode_every(mut self, ticks: u32) -> Self {
        self.change_mode_every = ticks;
        self
    }

    /// Set the update interval
    pub fn with_update_interval_ms(mut self, ms: u32) -> Self {
        self.update_interval_ms = ms;
        self
    }

    /// Set the CF1 channel used at setup
    pub fn with_initial_mode(mut self, mode: Cf1Mode) -> Self {
        self.initial_mode = mode;
        self
    }

    /// Check that the parameters yield positive multipliers and a usable schedule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.current_resistor.is_finite() && self.current_resistor > 0.0) {
            return Err(ConfigError::CurrentResistor(self.current_resistor));
        }
        if !(self.voltage_divider.is_finite() && self.voltage_divider > 0.0) {
            return Err(ConfigError::VoltageDivider(self.voltage_divider));
        }
        if !self.multipliers().is_positive() {
            return Err(ConfigError::Multipliers);
        }
        if self.change_mode_every == 0 {
            return Err(ConfigError::ChangeModeEvery);
        }
        if self.update_interval_ms == 0 {
            return Err(ConfigError::UpdateInterval);
        }
        Ok(())
    }

    /// Multipliers for this calibration.
    ///
    /// Depend only on `model`, `current_resistor` and `voltage_divider`.
    pub fn multipliers(&self) -> Multipliers {
        Multipliers::for_model(self.model, self.current_resistor, self.voltage_divider)
    }

    /// Update interval in microseconds, saturating at `u32::MAX`.
    pub fn update_interval_us(&self) -> u32 {
        self.update_interval_ms.saturating_mul(1000)
    }
}

// ============================================================================
// MQTT Config
// ============================================================================

/// MQTT client configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MqttConfig {
    /// Broker hostname or IP
    pub host: ShortString,
    /// Broker port
    pub port: u16,
    /// Client ID (should be unique per device)
    pub client_id: ShortString,
    /// Topic prefix for all publications (e.g., "energy" -> "energy/power")
    pub topic_prefix: ShortString,
    /// Username for authentication (empty = no auth)
    pub username: ShortString,
    /// Password for authentication
    pub password: ShortString,
    /// Readings publish interval in milliseconds
    pub heartbeat_ms: u32,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u16,
    /// Whether MQTT is enabled
    pub enabled: bool,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: short_string("localhost"),
            port: 1883,
            client_id: short_string("rs-hlw8012"),
            topic_prefix: short_string("energy"),
            username: ShortString::new(),
            password: ShortString::new(),
            heartbeat_ms: 60_000,
            keep_alive_secs: 30,
            enabled: true,
        }
    }
}

impl MqttConfig {
    /// Set the broker host
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = short_string(host);
        self
    }

    /// Set the broker port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the client ID
    pub fn with_client_id(mut self, id: &str) -> Self {
        self.client_id = short_string(id);
        self
    }

    /// Set the topic prefix
    pub fn with_topic_prefix(mut self, prefix: &str) -> Self {
        self.topic_prefix = short_string(prefix);
        self
    }

    /// Set authentication credentials
    pub fn with_auth(mut self, username: &str, password: &str) -> Self {
        self.username = short_string(username);
        self.password = short_string(password);
        self
    }

    /// Set the heartbeat interval
    pub fn with_heartbeat_ms(mut self, ms: u32) -> Self {
        self.heartbeat_ms = ms;
        self
    }

    /// Enable or disable MQTT
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Build a topic string with the configured prefix
    pub fn topic(&self, suffix: &str) -> LongString {
        let mut topic = LongString::new();
        let _ = topic.push_str(self.topic_prefix.as_str());
        let _ = topic.push('/');
        let _ = topic.push_str(suffix);
        topic
    }

    /// Check if authentication is configured
    pub fn has_auth(&self) -> bool {
        !self.username.is_empty()
    }
}

// ============================================================================
// WiFi Config
// ============================================================================

/// WiFi connection configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WifiConfig {
    /// WiFi network SSID
    pub ssid: ShortString,
    /// WiFi password
    pub password: ShortString,
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u32,
    /// Whether WiFi is enabled
    pub enabled: bool,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            ssid: ShortString::new(),
            password: ShortString::new(),
            connect_timeout_ms: 30_000,
            enabled: true,
        }
    }
}

impl WifiConfig {
    /// Set the SSID
    pub fn with_ssid(mut self, ssid: &str) -> Self {
        self.ssid = short_string(ssid);
        self
    }

    /// Set the password
    pub fn with_password(mut self, password: &str) -> Self {
        self.password = short_string(password);
        self
    }

    /// Set the connection timeout
    pub fn with_connect_timeout_ms(mut self, ms: u32) -> Self {
        self.connect_timeout_ms = ms;
        self
    }

    /// Enable or disable WiFi
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Enabled and an SSID is set.
    pub fn is_configured(&self) -> bool {
        self.enabled && !self.ssid.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.meter.model, SensorModel::Hlw8012);
        assert_eq!(config.meter.change_mode_every, 8);
    }

    // =========================================================================
    // MeterConfig Tests
    // =========================================================================

    #[test]
    fn meter_config_default() {
        let meter = MeterConfig::default();
        assert_eq!(meter.current_resistor, 0.001);
        assert_eq!(meter.voltage_divider, 2351.0);
        assert_eq!(meter.update_interval_ms, 60_000);
        assert_eq!(meter.initial_mode, Cf1Mode::Voltage);
        assert!(meter.validate().is_ok());
    }

    #[test]
    fn meter_config_builder() {
        let meter = MeterConfig::default()
            .with_model(SensorModel::Cse7759)
            .with_current_resistor(0.002)
            .with_voltage_divider(1880.0)
            .with_change_mode_every(4)
            .with_update_interval_ms(1_000)
            .with_initial_mode(Cf1Mode::Current);

        assert_eq!(meter.model, SensorModel::Cse7759);
        assert_eq!(meter.current_resistor, 0.002);
        assert_eq!(meter.voltage_divider, 1880.0);
        assert_eq!(meter.change_mode_every, 4);
        assert_eq!(meter.update_interval_us(), 1_000_000);
        assert_eq!(meter.initial_mode, Cf1Mode::Current);
    }

    #[test]
    fn meter_config_rejects_bad_resistor() {
        let zero = MeterConfig::default().with_current_resistor(0.0);
        assert_eq!(zero.validate(), Err(ConfigError::CurrentResistor(0.0)));

        let nan = MeterConfig::default().with_current_resistor(f32::NAN);
        assert!(matches!(nan.validate(), Err(ConfigError::CurrentResistor(_))));
    }

    #[test]
    fn meter_config_rejects_overflowing_multipliers() {
        // Subnormal shunt: valid on its own, but current and power overflow.
        let tiny = MeterConfig::default().with_current_resistor(1e-40);
        assert!(!tiny.multipliers().is_positive());
        assert_eq!(tiny.validate(), Err(ConfigError::Multipliers));

        let huge = MeterConfig::default().with_voltage_divider(f32::MAX);
        assert_eq!(huge.validate(), Err(ConfigError::Multipliers));

        assert!(MeterConfig::default().multipliers().is_positive());
    }

    #[test]
    fn meter_config_rejects_bad_divider() {
        let negative = MeterConfig::default().with_voltage_divider(-1.0);
        assert_eq!(negative.validate(), Err(ConfigError::VoltageDivider(-1.0)));
    }

    #[test]
    fn meter_config_rejects_zero_schedule() {
        let every = MeterConfig::default().with_change_mode_every(0);
        assert_eq!(every.validate(), Err(ConfigError::ChangeModeEvery));

        let interval = MeterConfig::default().with_update_interval_ms(0);
        assert_eq!(interval.validate(), Err(ConfigError::UpdateInterval));
    }

    #[test]
    fn multipliers_ignore_schedule_settings() {
        let a = MeterConfig::default();
        let b = MeterConfig::default()
            .with_change_mode_every(3)
            .with_update_interval_ms(500)
            .with_initial_mode(Cf1Mode::Current);
        assert_eq!(a.multipliers(), b.multipliers());

        let c = MeterConfig::default().with_voltage_divider(1000.0);
        assert_ne!(a.multipliers(), c.multipliers());
    }

    #[test]
    fn update_interval_us_saturates() {
        let meter = MeterConfig::default().with_update_interval_ms(u32::MAX);
        assert_eq!(meter.update_interval_us(), u32::MAX);
    }

    #[test]
    fn config_error_display() {
        let text = format!("{}", ConfigError::ChangeModeEvery);
        assert_eq!(text, "change_mode_every must be at least 1");
        let text = format!("{}", ConfigError::CurrentResistor(0.0));
        assert!(text.contains("ohms"));
    }

    // =========================================================================
    // MqttConfig Tests
    // =========================================================================

    #[test]
    fn mqtt_topic_building() {
        let mqtt = MqttConfig::default().with_topic_prefix("home/plug1");
        let topic = mqtt.topic("power");
        assert_eq!(topic.as_str(), "home/plug1/power");
    }

    #[test]
    fn mqtt_auth_detection() {
        let no_auth = MqttConfig::default();
        assert!(!no_auth.has_auth());

        let with_auth = MqttConfig::default().with_auth("user", "pass");
        assert!(with_auth.has_auth());
    }

    #[test]
    fn mqtt_config_default() {
        let mqtt = MqttConfig::default();
        assert_eq!(mqtt.host.as_str(), "localhost");
        assert_eq!(mqtt.client_id.as_str(), "rs-hlw8012");
        assert_eq!(mqtt.topic_prefix.as_str(), "energy");
        assert_eq!(mqtt.heartbeat_ms, 60_000);
        assert_eq!(mqtt.keep_alive_secs, 30);
        assert!(mqtt.enabled);
    }

    #[test]
    fn mqtt_config_full_builder() {
        let mqtt = MqttConfig::default()
            .with_host("broker.example.com")
            .with_port(8883)
            .with_client_id("kitchen-plug")
            .with_topic_prefix("home/kitchen")
            .with_auth("user", "pass")
            .with_heartbeat_ms(10_000)
            .with_enabled(false);

        assert_eq!(mqtt.host.as_str(), "broker.example.com");
        assert_eq!(mqtt.port, 8883);
        assert_eq!(mqtt.client_id.as_str(), "kitchen-plug");
        assert_eq!(mqtt.topic_prefix.as_str(), "home/kitchen");
        assert_eq!(mqtt.password.as_str(), "pass");
        assert_eq!(mqtt.heartbeat_ms, 10_000);
        assert!(!mqtt.enabled);
    }

    // =========================================================================
    // WifiConfig Tests
    // =========================================================================

    #[test]
    fn wifi_config_is_configured() {
        assert!(!WifiConfig::default().is_configured());
        assert!(WifiConfig::default().with_ssid("MyNetwork").is_configured());
        assert!(!WifiConfig::default().with_ssid("").is_configured());
        assert!(!WifiConfig::default()
            .with_ssid("MyNetwork")
            .with_enabled(false)
            .is_configured());
    }

    #[test]
    fn wifi_config_builder() {
        let wifi = WifiConfig::default()
            .with_ssid("TestNetwork")
            .with_password("secret123")
            .with_connect_timeout_ms(15_000)
            .with_enabled(false);

        assert_eq!(wifi.ssid.as_str(), "TestNetwork");
        assert_eq!(wifi.password.as_str(), "secret123");
        assert_eq!(wifi.connect_timeout_ms, 15_000);
        assert!(!wifi.enabled);
    }

    // =========================================================================
    // String Helper Tests
    // =========================================================================

    #[test]
    fn short_string_truncation() {
        let long_input = "a".repeat(100);
        let s = short_string(&long_input);
        assert_eq!(s.len(), MAX_SHORT_STRING);
    }

    #[test]
    fn long_string_truncation() {
        let long_input = "b".repeat(200);
        let s = long_string(&long_input);
        assert_eq!(s.len(), MAX_LONG_STRING);
    }

    #[test]
    fn string_helpers_utf8_boundary() {
        // 3 ASCII bytes push every 4-byte char off the 64-byte boundary
        let input = format!("abc{}", "\u{26A1}\u{1F50C}".repeat(20));
        let s = short_string(&input);
        assert!(!s.is_empty());
        assert!(s.len() <= MAX_SHORT_STRING);
        assert!(input.starts_with(s.as_str()));
    }
}
