//! # rs-hlw8012
//!
//! Driver for the HLW8012, CSE7759 and BL0937 single-phase energy-metering
//! chips. The chips report power on CF and either voltage or current on
//! CF1 as pulse trains whose frequency is proportional to the measurement.
//!
//! ## Features
//!
//! - **Pulse capture**: interrupt-safe rising-edge timestamps with wrap-safe periods
//! - **Calibration**: per-chip multipliers from shunt resistor and voltage divider
//! - **Channel multiplexing**: SEL scheduling that waits for a fresh channel to settle
//! - **Fade to zero**: readings decay when pulses stop, and drop to zero after 10 s
//! - **Energy**: watt-hours integrated from published power
//! - **Reporting**: MQTT publication for ESP32 (`esp-idf-svc`) and desktop (`rumqttc`)
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - Clock, SEL pin, sensor and MQTT abstractions
//! - `capture` - Edge store shared between ISR and update task
//! - `calibration` - Period to volts/amperes/watts
//! - `update` - Per-channel publish decision for one tick
//! - `scheduler` - SEL ownership and the mode-change counter
//! - `meter` - The driver that ties everything together
//! - `hal` - Concrete implementations (mock for testing, esp32 for hardware)
//!
//! ## Example
//!
//! ```rust
//! use rs_hlw8012::hal::{MockClock, MockSelectPin, MockSensor};
//! use rs_hlw8012::{Hlw8012, MeterConfig, PulseCapture};
//!
//! static CF: PulseCapture = PulseCapture::new();
//! static CF1: PulseCapture = PulseCapture::new();
//!
//! let clock = MockClock::starting_at(1);
//! let config = MeterConfig::default().with_update_interval_ms(1_000);
//! let mut meter = Hlw8012::new(config, MockSelectPin::new(), &clock, &CF, &CF1)
//!     .unwrap()
//!     .with_power_sensor(MockSensor::new());
//!
//! // In the update loop, once per interval:
//! meter.update().unwrap();
//! let state = meter.state();
//! assert!(!state.warmed_up);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

/// Period-to-quantity conversion and chip variants.
pub mod calibration;
/// Rising-edge capture shared with interrupt handlers.
pub mod capture;
/// Shared configuration system for desktop and ESP32.
pub mod config;
/// Energy accumulation from published power.
pub mod energy;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// The meter driver.
pub mod meter;
/// MQTT publication of readings.
pub mod report;
/// CF1 channel multiplexing.
pub mod scheduler;
/// Core traits for hardware, sensors and networking.
pub mod traits;
/// Per-channel publication decision.
pub mod update;

/// Host-side services (shared snapshot, desktop MQTT).
#[cfg(feature = "std")]
pub mod services;

// Re-exports for convenience
pub use calibration::{Multipliers, SensorModel};
pub use capture::{CaptureSnapshot, PulseCapture};
pub use energy::EnergyAccumulator;
pub use meter::{Hlw8012, MeterError, MeterState};
pub use scheduler::{Cf1Mode, ChannelScheduler};
pub use traits::{LatestValue, MicrosClock, MqttClient, MqttMessage, SelectPin, Sensor};
pub use update::{Channel, Decision};

// Config re-exports
pub use config::{Config, ConfigError, MeterConfig, MqttConfig, WifiConfig};

// Message re-exports
#[cfg(feature = "serde")]
pub use report::ReadingsMessage;
