//! ESP32-C3 hardware abstraction layer for an HLW8012-family smart plug.
//!
//! # Hardware Configuration
//!
//! - **MCU**: ESP32-C3 (RISC-V 160MHz)
//! - **Meter**: HLW8012, CSE7759 or BL0937 behind the mains-side optocouplers
//!
//! # Pin Assignments
//!
//! | GPIO | Signal | Direction |
//! |------|--------|-----------|
//! | 5 | SEL: low for voltage on CF1, high for current | out |
//! | 4 | CF: active power pulses | in |
//! | 3 | CF1: voltage or current pulses | in |
//!
//! CF and CF1 are open-collector on most boards, so the inputs enable the
//! internal pull-up.

mod clock;
mod pulse;
mod select;

pub use clock::Esp32Clock;
pub use pulse::Esp32PulseInput;
pub use select::Esp32SelectPin;

#[cfg(feature = "wifi")]
mod wifi;
#[cfg(feature = "wifi")]
pub use wifi::Esp32Wifi;

#[cfg(feature = "esp32-mqtt")]
mod mqtt;
#[cfg(feature = "esp32-mqtt")]
pub use mqtt::{Esp32Mqtt, Esp32MqttError};
