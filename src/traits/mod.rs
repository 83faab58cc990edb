//! Trait definitions for hardware abstraction, sensor publication and networking.
//!
//! This module defines the seams that let the meter driver:
//! - Run on different hardware (ESP32, desktop mock)
//! - Publish readings to whatever the host uses as a sensor registry
//! - Report readings over different MQTT implementations
//!
//! # Submodules
//!
//! - `hardware`: Microsecond clock and SEL output pin
//! - `sensor`: Per-quantity publication channel
//! - `network`: MQTT client trait
//!
//! # Hardware Abstraction
//!
//! - [`MicrosClock`]: `micros()` equivalent, wraps at 2³²
//! - [`SelectPin`]: SEL output, high while CF1 reports current
//! - [`Sensor`]: publication sink with a readable last state

pub mod hardware;
pub mod network;
pub mod sensor;

pub use hardware::*;
pub use network::*;
pub use sensor::*;
