//! Host-side services running beside the meter update loop.
//!
//! - `shared`: latest [`MeterState`](crate::MeterState) behind a mutex (`std`)
//! - `mqtt`: `rumqttc` heartbeat publisher (`mqtt` feature)
//!
//! The update loop stores a snapshot after every tick; services only read
//! snapshots and never hold the driver.

pub mod shared;

#[cfg(feature = "mqtt")]
pub mod mqtt;

pub use shared::*;

#[cfg(feature = "mqtt")]
pub use mqtt::*;
