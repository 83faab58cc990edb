//! MQTT seam used by the reporting layer.
//!
//! [`Hlw8012`](crate::Hlw8012) has no idea a network exists. The
//! [`report`](crate::report) module turns a [`MeterState`](crate::MeterState)
//! into publications and reads commands back through [`MqttClient`], so the
//! same reporting code runs on `esp-idf-svc`, on `rumqttc` and against
//! [`MockMqtt`](crate::hal::MockMqtt).
//!
//! # Topics
//!
//! ```text
//! <prefix>/voltage       V, retained
//! <prefix>/current       A, retained
//! <prefix>/power         W, retained
//! <prefix>/energy        Wh, retained
//! <prefix>/state         JSON snapshot
//! <prefix>/energy/reset  inbound, clears the energy total
//! ```

extern crate alloc;
use alloc::string::String;
use alloc::vec::Vec;

/// Blocking MQTT client.
///
/// Publishing blocks on the ESP32 and is queued on desktop. Receiving is
/// always a non-blocking poll so it fits inside the meter's update loop.
/// Reconnecting is the implementation's job.
///
/// ```rust,ignore
/// fn report_power<M: MqttClient>(client: &mut M, watts: f32) -> Result<(), M::Error> {
///     let text = format!("{:.1}", watts);
///     client.publish("energy/power", text.as_bytes(), true)
/// }
/// ```
pub trait MqttClient {
    /// Transport error.
    type Error;

    /// Send `payload` to `topic`. Retained messages are replayed by the
    /// broker to late subscribers.
    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Self::Error>;

    /// Register interest in `topic`.
    fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error>;

    /// Next inbound message, or `None` when the queue is empty.
    fn try_recv(&mut self) -> Option<MqttMessage>;

    /// Whether the broker session is up.
    fn is_connected(&self) -> bool;
}

/// Inbound message on a subscribed topic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MqttMessage {
    /// Full topic, prefix included.
    pub topic: String,
    /// Raw payload.
    pub payload: Vec<u8>,
}

impl MqttMessage {
    /// Build a message from anything string- and byte-like.
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Payload as text, `None` unless it is UTF-8.
    pub fn payload_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.payload).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_as_text() {
        let msg = MqttMessage::new("energy/energy/reset", b"1".to_vec());
        assert_eq!(msg.topic, "energy/energy/reset");
        assert_eq!(msg.payload_str(), Some("1"));
    }

    #[test]
    fn binary_payload_is_not_text() {
        let msg = MqttMessage::new("energy/energy/reset", vec![0xc3, 0x28]);
        assert_eq!(msg.payload_str(), None);
    }
}
