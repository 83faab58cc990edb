//! Desktop MQTT reporting with `rumqttc`.
//!
//! Publishes the latest [`SharedMeterState`] on every heartbeat:
//!
//! **Publish Topics:**
//! - `energy/voltage`, `energy/current`, `energy/power`, `energy/energy` (retained)
//! - `energy/state` - Full snapshot JSON
//!
//! The payloads are exactly what [`publish_readings`] produces on the ESP32.
//!
//! ```ignore
//! let shared = Arc::new(SharedMeterState::new());
//! let publisher = MqttPublisher::new(Arc::clone(&shared), config.mqtt.clone());
//! tokio::spawn(publisher.run());
//!
//! // update loop
//! meter.update()?;
//! shared.store(meter.state());
//! ```

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};

use crate::config::MqttConfig;
use crate::report::publish_readings;
use crate::traits::{MqttClient, MqttMessage};
use crate::MeterState;

use super::shared::SharedMeterState;

/// Delay before polling again after a connection error.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

// ============================================================================
// Outbox
// ============================================================================

/// One message ready to hand to the async client.
#[derive(Clone, Debug, PartialEq)]
pub struct OutgoingMessage {
    /// Full topic
    pub topic: String,
    /// Payload bytes
    pub payload: Vec<u8>,
    /// Retain flag
    pub retain: bool,
}

/// Collects what [`publish_readings`] would send so it can be published
/// asynchronously afterwards.
#[derive(Default)]
struct Outbox {
    messages: Vec<OutgoingMessage>,
}

impl MqttClient for Outbox {
    type Error = Infallible;

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Infallible> {
        self.messages.push(OutgoingMessage {
            topic: topic.to_string(),
            payload: payload.to_vec(),
            retain,
        });
        Ok(())
    }

    fn subscribe(&mut self, _topic: &str) -> Result<(), Infallible> {
        Ok(())
    }

    fn try_recv(&mut self) -> Option<MqttMessage> {
        None
    }

    fn is_connected(&self) -> bool {
        true
    }
}

/// Messages for one snapshot, in publish order.
pub fn outgoing(config: &MqttConfig, state: &MeterState) -> Vec<OutgoingMessage> {
    let mut outbox = Outbox::default();
    match publish_readings(&mut outbox, config, state) {
        Ok(_) => {}
        Err(never) => match never {},
    }
    outbox.messages
}

// ============================================================================
// Publisher
// ============================================================================

/// Heartbeat publisher bridging a [`SharedMeterState`] to an MQTT broker.
pub struct MqttPublisher {
    state: Arc<SharedMeterState>,
    config: MqttConfig,
}

impl MqttPublisher {
    /// Create a publisher for the given shared state.
    pub fn new(state: Arc<SharedMeterState>, config: MqttConfig) -> Self {
        Self { state, config }
    }

    /// Get a reference to the shared state.
    pub fn state(&self) -> Arc<SharedMeterState> {
        Arc::clone(&self.state)
    }

    /// Broker options derived from the config.
    pub fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(
            self.config.client_id.as_str(),
            self.config.host.as_str(),
            self.config.port,
        );
        options.set_keep_alive(Duration::from_secs(u64::from(self.config.keep_alive_secs)));
        if self.config.has_auth() {
            options.set_credentials(self.config.username.as_str(), self.config.password.as_str());
        }
        options
    }

    /// Run until the task is dropped.
    ///
    /// Connection errors are logged and retried; they never end the loop.
    pub async fn run(self) -> Result<(), MqttError> {
        if !self.config.enabled {
            return Err(MqttError::Disabled);
        }

        let (client, mut eventloop) = AsyncClient::new(self.options(), 10);
        log::info!(
            "MQTT publishing to {}:{} under '{}'",
            self.config.host,
            self.config.port,
            self.config.topic_prefix
        );

        let heartbeat = Duration::from_millis(u64::from(self.config.heartbeat_ms.max(1)));
        let state = Arc::clone(&self.state);
        let config = self.config.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(heartbeat);
            loop {
                interval.tick().await;
                for msg in outgoing(&config, &state.state()) {
                    if let Err(e) = client
                        .publish(msg.topic, QoS::AtLeastOnce, msg.retain, msg.payload)
                        .await
                    {
                        log::warn!("MQTT publish failed: {}", e);
                        break;
                    }
                }
            }
        });

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    log::info!("MQTT connected");
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!("MQTT error: {}", e);
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }
}

/// MQTT-related errors
#[derive(Debug, Clone, PartialEq)]
pub enum MqttError {
    /// MQTT is disabled in the configuration
    Disabled,
}

impl std::fmt::Display for MqttError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MqttError::Disabled => f.write_str("MQTT is disabled"),
        }
    }
}

impl std::error::Error for MqttError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cf1Mode;

    fn state() -> MeterState {
        MeterState {
            voltage: Some(231.0),
            current: Some(f32::NAN),
            power: Some(100.0),
            energy_wh: Some(1.5),
            mode: Cf1Mode::Voltage,
            warmed_up: true,
        }
    }

    #[test]
    fn outgoing_matches_report_topics() {
        let msgs = outgoing(&MqttConfig::default(), &state());
        let topics: Vec<&str> = msgs.iter().map(|m| m.topic.as_str()).collect();
        assert_eq!(
            topics,
            vec!["energy/voltage", "energy/power", "energy/energy", "energy/state"]
        );
        assert!(msgs[0].retain);
        assert!(!msgs[3].retain);
        assert_eq!(msgs[1].payload, b"100.0");
    }

    #[test]
    fn outgoing_empty_before_warm_up() {
        let cold = MeterState {
            warmed_up: false,
            ..state()
        };
        assert!(outgoing(&MqttConfig::default(), &cold).is_empty());
    }

    #[test]
    fn options_from_config() {
        let config = MqttConfig::default()
            .with_host("broker.local")
            .with_port(1884)
            .with_client_id("plug-a");
        let publisher = MqttPublisher::new(Arc::new(SharedMeterState::new()), config);
        let options = publisher.options();
        assert_eq!(options.broker_address(), ("broker.local".to_string(), 1884));
        assert_eq!(options.client_id(), "plug-a");
        assert_eq!(options.keep_alive(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn disabled_config_returns_immediately() {
        let config = MqttConfig::default().with_enabled(false);
        let publisher = MqttPublisher::new(Arc::new(SharedMeterState::new()), config);
        assert_eq!(publisher.run().await, Err(MqttError::Disabled));
    }
}
