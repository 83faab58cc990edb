//! [`MqttClient`] over the `esp-idf-svc` MQTT client.
//!
//! ```ignore
//! let mqtt = Esp32Mqtt::new(&config.mqtt)?;
//! let mut reporter = Reporter::new(mqtt, config.mqtt.clone());
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use esp_idf_svc::mqtt::client::{
    EspMqttClient, EspMqttConnection, EventPayload, MqttClientConfiguration, QoS,
};
use esp_idf_svc::sys::EspError;

use crate::config::MqttConfig;
use crate::traits::{MqttClient, MqttMessage};

const EVENT_STACK: usize = 6 * 1024;

/// Broker session plus a background thread draining connection events.
pub struct Esp32Mqtt {
    client: EspMqttClient<'static>,
    inbox: Receiver<MqttMessage>,
    online: Arc<AtomicBool>,
}

impl Esp32Mqtt {
    /// Start the session. Connecting happens in the background;
    /// [`is_connected`](MqttClient::is_connected) turns true on CONNACK.
    pub fn new(config: &MqttConfig) -> anyhow::Result<Self> {
        let url = format!("mqtt://{}:{}", config.host, config.port);
        let auth = config.has_auth();
        let conf = MqttClientConfiguration {
            client_id: Some(config.client_id.as_str()),
            keep_alive_interval: Some(Duration::from_secs(config.keep_alive_secs.into())),
            username: auth.then_some(config.username.as_str()),
            password: auth.then_some(config.password.as_str()),
            ..Default::default()
        };
        let (client, connection) = EspMqttClient::new(&url, &conf)?;

        let (tx, inbox) = mpsc::channel();
        let online = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&online);
        thread::Builder::new()
            .name("mqtt-events".into())
            .stack_size(EVENT_STACK)
            .spawn(move || pump_events(connection, tx, flag))?;

        log::info!("MQTT session to {}", url);
        Ok(Self {
            client,
            inbox,
            online,
        })
    }
}

/// Failed publish or subscribe.
#[derive(Debug)]
pub struct Esp32MqttError(pub EspError);

impl fmt::Display for Esp32MqttError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MQTT request failed: {}", self.0)
    }
}

impl std::error::Error for Esp32MqttError {}

impl MqttClient for Esp32Mqtt {
    type Error = Esp32MqttError;

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Self::Error> {
        // Retained readings must reach the broker; the JSON snapshot may drop.
        let qos = if retain {
            QoS::AtLeastOnce
        } else {
            QoS::AtMostOnce
        };
        self.client
            .enqueue(topic, qos, retain, payload)
            .map(drop)
            .map_err(Esp32MqttError)
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error> {
        self.client
            .subscribe(topic, QoS::AtLeastOnce)
            .map(drop)
            .map_err(Esp32MqttError)
    }

    fn try_recv(&mut self) -> Option<MqttMessage> {
        self.inbox.try_recv().ok()
    }

    fn is_connected(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }
}

fn pump_events(mut connection: EspMqttConnection, tx: Sender<MqttMessage>, online: Arc<AtomicBool>) {
    loop {
        let event = match connection.next() {
            Ok(event) => event,
            Err(e) => {
                // The connection is gone for good once `next` errors.
                log::warn!("MQTT event loop ended: {:?}", e);
                online.store(false, Ordering::Relaxed);
                return;
            }
        };
        match event.payload() {
            EventPayload::Connected(_) => {
                log::info!("MQTT connected");
                online.store(true, Ordering::Relaxed);
            }
            EventPayload::Disconnected => {
                log::warn!("MQTT disconnected");
                online.store(false, Ordering::Relaxed);
            }
            EventPayload::Received {
                topic: Some(topic),
                data,
                ..
            } => {
                if tx.send(MqttMessage::new(topic, data)).is_err() {
                    return;
                }
            }
            _ => {}
        }
    }
}
