//! ESP32-C3 smart-plug firmware.
//!
//! Runs the meter update loop on the configured interval:
//! - CF and CF1 rising edges are captured by GPIO interrupts
//! - Each tick publishes power and the active CF1 quantity
//! - Readings are reported over MQTT (if enabled)
//!
//! # Build
//!
//! ```bash
//! # Meter only (readings in the log)
//! cargo build --release --bin esp32_main --features esp32
//!
//! # With WiFi + MQTT
//! cargo build --release --bin esp32_main --features esp32-mqtt
//! ```
//!
//! Calibration and credentials come from compile-time environment variables:
//! `METER_MODEL`, `METER_CURRENT_RESISTOR`, `METER_VOLTAGE_DIVIDER`,
//! `WIFI_SSID`, `WIFI_PASSWORD`, `MQTT_HOST`, `MQTT_PREFIX`.

use std::thread;
use std::time::{Duration, Instant};

use esp_idf_hal::gpio::PinDriver;
use esp_idf_hal::peripherals::Peripherals;
use rs_hlw8012::hal::esp32::{Esp32Clock, Esp32PulseInput, Esp32SelectPin};
use rs_hlw8012::{Config, Hlw8012, LatestValue, MeterConfig, PulseCapture, SensorModel};

static CF: PulseCapture = PulseCapture::new();
static CF1: PulseCapture = PulseCapture::new();

fn env_f32(value: Option<&str>, default: f32) -> f32 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn main() -> anyhow::Result<()> {
    esp_idf_hal::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    // =========================================================================
    // Configuration
    // =========================================================================
    let defaults = MeterConfig::default();
    let meter_config = MeterConfig::default()
        .with_model(
            option_env!("METER_MODEL")
                .and_then(SensorModel::from_text)
                .unwrap_or_default(),
        )
        .with_current_resistor(env_f32(
            option_env!("METER_CURRENT_RESISTOR"),
            defaults.current_resistor,
        ))
        .with_voltage_divider(env_f32(
            option_env!("METER_VOLTAGE_DIVIDER"),
            defaults.voltage_divider,
        ));

    let config = Config::default()
        .with_meter(meter_config)
        .with_wifi(
            rs_hlw8012::WifiConfig::default()
                .with_ssid(option_env!("WIFI_SSID").unwrap_or(""))
                .with_password(option_env!("WIFI_PASSWORD").unwrap_or("")),
        )
        .with_mqtt(
            rs_hlw8012::MqttConfig::default()
                .with_host(option_env!("MQTT_HOST").unwrap_or("localhost"))
                .with_topic_prefix(option_env!("MQTT_PREFIX").unwrap_or("energy")),
        );

    let peripherals = Peripherals::take()?;

    // =========================================================================
    // Meter (SEL on GPIO5, CF on GPIO4, CF1 on GPIO3)
    // =========================================================================
    let sel = Esp32SelectPin::new(PinDriver::output(peripherals.pins.gpio5)?);
    let _cf = Esp32PulseInput::new(peripherals.pins.gpio4, &CF)?;
    let _cf1 = Esp32PulseInput::new(peripherals.pins.gpio3, &CF1)?;

    let clock = Esp32Clock::new();
    let mut meter = Hlw8012::new(config.meter.clone(), sel, clock, &CF, &CF1)?
        .with_voltage_sensor(LatestValue::new())
        .with_current_sensor(LatestValue::new())
        .with_power_sensor(LatestValue::new())
        .with_energy_sensor(LatestValue::new());
    meter.dump_config();

    // =========================================================================
    // WiFi (required for MQTT)
    // =========================================================================
    #[cfg(feature = "wifi")]
    let mut wifi = {
        use esp_idf_svc::eventloop::EspSystemEventLoop;
        use esp_idf_svc::nvs::EspDefaultNvsPartition;
        use rs_hlw8012::hal::esp32::Esp32Wifi;

        if config.wifi.is_configured() {
            let sysloop = EspSystemEventLoop::take()?;
            let nvs = EspDefaultNvsPartition::take()?;
            Some(Esp32Wifi::new(
                peripherals.modem,
                sysloop,
                Some(nvs),
                &config.wifi,
            )?)
        } else {
            log::warn!("WiFi not configured (set WIFI_SSID/WIFI_PASSWORD)");
            None
        }
    };

    // =========================================================================
    // MQTT Reporting
    // =========================================================================
    #[cfg(feature = "esp32-mqtt")]
    let mut reporter = {
        use rs_hlw8012::hal::esp32::Esp32Mqtt;
        use rs_hlw8012::report::Reporter;

        if config.mqtt.enabled && wifi.is_some() {
            match Esp32Mqtt::new(&config.mqtt) {
                Ok(client) => Some(Reporter::new(client, config.mqtt.clone())),
                Err(e) => {
                    log::warn!("MQTT client failed to start: {:?}", e);
                    None
                }
            }
        } else {
            log::info!("MQTT disabled");
            None
        }
    };

    // =========================================================================
    // Update Loop
    // =========================================================================
    let interval = Duration::from_millis(u64::from(config.meter.update_interval_ms));
    #[cfg(feature = "esp32-mqtt")]
    let mut subscribed = false;
    loop {
        let started = Instant::now();

        if let Err(e) = meter.update() {
            log::warn!("SEL write failed: {:?}", e);
        }

        #[cfg(feature = "wifi")]
        if let Some(ref mut wifi) = wifi {
            if let Err(e) = wifi.ensure_connected() {
                log::warn!("{:#}", e);
            }
        }

        let state = meter.state();
        log::debug!(
            "{:?} V, {:?} A, {:?} W, {:?} Wh ({})",
            state.voltage,
            state.current,
            state.power,
            state.energy_wh,
            state.mode.as_str()
        );

        #[cfg(feature = "esp32-mqtt")]
        if let Some(ref mut reporter) = reporter {
            use rs_hlw8012::report::MeterCommand;
            use rs_hlw8012::traits::MqttClient;

            // Subscriptions do not survive a broker reconnect.
            let connected = reporter.client().is_connected();
            if connected && !subscribed {
                match reporter.subscribe_commands() {
                    Ok(()) => subscribed = true,
                    Err(e) => log::warn!("{}", e),
                }
            } else if !connected {
                subscribed = false;
            }

            while let Some(cmd) = reporter.next_command() {
                match cmd {
                    MeterCommand::ResetEnergy => {
                        log::info!("Energy total reset over MQTT");
                        meter.reset_energy();
                    }
                }
            }

            if let Err(e) = reporter.poll(clock.now_ms(), &state) {
                log::warn!("{}", e);
            }
        }

        thread::sleep(interval.saturating_sub(started.elapsed()));
    }
}
