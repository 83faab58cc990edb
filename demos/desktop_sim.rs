//! Desktop simulation of a metered plug.
//!
//! Drives the real [`Hlw8012`] driver with synthetic CF/CF1 pulse trains
//! generated from a scripted load, using the mock HAL. Shows warm-up,
//! channel multiplexing, fade-down when the load switches off, and the
//! drop to zero after 10 s of silence.
//!
//! # Usage
//!
//! ```sh
//! cargo run --example desktop_sim
//! ```
//!
//! Publishing to a broker as well:
//! ```sh
//! cargo run --example desktop_sim --features mqtt
//! ```

use rs_hlw8012::calibration::hz_to_period;
use rs_hlw8012::hal::{MockClock, MockSelectPin, MockSensor};
use rs_hlw8012::{Cf1Mode, Config, Hlw8012, MeterConfig, MeterState, MicrosClock, PulseCapture};

static CF: PulseCapture = PulseCapture::new();
static CF1: PulseCapture = PulseCapture::new();

/// Simulated ticks (one per update interval).
const TICKS: u32 = 60;

const MAINS_VOLTS: f32 = 230.0;

/// Scripted load in watts for a given tick.
fn load_watts(tick: u32) -> f32 {
    match tick {
        0..=19 => 60.0,
        20..=39 => 0.0,
        _ => 1_500.0,
    }
}

/// Evenly spaced rising edges at a fixed frequency.
struct PulseTrain {
    next_us: Option<u32>,
}

impl PulseTrain {
    fn new() -> Self {
        Self { next_us: None }
    }

    /// Emit every edge in `[from, to)` at `hz`. Zero stops the train.
    fn run(&mut self, capture: &PulseCapture, from: u32, to: u32, hz: f32) {
        if hz <= 0.0 {
            self.next_us = None;
            return;
        }
        let period = (hz_to_period(hz) as u32).max(1);
        let mut t = self.next_us.unwrap_or(from).max(from);
        while t < to {
            capture.on_rising_edge(t);
            t += period;
        }
        self.next_us = Some(t);
    }
}

fn print_state(tick: u32, state: &MeterState) {
    let show = |v: Option<f32>| match v {
        Some(x) if x.is_finite() => format!("{:8.2}", x),
        _ => format!("{:>8}", "-"),
    };
    println!(
        "{:3}  {:7}  {}  {}  {}  {}",
        tick,
        state.mode.as_str(),
        show(state.voltage),
        show(state.current),
        show(state.power),
        show(state.energy_wh),
    );
}

fn main() -> anyhow::Result<()> {
    let config = Config::default().with_meter(
        MeterConfig::default()
            .with_update_interval_ms(1_000)
            .with_change_mode_every(4),
    );
    let interval_us = config.meter.update_interval_us();

    println!("=================================");
    println!("  rs-hlw8012 Desktop Simulation");
    println!("=================================");
    println!();

    let clock = MockClock::starting_at(1);
    let mut meter = Hlw8012::new(config.meter.clone(), MockSelectPin::new(), &clock, &CF, &CF1)
        .map_err(|e| anyhow::anyhow!("{}", e))?
        .with_voltage_sensor(MockSensor::new())
        .with_current_sensor(MockSensor::new())
        .with_power_sensor(MockSensor::new())
        .with_energy_sensor(MockSensor::new());
    meter.dump_config();
    let m = *meter.multipliers();

    #[cfg(feature = "mqtt")]
    let (runtime, shared) = {
        use std::sync::Arc;
        use rs_hlw8012::services::{MqttPublisher, SharedMeterState};

        let runtime = tokio::runtime::Runtime::new()?;
        let shared = Arc::new(SharedMeterState::new());
        let publisher = MqttPublisher::new(Arc::clone(&shared), config.mqtt.clone());
        runtime.spawn(async move {
            if let Err(e) = publisher.run().await {
                println!("MQTT stopped: {}", e);
            }
        });
        (runtime, shared)
    };

    let mut cf_train = PulseTrain::new();
    let mut cf1_train = PulseTrain::new();

    println!("tick  mode      volts     amps    watts       Wh");
    for tick in 0..TICKS {
        let watts = load_watts(tick);
        let from = clock.now_us();
        let to = from.wrapping_add(interval_us);

        cf_train.run(&CF, from, to, watts / m.power);
        let cf1_hz = match meter.mode() {
            Cf1Mode::Voltage => MAINS_VOLTS / m.voltage,
            Cf1Mode::Current => (watts / MAINS_VOLTS) / m.current,
        };
        cf1_train.run(&CF1, from, to, cf1_hz);

        clock.set(to);
        meter
            .update()
            .map_err(|_| anyhow::anyhow!("SEL write failed"))?;

        let state = meter.state();
        print_state(tick, &state);

        #[cfg(feature = "mqtt")]
        shared.store(state);
    }

    println!();
    println!(
        "{} channel changes, {:.3} Wh total",
        meter.mode_changes(),
        meter.energy_wh()
    );

    #[cfg(feature = "mqtt")]
    runtime.shutdown_background();

    Ok(())
}
