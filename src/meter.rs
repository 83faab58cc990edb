//! The HLW8012/CSE7759/BL0937 driver.
//!
//! [`Hlw8012`] ties the pieces together: two [`PulseCapture`]s filled by
//! interrupts, the [`Multipliers`] for the chip, a [`ChannelScheduler`]
//! owning SEL, and up to four [`Sensor`]s that receive readings.
//!
//! # Overview
//!
//! Call [`Hlw8012::update`] once per configured update interval. Each call:
//! - skips the first two ticks while the captures collect their first edges
//! - publishes power from CF (measured, faded or zero)
//! - publishes voltage or current from CF1, depending on the active mode
//! - lets the scheduler flip CF1 unless the fresh channel is still settling
//!
//! # Example
//!
//! ```rust
//! use rs_hlw8012::hal::{MockClock, MockSelectPin, MockSensor};
//! use rs_hlw8012::traits::MicrosClock;
//! use rs_hlw8012::{Hlw8012, MeterConfig, PulseCapture};
//!
//! let cf = PulseCapture::new();
//! let cf1 = PulseCapture::new();
//! let clock = MockClock::starting_at(1);
//! let config = MeterConfig::default().with_update_interval_ms(1_000);
//!
//! let mut meter = Hlw8012::new(config, MockSelectPin::new(), &clock, &cf, &cf1)
//!     .unwrap()
//!     .with_voltage_sensor(MockSensor::new());
//!
//! // Voltage pulses every 200 µs
//! for _ in 0..3 {
//!     for _ in 0..5 {
//!         clock.advance(200);
//!         cf1.on_rising_edge(clock.now_us());
//!     }
//!     meter.update().unwrap();
//!     clock.advance_ms(1_000);
//! }
//!
//! let volts = meter.voltage_sensor().unwrap().last().unwrap();
//! assert!((volts - 2043.2).abs() < 1.0);
//! ```

use core::fmt;

use crate::calibration::Multipliers;
use crate::capture::PulseCapture;
use crate::config::{ConfigError, MeterConfig};
use crate::energy::EnergyAccumulator;
use crate::scheduler::{ChannelScheduler, Cf1Mode};
use crate::traits::{MicrosClock, SelectPin, Sensor};
use crate::update::{evaluate, Channel, Decision};

/// Update ticks skipped after setup before anything is published.
pub const WARM_UP_TICKS: u8 = 2;

/// Errors returned while setting up the driver.
#[derive(Debug, PartialEq)]
pub enum MeterError<E> {
    /// The meter configuration was rejected.
    Config(ConfigError),
    /// Writing the SEL pin failed.
    Pin(E),
}

impl<E: fmt::Debug> fmt::Display for MeterError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeterError::Config(e) => write!(f, "invalid meter configuration: {}", e),
            MeterError::Pin(e) => write!(f, "SEL pin write failed: {:?}", e),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for MeterError<E> {}

impl<E> From<ConfigError> for MeterError<E> {
    fn from(e: ConfigError) -> Self {
        MeterError::Config(e)
    }
}

/// Pulse-frequency energy meter driver.
///
/// # Type Parameters
///
/// - `P`: SEL output ([`SelectPin`])
/// - `C`: microsecond clock ([`MicrosClock`])
/// - `S`: sensor type receiving readings ([`Sensor`])
///
/// The captures are borrowed because their interrupt handlers need access
/// too; on hardware they are usually `static`.
pub struct Hlw8012<'a, P: SelectPin, C: MicrosClock, S: Sensor> {
    config: MeterConfig,
    multipliers: Multipliers,
    scheduler: ChannelScheduler<P>,
    clock: C,
    cf: &'a PulseCapture,
    cf1: &'a PulseCapture,
    voltage_sensor: Option<S>,
    current_sensor: Option<S>,
    power_sensor: Option<S>,
    energy_sensor: Option<S>,
    energy: EnergyAccumulator,
    nth_value: u8,
}

impl<'a, P: SelectPin, C: MicrosClock, S: Sensor> Hlw8012<'a, P, C, S> {
    /// Set up the driver.
    ///
    /// Validates `config`, drives SEL to the initial mode and computes the
    /// multipliers. The host must route CF and CF1 rising edges into `cf`
    /// and `cf1`.
    pub fn new(
        config: MeterConfig,
        sel_pin: P,
        clock: C,
        cf: &'a PulseCapture,
        cf1: &'a PulseCapture,
    ) -> Result<Self, MeterError<P::Error>> {
        config.validate()?;
        log::info!("Setting up {}...", config.model.as_str());

        let scheduler =
            ChannelScheduler::new(sel_pin, config.initial_mode, config.change_mode_every)
                .map_err(MeterError::Pin)?;
        let multipliers = config.multipliers();
        log::debug!(
            "Multipliers: voltage={} current={} power={}",
            multipliers.voltage,
            multipliers.current,
            multipliers.power
        );

        Ok(Self {
            config,
            multipliers,
            scheduler,
            clock,
            cf,
            cf1,
            voltage_sensor: None,
            current_sensor: None,
            power_sensor: None,
            energy_sensor: None,
            energy: EnergyAccumulator::new(),
            nth_value: 0,
        })
    }

    /// Attach the voltage sensor
    pub fn with_voltage_sensor(mut self, sensor: S) -> Self {
        self.voltage_sensor = Some(sensor);
        self
    }

    /// Attach the current sensor
    pub fn with_current_sensor(mut self, sensor: S) -> Self {
        self.current_sensor = Some(sensor);
        self
    }

    /// Attach the power sensor
    pub fn with_power_sensor(mut self, sensor: S) -> Self {
        self.power_sensor = Some(sensor);
        self
    }

    /// Attach the energy sensor (watt-hours, integrated from power)
    pub fn with_energy_sensor(mut self, sensor: S) -> Self {
        self.energy_sensor = Some(sensor);
        self
    }

    /// Log the full configuration at info level.
    pub fn dump_config(&self) {
        log::info!("{}:", self.config.model.as_str());
        log::info!(
            "  Change measurement mode every {}",
            self.config.change_mode_every
        );
        log::info!(
            "  Current resistor: {:.1} mΩ",
            self.config.current_resistor * 1000.0
        );
        log::info!("  Voltage Divider: {:.1}", self.config.voltage_divider);
        log::info!("  Update Interval: {} ms", self.config.update_interval_ms);
        log::info!(
            "  Sensors: voltage={} current={} power={} energy={}",
            self.voltage_sensor.is_some(),
            self.current_sensor.is_some(),
            self.power_sensor.is_some(),
            self.energy_sensor.is_some()
        );
    }

    /// One update tick. Call every `update_interval_ms`.
    ///
    /// Only SEL writes can fail; measurement anomalies are handled by
    /// publishing zero or holding back.
    pub fn update(&mut self) -> Result<(), P::Error> {
        if self.nth_value < WARM_UP_TICKS {
            self.nth_value += 1;
            return Ok(());
        }

        let interval_us = self.config.update_interval_us();
        let m = self.multipliers;

        if let Some(sensor) = self.power_sensor.as_mut() {
            let snap = self.cf.snapshot();
            let elapsed = snap.elapsed_us(self.clock.now_us());
            let decision = evaluate(Channel::Cf, elapsed, &snap, interval_us, sensor.state());
            if let Some(watts) = publish(sensor, decision, |p| m.period_to_power(p)) {
                if let Some(energy) = self.energy_sensor.as_mut() {
                    let total = self
                        .energy
                        .accumulate(watts, self.config.update_interval_ms);
                    energy.publish_state(total);
                }
            }
        }

        if self.voltage_sensor.is_none() && self.current_sensor.is_none() {
            return Ok(());
        }

        let mode = self.scheduler.mode();
        let target = match mode {
            Cf1Mode::Current => self.current_sensor.as_mut(),
            Cf1Mode::Voltage => self.voltage_sensor.as_mut(),
        };

        let defer = match target {
            Some(sensor) => {
                let snap = self.cf1.snapshot();
                let elapsed = snap.elapsed_us(self.clock.now_us());
                let decision =
                    evaluate(Channel::Cf1, elapsed, &snap, interval_us, sensor.state());
                publish(sensor, decision, |p| match mode {
                    Cf1Mode::Current => m.period_to_current(p),
                    Cf1Mode::Voltage => m.period_to_voltage(p),
                });
                decision.defers_mode_change()
            }
            None => {
                // Nothing to measure on this channel; move on right away.
                self.scheduler.change(self.cf1)?;
                true
            }
        };

        self.scheduler.maybe_change(defer, self.cf1)?;
        Ok(())
    }

    /// Snapshot of the latest readings for reporting.
    pub fn state(&self) -> MeterState {
        MeterState {
            voltage: self.voltage_sensor.as_ref().map(Sensor::state),
            current: self.current_sensor.as_ref().map(Sensor::state),
            power: self.power_sensor.as_ref().map(Sensor::state),
            energy_wh: self.energy_sensor.as_ref().map(Sensor::state),
            mode: self.scheduler.mode(),
            warmed_up: self.is_warmed_up(),
        }
    }

    /// True once the warm-up ticks have passed.
    #[inline]
    pub fn is_warmed_up(&self) -> bool {
        self.nth_value >= WARM_UP_TICKS
    }

    /// Current CF1 mode.
    #[inline]
    pub fn mode(&self) -> Cf1Mode {
        self.scheduler.mode()
    }

    /// Ticks counted towards the next CF1 flip.
    #[inline]
    pub fn change_mode_at(&self) -> u32 {
        self.scheduler.change_mode_at()
    }

    /// Number of CF1 flips since setup.
    #[inline]
    pub fn mode_changes(&self) -> u32 {
        self.scheduler.changes()
    }

    /// Multipliers computed at setup.
    #[inline]
    pub fn multipliers(&self) -> &Multipliers {
        &self.multipliers
    }

    /// Configuration the driver was built with.
    #[inline]
    pub fn config(&self) -> &MeterConfig {
        &self.config
    }

    /// Borrow the SEL pin.
    pub fn sel_pin(&self) -> &P {
        self.scheduler.pin()
    }

    /// Voltage sensor, if attached.
    pub fn voltage_sensor(&self) -> Option<&S> {
        self.voltage_sensor.as_ref()
    }

    /// Current sensor, if attached.
    pub fn current_sensor(&self) -> Option<&S> {
        self.current_sensor.as_ref()
    }

    /// Power sensor, if attached.
    pub fn power_sensor(&self) -> Option<&S> {
        self.power_sensor.as_ref()
    }

    /// Energy sensor, if attached.
    pub fn energy_sensor(&self) -> Option<&S> {
        self.energy_sensor.as_ref()
    }

    /// Accumulated energy in watt-hours.
    pub fn energy_wh(&self) -> f32 {
        self.energy.total_wh()
    }

    /// Restart energy accumulation from zero and publish the cleared total.
    pub fn reset_energy(&mut self) {
        self.energy.reset();
        if let Some(sensor) = self.energy_sensor.as_mut() {
            sensor.publish_state(self.energy.total_wh());
        }
        log::info!("Energy total reset");
    }
}

fn publish<S: Sensor>(sensor: &mut S, decision: Decision, convert: impl Fn(f32) -> f32) -> Option<f32> {
    let value = match decision {
        Decision::Zero => 0.0,
        Decision::Fade(p) => {
            log::trace!("Fading down, {} µs since last edge", p);
            convert(p as f32)
        }
        Decision::Period(p) => convert(p as f32),
        Decision::Hold => return None,
    };
    sensor.publish_state(value);
    Some(value)
}

/// Latest readings, as seen by the attached sensors.
///
/// `None` means the sensor is not attached; `Some(NaN)` means it is
/// attached but nothing has been published yet.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MeterState {
    /// Volts.
    pub voltage: Option<f32>,
    /// Amperes.
    pub current: Option<f32>,
    /// Watts.
    pub power: Option<f32>,
    /// Watt-hours since setup or the last reset.
    pub energy_wh: Option<f32>,
    /// What CF1 currently measures.
    pub mode: Cf1Mode,
    /// Whether the warm-up ticks have passed.
    pub warmed_up: bool,
}

impl Default for MeterState {
    fn default() -> Self {
        Self {
            voltage: None,
            current: None,
            power: None,
            energy_wh: None,
            mode: Cf1Mode::Voltage,
            warmed_up: false,
        }
    }
}
