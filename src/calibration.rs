//! Period-to-quantity conversion.
//!
//! The chip outputs pulse trains whose frequency is proportional to the
//! measured quantity. A multiplier per quantity turns frequency into volts,
//! amperes or watts. Multipliers are computed once from the chip variant,
//! the shunt resistor and the voltage divider, and never change afterwards.
//!
//! # Example
//!
//! ```rust
//! use rs_hlw8012::{Multipliers, SensorModel};
//!
//! let m = Multipliers::for_model(SensorModel::Hlw8012, 0.001, 2351.0);
//!
//! // 200 µs period on CF1 in voltage mode is about 2043 V with this divider
//! let volts = m.period_to_voltage(200.0);
//! assert!((volts - 2043.2).abs() < 1.0);
//!
//! // No signal reads as exactly zero
//! assert_eq!(m.period_to_power(0.0), 0.0);
//! ```

/// Internal oscillator of the HLW8012 and CSE7759.
pub const HLW8012_CLOCK_FREQUENCY: f32 = 3_579_000.0;

/// Reference voltage of the HLW8012 and CSE7759.
pub const HLW8012_REFERENCE_VOLTAGE: f32 = 2.43;

/// Reference voltage of the BL0937.
pub const BL0937_REFERENCE_VOLTAGE: f32 = 1.218;

/// Supported metering chips.
///
/// HLW8012 and CSE7759 share reference specs; BL0937 has its own
/// datasheet denominators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SensorModel {
    /// HLW8012.
    #[default]
    Hlw8012,
    /// CSE7759, register compatible with the HLW8012.
    Cse7759,
    /// BL0937.
    Bl0937,
}

impl SensorModel {
    /// Returns the model name as used in configuration files.
    ///
    /// ```
    /// use rs_hlw8012::SensorModel;
    ///
    /// assert_eq!(SensorModel::Bl0937.as_str(), "bl0937");
    /// ```
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            SensorModel::Hlw8012 => "hlw8012",
            SensorModel::Cse7759 => "cse7759",
            SensorModel::Bl0937 => "bl0937",
        }
    }

    /// Parse a model name. Input is trimmed and case-insensitive.
    ///
    /// ```
    /// use rs_hlw8012::SensorModel;
    ///
    /// assert_eq!(SensorModel::from_text("HLW8012"), Some(SensorModel::Hlw8012));
    /// assert_eq!(SensorModel::from_text(" cse7759 "), Some(SensorModel::Cse7759));
    /// assert_eq!(SensorModel::from_text("bl0937"), Some(SensorModel::Bl0937));
    /// assert_eq!(SensorModel::from_text("ade7953"), None);
    /// ```
    pub fn from_text(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("hlw8012") {
            Some(SensorModel::Hlw8012)
        } else if s.eq_ignore_ascii_case("cse7759") {
            Some(SensorModel::Cse7759)
        } else if s.eq_ignore_ascii_case("bl0937") {
            Some(SensorModel::Bl0937)
        } else {
            None
        }
    }

    /// Internal reference voltage of the chip.
    #[inline]
    pub const fn reference_voltage(&self) -> f32 {
        match self {
            SensorModel::Hlw8012 | SensorModel::Cse7759 => HLW8012_REFERENCE_VOLTAGE,
            SensorModel::Bl0937 => BL0937_REFERENCE_VOLTAGE,
        }
    }
}

/// Frequency in Hz for a period in microseconds. Zero maps to zero.
#[inline]
pub fn period_to_hz(period_us: f32) -> f32 {
    if period_us == 0.0 {
        0.0
    } else {
        1_000_000.0 / period_us
    }
}

/// Period in microseconds for a frequency in Hz. Zero maps to zero.
#[inline]
pub fn hz_to_period(hz: f32) -> f32 {
    if hz == 0.0 {
        0.0
    } else {
        1_000_000.0 / hz
    }
}

/// Frequency-to-unit multipliers for one chip.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Multipliers {
    /// Volts per Hz on CF1 in voltage mode.
    pub voltage: f32,
    /// Amperes per Hz on CF1 in current mode.
    pub current: f32,
    /// Watts per Hz on CF.
    pub power: f32,
}

impl Multipliers {
    /// Compute multipliers for a chip variant.
    ///
    /// `current_resistor` is the shunt in ohms, `voltage_divider` the
    /// dimensionless ratio on the voltage-sense leg. Both must be positive;
    /// [`MeterConfig::validate`](crate::MeterConfig::validate) checks that.
    pub fn for_model(model: SensorModel, current_resistor: f32, voltage_divider: f32) -> Self {
        let vref = model.reference_voltage();
        match model {
            SensorModel::Bl0937 => Self {
                power: vref * vref * voltage_divider / current_resistor / 1_721_506.0,
                current: vref / current_resistor / 94_638.0,
                voltage: vref * voltage_divider / 15_397.0,
            },
            SensorModel::Hlw8012 | SensorModel::Cse7759 => Self {
                power: vref * vref * voltage_divider / current_resistor * 64.0 / 24.0
                    / HLW8012_CLOCK_FREQUENCY,
                current: vref / current_resistor * 512.0 / 24.0 / HLW8012_CLOCK_FREQUENCY,
                voltage: vref * voltage_divider * 256.0 / HLW8012_CLOCK_FREQUENCY,
            },
        }
    }

    /// Voltage for a CF1 period measured in voltage mode.
    #[inline]
    pub fn period_to_voltage(&self, period_us: f32) -> f32 {
        period_to_hz(period_us) * self.voltage
    }

    /// Current for a CF1 period measured in current mode.
    #[inline]
    pub fn period_to_current(&self, period_us: f32) -> f32 {
        period_to_hz(period_us) * self.current
    }

    /// Active power for a CF period.
    #[inline]
    pub fn period_to_power(&self, period_us: f32) -> f32 {
        period_to_hz(period_us) * self.power
    }

    /// True when every multiplier is finite and strictly positive.
    pub fn is_positive(&self) -> bool {
        [self.voltage, self.current, self.power]
            .iter()
            .all(|m| m.is_finite() && *m > 0.0)
    }
}
