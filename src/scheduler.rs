//! CF1 channel multiplexing.
//!
//! CF always reports power, but CF1 carries either voltage or current
//! depending on the SEL pin. [`ChannelScheduler`] owns SEL and flips it
//! every `change_mode_every` update ticks, unless the update logic asks it
//! to hold the current channel a little longer.

use crate::capture::PulseCapture;
use crate::traits::SelectPin;

/// What the CF1 line currently reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Cf1Mode {
    /// CF1 reports voltage (SEL low).
    #[default]
    Voltage,
    /// CF1 reports current (SEL high).
    Current,
}

impl Cf1Mode {
    /// True in current mode. This is the level written to SEL.
    #[inline]
    pub const fn is_current(&self) -> bool {
        matches!(self, Cf1Mode::Current)
    }

    /// The other mode.
    #[inline]
    pub const fn toggled(&self) -> Self {
        match self {
            Cf1Mode::Voltage => Cf1Mode::Current,
            Cf1Mode::Current => Cf1Mode::Voltage,
        }
    }

    /// Returns the mode as an upper-case label for logs.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Cf1Mode::Voltage => "VOLTAGE",
            Cf1Mode::Current => "CURRENT",
        }
    }
}

/// Owner of the SEL pin and the mode-change counter.
///
/// # Counter semantics
///
/// `change_mode_at` counts non-deferred ticks spent in the current mode.
/// A change resets it to 1, and the flip happens on the tick where it has
/// reached `change_mode_every`, so every channel gets exactly
/// `change_mode_every` useful ticks. Deferred ticks leave it untouched,
/// which keeps it at or below `change_mode_every`.
#[derive(Debug)]
pub struct ChannelScheduler<P: SelectPin> {
    pin: P,
    mode: Cf1Mode,
    change_mode_every: u32,
    change_mode_at: u32,
    changes: u32,
}

impl<P: SelectPin> ChannelScheduler<P> {
    /// Take ownership of SEL and drive it to `initial`.
    pub fn new(mut pin: P, initial: Cf1Mode, change_mode_every: u32) -> Result<Self, P::Error> {
        pin.set_level(initial.is_current())?;
        Ok(Self {
            pin,
            mode: initial,
            change_mode_every,
            change_mode_at: 0,
            changes: 0,
        })
    }

    /// End-of-tick scheduling decision.
    ///
    /// Does nothing while `defer` is set. Otherwise flips the channel once
    /// the counter has reached `change_mode_every`, or advances the counter.
    /// Returns true if the mode changed.
    pub fn maybe_change(&mut self, defer: bool, cf1: &PulseCapture) -> Result<bool, P::Error> {
        if defer {
            return Ok(false);
        }
        if self.change_mode_at >= self.change_mode_every {
            self.change(cf1)?;
            Ok(true)
        } else {
            self.change_mode_at += 1;
            Ok(false)
        }
    }

    /// Toggle the CF1 channel immediately.
    ///
    /// Drives SEL, resets the CF1 capture so the next period is measured on
    /// the new channel, and restarts the counter.
    pub fn change(&mut self, cf1: &PulseCapture) -> Result<(), P::Error> {
        let next = self.mode.toggled();
        log::debug!("Changing mode to {} mode", next.as_str());
        self.pin.set_level(next.is_current())?;
        self.mode = next;
        self.change_mode_at = 1;
        self.changes = self.changes.wrapping_add(1);
        cf1.reset();
        Ok(())
    }

    /// Current CF1 mode.
    #[inline]
    pub fn mode(&self) -> Cf1Mode {
        self.mode
    }

    /// Ticks counted in the current mode.
    #[inline]
    pub fn change_mode_at(&self) -> u32 {
        self.change_mode_at
    }

    /// Configured ticks per channel.
    #[inline]
    pub fn change_mode_every(&self) -> u32 {
        self.change_mode_every
    }

    /// Number of mode changes since setup.
    #[inline]
    pub fn changes(&self) -> u32 {
        self.changes
    }

    /// Borrow the SEL pin.
    pub fn pin(&self) -> &P {
        &self.pin
    }
}
