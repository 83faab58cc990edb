//! SEL output for any `embedded-hal` output pin.

use embedded_hal::digital::{OutputPin, PinState};

use crate::traits::SelectPin;

/// Drives SEL through an `embedded-hal` 1.0 [`OutputPin`].
///
/// `esp_idf_hal::gpio::PinDriver` in output mode implements the trait, so
/// the usual construction is:
///
/// ```ignore
/// use esp_idf_hal::gpio::PinDriver;
/// use rs_hlw8012::hal::esp32::Esp32SelectPin;
///
/// let sel = Esp32SelectPin::new(PinDriver::output(peripherals.pins.gpio5)?);
/// ```
pub struct Esp32SelectPin<P: OutputPin> {
    pin: P,
}

impl<P: OutputPin> Esp32SelectPin<P> {
    /// Wrap an output pin. The level is set by the scheduler at setup.
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    /// Release the underlying pin.
    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> SelectPin for Esp32SelectPin<P> {
    type Error = P::Error;

    fn set_level(&mut self, high: bool) -> Result<(), P::Error> {
        self.pin.set_state(PinState::from(high))
    }
}
