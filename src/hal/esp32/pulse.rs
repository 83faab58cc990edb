//! Rising-edge interrupts feeding a [`PulseCapture`].
//!
//! The handler is registered directly with the ESP-IDF GPIO ISR service so
//! it stays armed between edges. It only reads the timer and stores the
//! edge; everything else happens in the update task.

use core::ffi::c_void;

use esp_idf_hal::gpio::{Input, InputPin, OutputPin, PinDriver, Pull};
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::sys::{self, esp, EspError};

use super::clock::timer_us;
use crate::capture::PulseCapture;

/// One pulse line (CF or CF1) wired to a `static` capture.
///
/// The interrupt is removed when this value is dropped.
///
/// # Example
///
/// ```ignore
/// use rs_hlw8012::hal::esp32::Esp32PulseInput;
/// use rs_hlw8012::PulseCapture;
///
/// static CF: PulseCapture = PulseCapture::new();
///
/// let _cf = Esp32PulseInput::new(peripherals.pins.gpio4, &CF)?;
/// ```
pub struct Esp32PulseInput<'d, T: InputPin> {
    pin: PinDriver<'d, T, Input>,
    capture: &'static PulseCapture,
}

impl<'d, T: InputPin + OutputPin> Esp32PulseInput<'d, T> {
    /// Configure the pin as a pulled-up input and start capturing rising edges.
    pub fn new(
        pin: impl Peripheral<P = T> + 'd,
        capture: &'static PulseCapture,
    ) -> Result<Self, EspError> {
        let mut driver = PinDriver::input(pin)?;
        driver.set_pull(Pull::Up)?;
        let gpio = driver.pin();

        unsafe {
            esp!(sys::gpio_set_intr_type(
                gpio,
                sys::gpio_int_type_t_GPIO_INTR_POSEDGE
            ))?;

            // Already installed by another input or by esp-idf-hal itself.
            let err = sys::gpio_install_isr_service(0);
            if err != sys::ESP_OK as i32 && err != sys::ESP_ERR_INVALID_STATE as i32 {
                esp!(err)?;
            }

            esp!(sys::gpio_isr_handler_add(
                gpio,
                Some(on_rising_edge),
                capture as *const PulseCapture as *mut c_void,
            ))?;
            esp!(sys::gpio_intr_enable(gpio))?;
        }

        log::info!("Capturing rising edges on GPIO{}", gpio);
        Ok(Self {
            pin: driver,
            capture,
        })
    }

    /// The capture this input feeds.
    pub fn capture(&self) -> &'static PulseCapture {
        self.capture
    }

    /// Current logic level of the line.
    pub fn is_high(&self) -> bool {
        self.pin.is_high()
    }
}

impl<'d, T: InputPin> Drop for Esp32PulseInput<'d, T> {
    fn drop(&mut self) {
        let gpio = self.pin.pin();
        unsafe {
            sys::gpio_intr_disable(gpio);
            sys::gpio_isr_handler_remove(gpio);
        }
    }
}

unsafe extern "C" fn on_rising_edge(arg: *mut c_void) {
    // `arg` is the `&'static PulseCapture` registered in `new`.
    let capture = &*(arg as *const PulseCapture);
    capture.on_rising_edge(timer_us() as u32);
}
