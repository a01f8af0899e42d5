//! Heartbeat LED driver.
//!
//! One GPIO driven high/low through `embedded_hal::digital::OutputPin`, so
//! the heartbeat works with any pin type.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: `PinDriver` in output mode on the configured GPIO.
//! On host/test: tracks the level in memory only.

#[cfg(not(target_os = "espidf"))]
use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};

#[cfg(target_os = "espidf")]
use esp_idf_hal::gpio::{AnyOutputPin, Output, PinDriver};

pub struct StatusLed {
    gpio: u8,
    lit: bool,
    #[cfg(target_os = "espidf")]
    pin: PinDriver<'static, AnyOutputPin, Output>,
}

#[cfg(target_os = "espidf")]
impl StatusLed {
    /// Reset `gpio` and configure it as a push-pull output, initially low.
    pub fn new(gpio: u8) -> Result<Self, esp_idf_sys::EspError> {
        // SAFETY: the GPIO number comes from validated configuration and
        // the pin is owned by this driver for the rest of the program.
        let any = unsafe { AnyOutputPin::new(gpio as i32) };
        let mut pin = PinDriver::output(any)?;
        pin.set_low()?;
        log::info!("StatusLed: GPIO{} configured as output", gpio);
        Ok(Self {
            gpio,
            lit: false,
            pin,
        })
    }
}

#[cfg(not(target_os = "espidf"))]
impl StatusLed {
    pub fn new(gpio: u8) -> Result<Self, Infallible> {
        Ok(Self { gpio, lit: false })
    }
}

impl StatusLed {
    pub fn gpio(&self) -> u8 {
        self.gpio
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }
}

#[cfg(target_os = "espidf")]
impl ErrorType for StatusLed {
    type Error = esp_idf_sys::EspError;
}

#[cfg(target_os = "espidf")]
impl OutputPin for StatusLed {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.pin.set_low()?;
        self.lit = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.pin.set_high()?;
        self.lit = true;
        Ok(())
    }
}

#[cfg(not(target_os = "espidf"))]
impl ErrorType for StatusLed {
    type Error = Infallible;
}

#[cfg(not(target_os = "espidf"))]
impl OutputPin for StatusLed {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.lit = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.lit = true;
        Ok(())
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    #[test]
    fn sim_led_tracks_level() {
        let mut led = StatusLed::new(5).unwrap();
        assert_eq!(led.gpio(), 5);
        assert!(!led.is_lit());
        led.set_high().unwrap();
        assert!(led.is_lit());
        led.set_low().unwrap();
        assert!(!led.is_lit());
    }
}
