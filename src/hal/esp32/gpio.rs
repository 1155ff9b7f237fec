//! Native GPIO through the ESP-IDF GPIO driver.

use esp_idf_hal::sys::{self, esp, gpio_num_t, EspError};

use crate::traits::{IoMode, NativeGpio};

/// Native pins addressed by GPIO number.
///
/// Outputs are configured input-output so their level can be read back.
#[derive(Debug, Default)]
pub struct Esp32Gpio {
    _private: (),
}

impl Esp32Gpio {
    /// Creates the driver. Pins are configured lazily by `set_mode`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl NativeGpio for Esp32Gpio {
    type Error = EspError;

    fn set_mode(&mut self, pin: u8, mode: IoMode) -> Result<(), EspError> {
        let (direction, pull) = match mode {
            IoMode::Input => (sys::gpio_mode_t_GPIO_MODE_INPUT, sys::gpio_pull_mode_t_GPIO_FLOATING),
            IoMode::InputPullUp => (
                sys::gpio_mode_t_GPIO_MODE_INPUT,
                sys::gpio_pull_mode_t_GPIO_PULLUP_ONLY,
            ),
            IoMode::InputPullDown => (
                sys::gpio_mode_t_GPIO_MODE_INPUT,
                sys::gpio_pull_mode_t_GPIO_PULLDOWN_ONLY,
            ),
            IoMode::Output => (
                sys::gpio_mode_t_GPIO_MODE_INPUT_OUTPUT,
                sys::gpio_pull_mode_t_GPIO_FLOATING,
            ),
        };
        let num = pin as gpio_num_t;
        // SAFETY: plain register configuration of a pin the profile owns
        unsafe {
            esp!(sys::gpio_reset_pin(num))?;
            esp!(sys::gpio_set_direction(num, direction))?;
            esp!(sys::gpio_set_pull_mode(num, pull))?;
        }
        Ok(())
    }

    fn write(&mut self, pin: u8, high: bool) -> Result<(), EspError> {
        // SAFETY: see set_mode
        unsafe { esp!(sys::gpio_set_level(pin as gpio_num_t, u32::from(high))) }
    }

    fn read(&mut self, pin: u8) -> Result<bool, EspError> {
        // SAFETY: see set_mode
        let level = unsafe { sys::gpio_get_level(pin as gpio_num_t) };
        Ok(level != 0)
    }
}
