//! 1-Wire data line on an open-drain GPIO.
//!
//! The pin is handed to `one_wire_bus`, which times the slots with
//! [`Ets`] busy-waits.

use embedded_hal_0_2::digital::v2::InputPin;
use esp_idf_hal::delay::Ets;
use esp_idf_hal::gpio::{AnyIOPin, InputOutput, PinDriver, Pull};
use esp_idf_hal::sys::EspError;

use crate::traits::OneWire;

type LinePin = PinDriver<'static, AnyIOPin, InputOutput>;

/// 1-Wire line on one GPIO with an external pull-up.
pub struct Esp32OneWire {
    pin: LinePin,
}

impl Esp32OneWire {
    /// Configures `pin` as open-drain and releases the line.
    pub fn new(pin: u8) -> Result<Self, EspError> {
        // SAFETY: the board profile assigns this pin to the 1-Wire bus only
        let pin = unsafe { AnyIOPin::new(i32::from(pin)) };
        let mut pin = PinDriver::input_output_od(pin)?;
        pin.set_pull(Pull::Up)?;
        pin.set_high()?;
        Ok(Self { pin })
    }
}

impl OneWire for Esp32OneWire {
    type Error = <LinePin as InputPin>::Error;
    type Pin = LinePin;
    type Delay = Ets;

    fn into_parts(self) -> (LinePin, Ets) {
        (self.pin, Ets)
    }
}
