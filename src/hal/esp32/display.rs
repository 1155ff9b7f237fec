//! SSD1306 OLED status display.
//!
//! Two text rows on a 128x64 panel:
//!
//! ```text
//! ┌────────────────────────────┐
//! │  PLC                       │  device name
//! │                            │
//! │  T:41.5C FAN:OFF           │  status / ALARM
//! └────────────────────────────┘
//! ```

use embedded_graphics::{
    mono_font::{ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    text::Text,
};
use embedded_hal::i2c::I2c;
use ssd1306::{mode::BufferedGraphicsMode, prelude::*, I2CDisplayInterface, Ssd1306};

use crate::traits::StatusDisplay;

type DisplayDriver<I> =
    Ssd1306<I2CInterface<I>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>;

/// SSD1306 OLED on its own I2C bus.
pub struct Esp32Display<I> {
    display: DisplayDriver<I>,
}

impl<I: I2c> Esp32Display<I> {
    /// Wraps an I2C handle; the panel is set up by `init`.
    pub fn new(i2c: I) -> Self {
        let interface = I2CDisplayInterface::new(i2c);
        let display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        Self { display }
    }
}

impl<I: I2c> StatusDisplay for Esp32Display<I> {
    type Error = DisplayError;

    fn init(&mut self) -> Result<(), DisplayError> {
        self.display.init()?;
        self.clear()
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.display.clear(BinaryColor::Off)?;
        self.display.flush()?;
        Ok(())
    }

    fn show_lines(&mut self, line1: &str, line2: &str) -> Result<(), DisplayError> {
        self.display.clear(BinaryColor::Off)?;
        let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
        Text::new(line1, Point::new(4, 20), style).draw(&mut self.display)?;
        Text::new(line2, Point::new(4, 44), style).draw(&mut self.display)?;
        self.display.flush()?;
        Ok(())
    }
}

/// Display error type.
#[derive(Debug)]
pub struct DisplayError;

impl From<display_interface::DisplayError> for DisplayError {
    fn from(_: display_interface::DisplayError) -> Self {
        DisplayError
    }
}
