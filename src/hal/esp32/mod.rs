//! ESP32 hardware abstraction layer for the PLC board.
//!
//! Pins are addressed by number at runtime because the board profile, not
//! the code, decides the wiring. Native GPIO therefore goes through the
//! ESP-IDF GPIO driver directly; the 1-Wire line is an `AnyIOPin` driver in
//! open-drain mode.
//!
//! I2C buses use `esp_idf_hal::i2c::I2cDriver`, which implements
//! `embedded_hal::i2c::I2c` and plugs straight into
//! [`I2cManager`](crate::i2c::I2cManager).

mod clock;
mod eeprom;
mod gpio;
mod onewire;

pub use clock::Esp32Clock;
pub use eeprom::NvsEeprom;
pub use gpio::Esp32Gpio;
pub use onewire::Esp32OneWire;

#[cfg(feature = "display")]
mod display;
#[cfg(feature = "display")]
pub use display::{DisplayError, Esp32Display};

/// Fixed wiring outside the board profile.
pub mod pins {
    // =========================================================================
    // Status display (SSD1306)
    // =========================================================================

    /// OLED data line, on the second I2C controller.
    pub const OLED_SDA: i32 = 18;

    /// OLED clock line.
    pub const OLED_SCL: i32 = 19;
}
