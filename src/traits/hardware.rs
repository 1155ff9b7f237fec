//! Hardware abstraction traits for native pins, 1-Wire lines, EEPROM and time.
//!
//! This module defines the platform seams that allow rs-plc to run on the
//! ESP32 board and on a desktop with mock hardware.
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`NativeGpio`] | Microcontroller pins addressed by physical number |
//! | [`OneWire`] | 1-Wire data pin and slot delay |
//! | [`Eeprom`] | Small byte-addressable persistent memory |
//! | [`Clock`] | Monotonic millisecond time source |
//!
//! I2C buses are not abstracted here: every bus handle is an
//! [`embedded_hal::i2c::I2c`] implementation.
//!
//! # Example
//!
//! ```rust
//! use rs_plc::traits::{IoMode, NativeGpio};
//! use rs_plc::hal::MockGpio;
//!
//! let mut gpio = MockGpio::new();
//! gpio.set_mode(2, IoMode::Output).unwrap();
//! gpio.write(2, true).unwrap();
//! assert_eq!(gpio.level(2), Some(true));
//! ```

use core::fmt::Debug;

use embedded_hal_0_2::blocking::delay::DelayUs;
use embedded_hal_0_2::digital::v2::{InputPin, OutputPin};

/// Electrical configuration of a pin as understood by the platform.
///
/// Logical (mode, pull) pairs are mapped to one of these by
/// [`GpioManager::set_mode`](crate::gpio::GpioManager::set_mode).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IoMode {
    /// Floating input.
    Input,
    /// Input with the internal pull-up enabled.
    InputPullUp,
    /// Input with the internal pull-down enabled.
    InputPullDown,
    /// Push-pull output.
    Output,
}

impl IoMode {
    /// Returns true for the three input variants.
    #[inline]
    pub const fn is_input(&self) -> bool {
        !matches!(self, IoMode::Output)
    }
}

/// Native microcontroller pins.
///
/// # Implementation Notes
///
/// - Pins are addressed by their physical number
/// - `read` must sample the line, never a cached value
/// - Writes to a pin not in output mode may be ignored by the platform
pub trait NativeGpio {
    /// Error type for pin operations.
    type Error: Debug;

    /// Configure the electrical mode of a pin.
    fn set_mode(&mut self, pin: u8, mode: IoMode) -> Result<(), Self::Error>;

    /// Drive an output pin high (`true`) or low (`false`).
    fn write(&mut self, pin: u8, high: bool) -> Result<(), Self::Error>;

    /// Sample the current level of a pin.
    fn read(&mut self, pin: u8) -> Result<bool, Self::Error>;
}

/// A 1-Wire data line handed over by the platform.
///
/// The line is an open-drain pin with an external pull-up plus a
/// microsecond delay. Slot timing, ROM search and CRC are done by
/// [`one_wire_bus`] on top of these two; see [`crate::onewire`].
pub trait OneWire {
    /// Error raised by the pin.
    type Error: Debug;

    /// Pin that can both release (high) and pull down (low) the line.
    type Pin: InputPin<Error = Self::Error> + OutputPin<Error = Self::Error>;

    /// Busy-wait delay timing the slots.
    type Delay: DelayUs<u16>;

    /// Splits the line into its pin and delay.
    fn into_parts(self) -> (Self::Pin, Self::Delay);
}

/// Byte-addressable persistent memory (EEPROM or an emulation of it).
///
/// Writes may be buffered until [`commit`](Self::commit) is called.
pub trait Eeprom {
    /// Error type for memory operations.
    type Error: Debug;

    /// Total number of addressable bytes.
    fn capacity(&self) -> usize;

    /// Read `buf.len()` bytes starting at `offset`.
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Write `data` starting at `offset`.
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), Self::Error>;

    /// Flush buffered writes to the medium.
    fn commit(&mut self) -> Result<(), Self::Error>;
}

/// Time source trait for `no_std` compatibility.
///
/// Provides monotonic time in milliseconds for every timed phase of the
/// control loop. On embedded, use a hardware timer.
///
/// # Example
///
/// ```rust
/// use rs_plc::traits::Clock;
/// use rs_plc::hal::MockClock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.advance(100);
/// assert_eq!(clock.now_ms(), 100);
/// ```
pub trait Clock {
    /// Returns current time in milliseconds since an arbitrary epoch.
    ///
    /// Must be monotonically increasing.
    fn now_ms(&self) -> u64;
}
