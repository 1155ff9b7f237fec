//! Trait definitions for hardware abstraction.
//!
//! This module defines the core abstractions that allow rs-plc to:
//! - Run on different hardware (ESP32, desktop mock)
//! - Address native and expander pins through one pin contract
//! - Persist socket state on different media
//!
//! # Submodules
//!
//! - `hardware`: native GPIO, 1-Wire line, EEPROM, clock
//! - `display`: two-line status display
//!
//! # Hardware Abstraction
//!
//! The key hardware traits are:
//!
//! - [`NativeGpio`]: microcontroller pins by physical number
//! - [`OneWire`]: 1-Wire data pin and slot delay
//! - [`Eeprom`]: byte-addressable persistent memory
//! - [`Clock`]: time source for `no_std` environments
//!
//! I2C bus handles use [`embedded_hal::i2c::I2c`] directly.

pub mod display;
pub mod hardware;

pub use display::*;
pub use hardware::*;
