//! Board bring-up.
//!
//! [`Board::begin`] runs the initialization protocol for one
//! [`BoardProfile`], leaf first:
//!
//! 1. validate the profile (problems are logged, bring-up continues)
//! 2. open the I2C buses
//! 3. open the 1-Wire buses
//! 4. detect the extenders
//! 5. register and configure the logical pins
//!
//! A failing step never aborts the sequence. Anything that depends on a
//! missing resource stays registered but inactive, and [`Board::healthy`]
//! reports whether every step succeeded.
//!
//! # Example
//!
//! ```rust
//! use rs_plc::board::Board;
//! use rs_plc::hal::{MockGpio, MockI2c, MockOneWire};
//! use rs_plc::profile::boards::PLC_ESP32_V1;
//!
//! let board = Board::begin(
//!     PLC_ESP32_V1,
//!     MockGpio::new(),
//!     |_, _| Ok::<_, ()>(MockI2c::new().with_device(0x20).with_device(0x21)),
//!     |_| Ok::<_, ()>(MockOneWire::new()),
//! );
//! assert!(board.healthy());
//! assert_eq!(board.extenders().filter(|e| e.active()).count(), 2);
//! ```

use core::fmt;

use embedded_hal::i2c::I2c;
use heapless::Vec;
use log::{error, info, warn};

use crate::extender::{Extender, ExtenderManager};
use crate::gpio::{GpioManager, GpioPin};
use crate::i2c::{BusError, I2cBus, I2cManager};
use crate::onewire::{OneWireBus, OneWireError, OneWireManager, RomHex, ONEWIRE_MAX_DEVICES};
use crate::profile::{BoardProfile, I2cProfile, OneWireProfile};
use crate::traits::{NativeGpio, OneWire};

/// Hardware brought up from a board profile.
pub struct Board<G, I, W: OneWire> {
    profile: BoardProfile,
    /// Logical pins, I2C buses and extenders.
    pub gpio: GpioManager<G, I>,
    /// 1-Wire buses.
    pub onewire: OneWireManager<W>,
    healthy: bool,
}

impl<G: NativeGpio, I: I2c, W: OneWire> Board<G, I, W> {
    /// Brings up every interface `profile` declares.
    ///
    /// `open_i2c` receives the bus entry and its clock in Hz, `open_onewire`
    /// the 1-Wire entry; both return the platform handle.
    pub fn begin<FI, EI, FW, EW>(profile: BoardProfile, native: G, open_i2c: FI, open_onewire: FW) -> Self
    where
        FI: FnMut(&I2cProfile, u32) -> Result<I, EI>,
        EI: fmt::Debug,
        FW: FnMut(&OneWireProfile) -> Result<W, EW>,
        EW: fmt::Debug,
    {
        info!("bringing up board {}", profile.name);
        let mut healthy = true;
        if let Err(e) = profile.validate() {
            error!("board profile {}: {}", profile.name, e);
            healthy = false;
        }

        let mut i2c = I2cManager::new();
        healthy &= i2c.begin(profile.i2c, open_i2c);

        let mut onewire = OneWireManager::new();
        healthy &= onewire.begin(profile.onewire, open_onewire);

        let mut extenders = ExtenderManager::new();
        healthy &= extenders.begin(profile.extenders, &mut i2c);

        let mut gpio = GpioManager::new(native, i2c, extenders);
        healthy &= gpio.begin(profile.gpio);

        if healthy {
            info!("board {} ready", profile.name);
        } else {
            warn!("board {} started degraded", profile.name);
        }
        Self {
            profile,
            gpio,
            onewire,
            healthy,
        }
    }

    /// Profile the board was brought up from.
    pub fn profile(&self) -> &BoardProfile {
        &self.profile
    }

    /// True when every bring-up step succeeded.
    pub fn healthy(&self) -> bool {
        self.healthy
    }

    /// Registered logical pins.
    pub fn pins(&self) -> impl Iterator<Item = &GpioPin> {
        self.gpio.pins()
    }

    /// Open I2C buses.
    pub fn i2c_buses(&self) -> impl Iterator<Item = &I2cBus<I>> {
        self.gpio.i2c().buses()
    }

    /// Open 1-Wire buses.
    pub fn onewire_buses(&self) -> impl Iterator<Item = &OneWireBus<W>> {
        self.onewire.buses()
    }

    /// Registered extenders, active or not.
    pub fn extenders(&self) -> impl Iterator<Item = &Extender> {
        self.gpio.extenders().extenders()
    }

    /// Addresses that answer on I2C bus `bus`.
    pub fn scan_i2c(&mut self, bus: u8) -> Result<Vec<u8, 128>, BusError> {
        self.gpio.i2c_mut().find_devices(bus)
    }

    /// ROM codes present on 1-Wire bus `bus`.
    pub fn scan_onewire(&mut self, bus: u8) -> Result<Vec<RomHex, ONEWIRE_MAX_DEVICES>, OneWireError> {
        self.onewire.find_devices(bus)
    }
}

impl<G, I, W: OneWire> fmt::Debug for Board<G, I, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Board")
            .field("profile", &self.profile.name)
            .field("healthy", &self.healthy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{MockGpio, MockI2c, MockOneWire};
    use crate::onewire::RomAddress;
    use crate::profile::boards::{DEVKIT, PLC_ESP32_V1};

    fn board_rom() -> RomAddress {
        RomAddress([0x28, 0xFF, 0x64, 0x1E, 0x87, 0x16, 0x03, 0xD7])
    }

    #[test]
    fn full_board_comes_up() {
        let mut board = Board::begin(
            PLC_ESP32_V1,
            MockGpio::new(),
            |_, hz| {
                assert_eq!(hz, crate::i2c::I2C_CLOCK_HZ);
                Ok::<_, ()>(MockI2c::new().with_device(0x20).with_device(0x21))
            },
            |_| Ok::<_, ()>(MockOneWire::new().with_sensor(board_rom(), 25.0)),
        );
        assert!(board.healthy());
        assert_eq!(board.i2c_buses().count(), 1);
        assert_eq!(board.onewire_buses().count(), 1);
        assert_eq!(board.pins().count(), PLC_ESP32_V1.gpio.len());
        assert_eq!(board.scan_i2c(1).unwrap().as_slice(), &[0x20, 0x21]);
        assert_eq!(board.scan_onewire(1).unwrap()[0].as_str(), "28FF641E871603D7");
    }

    #[test]
    fn relays_boot_low_on_the_expander() {
        let mut board = Board::begin(
            PLC_ESP32_V1,
            MockGpio::new(),
            |_, _| Ok::<_, ()>(MockI2c::new().with_device(0x20).with_device(0x21)),
            |_| Ok::<_, ()>(MockOneWire::new()),
        );
        let bus = board.gpio.i2c().bus(1).unwrap().handle();
        assert_eq!(bus.latch(0x20), Some(0x00));
        // button bank stays released so the lines can be read
        assert_eq!(bus.latch(0x21), Some(0xFF));
        for relay in 9..=16 {
            assert_eq!(board.gpio.state(relay), Ok(false));
        }
    }

    #[test]
    fn missing_extender_degrades() {
        let board = Board::begin(
            PLC_ESP32_V1,
            MockGpio::new(),
            |_, _| Ok::<_, ()>(MockI2c::new().with_device(0x21)),
            |_| Ok::<_, ()>(MockOneWire::new()),
        );
        assert!(!board.healthy());
        let inactive: std::vec::Vec<u8> = board.extenders().filter(|e| !e.active()).map(|e| e.id()).collect();
        assert_eq!(inactive, [1]);
        // relay pins stay registered
        assert!(board.gpio.pin(9).is_some());
    }

    #[test]
    fn failed_bus_degrades() {
        let board: Board<MockGpio, MockI2c, MockOneWire> = Board::begin(
            PLC_ESP32_V1,
            MockGpio::new(),
            |_, _| Err("no bus"),
            |_| Err("no line"),
        );
        assert!(!board.healthy());
        assert_eq!(board.i2c_buses().count(), 0);
        assert_eq!(board.onewire_buses().count(), 0);
        assert!(board.extenders().all(|e| !e.active()));
    }

    #[test]
    fn devkit_needs_no_buses() {
        let board: Board<MockGpio, MockI2c, MockOneWire> = Board::begin(
            DEVKIT,
            MockGpio::new(),
            |_, _| Ok::<_, ()>(MockI2c::new()),
            |_| Ok::<_, ()>(MockOneWire::new()),
        );
        assert!(board.healthy());
        assert_eq!(board.profile().name, DEVKIT.name);
    }
}
