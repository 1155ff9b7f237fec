//! # rs-plc
//!
//! Firmware core for a modular PLC: relays, digital inputs and DS18B20
//! temperature sensors behind a layered hardware abstraction, driven by a
//! cooperative round-robin main loop.
//!
//! ## Features
//!
//! - **Board profiles**: every bus, expander and pin of a hardware revision
//!   is compiled-in data; the control code never names a physical pin
//! - **One pin contract**: native pins and PCF8574-style expander lines are
//!   addressed by the same logical id
//! - **Relay sockets**: debounced push buttons toggle relays, states survive
//!   reboots
//! - **Temperature polling**: round-robin DS18B20 sampling with a sentinel
//!   value for failed sensors
//! - **Supervisor**: alarm LED, buzzer, board fan and status display
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - Hardware seams (native GPIO, 1-Wire line, EEPROM, clock, display)
//! - `i2c`, `onewire` - Bus managers
//! - `extender` - I2C I/O expanders
//! - `gpio` - Logical pin table over native and expander pins
//! - `profile` - Static board descriptions
//! - `board` - Bring-up sequence for a profile
//! - `plc`, `socket`, `meteo` - Controllers ticked by the main loop
//! - `storage` - Socket state persistence (EEPROM bitmap or JSON file)
//! - `hal` - Concrete implementations (mock for testing, esp32 for hardware)
//!
//! ## Example
//!
//! ```rust
//! use rs_plc::{
//!     Board, Config, MeteoController, PlcSupervisor, SocketController, SocketPersistence,
//!     SocketSettings,
//!     hal::{MockDisplay, MockEeprom, MockGpio, MockI2c, MockOneWire},
//!     profile::boards::PLC_ESP32_V1,
//!     storage::EepromSocketDb,
//! };
//!
//! let mut board = Board::begin(
//!     PLC_ESP32_V1,
//!     MockGpio::new(),
//!     |_, _| Ok::<_, ()>(MockI2c::new().with_device(0x20).with_device(0x21)),
//!     |_| Ok::<_, ()>(MockOneWire::new()),
//! );
//!
//! let config = Config::default().with_socket_entry(SocketSettings::new(0, "Kitchen", 9));
//! let store = SocketPersistence::new().with_store(EepromSocketDb::new(MockEeprom::new(512)));
//!
//! let mut plc = PlcSupervisor::new(config.plc, "PLC", MockDisplay::new());
//! let mut sockets = SocketController::new(config.socket, store);
//! let mut meteo = MeteoController::new(config.meteo);
//!
//! plc.begin(&PLC_ESP32_V1.plc, &mut board.gpio, &mut board.onewire, 0);
//! sockets.begin(&config.sockets, &mut board.gpio);
//! meteo.begin(&config.sensors, &board.onewire, 0);
//!
//! // main loop pass
//! let now = 20;
//! plc.tick(now, &mut board.gpio, &mut board.onewire);
//! sockets.tick(now, &mut board.gpio);
//! meteo.tick(now, &mut board.onewire);
//!
//! sockets.set_status(0, true, true, &mut board.gpio).unwrap();
//! assert_eq!(board.gpio.state(9), Ok(true));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

/// Fixed-capacity tables indexed by stable ids.
pub mod arena;
/// Board bring-up from a static profile.
pub mod board;
/// Shared configuration system for desktop and ESP32.
pub mod config;
/// I2C I/O expanders.
pub mod extender;
/// Logical pin table over native and expander pins.
pub mod gpio;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// I2C bus manager.
pub mod i2c;
/// Round-robin DS18B20 temperature polling.
pub mod meteo;
/// 1-Wire bus manager and DS18B20 protocol.
pub mod onewire;
/// Alarm, buzzer, fan and status display supervisor.
pub mod plc;
/// Static board descriptions.
pub mod profile;
/// Relay sockets with debounced push buttons.
pub mod socket;
/// Socket state persistence backends.
pub mod storage;
/// Millisecond interval timers.
pub mod timer;
/// Core traits for hardware abstraction.
pub mod traits;

// Re-exports for convenience
pub use board::Board;
pub use extender::{Extender, ExtenderError, ExtenderManager};
pub use gpio::{GpioManager, GpioPin, PinError, PinKind, PinLocation, PinMode, Pull};
pub use i2c::{BusError, I2cManager};
pub use meteo::{MeteoController, MeteoEvent, MeteoPhase, SENSOR_ERROR_VALUE};
pub use onewire::{OneWireError, OneWireManager, RomAddress};
pub use plc::{PlcMod, PlcPhase, PlcSupervisor};
pub use profile::{BoardProfile, ProfileError};
pub use socket::{SocketController, SocketError, SocketEvent};
pub use storage::{SocketPersistence, SocketStateStore, StoreError};
pub use timer::Interval;
pub use traits::{
    // Hardware
    Clock,
    Eeprom,
    IoMode,
    NativeGpio,
    OneWire,
    // Display
    NoDisplay,
    StatusDisplay,
};

// Config re-exports
pub use config::{
    Config, DeviceConfig, MeteoConfig, NetworkConfig, PlcConfig, SensorSettings, SocketConfig,
    SocketSettings,
};
