//! Static board description.
//!
//! A [`BoardProfile`] declares every interface a hardware revision carries
//! (I2C and 1-Wire buses, I/O expanders, GPIO pins, SPI and UART buses) and
//! which logical pins take the fixed PLC roles. Profiles are `const` data;
//! swapping hardware means swapping the profile, not the control code.
//!
//! Compiled-in profiles live in [`boards`].
//!
//! # Example
//!
//! ```rust
//! use rs_plc::profile::boards::PLC_ESP32_V1;
//!
//! assert!(PLC_ESP32_V1.validate().is_ok());
//! assert_eq!(PLC_ESP32_V1.extenders.len(), 2);
//! ```

pub mod boards;

use crate::gpio::{PinKind, PinMode, Pull, GPIO_MAX_PINS};
use crate::onewire::RomAddress;

/// Maximum I2C buses in a profile.
pub const PROFILE_MAX_I2C: usize = 2;
/// Maximum 1-Wire buses in a profile.
pub const PROFILE_MAX_ONEWIRE: usize = 2;
/// Maximum extenders in a profile.
pub const PROFILE_MAX_EXTENDERS: usize = 10;
/// Maximum GPIO entries in a profile.
pub const PROFILE_MAX_GPIO: usize = 40;
/// Maximum SPI buses in a profile.
pub const PROFILE_MAX_SPI: usize = 2;
/// Maximum UART buses in a profile.
pub const PROFILE_MAX_UART: usize = 1;
/// Lines per extender chip.
pub const EXTENDER_PINS: u8 = 8;

/// Declared I2C bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct I2cProfile {
    /// Bus id referenced by extenders.
    pub id: u8,
    /// Data pin.
    pub sda: u8,
    /// Clock pin.
    pub scl: u8,
    /// Whether the bus is brought up.
    pub enabled: bool,
}

/// Declared 1-Wire bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OneWireProfile {
    /// Bus id.
    pub id: u8,
    /// Data pin.
    pub pin: u8,
    /// Whether the bus is brought up.
    pub enabled: bool,
}

/// Declared I/O expander chip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExtenderProfile {
    /// Extender id, starting at 1 (0 means native in GPIO entries).
    pub id: u8,
    /// Owning I2C bus id.
    pub i2c: u8,
    /// 7-bit device address.
    pub address: u8,
    /// Whether the chip is brought up at boot.
    pub enabled: bool,
}

/// Declared logical pin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GpioProfile {
    /// Logical pin id.
    pub id: u8,
    /// Physical pin number, or sub-pin (0-7) when `ext` is non-zero.
    pub pin: u8,
    /// Role of the pin.
    pub kind: PinKind,
    /// Direction applied at boot.
    pub mode: PinMode,
    /// Pull resistor applied at boot.
    pub pull: Pull,
    /// Owning extender id, 0 for a native pin.
    pub ext: u8,
    /// Whether the pin is usable.
    pub enabled: bool,
}

impl GpioProfile {
    /// Native output pin.
    pub const fn native_output(id: u8, pin: u8, kind: PinKind) -> Self {
        Self {
            id,
            pin,
            kind,
            mode: PinMode::Output,
            pull: Pull::None,
            ext: 0,
            enabled: true,
        }
    }

    /// Native input pin with pull-up.
    pub const fn native_input(id: u8, pin: u8, kind: PinKind) -> Self {
        Self {
            id,
            pin,
            kind,
            mode: PinMode::Input,
            pull: Pull::Up,
            ext: 0,
            enabled: true,
        }
    }

    /// Extender output line.
    pub const fn ext_output(id: u8, ext: u8, subpin: u8, kind: PinKind) -> Self {
        Self {
            id,
            pin: subpin,
            kind,
            mode: PinMode::Output,
            pull: Pull::None,
            ext,
            enabled: true,
        }
    }

    /// Extender input line (quasi-bidirectional, pulled up).
    pub const fn ext_input(id: u8, ext: u8, subpin: u8, kind: PinKind) -> Self {
        Self {
            id,
            pin: subpin,
            kind,
            mode: PinMode::Input,
            pull: Pull::Up,
            ext,
            enabled: true,
        }
    }
}

/// Declared SPI bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpiProfile {
    /// Bus id.
    pub id: u8,
    /// Clock pin.
    pub sck: u8,
    /// Controller-in pin.
    pub miso: u8,
    /// Controller-out pin.
    pub mosi: u8,
    /// Chip-select pin.
    pub cs: u8,
    /// Whether the bus is used.
    pub enabled: bool,
}

/// Declared UART.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UartProfile {
    /// Bus id.
    pub id: u8,
    /// Receive pin.
    pub rx: u8,
    /// Transmit pin.
    pub tx: u8,
    /// Line speed.
    pub baud: u32,
    /// Whether the UART is used.
    pub enabled: bool,
}

/// Indicator LED that mirrors a relay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RelayLed {
    /// Relay pin id.
    pub relay: u8,
    /// LED pin id.
    pub led: u8,
}

/// On-board temperature sensor used for fan control.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoardSensor {
    /// 1-Wire bus id.
    pub bus: u8,
    /// ROM code of the DS18B20.
    pub address: RomAddress,
}

/// Fixed PLC pin roles, as logical pin ids. `None` means not fitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlcPins {
    /// Alarm LED.
    pub alarm_led: Option<u8>,
    /// Power/status LED.
    pub status_led: Option<u8>,
    /// Buzzer.
    pub buzzer: Option<u8>,
    /// Cooling fan.
    pub fan: Option<u8>,
    /// Front panel buttons.
    pub buttons: [Option<u8>; 3],
    /// Relay indicator LEDs.
    pub relay_leds: &'static [RelayLed],
    /// Board temperature sensor.
    pub board_sensor: Option<BoardSensor>,
}

impl PlcPins {
    /// Board with no PLC role pins fitted.
    pub const NONE: Self = Self {
        alarm_led: None,
        status_led: None,
        buzzer: None,
        fan: None,
        buttons: [None; 3],
        relay_leds: &[],
        board_sensor: None,
    };

    fn role_pins(&self) -> impl Iterator<Item = (&'static str, u8)> + '_ {
        let singles = [
            ("alarm LED", self.alarm_led),
            ("status LED", self.status_led),
            ("buzzer", self.buzzer),
            ("fan", self.fan),
            ("button 1", self.buttons[0]),
            ("button 2", self.buttons[1]),
            ("button 3", self.buttons[2]),
        ];
        singles
            .into_iter()
            .filter_map(|(role, pin)| pin.map(|p| (role, p)))
            .chain(
                self.relay_leds
                    .iter()
                    .flat_map(|rl| [("indicated relay", rl.relay), ("relay LED", rl.led)]),
            )
    }
}

/// Network defaults for a hardware revision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NetworkDefaults {
    /// Hostname announced on the network.
    pub hostname: &'static str,
    /// SSID of the configuration access point.
    pub ap_ssid: &'static str,
    /// Whether the board has an Ethernet PHY.
    pub ethernet: bool,
    /// Whether the board has a GSM modem.
    pub gsm: bool,
}

/// Inconsistency found by [`BoardProfile::validate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    /// A table holds more entries than the hardware model allows.
    #[error("{table}: {count} entries, at most {max}")]
    TooMany {
        /// Table name.
        table: &'static str,
        /// Declared entries.
        count: usize,
        /// Allowed entries.
        max: usize,
    },
    /// Two entries of one table share an id.
    #[error("{table}: id {id} declared twice")]
    DuplicateId {
        /// Table name.
        table: &'static str,
        /// Repeated id.
        id: u8,
    },
    /// Extender ids start at 1.
    #[error("extender id 0 is reserved for native pins")]
    ReservedExtenderId,
    /// Extender on an undeclared I2C bus.
    #[error("extender {extender} references unknown I2C bus {bus}")]
    UnknownI2cBus {
        /// Extender id.
        extender: u8,
        /// Referenced bus.
        bus: u8,
    },
    /// Pin on an undeclared extender.
    #[error("pin {pin} references unknown extender {ext}")]
    UnknownExtender {
        /// Pin id.
        pin: u8,
        /// Referenced extender.
        ext: u8,
    },
    /// Pin id beyond the runtime table.
    #[error("pin id {0} exceeds the pin table")]
    PinIdOutOfRange(u8),
    /// Extender line beyond the chip.
    #[error("pin {pin} uses sub-pin {subpin} of an 8-line extender")]
    SubpinOutOfRange {
        /// Pin id.
        pin: u8,
        /// Declared sub-pin.
        subpin: u8,
    },
    /// PLC role bound to an undeclared pin.
    #[error("{role} bound to undeclared pin {pin}")]
    UnknownRolePin {
        /// Role name.
        role: &'static str,
        /// Referenced pin id.
        pin: u8,
    },
    /// Board sensor on an undeclared 1-Wire bus.
    #[error("board sensor references unknown 1-Wire bus {0}")]
    UnknownOneWireBus(u8),
}

/// Complete description of one hardware revision.
#[derive(Clone, Copy, Debug)]
pub struct BoardProfile {
    /// Board name, shown on the status display.
    pub name: &'static str,
    /// I2C buses.
    pub i2c: &'static [I2cProfile],
    /// 1-Wire buses.
    pub onewire: &'static [OneWireProfile],
    /// I/O expanders.
    pub extenders: &'static [ExtenderProfile],
    /// Logical pins.
    pub gpio: &'static [GpioProfile],
    /// SPI buses.
    pub spi: &'static [SpiProfile],
    /// UARTs.
    pub uart: &'static [UartProfile],
    /// PLC role assignments.
    pub plc: PlcPins,
    /// Network defaults.
    pub network: NetworkDefaults,
}

impl BoardProfile {
    /// Checks table bounds and cross references.
    ///
    /// Reports the first inconsistency found.
    pub fn validate(&self) -> Result<(), ProfileError> {
        bounded("i2c", self.i2c.len(), PROFILE_MAX_I2C)?;
        bounded("onewire", self.onewire.len(), PROFILE_MAX_ONEWIRE)?;
        bounded("extenders", self.extenders.len(), PROFILE_MAX_EXTENDERS)?;
        bounded("gpio", self.gpio.len(), PROFILE_MAX_GPIO)?;
        bounded("spi", self.spi.len(), PROFILE_MAX_SPI)?;
        bounded("uart", self.uart.len(), PROFILE_MAX_UART)?;

        unique("i2c", self.i2c.iter().map(|b| b.id))?;
        unique("onewire", self.onewire.iter().map(|b| b.id))?;
        unique("extenders", self.extenders.iter().map(|e| e.id))?;
        unique("gpio", self.gpio.iter().map(|p| p.id))?;

        for ext in self.extenders {
            if ext.id == 0 {
                return Err(ProfileError::ReservedExtenderId);
            }
            if !self.i2c.iter().any(|b| b.id == ext.i2c) {
                return Err(ProfileError::UnknownI2cBus {
                    extender: ext.id,
                    bus: ext.i2c,
                });
            }
        }

        for pin in self.gpio {
            if usize::from(pin.id) >= GPIO_MAX_PINS {
                return Err(ProfileError::PinIdOutOfRange(pin.id));
            }
            if pin.ext == 0 {
                continue;
            }
            if !self.extenders.iter().any(|e| e.id == pin.ext) {
                return Err(ProfileError::UnknownExtender {
                    pin: pin.id,
                    ext: pin.ext,
                });
            }
            if pin.pin >= EXTENDER_PINS {
                return Err(ProfileError::SubpinOutOfRange {
                    pin: pin.id,
                    subpin: pin.pin,
                });
            }
        }

        for (role, id) in self.plc.role_pins() {
            if self.gpio_entry(id).is_none() {
                return Err(ProfileError::UnknownRolePin { role, pin: id });
            }
        }
        if let Some(sensor) = self.plc.board_sensor {
            if !self.onewire.iter().any(|b| b.id == sensor.bus) {
                return Err(ProfileError::UnknownOneWireBus(sensor.bus));
            }
        }
        Ok(())
    }

    /// GPIO entry by logical id.
    pub fn gpio_entry(&self, id: u8) -> Option<&GpioProfile> {
        self.gpio.iter().find(|p| p.id == id)
    }
}

fn bounded(table: &'static str, count: usize, max: usize) -> Result<(), ProfileError> {
    if count > max {
        return Err(ProfileError::TooMany { table, count, max });
    }
    Ok(())
}

fn unique(table: &'static str, ids: impl Iterator<Item = u8> + Clone) -> Result<(), ProfileError> {
    for (i, id) in ids.clone().enumerate() {
        if ids.clone().skip(i + 1).any(|other| other == id) {
            return Err(ProfileError::DuplicateId { table, id });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUS: [I2cProfile; 1] = [I2cProfile {
        id: 1,
        sda: 21,
        scl: 22,
        enabled: true,
    }];

    const EXT: [ExtenderProfile; 1] = [ExtenderProfile {
        id: 1,
        i2c: 1,
        address: 0x20,
        enabled: true,
    }];

    fn profile(gpio: &'static [GpioProfile]) -> BoardProfile {
        BoardProfile {
            gpio,
            ..boards::DEVKIT
        }
    }

    #[test]
    fn compiled_profiles_are_consistent() {
        assert_eq!(boards::PLC_ESP32_V1.validate(), Ok(()));
        assert_eq!(boards::DEVKIT.validate(), Ok(()));
    }

    #[test]
    fn extender_on_unknown_bus_rejected() {
        static BAD: [ExtenderProfile; 1] = [ExtenderProfile {
            id: 1,
            i2c: 2,
            address: 0x20,
            enabled: true,
        }];
        let p = BoardProfile {
            i2c: &BUS,
            extenders: &BAD,
            ..boards::DEVKIT
        };
        assert_eq!(
            p.validate(),
            Err(ProfileError::UnknownI2cBus {
                extender: 1,
                bus: 2
            })
        );
    }

    #[test]
    fn pin_on_unknown_extender_rejected() {
        static PINS: [GpioProfile; 1] = [GpioProfile::ext_output(9, 3, 0, PinKind::Relay)];
        let p = BoardProfile {
            i2c: &BUS,
            extenders: &EXT,
            ..profile(&PINS)
        };
        assert_eq!(
            p.validate(),
            Err(ProfileError::UnknownExtender { pin: 9, ext: 3 })
        );
    }

    #[test]
    fn subpin_beyond_chip_rejected() {
        static PINS: [GpioProfile; 1] = [GpioProfile::ext_output(9, 1, 8, PinKind::Relay)];
        let p = BoardProfile {
            i2c: &BUS,
            extenders: &EXT,
            ..profile(&PINS)
        };
        assert_eq!(
            p.validate(),
            Err(ProfileError::SubpinOutOfRange { pin: 9, subpin: 8 })
        );
    }

    #[test]
    fn duplicate_pin_id_rejected() {
        static PINS: [GpioProfile; 2] = [
            GpioProfile::native_output(5, 2, PinKind::Generic),
            GpioProfile::native_output(5, 4, PinKind::Generic),
        ];
        assert_eq!(
            profile(&PINS).validate(),
            Err(ProfileError::DuplicateId {
                table: "gpio",
                id: 5
            })
        );
    }

    #[test]
    fn pin_id_beyond_table_rejected() {
        static PINS: [GpioProfile; 1] = [GpioProfile::native_output(200, 2, PinKind::Generic)];
        assert_eq!(
            profile(&PINS).validate(),
            Err(ProfileError::PinIdOutOfRange(200))
        );
    }

    #[test]
    fn role_on_undeclared_pin_rejected() {
        let p = BoardProfile {
            plc: PlcPins {
                buzzer: Some(99),
                ..PlcPins::NONE
            },
            ..boards::DEVKIT
        };
        assert_eq!(
            p.validate(),
            Err(ProfileError::UnknownRolePin {
                role: "buzzer",
                pin: 99
            })
        );
    }

    #[test]
    fn too_many_buses_rejected() {
        static BUSES: [I2cProfile; 3] = [
            I2cProfile {
                id: 1,
                sda: 21,
                scl: 22,
                enabled: true,
            },
            I2cProfile {
                id: 2,
                sda: 16,
                scl: 17,
                enabled: true,
            },
            I2cProfile {
                id: 3,
                sda: 18,
                scl: 19,
                enabled: true,
            },
        ];
        let p = BoardProfile {
            i2c: &BUSES,
            ..boards::DEVKIT
        };
        assert_eq!(
            p.validate(),
            Err(ProfileError::TooMany {
                table: "i2c",
                count: 3,
                max: 2
            })
        );
    }
}
