//! 1-Wire bus manager and DS18B20 access.
//!
//! Owns the 1-Wire lines declared by the board profile (at most
//! [`ONEWIRE_MAX_BUSES`]). Each line is driven by [`one_wire_bus`]:
//! slot timing, the `0xF0` ROM search and the Dallas/Maxim CRC-8 come from
//! there, the DS18B20 command set from [`ds18b20`]. This module adds the bus
//! table, hex ROM codes and the read-failure classification the meteo and
//! PLC controllers rely on.
//!
//! # Example
//!
//! ```rust
//! use rs_plc::onewire::{OneWireManager, RomAddress};
//! use rs_plc::profile::OneWireProfile;
//! use rs_plc::hal::MockOneWire;
//!
//! let rom = RomAddress::from_hex("28FF641E871603D7").unwrap();
//! let declared = [OneWireProfile { id: 1, pin: 4, enabled: true }];
//!
//! let mut onewire = OneWireManager::new();
//! onewire.begin(&declared, |_| Ok::<_, ()>(MockOneWire::new().with_sensor(rom, 21.5)));
//!
//! let found = onewire.find_devices(1).unwrap();
//! assert_eq!(found[0].as_str(), "28FF641E871603D7");
//!
//! onewire.request_temperatures(1).unwrap();
//! assert_eq!(onewire.read_temperature(1, &rom).unwrap(), 21.5);
//! ```

use core::fmt;

use ds18b20::Ds18b20;
use embedded_hal_0_2::blocking::delay::DelayUs;
use embedded_hal_0_2::digital::v2::{InputPin, OutputPin};
use heapless::{String, Vec};
use log::{debug, error, info, warn};
use one_wire_bus::crc::{check_crc8, crc8};
use one_wire_bus::{Address, OneWireResult};

use crate::profile::OneWireProfile;
use crate::traits::OneWire;

/// Maximum number of 1-Wire buses.
pub const ONEWIRE_MAX_BUSES: usize = 2;

/// Maximum number of devices returned by a search.
pub const ONEWIRE_MAX_DEVICES: usize = 32;

/// DS18B20 family code.
pub const FAMILY_DS18B20: u8 = ds18b20::FAMILY_CODE;

/// Hex text of a ROM code.
pub type RomHex = String<16>;

/// Errors raised by bus lookup, search and sensor access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum OneWireError {
    /// No bus with this id was brought up.
    #[error("1-Wire bus {0} not found")]
    Unknown(u8),
    /// The bus exists but is administratively disabled.
    #[error("1-Wire bus {0} is disabled")]
    Disabled(u8),
    /// Reset pulse got no presence answer.
    #[error("no presence pulse on 1-Wire bus {0}")]
    NoPresence(u8),
    /// Line driver failure.
    #[error("1-Wire bus {0} line error")]
    Line(u8),
    /// ROM code does not belong to a DS18B20.
    #[error("device {0} is not a DS18B20")]
    WrongFamily(RomAddress),
    /// Addressed device did not answer (all-ones scratchpad).
    #[error("device {0} not responding")]
    NotResponding(RomAddress),
    /// Scratchpad failed its CRC.
    #[error("CRC mismatch reading {0}")]
    Crc(RomAddress),
    /// Scratchpad still holds the power-on value; no conversion has run.
    #[error("device {0} has not converted since power-on")]
    PowerOnValue(RomAddress),
}

/// 64-bit ROM code: family byte, 48-bit serial, CRC.
///
/// Bytes are kept in wire order, so the family code comes first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RomAddress(pub [u8; 8]);

impl RomAddress {
    /// Builds a ROM code from its family and serial, appending the CRC.
    pub fn new(family: u8, serial: [u8; 6]) -> Self {
        let mut bytes = [family, 0, 0, 0, 0, 0, 0, 0];
        bytes[1..7].copy_from_slice(&serial);
        bytes[7] = crc8(&bytes[..7]);
        Self(bytes)
    }

    /// Family code (first byte).
    #[inline]
    pub const fn family(&self) -> u8 {
        self.0[0]
    }

    /// True when the last byte is the CRC-8 of the first seven.
    pub fn crc_valid(&self) -> bool {
        check_crc8::<()>(&self.0).is_ok()
    }

    /// Uppercase hex, first ROM byte first.
    pub fn to_hex(&self) -> RomHex {
        let mut s = RomHex::new();
        let _ = fmt::write(&mut s, format_args!("{}", self));
        s
    }

    /// Parses 16 hex digits (case-insensitive).
    pub fn from_hex(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.len() != 16 || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let mut bytes = [0u8; 8];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&text[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Self(bytes))
    }

    /// The address as `one_wire_bus` transmits it.
    pub fn address(&self) -> Address {
        Address(u64::from_le_bytes(self.0))
    }
}

impl From<Address> for RomAddress {
    fn from(address: Address) -> Self {
        Self(address.0.to_le_bytes())
    }
}

impl fmt::Display for RomAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{:02X}", b)?;
        }
        Ok(())
    }
}

/// Runtime record of one 1-Wire line.
pub struct OneWireBus<W: OneWire> {
    id: u8,
    pin: u8,
    enabled: bool,
    line: one_wire_bus::OneWire<W::Pin>,
    delay: W::Delay,
}

impl<W: OneWire> OneWireBus<W> {
    /// Bus id from the board profile.
    #[inline]
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Physical data pin.
    #[inline]
    pub fn pin(&self) -> u8 {
        self.pin
    }

    /// Whether transfers are allowed.
    #[inline]
    pub fn enabled(&self) -> bool {
        self.enabled
    }
}

impl<W: OneWire> fmt::Debug for OneWireBus<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneWireBus")
            .field("id", &self.id)
            .field("pin", &self.pin)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

/// Owner of all 1-Wire lines.
#[derive(Debug)]
pub struct OneWireManager<W: OneWire> {
    buses: Vec<OneWireBus<W>, ONEWIRE_MAX_BUSES>,
}

impl<W: OneWire> Default for OneWireManager<W> {
    fn default() -> Self {
        Self { buses: Vec::new() }
    }
}

impl<W: OneWire> OneWireManager<W> {
    /// Creates a manager with no buses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Brings up every enabled bus declared in `declared`.
    ///
    /// Returns `false` if any declared bus failed to open.
    pub fn begin<F, E>(&mut self, declared: &[OneWireProfile], mut open: F) -> bool
    where
        F: FnMut(&OneWireProfile) -> Result<W, E>,
        E: fmt::Debug,
    {
        let mut ok = true;
        for profile in declared {
            if !profile.enabled {
                debug!("1-Wire bus {} disabled in profile", profile.id);
                continue;
            }
            let line = match open(profile) {
                Ok(line) => line,
                Err(e) => {
                    error!("1-Wire bus {} failed to initialize: {:?}", profile.id, e);
                    ok = false;
                    continue;
                }
            };
            let (pin, delay) = line.into_parts();
            let line = match one_wire_bus::OneWire::new(pin) {
                Ok(line) => line,
                Err(e) => {
                    error!("1-Wire bus {} cannot release its line: {:?}", profile.id, e);
                    ok = false;
                    continue;
                }
            };
            let bus = OneWireBus {
                id: profile.id,
                pin: profile.pin,
                enabled: true,
                line,
                delay,
            };
            if self.buses.push(bus).is_err() {
                error!("1-Wire bus {}: more than {} buses", profile.id, ONEWIRE_MAX_BUSES);
                ok = false;
                continue;
            }
            info!("1-Wire bus {} up on pin {}", profile.id, profile.pin);
        }
        ok
    }

    /// Bus by id.
    pub fn bus(&self, id: u8) -> Option<&OneWireBus<W>> {
        self.buses.iter().find(|b| b.id == id)
    }

    /// Enabled bus by id, ready for transfers.
    pub fn bus_mut(&mut self, id: u8) -> Result<&mut OneWireBus<W>, OneWireError> {
        let bus = self
            .buses
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(OneWireError::Unknown(id))?;
        if !bus.enabled {
            return Err(OneWireError::Disabled(id));
        }
        Ok(bus)
    }

    /// All buses that were brought up.
    pub fn buses(&self) -> impl Iterator<Item = &OneWireBus<W>> {
        self.buses.iter()
    }

    /// Enables or disables transfers on a bus.
    pub fn set_enabled(&mut self, id: u8, enabled: bool) -> Result<(), OneWireError> {
        let bus = self
            .buses
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(OneWireError::Unknown(id))?;
        bus.enabled = enabled;
        Ok(())
    }

    /// ROM codes of every device on the bus, CRC-checked.
    pub fn search(&mut self, id: u8) -> Result<Vec<RomAddress, ONEWIRE_MAX_DEVICES>, OneWireError> {
        let bus = self.bus_mut(id)?;
        let mut found = Vec::new();
        if !bus.line.reset(&mut bus.delay).map_err(|_| OneWireError::Line(id))? {
            return Ok(found);
        }

        let mut state = None;
        loop {
            let (address, next) = match bus.line.device_search(state.as_ref(), false, &mut bus.delay) {
                Ok(Some(hit)) => hit,
                Ok(None) => break,
                Err(one_wire_bus::OneWireError::CrcMismatch) => {
                    warn!("1-Wire bus {}: search stopped at a ROM with bad CRC", id);
                    break;
                }
                Err(e) => {
                    warn!("1-Wire bus {}: search aborted: {:?}", id, e);
                    return Err(OneWireError::Line(id));
                }
            };
            state = Some(next);
            let rom = RomAddress::from(address);
            if !rom.crc_valid() {
                warn!("1-Wire bus {}: skipping ROM {} with bad CRC", id, rom);
                continue;
            }
            if found.push(rom).is_err() {
                warn!("1-Wire bus {}: more than {} devices", id, ONEWIRE_MAX_DEVICES);
                break;
            }
        }
        Ok(found)
    }

    /// Uppercase hex ROM codes of every device on the bus.
    ///
    /// An empty list is a valid answer, not an error.
    pub fn find_devices(&mut self, id: u8) -> Result<Vec<RomHex, ONEWIRE_MAX_DEVICES>, OneWireError> {
        let roms = self.search(id)?;
        Ok(roms.iter().map(RomAddress::to_hex).collect())
    }

    /// Starts a temperature conversion on every DS18B20 of the bus.
    pub fn request_temperatures(&mut self, id: u8) -> Result<(), OneWireError> {
        let bus = self.bus_mut(id)?;
        if !bus.line.reset(&mut bus.delay).map_err(|_| OneWireError::Line(id))? {
            return Err(OneWireError::NoPresence(id));
        }
        ds18b20::start_simultaneous_temp_measurement(&mut bus.line, &mut bus.delay)
            .map_err(|_| OneWireError::Line(id))
    }

    /// Reads the last converted temperature of one DS18B20, in °C.
    pub fn read_temperature(&mut self, id: u8, rom: &RomAddress) -> Result<f32, OneWireError> {
        let bus = self.bus_mut(id)?;
        Ds18b20::new::<()>(rom.address()).map_err(|_| OneWireError::WrongFamily(*rom))?;
        let pad = read_scratchpad(&mut bus.line, &mut bus.delay, &rom.address())
            .map_err(|_| OneWireError::Line(id))?;
        let Some(pad) = pad else {
            return Err(OneWireError::NoPresence(id));
        };
        if pad.iter().all(|&b| b == 0xFF) {
            return Err(OneWireError::NotResponding(*rom));
        }
        if check_crc8::<()>(&pad).is_err() {
            return Err(OneWireError::Crc(*rom));
        }
        if is_power_on_value(&pad) {
            return Err(OneWireError::PowerOnValue(*rom));
        }
        Ok(decode_temperature(&pad))
    }
}

/// Match ROM + read scratchpad, `None` when nobody answers the reset.
fn read_scratchpad<P, E>(
    line: &mut one_wire_bus::OneWire<P>,
    delay: &mut impl DelayUs<u16>,
    address: &Address,
) -> OneWireResult<Option<[u8; 9]>, E>
where
    P: InputPin<Error = E> + OutputPin<Error = E>,
{
    if !line.reset(delay)? {
        return Ok(None);
    }
    line.match_address(address, delay)?;
    line.write_byte(ds18b20::commands::READ_SCRATCHPAD, delay)?;
    let mut pad = [0u8; 9];
    line.read_bytes(&mut pad, delay)?;
    Ok(Some(pad))
}

/// 85 °C with the reserved byte still at its reset value.
fn is_power_on_value(pad: &[u8; 9]) -> bool {
    pad[0] == 0x50 && pad[1] == 0x05 && pad[6] == 0x0C
}

/// Signed 1/16 °C, with the undefined low bits of 9..11-bit resolution masked.
fn decode_temperature(pad: &[u8; 9]) -> f32 {
    let mut raw = i16::from_le_bytes([pad[0], pad[1]]);
    raw &= match (pad[4] >> 5) & 0x03 {
        0 => !0x07,
        1 => !0x03,
        2 => !0x01,
        _ => !0x00,
    };
    f32::from(raw) / 16.0
}
