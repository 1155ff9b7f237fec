//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for every hardware seam, enabling
//! development and testing on desktop without a PLC board.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockGpio`] | [`NativeGpio`] | Pin levels, mode history, read counts |
//! | [`MockI2c`] | [`embedded_hal::i2c::I2c`] | PCF8574-style expanders by address |
//! | [`MockOneWire`] | [`OneWire`] | Open-drain line with simulated DS18B20s |
//! | [`MockEeprom`] | [`Eeprom`] | Shared byte image that survives "reboots" |
//! | [`MockClock`] | [`Clock`] | Controllable time source |
//! | [`MockDisplay`] | [`StatusDisplay`] | Captures shown lines |
//!
//! # Example
//!
//! ```rust
//! use rs_plc::hal::MockGpio;
//! use rs_plc::traits::{IoMode, NativeGpio};
//!
//! let mut gpio = MockGpio::new();
//! gpio.set_mode(32, IoMode::InputPullUp).unwrap();
//! assert!(gpio.read(32).unwrap()); // pulled up while nothing drives it
//!
//! gpio.set_input(32, false);
//! assert!(!gpio.read(32).unwrap());
//! assert_eq!(gpio.reads(32), 2);
//! ```
//!
//! [`NativeGpio`]: crate::traits::NativeGpio
//! [`OneWire`]: crate::traits::OneWire
//! [`Eeprom`]: crate::traits::Eeprom
//! [`Clock`]: crate::traits::Clock
//! [`StatusDisplay`]: crate::traits::StatusDisplay

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::convert::Infallible;

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use embedded_hal_0_2 as hal02;
use one_wire_bus::crc::crc8;

use crate::onewire::RomAddress;
use crate::traits::{Clock, Eeprom, IoMode, NativeGpio, OneWire, StatusDisplay};

// ============================================================================
// Native GPIO
// ============================================================================

/// Mock native pin bank.
///
/// Writes set the pin level; [`set_input`](Self::set_input) simulates an
/// external driver. An undriven pin configured with a pull-up reads high.
#[derive(Debug, Default)]
pub struct MockGpio {
    levels: BTreeMap<u8, bool>,
    modes: BTreeMap<u8, Vec<IoMode>>,
    read_counts: BTreeMap<u8, usize>,
    /// Number of write() calls across all pins.
    pub write_count: usize,
}

impl MockGpio {
    /// Creates a pin bank with nothing configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forces the level seen by the next reads of `pin`.
    pub fn set_input(&mut self, pin: u8, high: bool) {
        self.levels.insert(pin, high);
    }

    /// Current level of `pin`, `None` if never written or driven.
    pub fn level(&self, pin: u8) -> Option<bool> {
        self.levels.get(&pin).copied()
    }

    /// Last mode applied to `pin`.
    pub fn mode(&self, pin: u8) -> Option<IoMode> {
        self.mode_history(pin).last().copied()
    }

    /// Every mode applied to `pin`, oldest first.
    pub fn mode_history(&self, pin: u8) -> &[IoMode] {
        self.modes.get(&pin).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of hardware reads of `pin`.
    pub fn reads(&self, pin: u8) -> usize {
        self.read_counts.get(&pin).copied().unwrap_or(0)
    }
}

impl NativeGpio for MockGpio {
    type Error = ();

    fn set_mode(&mut self, pin: u8, mode: IoMode) -> Result<(), ()> {
        self.modes.entry(pin).or_default().push(mode);
        Ok(())
    }

    fn write(&mut self, pin: u8, high: bool) -> Result<(), ()> {
        self.levels.insert(pin, high);
        self.write_count += 1;
        Ok(())
    }

    fn read(&mut self, pin: u8) -> Result<bool, ()> {
        *self.read_counts.entry(pin).or_default() += 1;
        let pulled_up = self.mode(pin) == Some(IoMode::InputPullUp);
        Ok(self.level(pin).unwrap_or(pulled_up))
    }
}

// ============================================================================
// I2C
// ============================================================================

#[derive(Clone, Copy, Debug)]
struct MockPort {
    latch: u8,
    inputs: u8,
}

/// Mock I2C bus populated with 8-bit quasi-bidirectional port expanders.
///
/// A write stores its last byte as the port latch; a read returns the latch
/// ANDed with the externally driven levels (all high by default). Addresses
/// without a device answer with a NACK.
///
/// # Example
///
/// ```rust
/// use rs_plc::hal::MockI2c;
/// use embedded_hal::i2c::I2c;
///
/// let mut bus = MockI2c::new().with_device(0x20);
/// bus.write(0x20, &[0xFE]).unwrap();
/// assert_eq!(bus.latch(0x20), Some(0xFE));
/// assert!(bus.write(0x21, &[0x00]).is_err());
/// ```
#[derive(Clone, Debug, Default)]
pub struct MockI2c {
    devices: BTreeMap<u8, MockPort>,
    /// Number of transactions attempted, acknowledged or not.
    pub transfers: usize,
    /// When set, every transaction fails with a bus error.
    pub fail: bool,
}

impl MockI2c {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an expander at `address`.
    pub fn with_device(mut self, address: u8) -> Self {
        self.devices.insert(
            address,
            MockPort {
                latch: 0xFF,
                inputs: 0xFF,
            },
        );
        self
    }

    /// Removes the expander at `address`, as if unplugged.
    pub fn remove_device(&mut self, address: u8) {
        self.devices.remove(&address);
    }

    /// Drives line `subpin` of the expander at `address` externally.
    pub fn set_input(&mut self, address: u8, subpin: u8, high: bool) {
        if let Some(port) = self.devices.get_mut(&address) {
            if high {
                port.inputs |= 1 << subpin;
            } else {
                port.inputs &= !(1 << subpin);
            }
        }
    }

    /// Last byte written to the expander at `address`.
    pub fn latch(&self, address: u8) -> Option<u8> {
        self.devices.get(&address).map(|p| p.latch)
    }
}

impl ErrorType for MockI2c {
    type Error = ErrorKind;
}

impl I2c for MockI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), ErrorKind> {
        self.transfers += 1;
        if self.fail {
            return Err(ErrorKind::Bus);
        }
        let port = self
            .devices
            .get_mut(&address)
            .ok_or(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address))?;
        for op in operations {
            match op {
                Operation::Write(bytes) => {
                    if let Some(&last) = bytes.last() {
                        port.latch = last;
                    }
                }
                Operation::Read(buf) => buf.fill(port.latch & port.inputs),
            }
        }
        Ok(())
    }
}

// ============================================================================
// 1-Wire
// ============================================================================

/// Low pulses at least this long reset every device.
const RESET_MIN_US: u64 = 480;

/// Shorter low pulses are 1 bits or read slots.
const SLOT_ONE_MAX_US: u64 = 15;

/// A device sending a 0 holds the line this long from the slot start.
const DEVICE_HOLD_US: u64 = 45;

/// Presence pulse, relative to the end of the reset pulse.
const PRESENCE_FROM_US: u64 = 15;
const PRESENCE_UNTIL_US: u64 = 240;

#[derive(Clone, Debug)]
struct SimSensor {
    rom: RomAddress,
    celsius: f32,
    converted: bool,
    connected: bool,
}

impl SimSensor {
    fn rom_bit(&self, bit: u8) -> bool {
        self.rom.0[usize::from(bit / 8)] & (1 << (bit % 8)) != 0
    }

    /// Power-on content (85 °C, reserved byte 0x0C) until the first conversion.
    fn scratchpad(&self) -> [u8; 9] {
        let (temp, remain) = if self.converted {
            let scaled = self.celsius * 16.0;
            let raw = (if scaled >= 0.0 { scaled + 0.5 } else { scaled - 0.5 }) as i16;
            let temp = raw.to_le_bytes();
            (temp, 0x10 - (temp[0] & 0x0F))
        } else {
            ([0x50, 0x05], 0x0C)
        };
        let mut pad = [temp[0], temp[1], 0x4B, 0x46, 0x7F, 0xFF, remain, 0x10, 0];
        pad[8] = crc8(&pad[..8]);
        pad
    }

    fn scratchpad_bit(&self, bit: u8) -> bool {
        self.scratchpad()[usize::from(bit / 8)] & (1 << (bit % 8)) != 0
    }
}

#[derive(Clone, Copy, Debug, Default)]
enum Phase {
    #[default]
    Idle,
    RomCommand { byte: u8, bits: u8 },
    MatchRom { bit: u8 },
    Search { bit: u8, slot: u8 },
    Function { byte: u8, bits: u8 },
    Scratchpad { bit: u8 },
}

/// Shared state of a simulated line: the devices, the simulated
/// microsecond clock and who is pulling the line low.
#[derive(Debug, Default)]
struct SimLine {
    sensors: Vec<SimSensor>,
    selected: Vec<bool>,
    phase: Phase,
    now_us: u64,
    master_low_since: Option<u64>,
    device_low: (u64, u64),
    conversions: usize,
    resets: usize,
}

impl SimLine {
    fn is_high(&self) -> bool {
        let (from, until) = self.device_low;
        self.master_low_since.is_none() && !(from..until).contains(&self.now_us)
    }

    fn pull_low(&mut self) {
        if self.master_low_since.is_none() {
            self.master_low_since = Some(self.now_us);
        }
    }

    fn release(&mut self) {
        let Some(since) = self.master_low_since.take() else {
            return;
        };
        let held = self.now_us - since;
        if held >= RESET_MIN_US {
            self.reset();
        } else {
            self.slot(since, held < SLOT_ONE_MAX_US);
        }
    }

    fn reset(&mut self) {
        self.resets += 1;
        self.selected = self.sensors.iter().map(|s| s.connected).collect();
        self.phase = Phase::RomCommand { byte: 0, bits: 0 };
        if self.selected.iter().any(|&s| s) {
            self.device_low = (self.now_us + PRESENCE_FROM_US, self.now_us + PRESENCE_UNTIL_US);
        }
    }

    /// Read slot starting at `start`: wired-AND of every selected device.
    fn answer(&mut self, start: u64, bit: impl Fn(&SimSensor) -> bool) {
        let zero = self
            .sensors
            .iter()
            .zip(&self.selected)
            .any(|(s, &selected)| selected && s.connected && !bit(s));
        if zero {
            self.device_low = (start, start + DEVICE_HOLD_US);
        }
    }

    fn deselect(&mut self, bit: u8, sent: bool) {
        for (s, selected) in self.sensors.iter().zip(self.selected.iter_mut()) {
            if s.rom_bit(bit) != sent {
                *selected = false;
            }
        }
    }

    fn convert(&mut self) {
        self.conversions += 1;
        for (s, &selected) in self.sensors.iter_mut().zip(&self.selected) {
            if selected && s.connected {
                s.converted = true;
            }
        }
    }

    fn slot(&mut self, start: u64, one: bool) {
        let phase = self.phase;
        self.phase = match phase {
            Phase::Idle => Phase::Idle,
            Phase::RomCommand { byte, bits } => {
                let byte = byte | (u8::from(one) << bits);
                if bits < 7 {
                    Phase::RomCommand { byte, bits: bits + 1 }
                } else {
                    match byte {
                        0xF0 => Phase::Search { bit: 0, slot: 0 },
                        0x55 => Phase::MatchRom { bit: 0 },
                        0xCC => Phase::Function { byte: 0, bits: 0 },
                        _ => Phase::Idle,
                    }
                }
            }
            Phase::MatchRom { bit } => {
                self.deselect(bit, one);
                if bit < 63 {
                    Phase::MatchRom { bit: bit + 1 }
                } else {
                    Phase::Function { byte: 0, bits: 0 }
                }
            }
            Phase::Search { bit, slot: 0 } => {
                self.answer(start, |s| s.rom_bit(bit));
                Phase::Search { bit, slot: 1 }
            }
            Phase::Search { bit, slot: 1 } => {
                self.answer(start, |s| !s.rom_bit(bit));
                Phase::Search { bit, slot: 2 }
            }
            Phase::Search { bit, .. } => {
                self.deselect(bit, one);
                if bit < 63 {
                    Phase::Search { bit: bit + 1, slot: 0 }
                } else {
                    Phase::Function { byte: 0, bits: 0 }
                }
            }
            Phase::Function { byte, bits } => {
                let byte = byte | (u8::from(one) << bits);
                if bits < 7 {
                    Phase::Function { byte, bits: bits + 1 }
                } else {
                    match byte {
                        0x44 => {
                            self.convert();
                            Phase::Idle
                        }
                        0xBE => Phase::Scratchpad { bit: 0 },
                        _ => Phase::Idle,
                    }
                }
            }
            Phase::Scratchpad { bit } => {
                self.answer(start, |s| s.scratchpad_bit(bit));
                if bit < 71 {
                    Phase::Scratchpad { bit: bit + 1 }
                } else {
                    Phase::Idle
                }
            }
        };
    }
}

/// Mock 1-Wire line with simulated DS18B20 sensors.
///
/// The line works at the electrical level: [`MockOneWirePin`] pulls it low
/// and releases it, [`MockOneWireDelay`] advances a simulated microsecond
/// clock, and the devices decode reset pulses and time slots from that.
/// They answer ROM search, match/skip ROM, convert and read scratchpad.
///
/// Clones share the same line, so a test can keep one to change sensors
/// after handing another to a bus manager. A sensor reports its power-on
/// scratchpad until the first conversion; a disconnected sensor stays
/// silent.
///
/// # Example
///
/// ```rust
/// use rs_plc::hal::MockOneWire;
/// use rs_plc::onewire::{OneWireManager, RomAddress};
/// use rs_plc::profile::OneWireProfile;
///
/// let rom = RomAddress::from_hex("28FF641E871603D7").unwrap();
/// let line = MockOneWire::new().with_sensor(rom, 20.0);
///
/// let mut onewire = OneWireManager::new();
/// let declared = [OneWireProfile { id: 1, pin: 4, enabled: true }];
/// onewire.begin(&declared, |_| Ok::<_, ()>(line.clone()));
///
/// line.disconnect(&rom);
/// assert!(onewire.find_devices(1).unwrap().is_empty());
/// ```
#[derive(Clone, Debug, Default)]
pub struct MockOneWire {
    line: Rc<RefCell<SimLine>>,
}

impl MockOneWire {
    /// Creates a line with no devices.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a DS18B20 that will convert to `celsius`.
    pub fn with_sensor(self, rom: RomAddress, celsius: f32) -> Self {
        self.line.borrow_mut().sensors.push(SimSensor {
            rom,
            celsius,
            converted: false,
            connected: true,
        });
        self
    }

    /// Changes the temperature a sensor measures.
    ///
    /// Takes effect on the next scratchpad read once the sensor has
    /// converted at least once.
    pub fn set_temperature(&self, rom: &RomAddress, celsius: f32) {
        self.with_sensor_mut(rom, |s| s.celsius = celsius);
    }

    /// Unplugs a sensor.
    pub fn disconnect(&self, rom: &RomAddress) {
        self.with_sensor_mut(rom, |s| {
            s.connected = false;
            s.converted = false;
        });
    }

    /// Plugs a sensor back in. It powers up unconverted.
    pub fn connect(&self, rom: &RomAddress) {
        self.with_sensor_mut(rom, |s| s.connected = true);
    }

    /// Number of convert commands received.
    pub fn conversions(&self) -> usize {
        self.line.borrow().conversions
    }

    /// Number of reset pulses seen.
    pub fn resets(&self) -> usize {
        self.line.borrow().resets
    }

    fn with_sensor_mut(&self, rom: &RomAddress, f: impl FnOnce(&mut SimSensor)) {
        if let Some(s) = self.line.borrow_mut().sensors.iter_mut().find(|s| s.rom == *rom) {
            f(s);
        }
    }
}

impl OneWire for MockOneWire {
    type Error = Infallible;
    type Pin = MockOneWirePin;
    type Delay = MockOneWireDelay;

    fn into_parts(self) -> (MockOneWirePin, MockOneWireDelay) {
        let pin = MockOneWirePin {
            line: Rc::clone(&self.line),
        };
        (pin, MockOneWireDelay { line: self.line })
    }
}

/// Open-drain data pin of a [`MockOneWire`].
#[derive(Debug)]
pub struct MockOneWirePin {
    line: Rc<RefCell<SimLine>>,
}

impl hal02::digital::v2::OutputPin for MockOneWirePin {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Infallible> {
        self.line.borrow_mut().pull_low();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.line.borrow_mut().release();
        Ok(())
    }
}

impl hal02::digital::v2::InputPin for MockOneWirePin {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Infallible> {
        Ok(self.line.borrow().is_high())
    }

    fn is_low(&self) -> Result<bool, Infallible> {
        Ok(!self.line.borrow().is_high())
    }
}

/// Delay of a [`MockOneWire`]: advances the simulated clock, never sleeps.
#[derive(Debug)]
pub struct MockOneWireDelay {
    line: Rc<RefCell<SimLine>>,
}

impl hal02::blocking::delay::DelayUs<u16> for MockOneWireDelay {
    fn delay_us(&mut self, us: u16) {
        self.line.borrow_mut().now_us += u64::from(us);
    }
}

impl hal02::blocking::delay::DelayMs<u16> for MockOneWireDelay {
    fn delay_ms(&mut self, ms: u16) {
        self.line.borrow_mut().now_us += u64::from(ms) * 1000;
    }
}

// ============================================================================
// EEPROM
// ============================================================================

/// Mock EEPROM backed by a shared byte image.
///
/// Clones share the same image, so dropping a store and opening a new one
/// on a clone behaves like a reboot.
///
/// # Example
///
/// ```rust
/// use rs_plc::hal::MockEeprom;
/// use rs_plc::traits::Eeprom;
///
/// let mut a = MockEeprom::new(16);
/// let mut b = a.clone();
/// a.write(0, &[0xA5]).unwrap();
///
/// let mut buf = [0u8; 1];
/// b.read(0, &mut buf).unwrap();
/// assert_eq!(buf, [0xA5]);
/// ```
#[derive(Clone, Debug)]
pub struct MockEeprom {
    image: Rc<RefCell<Vec<u8>>>,
    /// Number of commit() calls on this handle.
    pub commits: usize,
    /// When set, writes and commits fail.
    pub fail: bool,
}

impl MockEeprom {
    /// Creates an erased (all 0xFF) memory of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self {
            image: Rc::new(RefCell::new(vec![0xFF; size])),
            commits: 0,
            fail: false,
        }
    }

    /// Copy of the current image.
    pub fn bytes(&self) -> Vec<u8> {
        self.image.borrow().clone()
    }
}

impl Eeprom for MockEeprom {
    type Error = ();

    fn capacity(&self) -> usize {
        self.image.borrow().len()
    }

    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), ()> {
        let image = self.image.borrow();
        let src = image.get(offset..offset + buf.len()).ok_or(())?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), ()> {
        if self.fail {
            return Err(());
        }
        let mut image = self.image.borrow_mut();
        let dst = image.get_mut(offset..offset + data.len()).ok_or(())?;
        dst.copy_from_slice(data);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), ()> {
        if self.fail {
            return Err(());
        }
        self.commits += 1;
        Ok(())
    }
}

// ============================================================================
// Clock
// ============================================================================

/// Mock clock for testing.
///
/// Provides a controllable time source for testing time-dependent behavior.
///
/// # Example
///
/// ```rust
/// use rs_plc::hal::MockClock;
/// use rs_plc::traits::Clock;
///
/// let mut clock = MockClock::new();
/// clock.set(1000);
/// clock.advance(500);
/// assert_eq!(clock.now_ms(), 1500);
/// ```
#[derive(Debug, Default)]
pub struct MockClock {
    current_ms: u64,
}

impl MockClock {
    /// Creates a new mock clock starting at 0ms.
    pub fn new() -> Self {
        Self { current_ms: 0 }
    }

    /// Sets the current time in milliseconds.
    pub fn set(&mut self, ms: u64) {
        self.current_ms = ms;
    }

    /// Advances the clock by the given duration.
    pub fn advance(&mut self, ms: u64) {
        self.current_ms += ms;
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.current_ms
    }
}

// ============================================================================
// Display
// ============================================================================

/// Mock status display that records what was shown.
///
/// # Example
///
/// ```rust
/// use rs_plc::hal::MockDisplay;
/// use rs_plc::traits::StatusDisplay;
///
/// let mut display = MockDisplay::new();
/// display.show_lines("PLC", "T:21.5C FAN:OFF").unwrap();
/// assert_eq!(display.render_count, 1);
/// assert_eq!(display.line2(), Some("T:21.5C FAN:OFF"));
/// ```
#[derive(Debug, Default)]
pub struct MockDisplay {
    /// Last pair of lines shown.
    pub lines: Option<(String, String)>,
    /// Number of show_lines() calls.
    pub render_count: usize,
    /// Whether init() was called.
    pub initialized: bool,
}

impl MockDisplay {
    /// Creates a new mock display.
    pub fn new() -> Self {
        Self::default()
    }

    /// First row, if anything was shown.
    pub fn line1(&self) -> Option<&str> {
        self.lines.as_ref().map(|(l1, _)| l1.as_str())
    }

    /// Second row, if anything was shown.
    pub fn line2(&self) -> Option<&str> {
        self.lines.as_ref().map(|(_, l2)| l2.as_str())
    }
}

impl StatusDisplay for MockDisplay {
    type Error = ();

    fn init(&mut self) -> Result<(), ()> {
        self.initialized = true;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), ()> {
        self.lines = None;
        Ok(())
    }

    fn show_lines(&mut self, line1: &str, line2: &str) -> Result<(), ()> {
        self.lines = Some((line1.into(), line2.into()));
        self.render_count += 1;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use hal02::digital::v2::InputPin;

    // =========================================================================
    // MockGpio Tests
    // =========================================================================

    #[test]
    fn mock_gpio_undriven_pin_reads_low_without_pull_up() {
        let mut gpio = MockGpio::new();
        gpio.set_mode(4, IoMode::Input).unwrap();
        assert!(!gpio.read(4).unwrap());
    }

    #[test]
    fn mock_gpio_records_writes() {
        let mut gpio = MockGpio::new();
        gpio.write(2, true).unwrap();
        gpio.write(2, false).unwrap();
        assert_eq!(gpio.level(2), Some(false));
        assert_eq!(gpio.write_count, 2);
    }

    // =========================================================================
    // MockI2c Tests
    // =========================================================================

    #[test]
    fn mock_i2c_read_combines_latch_and_inputs() {
        let mut bus = MockI2c::new().with_device(0x20);
        bus.write(0x20, &[0xF0]).unwrap();
        bus.set_input(0x20, 7, false);
        let mut buf = [0u8];
        bus.read(0x20, &mut buf).unwrap();
        assert_eq!(buf[0], 0x70);
    }

    #[test]
    fn mock_i2c_missing_device_nacks() {
        let mut bus = MockI2c::new();
        assert_eq!(
            bus.write(0x27, &[]),
            Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address))
        );
        assert_eq!(bus.transfers, 1);
    }

    #[test]
    fn mock_i2c_fail_flag() {
        let mut bus = MockI2c::new().with_device(0x20);
        bus.fail = true;
        assert_eq!(bus.write(0x20, &[0]), Err(ErrorKind::Bus));
    }

    // =========================================================================
    // MockOneWire Tests
    // =========================================================================

    fn rom(serial: u8) -> RomAddress {
        RomAddress::new(0x28, [serial, 0, 0, 0, 0, 0])
    }

    fn bus(line: &MockOneWire) -> (one_wire_bus::OneWire<MockOneWirePin>, MockOneWireDelay) {
        let (pin, delay) = line.clone().into_parts();
        (one_wire_bus::OneWire::new(pin).unwrap(), delay)
    }

    #[test]
    fn mock_onewire_presence_follows_connection() {
        let line = MockOneWire::new().with_sensor(rom(1), 20.0);
        let (mut bus, mut delay) = bus(&line);
        assert!(bus.reset(&mut delay).unwrap());
        line.disconnect(&rom(1));
        assert!(!bus.reset(&mut delay).unwrap());
        assert_eq!(line.resets(), 2);
    }

    #[test]
    fn mock_onewire_line_idles_high() {
        let line = MockOneWire::new().with_sensor(rom(1), 20.0);
        let (pin, _) = line.into_parts();
        assert!(pin.is_high().unwrap());
    }

    #[test]
    fn mock_onewire_convert_counts() {
        let line = MockOneWire::new().with_sensor(rom(1), 20.0);
        let (mut bus, mut delay) = bus(&line);
        ds18b20::start_simultaneous_temp_measurement(&mut bus, &mut delay).unwrap();
        assert_eq!(line.conversions(), 1);
    }

    #[test]
    fn mock_onewire_unmatched_rom_reads_ones() {
        let line = MockOneWire::new().with_sensor(rom(1), 20.0);
        let (mut bus, mut delay) = bus(&line);
        assert!(bus.reset(&mut delay).unwrap());
        bus.match_address(&rom(2).address(), &mut delay).unwrap();
        bus.write_byte(0xBE, &mut delay).unwrap();
        assert_eq!(bus.read_byte(&mut delay).unwrap(), 0xFF);
    }

    #[test]
    fn mock_onewire_matched_rom_sends_power_on_scratchpad() {
        let line = MockOneWire::new().with_sensor(rom(1), 20.0);
        let (mut bus, mut delay) = bus(&line);
        assert!(bus.reset(&mut delay).unwrap());
        bus.match_address(&rom(1).address(), &mut delay).unwrap();
        bus.write_byte(0xBE, &mut delay).unwrap();
        let mut pad = [0u8; 9];
        bus.read_bytes(&mut pad, &mut delay).unwrap();
        assert_eq!(&pad[..2], &[0x50, 0x05]);
        assert_eq!(pad[6], 0x0C);
        assert_eq!(crc8(&pad), 0);
    }

    // =========================================================================
    // MockEeprom Tests
    // =========================================================================

    #[test]
    fn mock_eeprom_out_of_range() {
        let mut eeprom = MockEeprom::new(4);
        assert!(eeprom.write(3, &[1, 2]).is_err());
        let mut buf = [0u8; 8];
        assert!(eeprom.read(0, &mut buf).is_err());
    }

    #[test]
    fn mock_eeprom_starts_erased() {
        let eeprom = MockEeprom::new(3);
        assert_eq!(eeprom.bytes(), vec![0xFF, 0xFF, 0xFF]);
        assert_eq!(eeprom.capacity(), 3);
    }

    // =========================================================================
    // MockDisplay Tests
    // =========================================================================

    #[test]
    fn mock_display_clear() {
        let mut display = MockDisplay::new();
        display.init().unwrap();
        display.show_lines("a", "b").unwrap();
        display.clear().unwrap();
        assert!(display.lines.is_none());
        assert!(display.initialized);
    }
}
