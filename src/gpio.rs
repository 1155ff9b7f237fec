//! Logical pin table.
//!
//! Every pin the firmware touches is registered here under a small logical
//! id. A pin either sits on the microcontroller ([`PinLocation::Native`]) or
//! on an I2C expander ([`PinLocation::Expander`]); callers never see the
//! difference.
//!
//! # Caching
//!
//! - [`GpioManager::write`] always updates the cached level, even when the
//!   hardware write fails.
//! - [`GpioManager::read`] always samples the hardware and never touches
//!   the cache.
//! - [`GpioManager::state`] samples input pins and returns the cached level
//!   of output pins, so a relay's commanded state costs no bus traffic.
//!
//! # Example
//!
//! ```rust
//! use rs_plc::gpio::{GpioManager, PinKind};
//! use rs_plc::extender::ExtenderManager;
//! use rs_plc::i2c::I2cManager;
//! use rs_plc::profile::GpioProfile;
//! use rs_plc::hal::{MockGpio, MockI2c};
//!
//! let mut gpio: GpioManager<MockGpio, MockI2c> =
//!     GpioManager::new(MockGpio::new(), I2cManager::new(), ExtenderManager::new());
//! gpio.begin(&[GpioProfile::native_output(9, 16, PinKind::Relay)]);
//!
//! gpio.write(9, true).unwrap();
//! assert_eq!(gpio.state(9), Ok(true));
//! assert_eq!(gpio.native().level(16), Some(true));
//! ```

use embedded_hal::i2c::I2c;
use log::{debug, error, warn};

use crate::arena::{SlotError, Slots};
use crate::extender::{ExtenderError, ExtenderManager};
use crate::i2c::I2cManager;
use crate::profile::GpioProfile;
use crate::traits::{IoMode, NativeGpio};

/// Size of the logical pin table.
pub const GPIO_MAX_PINS: usize = 144;

/// Role of a pin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PinKind {
    /// Anything else (LEDs, spare lines).
    Generic,
    /// Digital input (buttons, contacts).
    Input,
    /// Relay coil driver.
    Relay,
    /// Sensor data line.
    Sensor,
    /// Buzzer driver.
    Buzzer,
}

/// Logical direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PinMode {
    /// Sampled line.
    Input,
    /// Driven line.
    Output,
}

/// Pull resistor selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Pull {
    /// Floating.
    None,
    /// Pull-up.
    Up,
    /// Pull-down.
    Down,
}

/// Where a logical pin physically lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PinLocation {
    /// Microcontroller pin number.
    Native(u8),
    /// Line of an I2C expander.
    Expander {
        /// Extender id.
        extender: u8,
        /// Line on the chip (0-7).
        subpin: u8,
    },
}

impl PinLocation {
    /// Location declared by a profile entry.
    pub const fn from_profile(profile: &GpioProfile) -> Self {
        if profile.ext == 0 {
            Self::Native(profile.pin)
        } else {
            Self::Expander {
                extender: profile.ext,
                subpin: profile.pin,
            }
        }
    }
}

/// Errors raised by pin operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PinError {
    /// No pin registered under this id.
    #[error("pin {0} not registered")]
    Unknown(u8),
    /// The pin is administratively disabled.
    #[error("pin {0} is disabled")]
    Disabled(u8),
    /// Pull resistors only apply to inputs.
    #[error("pin {0}: pull resistor requested on an output")]
    PullOnOutput(u8),
    /// The platform rejected a native pin operation.
    #[error("native pin {pin} I/O failed")]
    Native {
        /// Physical pin number.
        pin: u8,
    },
    /// Expander operation failed.
    #[error(transparent)]
    Extender(#[from] ExtenderError),
    /// Pin id does not fit the table.
    #[error(transparent)]
    Slot(#[from] SlotError),
}

/// One entry of the logical pin table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GpioPin {
    id: u8,
    location: PinLocation,
    kind: PinKind,
    mode: PinMode,
    pull: Pull,
    state: bool,
    enabled: bool,
}

impl GpioPin {
    /// Logical id.
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Physical location.
    pub fn location(&self) -> PinLocation {
        self.location
    }

    /// Physical pin number, or sub-pin for expander lines.
    pub fn pin(&self) -> u8 {
        match self.location {
            PinLocation::Native(pin) => pin,
            PinLocation::Expander { subpin, .. } => subpin,
        }
    }

    /// Owning extender id, `None` for native pins.
    pub fn extender(&self) -> Option<u8> {
        match self.location {
            PinLocation::Native(_) => None,
            PinLocation::Expander { extender, .. } => Some(extender),
        }
    }

    /// Role.
    pub fn kind(&self) -> PinKind {
        self.kind
    }

    /// Current direction.
    pub fn mode(&self) -> PinMode {
        self.mode
    }

    /// Current pull selection.
    pub fn pull(&self) -> Pull {
        self.pull
    }

    /// Last written level.
    pub fn cached_state(&self) -> bool {
        self.state
    }

    /// Whether the pin accepts operations.
    pub fn enabled(&self) -> bool {
        self.enabled
    }
}

/// Platform mode for a logical (mode, pull) pair.
pub fn io_mode(mode: PinMode, pull: Pull) -> Option<IoMode> {
    match (mode, pull) {
        (PinMode::Input, Pull::None) => Some(IoMode::Input),
        (PinMode::Input, Pull::Up) => Some(IoMode::InputPullUp),
        (PinMode::Input, Pull::Down) => Some(IoMode::InputPullDown),
        (PinMode::Output, Pull::None) => Some(IoMode::Output),
        (PinMode::Output, _) => None,
    }
}

/// Physical access by location.
trait PhysicalPins {
    fn set_mode(&mut self, at: PinLocation, mode: IoMode) -> Result<(), PinError>;
    fn write(&mut self, at: PinLocation, high: bool) -> Result<(), PinError>;
    fn read(&mut self, at: PinLocation) -> Result<bool, PinError>;
}

struct Backends<'a, G, I> {
    native: &'a mut G,
    i2c: &'a mut I2cManager<I>,
    extenders: &'a mut ExtenderManager,
}

fn native_failed<E: core::fmt::Debug>(pin: u8) -> impl FnOnce(E) -> PinError {
    move |e| {
        debug!("native pin {}: {:?}", pin, e);
        PinError::Native { pin }
    }
}

impl<G: NativeGpio, I: I2c> PhysicalPins for Backends<'_, G, I> {
    fn set_mode(&mut self, at: PinLocation, mode: IoMode) -> Result<(), PinError> {
        match at {
            PinLocation::Native(pin) => self.native.set_mode(pin, mode).map_err(native_failed(pin)),
            PinLocation::Expander { extender, subpin } => Ok(self
                .extenders
                .set_pin_mode(self.i2c, extender, subpin, mode)?),
        }
    }

    fn write(&mut self, at: PinLocation, high: bool) -> Result<(), PinError> {
        match at {
            PinLocation::Native(pin) => self.native.write(pin, high).map_err(native_failed(pin)),
            PinLocation::Expander { extender, subpin } => {
                Ok(self.extenders.write(self.i2c, extender, subpin, high)?)
            }
        }
    }

    fn read(&mut self, at: PinLocation) -> Result<bool, PinError> {
        match at {
            PinLocation::Native(pin) => self.native.read(pin).map_err(native_failed(pin)),
            PinLocation::Expander { extender, subpin } => {
                Ok(self.extenders.read(self.i2c, extender, subpin)?)
            }
        }
    }
}

/// Owner of the logical pin table and of the drivers behind it.
#[derive(Debug)]
pub struct GpioManager<G, I> {
    native: G,
    i2c: I2cManager<I>,
    extenders: ExtenderManager,
    pins: Slots<GpioPin, GPIO_MAX_PINS>,
}

impl<G: NativeGpio, I: I2c> GpioManager<G, I> {
    /// Takes ownership of the native driver and the already started bus and
    /// extender managers.
    pub fn new(native: G, i2c: I2cManager<I>, extenders: ExtenderManager) -> Self {
        Self {
            native,
            i2c,
            extenders,
            pins: Slots::new(),
        }
    }

    fn split(&mut self) -> (Backends<'_, G, I>, &mut Slots<GpioPin, GPIO_MAX_PINS>) {
        (
            Backends {
                native: &mut self.native,
                i2c: &mut self.i2c,
                extenders: &mut self.extenders,
            },
            &mut self.pins,
        )
    }

    /// Registers and configures every declared pin.
    ///
    /// Never stops early: each failure is logged and the remaining pins are
    /// still brought up. Returns `false` if any pin failed.
    pub fn begin(&mut self, declared: &[GpioProfile]) -> bool {
        let mut ok = true;
        for profile in declared {
            if let Err(e) = self.add_pin(profile) {
                warn!("pin {}: {}", profile.id, e);
                ok = false;
            }
        }
        ok
    }

    /// Registers one pin, parks it as an input, then applies the declared
    /// mode. An output is then driven to its cached level (low), so the
    /// line matches what [`state`](Self::state) reports.
    ///
    /// A pin whose hardware setup fails stays registered and the error is
    /// returned; registration itself fails only for an out-of-range id or
    /// an undeclared extender.
    pub fn add_pin(&mut self, profile: &GpioProfile) -> Result<(), PinError> {
        let location = PinLocation::from_profile(profile);
        if let PinLocation::Expander { extender, .. } = location {
            if self.extenders.get(extender).is_none() {
                error!("pin {}: extender {} not declared", profile.id, extender);
                return Err(ExtenderError::Unknown(extender).into());
            }
        }

        let pin = GpioPin {
            id: profile.id,
            location,
            kind: profile.kind,
            mode: PinMode::Input,
            pull: Pull::None,
            state: false,
            enabled: profile.enabled,
        };
        if self.pins.insert(usize::from(profile.id), pin)?.is_some() {
            warn!("pin {} redeclared", profile.id);
        }
        if !profile.enabled {
            debug!("pin {} disabled in profile", profile.id);
            return Ok(());
        }

        let (mut hw, _) = self.split();
        let parked = hw.set_mode(location, IoMode::Input);
        let applied = self.set_mode(profile.id, profile.mode, profile.pull);
        let driven = match (&applied, profile.mode) {
            (Ok(()), PinMode::Output) => {
                let (mut hw, pins) = self.split();
                let level = pins.get(usize::from(profile.id)).map_or(false, GpioPin::cached_state);
                hw.write(location, level)
            }
            _ => Ok(()),
        };
        parked.and(applied).and(driven)
    }

    /// Changes direction and pull of a pin.
    ///
    /// A pull on an output is rejected with [`PinError::PullOnOutput`] and
    /// leaves the pin untouched. Otherwise the logical mode is recorded
    /// before the hardware is reconfigured.
    pub fn set_mode(&mut self, id: u8, mode: PinMode, pull: Pull) -> Result<(), PinError> {
        let (mut hw, pins) = self.split();
        let pin = usable(pins, id)?;
        let Some(io) = io_mode(mode, pull) else {
            error!("pin {}: {:?} pull is not valid on an output", id, pull);
            return Err(PinError::PullOnOutput(id));
        };
        pin.mode = mode;
        pin.pull = pull;
        hw.set_mode(pin.location, io)
    }

    /// Drives an output pin and records the level.
    pub fn write(&mut self, id: u8, high: bool) -> Result<(), PinError> {
        let (mut hw, pins) = self.split();
        let pin = usable(pins, id)?;
        pin.state = high;
        hw.write(pin.location, high)
    }

    /// Samples the hardware level of a pin.
    pub fn read(&mut self, id: u8) -> Result<bool, PinError> {
        let (mut hw, pins) = self.split();
        let pin = usable(pins, id)?;
        hw.read(pin.location)
    }

    /// Live level for inputs, cached level for outputs.
    pub fn state(&mut self, id: u8) -> Result<bool, PinError> {
        let pin = self.pin(id).ok_or(PinError::Unknown(id))?;
        match pin.mode {
            PinMode::Output => Ok(pin.state),
            PinMode::Input => self.read(id),
        }
    }

    /// Pin by logical id.
    pub fn pin(&self, id: u8) -> Option<&GpioPin> {
        self.pins.get(usize::from(id))
    }

    /// All registered pins in id order.
    pub fn pins(&self) -> impl Iterator<Item = &GpioPin> {
        self.pins.iter().map(|(_, p)| p)
    }

    /// Registered pins of one kind.
    pub fn pins_by_type(&self, kind: PinKind) -> impl Iterator<Item = &GpioPin> {
        self.pins().filter(move |p| p.kind == kind)
    }

    /// Enables or disables a pin.
    pub fn set_enabled(&mut self, id: u8, enabled: bool) -> Result<(), PinError> {
        let pin = self
            .pins
            .get_mut(usize::from(id))
            .ok_or(PinError::Unknown(id))?;
        pin.enabled = enabled;
        Ok(())
    }

    /// Native driver.
    pub fn native(&self) -> &G {
        &self.native
    }

    /// Mutable native driver.
    pub fn native_mut(&mut self) -> &mut G {
        &mut self.native
    }

    /// I2C buses.
    pub fn i2c(&self) -> &I2cManager<I> {
        &self.i2c
    }

    /// Mutable I2C buses.
    pub fn i2c_mut(&mut self) -> &mut I2cManager<I> {
        &mut self.i2c
    }

    /// Expander chips.
    pub fn extenders(&self) -> &ExtenderManager {
        &self.extenders
    }

    /// Mutable expander chips.
    pub fn extenders_mut(&mut self) -> &mut ExtenderManager {
        &mut self.extenders
    }
}

fn usable(pins: &mut Slots<GpioPin, GPIO_MAX_PINS>, id: u8) -> Result<&mut GpioPin, PinError> {
    let pin = pins
        .get_mut(usize::from(id))
        .ok_or(PinError::Unknown(id))?;
    if !pin.enabled {
        return Err(PinError::Disabled(id));
    }
    Ok(pin)
}
