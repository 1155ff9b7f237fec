//! I2C I/O expander manager.
//!
//! Drives PCF8574-class quasi-bidirectional expanders: one 8-bit port, a
//! single-byte write sets the output latch and a single-byte read samples
//! the lines. A line used as input must have its latch bit high so the
//! weak internal pull-up holds it.
//!
//! Extender id 0 is reserved (it means "native" in pin declarations), so the
//! table holds ids 1 through [`EXTENDER_MAX`].

use embedded_hal::i2c::I2c;
use log::{debug, error, info, warn};

use crate::arena::Slots;
use crate::i2c::{BusError, I2cManager};
use crate::profile::{ExtenderProfile, EXTENDER_PINS};
use crate::traits::IoMode;

/// Highest extender id.
pub const EXTENDER_MAX: usize = 16;

/// Errors raised by extender pin operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ExtenderError {
    /// No extender with this id was declared.
    #[error("extender {0} not declared")]
    Unknown(u8),
    /// The extender is administratively disabled.
    #[error("extender {0} is disabled")]
    Disabled(u8),
    /// The chip did not answer at boot.
    #[error("extender {0} is not active")]
    Inactive(u8),
    /// Sub-pin beyond the 8-line port.
    #[error("extender {ext} has no sub-pin {subpin}")]
    Subpin {
        /// Extender id.
        ext: u8,
        /// Requested sub-pin.
        subpin: u8,
    },
    /// The chip has no pull-down resistors.
    #[error("extender {ext} sub-pin {subpin}: pull-down not supported")]
    PullDownUnsupported {
        /// Extender id.
        ext: u8,
        /// Requested sub-pin.
        subpin: u8,
    },
    /// Transfer failure.
    #[error(transparent)]
    Bus(#[from] BusError),
}

/// Runtime record of one expander chip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Extender {
    id: u8,
    bus: u8,
    address: u8,
    enabled: bool,
    active: bool,
    latch: u8,
}

impl Extender {
    /// Extender id.
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Owning I2C bus id.
    pub fn bus(&self) -> u8 {
        self.bus
    }

    /// 7-bit device address.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Whether operations are allowed.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the chip answered at boot.
    pub fn active(&self) -> bool {
        self.active
    }

    /// Last byte written to the port.
    pub fn latch(&self) -> u8 {
        self.latch
    }
}

/// Owner of all expander chips.
#[derive(Debug, Default)]
pub struct ExtenderManager {
    slots: Slots<Extender, { EXTENDER_MAX + 1 }>,
}

impl ExtenderManager {
    /// Creates a manager with no extenders.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every declared extender and checks that it answers.
    ///
    /// Entries whose bus is missing or whose chip does not acknowledge stay
    /// registered but inactive. Returns `false` if any enabled entry ended up
    /// inactive.
    pub fn begin<I: I2c>(&mut self, declared: &[ExtenderProfile], i2c: &mut I2cManager<I>) -> bool {
        let mut ok = true;
        for profile in declared {
            let mut ext = Extender {
                id: profile.id,
                bus: profile.i2c,
                address: profile.address,
                enabled: profile.enabled,
                active: false,
                latch: 0xFF,
            };

            if profile.id == 0 {
                error!("extender id 0 is reserved, entry ignored");
                ok = false;
                continue;
            }

            if !profile.enabled {
                debug!("extender {} disabled in profile", profile.id);
            } else if i2c.bus(profile.i2c).is_none() {
                error!(
                    "extender {}: I2C bus {} not available",
                    profile.id, profile.i2c
                );
                ok = false;
            } else {
                // release every line high: all inputs, all relays off
                match i2c.write(profile.i2c, profile.address, &[ext.latch]) {
                    Ok(()) => {
                        ext.active = true;
                        info!(
                            "extender {} up at {:#04x} on I2C bus {}",
                            profile.id, profile.address, profile.i2c
                        );
                    }
                    Err(e) => {
                        warn!("extender {} not responding: {}", profile.id, e);
                        ok = false;
                    }
                }
            }

            if let Err(e) = self.slots.insert(usize::from(profile.id), ext) {
                error!("extender {}: {}", profile.id, e);
                ok = false;
            }
        }
        ok
    }

    /// Extender by id.
    pub fn get(&self, id: u8) -> Option<&Extender> {
        self.slots.get(usize::from(id))
    }

    /// All declared extenders in id order.
    pub fn extenders(&self) -> impl Iterator<Item = &Extender> {
        self.slots.iter().map(|(_, e)| e)
    }

    /// Enables or disables an extender.
    pub fn set_enabled(&mut self, id: u8, enabled: bool) -> Result<(), ExtenderError> {
        let ext = self
            .slots
            .get_mut(usize::from(id))
            .ok_or(ExtenderError::Unknown(id))?;
        ext.enabled = enabled;
        Ok(())
    }

    /// Configures one line.
    ///
    /// Inputs get their latch bit set so the line floats high; outputs keep
    /// the last written level.
    pub fn set_pin_mode<I: I2c>(
        &mut self,
        i2c: &mut I2cManager<I>,
        id: u8,
        subpin: u8,
        mode: IoMode,
    ) -> Result<(), ExtenderError> {
        let ext = self.ready(id, subpin)?;
        match mode {
            IoMode::Output => Ok(()),
            IoMode::InputPullDown => Err(ExtenderError::PullDownUnsupported { ext: id, subpin }),
            IoMode::Input | IoMode::InputPullUp => {
                let latch = ext.latch | (1 << subpin);
                i2c.write(ext.bus, ext.address, &[latch])?;
                ext.latch = latch;
                Ok(())
            }
        }
    }

    /// Drives one line.
    pub fn write<I: I2c>(
        &mut self,
        i2c: &mut I2cManager<I>,
        id: u8,
        subpin: u8,
        high: bool,
    ) -> Result<(), ExtenderError> {
        let ext = self.ready(id, subpin)?;
        let latch = if high {
            ext.latch | (1 << subpin)
        } else {
            ext.latch & !(1 << subpin)
        };
        i2c.write(ext.bus, ext.address, &[latch])?;
        ext.latch = latch;
        Ok(())
    }

    /// Samples one line.
    pub fn read<I: I2c>(
        &mut self,
        i2c: &mut I2cManager<I>,
        id: u8,
        subpin: u8,
    ) -> Result<bool, ExtenderError> {
        let ext = self.ready(id, subpin)?;
        let mut port = [0u8; 1];
        i2c.read(ext.bus, ext.address, &mut port)?;
        Ok(port[0] & (1 << subpin) != 0)
    }

    fn ready(&mut self, id: u8, subpin: u8) -> Result<&mut Extender, ExtenderError> {
        let ext = self
            .slots
            .get_mut(usize::from(id))
            .ok_or(ExtenderError::Unknown(id))?;
        if !ext.enabled {
            return Err(ExtenderError::Disabled(id));
        }
        if !ext.active {
            return Err(ExtenderError::Inactive(id));
        }
        if subpin >= EXTENDER_PINS {
            return Err(ExtenderError::Subpin { ext: id, subpin });
        }
        Ok(ext)
    }
}
