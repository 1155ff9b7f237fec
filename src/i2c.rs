//! I2C bus manager.
//!
//! Owns the physical I2C buses declared by the board profile (at most
//! [`I2C_MAX_BUSES`]) and exposes them by id. Bus handles are any
//! [`embedded_hal::i2c::I2c`] implementation; the platform supplies an opener
//! that turns an [`I2cProfile`] into a handle.
//!
//! # Example
//!
//! ```rust
//! use rs_plc::i2c::I2cManager;
//! use rs_plc::profile::I2cProfile;
//! use rs_plc::hal::MockI2c;
//!
//! let declared = [I2cProfile { id: 1, sda: 21, scl: 22, enabled: true }];
//! let mut i2c = I2cManager::new();
//! let ok = i2c.begin(&declared, |_, _| Ok::<_, ()>(MockI2c::new().with_device(0x20)));
//! assert!(ok);
//!
//! let found = i2c.find_devices(1).unwrap();
//! assert_eq!(found.as_slice(), &[0x20]);
//! ```

use embedded_hal::i2c::{Error as _, ErrorKind, I2c};
use heapless::Vec;
use log::{debug, error, info};

use crate::profile::I2cProfile;

/// Maximum number of I2C buses.
pub const I2C_MAX_BUSES: usize = 2;

/// Clock speed every bus is configured with.
pub const I2C_CLOCK_HZ: u32 = 100_000;

/// First address scanned by [`I2cManager::find_devices`].
pub const I2C_SCAN_FIRST: u8 = 0x01;

/// Last address scanned by [`I2cManager::find_devices`].
pub const I2C_SCAN_LAST: u8 = 0x7E;

/// Errors raised by bus lookup and transfers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    /// No bus with this id was brought up.
    #[error("I2C bus {0} not found")]
    Unknown(u8),
    /// The bus exists but is administratively disabled.
    #[error("I2C bus {0} is disabled")]
    Disabled(u8),
    /// No device acknowledged the address.
    #[error("no ACK on I2C bus {bus} at {address:#04x}")]
    Nack {
        /// Bus id.
        bus: u8,
        /// 7-bit device address.
        address: u8,
    },
    /// Any other transfer failure reported by the driver.
    #[error("I2C bus {bus} transfer to {address:#04x} failed")]
    Transfer {
        /// Bus id.
        bus: u8,
        /// 7-bit device address.
        address: u8,
    },
}

/// Runtime record of one bus.
#[derive(Debug)]
pub struct I2cBus<I> {
    id: u8,
    enabled: bool,
    handle: I,
}

impl<I> I2cBus<I> {
    /// Bus id from the board profile.
    #[inline]
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Whether transfers are allowed.
    #[inline]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// The underlying driver handle.
    pub fn handle(&self) -> &I {
        &self.handle
    }

    /// Mutable access to the underlying driver handle.
    pub fn handle_mut(&mut self) -> &mut I {
        &mut self.handle
    }
}

/// Owner of all I2C buses.
#[derive(Debug)]
pub struct I2cManager<I> {
    buses: Vec<I2cBus<I>, I2C_MAX_BUSES>,
}

impl<I> Default for I2cManager<I> {
    fn default() -> Self {
        Self { buses: Vec::new() }
    }
}

impl<I: I2c> I2cManager<I> {
    /// Creates a manager with no buses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Brings up every enabled bus declared in `declared`.
    ///
    /// `open` receives the profile entry and [`I2C_CLOCK_HZ`]. Returns `false`
    /// if any declared bus failed to open; the buses that did open remain
    /// usable.
    pub fn begin<F, E>(&mut self, declared: &[I2cProfile], mut open: F) -> bool
    where
        F: FnMut(&I2cProfile, u32) -> Result<I, E>,
        E: core::fmt::Debug,
    {
        let mut ok = true;
        for profile in declared {
            if !profile.enabled {
                debug!("I2C bus {} disabled in profile", profile.id);
                continue;
            }
            if self.bus(profile.id).is_some() {
                error!("I2C bus {} declared twice", profile.id);
                ok = false;
                continue;
            }
            match open(profile, I2C_CLOCK_HZ) {
                Ok(handle) => {
                    let bus = I2cBus {
                        id: profile.id,
                        enabled: true,
                        handle,
                    };
                    if self.buses.push(bus).is_err() {
                        error!("I2C bus {}: more than {} buses", profile.id, I2C_MAX_BUSES);
                        ok = false;
                        continue;
                    }
                    info!(
                        "I2C bus {} up (SDA {}, SCL {}, {} Hz)",
                        profile.id, profile.sda, profile.scl, I2C_CLOCK_HZ
                    );
                }
                Err(e) => {
                    error!("I2C bus {} failed to initialize: {:?}", profile.id, e);
                    ok = false;
                }
            }
        }
        ok
    }

    /// Bus by id.
    pub fn bus(&self, id: u8) -> Option<&I2cBus<I>> {
        self.buses.iter().find(|b| b.id == id)
    }

    /// Enabled bus by id, ready for transfers.
    pub fn bus_mut(&mut self, id: u8) -> Result<&mut I2cBus<I>, BusError> {
        let bus = self
            .buses
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(BusError::Unknown(id))?;
        if !bus.enabled {
            return Err(BusError::Disabled(id));
        }
        Ok(bus)
    }

    /// All buses that were brought up.
    pub fn buses(&self) -> impl Iterator<Item = &I2cBus<I>> {
        self.buses.iter()
    }

    /// Enables or disables transfers on a bus.
    pub fn set_enabled(&mut self, id: u8, enabled: bool) -> Result<(), BusError> {
        let bus = self
            .buses
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(BusError::Unknown(id))?;
        bus.enabled = enabled;
        Ok(())
    }

    /// Writes `bytes` to the device at `address`.
    pub fn write(&mut self, id: u8, address: u8, bytes: &[u8]) -> Result<(), BusError> {
        let bus = self.bus_mut(id)?;
        bus.handle
            .write(address, bytes)
            .map_err(|e| classify(id, address, e.kind()))
    }

    /// Reads `buf.len()` bytes from the device at `address`.
    pub fn read(&mut self, id: u8, address: u8, buf: &mut [u8]) -> Result<(), BusError> {
        let bus = self.bus_mut(id)?;
        bus.handle
            .read(address, buf)
            .map_err(|e| classify(id, address, e.kind()))
    }

    /// Addresses that acknowledge an empty write, swept from
    /// [`I2C_SCAN_FIRST`] to [`I2C_SCAN_LAST`].
    pub fn find_devices(&mut self, id: u8) -> Result<Vec<u8, 128>, BusError> {
        let bus = self.bus_mut(id)?;
        let mut found = Vec::new();
        for address in I2C_SCAN_FIRST..=I2C_SCAN_LAST {
            if bus.handle.write(address, &[]).is_ok() {
                // 126 candidate addresses always fit
                let _ = found.push(address);
            }
        }
        debug!("I2C bus {}: {} device(s) found", id, found.len());
        Ok(found)
    }
}

fn classify(bus: u8, address: u8, kind: ErrorKind) -> BusError {
    match kind {
        ErrorKind::NoAcknowledge(_) => BusError::Nack { bus, address },
        _ => BusError::Transfer { bus, address },
    }
}
