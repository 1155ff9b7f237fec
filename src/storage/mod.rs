//! Socket state persistence.
//!
//! Two interchangeable backends keep relay states across reboots:
//!
//! - [`EepromSocketDb`]: a 64-bit on/off bitmap keyed by socket id, for
//!   boards with byte-addressable EEPROM (or an emulation of it)
//! - [`JsonSocketDb`]: a JSON file keyed by socket name (`json-db` feature)
//!
//! Both implement [`SocketStateStore`]; [`SocketPersistence`] holds them in
//! priority order and routes every request to the first enabled one.

extern crate alloc;

use alloc::boxed::Box;
use alloc::vec::Vec;

use log::{debug, info, warn};

pub mod eeprom;
#[cfg(feature = "json-db")]
pub mod json;

pub use eeprom::EepromSocketDb;
#[cfg(feature = "json-db")]
pub use json::JsonSocketDb;

/// Errors raised by persistence backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The bitmap only holds ids 0 through 63.
    #[error("socket id {0} out of range")]
    IdOutOfRange(u8),
    /// The storage medium reported a failure.
    #[error("storage medium failure")]
    Medium,
    /// File could not be read or written.
    #[error("file I/O failure")]
    Io,
    /// Stored content could not be decoded.
    #[error("stored data is malformed")]
    Format,
    /// No backend is enabled.
    #[error("no storage backend available")]
    Unavailable,
}

/// One persistence backend for socket on/off states.
pub trait SocketStateStore {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Whether the backend can be used on this board.
    fn is_enabled(&self) -> bool;

    /// Loads stored states from the medium.
    fn load(&mut self) -> Result<(), StoreError>;

    /// Stored state of a socket, `None` if nothing is stored for it.
    fn status(&self, id: u8, name: &str) -> Option<bool>;

    /// Records a socket state in memory.
    fn set_status(&mut self, id: u8, name: &str, on: bool) -> Result<(), StoreError>;

    /// Writes recorded states to the medium.
    fn save(&mut self) -> Result<(), StoreError>;
}

/// Backends in priority order.
///
/// # Example
///
/// ```rust
/// use rs_plc::storage::{EepromSocketDb, SocketPersistence};
/// use rs_plc::hal::MockEeprom;
///
/// let eeprom = MockEeprom::new(64);
/// let mut store = SocketPersistence::new().with_store(EepromSocketDb::new(eeprom.clone()));
/// store.load().unwrap();
/// store.persist(3, "Kitchen", true).unwrap();
///
/// // after a reboot
/// let mut store = SocketPersistence::new().with_store(EepromSocketDb::new(eeprom));
/// store.load().unwrap();
/// assert_eq!(store.status(3, "Kitchen"), Some(true));
/// ```
#[derive(Default)]
pub struct SocketPersistence {
    stores: Vec<Box<dyn SocketStateStore>>,
}

impl core::fmt::Debug for SocketPersistence {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list()
            .entries(self.stores.iter().map(|s| s.name()))
            .finish()
    }
}

impl SocketPersistence {
    /// No backends; every request fails with [`StoreError::Unavailable`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a backend with lower priority than those already added.
    pub fn with_store(mut self, store: impl SocketStateStore + 'static) -> Self {
        self.push(store);
        self
    }

    /// Appends a backend with lower priority than those already added.
    pub fn push(&mut self, store: impl SocketStateStore + 'static) {
        self.stores.push(Box::new(store));
    }

    /// Name of the backend requests go to.
    pub fn active_name(&self) -> Option<&'static str> {
        self.stores.iter().find(|s| s.is_enabled()).map(|s| s.name())
    }

    fn active(&mut self) -> Result<&mut Box<dyn SocketStateStore>, StoreError> {
        self.stores
            .iter_mut()
            .find(|s| s.is_enabled())
            .ok_or(StoreError::Unavailable)
    }

    /// Loads the active backend.
    pub fn load(&mut self) -> Result<(), StoreError> {
        let store = self.active()?;
        store.load()?;
        info!("socket states loaded from {}", store.name());
        Ok(())
    }

    /// Stored state of a socket in the active backend.
    pub fn status(&self, id: u8, name: &str) -> Option<bool> {
        self.stores
            .iter()
            .find(|s| s.is_enabled())
            .and_then(|s| s.status(id, name))
    }

    /// Records and saves one socket state.
    pub fn persist(&mut self, id: u8, name: &str, on: bool) -> Result<(), StoreError> {
        let store = self.active()?;
        let backend = store.name();
        if let Err(e) = store.set_status(id, name, on) {
            warn!("socket {}: {} rejected state: {}", id, backend, e);
            return Err(e);
        }
        debug!("socket {}: state recorded in {}", id, backend);
        if let Err(e) = store.save() {
            warn!("socket {}: {} save failed: {}", id, backend, e);
            return Err(e);
        }
        debug!("socket {}: {} saved", id, backend);
        Ok(())
    }
}
