//! EEPROM bitmap backend.
//!
//! Layout at the configured offset:
//!
//! | Byte | Content |
//! |------|---------|
//! | 0 | magic `0xA5` |
//! | 1 | layout version |
//! | 2..10 | status bitmap, little-endian, bit n = socket n |
//!
//! A header mismatch (erased or foreign data) loads as "all off"; the next
//! save writes a fresh header.

use log::{debug, info, warn};

use super::{SocketStateStore, StoreError};
use crate::traits::Eeprom;

/// Header magic byte.
pub const SOCKET_DB_MAGIC: u8 = 0xA5;
/// Layout version.
pub const SOCKET_DB_VERSION: u8 = 1;
/// Bytes used by the database.
pub const SOCKET_DB_SIZE: usize = 10;
/// Highest socket id the bitmap can hold.
pub const SOCKET_DB_MAX_ID: u8 = 63;

/// Socket states as a bitmap in EEPROM.
#[derive(Debug)]
pub struct EepromSocketDb<E> {
    eeprom: E,
    offset: usize,
    bitmap: u64,
}

impl<E: Eeprom> EepromSocketDb<E> {
    /// Database at offset 0.
    pub fn new(eeprom: E) -> Self {
        Self::with_offset(eeprom, 0)
    }

    /// Database at `offset`.
    pub fn with_offset(eeprom: E, offset: usize) -> Self {
        Self {
            eeprom,
            offset,
            bitmap: 0,
        }
    }

    /// Reads the bitmap from EEPROM.
    pub fn load_socket_db(&mut self) -> Result<(), StoreError> {
        let mut raw = [0u8; SOCKET_DB_SIZE];
        self.eeprom.read(self.offset, &mut raw).map_err(|e| {
            warn!("EEPROM read at {} failed: {:?}", self.offset, e);
            StoreError::Medium
        })?;
        if raw[0] != SOCKET_DB_MAGIC || raw[1] != SOCKET_DB_VERSION {
            info!("no socket database in EEPROM, starting empty");
            self.bitmap = 0;
            return Ok(());
        }
        let mut bitmap = [0u8; 8];
        bitmap.copy_from_slice(&raw[2..]);
        self.bitmap = u64::from_le_bytes(bitmap);
        debug!("socket bitmap loaded: {:#018x}", self.bitmap);
        Ok(())
    }

    /// Writes header and bitmap, then commits.
    pub fn save_socket_db(&mut self) -> Result<(), StoreError> {
        let mut raw = [0u8; SOCKET_DB_SIZE];
        raw[0] = SOCKET_DB_MAGIC;
        raw[1] = SOCKET_DB_VERSION;
        raw[2..].copy_from_slice(&self.bitmap.to_le_bytes());
        self.eeprom
            .write(self.offset, &raw)
            .and_then(|_| self.eeprom.commit())
            .map_err(|e| {
                warn!("EEPROM write at {} failed: {:?}", self.offset, e);
                StoreError::Medium
            })
    }

    /// Stored state of socket `id`.
    pub fn socket_status(&self, id: u8) -> Result<bool, StoreError> {
        let bit = bit(id)?;
        Ok(self.bitmap & bit != 0)
    }

    /// Records the state of socket `id` (not yet saved).
    pub fn set_socket_status(&mut self, id: u8, on: bool) -> Result<(), StoreError> {
        let bit = bit(id)?;
        if on {
            self.bitmap |= bit;
        } else {
            self.bitmap &= !bit;
        }
        Ok(())
    }

    /// Raw bitmap.
    pub fn bitmap(&self) -> u64 {
        self.bitmap
    }

    /// The underlying memory.
    pub fn eeprom(&self) -> &E {
        &self.eeprom
    }
}

fn bit(id: u8) -> Result<u64, StoreError> {
    if id > SOCKET_DB_MAX_ID {
        return Err(StoreError::IdOutOfRange(id));
    }
    Ok(1u64 << id)
}

impl<E: Eeprom> SocketStateStore for EepromSocketDb<E> {
    fn name(&self) -> &'static str {
        "eeprom"
    }

    fn is_enabled(&self) -> bool {
        self.eeprom.capacity() >= self.offset + SOCKET_DB_SIZE
    }

    fn load(&mut self) -> Result<(), StoreError> {
        self.load_socket_db()
    }

    fn status(&self, id: u8, _name: &str) -> Option<bool> {
        self.socket_status(id).ok()
    }

    fn set_status(&mut self, id: u8, _name: &str, on: bool) -> Result<(), StoreError> {
        self.set_socket_status(id, on)
    }

    fn save(&mut self) -> Result<(), StoreError> {
        self.save_socket_db()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockEeprom;

    #[test]
    fn erased_memory_loads_empty() {
        let mut db = EepromSocketDb::new(MockEeprom::new(16));
        db.load_socket_db().unwrap();
        assert_eq!(db.bitmap(), 0);
        assert_eq!(db.socket_status(5), Ok(false));
    }

    #[test]
    fn layout_is_header_then_le_bitmap() {
        let eeprom = MockEeprom::new(16);
        let mut db = EepromSocketDb::with_offset(eeprom.clone(), 2);
        db.set_socket_status(0, true).unwrap();
        db.set_socket_status(9, true).unwrap();
        db.save_socket_db().unwrap();
        assert_eq!(
            &eeprom.bytes()[2..12],
            &[0xA5, 0x01, 0x01, 0x02, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(db.eeprom().commits, 1);
    }

    #[test]
    fn states_survive_reopen() {
        let eeprom = MockEeprom::new(16);
        let mut db = EepromSocketDb::new(eeprom.clone());
        db.set_socket_status(63, true).unwrap();
        db.save_socket_db().unwrap();

        let mut reopened = EepromSocketDb::new(eeprom);
        reopened.load_socket_db().unwrap();
        assert_eq!(reopened.socket_status(63), Ok(true));
        assert_eq!(reopened.socket_status(62), Ok(false));
    }

    #[test]
    fn id_above_63_rejected() {
        let mut db = EepromSocketDb::new(MockEeprom::new(16));
        assert_eq!(db.set_socket_status(64, true), Err(StoreError::IdOutOfRange(64)));
        assert_eq!(db.socket_status(200), Err(StoreError::IdOutOfRange(200)));
    }

    #[test]
    fn too_small_memory_is_disabled() {
        let db = EepromSocketDb::with_offset(MockEeprom::new(16), 8);
        assert!(!db.is_enabled());
    }

    #[test]
    fn clearing_a_bit() {
        let mut db = EepromSocketDb::new(MockEeprom::new(16));
        db.set_socket_status(3, true).unwrap();
        db.set_socket_status(3, false).unwrap();
        assert_eq!(db.bitmap(), 0);
    }
}
