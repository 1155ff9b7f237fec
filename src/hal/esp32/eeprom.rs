//! EEPROM emulation on top of an NVS blob.
//!
//! The whole image lives in RAM; `commit` writes it back as one blob.

use alloc::vec;
use alloc::vec::Vec;

use esp_idf_svc::nvs::{EspNvs, NvsDefault};
use esp_idf_hal::sys::EspError;
use log::debug;

use crate::traits::Eeprom;

const EEPROM_KEY: &str = "eeprom";

/// Byte-addressable memory backed by one NVS entry.
pub struct NvsEeprom {
    nvs: EspNvs<NvsDefault>,
    image: Vec<u8>,
}

impl NvsEeprom {
    /// Loads `size` bytes from `nvs`. A missing or short blob reads as
    /// erased (`0xFF`).
    pub fn new(nvs: EspNvs<NvsDefault>, size: usize) -> Result<Self, EspError> {
        let mut image = vec![0xFF; size];
        let mut stored = vec![0u8; size];
        if let Some(blob) = nvs.get_blob(EEPROM_KEY, &mut stored)? {
            let len = blob.len().min(size);
            image[..len].copy_from_slice(&blob[..len]);
            debug!("EEPROM image loaded, {} byte(s)", len);
        }
        Ok(Self { nvs, image })
    }
}

impl Eeprom for NvsEeprom {
    type Error = EspError;

    fn capacity(&self) -> usize {
        self.image.len()
    }

    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), EspError> {
        let end = offset.saturating_add(buf.len()).min(self.image.len());
        let start = offset.min(end);
        buf.fill(0xFF);
        buf[..end - start].copy_from_slice(&self.image[start..end]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), EspError> {
        let end = offset.saturating_add(data.len()).min(self.image.len());
        let start = offset.min(end);
        self.image[start..end].copy_from_slice(&data[..end - start]);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), EspError> {
        self.nvs.set_blob(EEPROM_KEY, &self.image)
    }
}
