//! JSON file backend.
//!
//! Stores states keyed by socket name:
//!
//! ```json
//! { "sockets": { "Kitchen": true, "Garage": false } }
//! ```
//!
//! A missing file loads as empty.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::string::String;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::{SocketStateStore, StoreError};

#[derive(Debug, Default, Serialize, Deserialize)]
struct SocketFile {
    #[serde(default)]
    sockets: BTreeMap<String, bool>,
}

/// Socket states in a JSON file.
#[derive(Debug)]
pub struct JsonSocketDb {
    path: PathBuf,
    sockets: BTreeMap<String, bool>,
    enabled: bool,
}

impl JsonSocketDb {
    /// Database backed by `path`. Nothing is read until
    /// [`load_from_file`](Self::load_from_file).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sockets: BTreeMap::new(),
            enabled: true,
        }
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Enables or disables the backend.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Reads the file, replacing in-memory states.
    pub fn load_from_file(&mut self) -> Result<(), StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("{} not found, starting empty", self.path.display());
                self.sockets.clear();
                return Ok(());
            }
            Err(e) => {
                warn!("reading {} failed: {}", self.path.display(), e);
                return Err(StoreError::Io);
            }
        };
        let file: SocketFile = serde_json::from_str(&text).map_err(|e| {
            warn!("{} is not a socket database: {}", self.path.display(), e);
            StoreError::Format
        })?;
        self.sockets = file.sockets;
        debug!("{} socket state(s) loaded", self.sockets.len());
        Ok(())
    }

    /// Writes all states to the file.
    pub fn save_to_file(&self) -> Result<(), StoreError> {
        let file = SocketFile {
            sockets: self.sockets.clone(),
        };
        let text = serde_json::to_string_pretty(&file).map_err(|e| {
            warn!("encoding socket database failed: {}", e);
            StoreError::Format
        })?;
        fs::write(&self.path, text).map_err(|e| {
            warn!("writing {} failed: {}", self.path.display(), e);
            StoreError::Io
        })
    }

    /// Stored state of socket `name`.
    pub fn status(&self, name: &str) -> Option<bool> {
        self.sockets.get(name).copied()
    }

    /// Records the state of socket `name` (not yet saved).
    pub fn set_status(&mut self, name: &str, on: bool) {
        self.sockets.insert(name.into(), on);
    }
}

impl SocketStateStore for JsonSocketDb {
    fn name(&self) -> &'static str {
        "json"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn load(&mut self) -> Result<(), StoreError> {
        self.load_from_file()
    }

    fn status(&self, _id: u8, name: &str) -> Option<bool> {
        JsonSocketDb::status(self, name)
    }

    fn set_status(&mut self, _id: u8, name: &str, on: bool) -> Result<(), StoreError> {
        JsonSocketDb::set_status(self, name, on);
        Ok(())
    }

    fn save(&mut self) -> Result<(), StoreError> {
        self.save_to_file()
    }
}
