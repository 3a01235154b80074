//! Durable key/value slots backing the token store
//!
//! Reads and writes are synchronous and local. File slots are written to a
//! temporary sibling first and renamed into place, so a slot is always either
//! the old value or the new one.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{ClientError, Result};

/// Named slots holding string values
pub trait SlotStorage: Send + Sync + std::fmt::Debug {
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite the slot with `value`
    fn write(&self, key: &str, value: &str) -> Result<()>;

    /// Remove the slot; removing a missing slot is not an error
    fn remove(&self, key: &str) -> Result<()>;
}

/// One file per slot inside a directory
#[derive(Debug, Clone)]
pub struct FileSlotStorage {
    dir: PathBuf,
}

impl FileSlotStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ClientError::invalid_input(format!(
                "Invalid storage slot name: '{}'",
                key
            )));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl SlotStorage for FileSlotStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.slot_path(key)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ClientError::storage_from_error(
                    format!("Failed to read credential slot {}", path.display()),
                    e,
                ))
            }
        };
        String::from_utf8(bytes).map(Some).map_err(|_| {
            ClientError::storage_corrupt(format!(
                "credential slot {} is not valid UTF-8",
                path.display()
            ))
        })
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let path = self.slot_path(key)?;

        fs::create_dir_all(&self.dir).map_err(|e| {
            ClientError::storage_write(
                format!("Failed to create storage directory {}", self.dir.display()),
                e,
            )
        })?;

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, value).map_err(|e| {
            ClientError::storage_write(
                format!("Failed to write credential slot {}", tmp_path.display()),
                e,
            )
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600));
        }

        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            ClientError::storage_write(
                format!("Failed to replace credential slot {}", path.display()),
                e,
            )
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.slot_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClientError::storage_write(
                format!("Failed to remove credential slot {}", path.display()),
                e,
            )),
        }
    }
}

/// In-process slots; contents are lost when the value is dropped
#[derive(Debug, Default)]
pub struct MemorySlotStorage {
    slots: Mutex<HashMap<String, String>>,
}

impl MemorySlotStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SlotStorage for MemorySlotStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.slots.lock().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.slots.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.slots.lock().remove(key);
        Ok(())
    }
}
