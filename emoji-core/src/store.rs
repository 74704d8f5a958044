//! Persistence gateways: read and write a serialized document to a named slot.
//!
//! [`FileGateway`] keeps one JSON file per slot in a data directory;
//! [`MemoryGateway`] is a shareable in-memory map for hosts without a
//! filesystem and for tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::{CoreError, CoreResult};

/// File extension used for slot files.
const SLOT_EXTENSION: &str = "json";

/// Abstract storage of serialized documents keyed by slot id.
///
/// A slot is assumed to be owned by a single writer at a time.
pub trait PersistenceGateway: Send + Sync {
    /// Read a slot. `Ok(None)` means the slot has never been written.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage fails.
    fn read(&self, slot: &str) -> CoreResult<Option<Vec<u8>>>;

    /// Replace the contents of a slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage fails.
    fn write(&self, slot: &str, bytes: &[u8]) -> CoreResult<()>;

    /// Remove a slot. Removing a missing slot is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage fails.
    fn delete(&self, slot: &str) -> CoreResult<()>;

    /// List all written slots.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage fails.
    fn slots(&self) -> CoreResult<Vec<String>>;
}

impl<G: PersistenceGateway + ?Sized> PersistenceGateway for Arc<G> {
    fn read(&self, slot: &str) -> CoreResult<Option<Vec<u8>>> {
        (**self).read(slot)
    }

    fn write(&self, slot: &str, bytes: &[u8]) -> CoreResult<()> {
        (**self).write(slot, bytes)
    }

    fn delete(&self, slot: &str) -> CoreResult<()> {
        (**self).delete(slot)
    }

    fn slots(&self) -> CoreResult<Vec<String>> {
        (**self).slots()
    }
}

/// Gateway storing each slot as `<slot>.json` inside a directory.
///
/// Slot ids are limited to alphanumerics, `-` and `_`, so every slot maps to
/// its own file and [`PersistenceGateway::slots`] returns the ids written.
#[derive(Debug, Clone)]
pub struct FileGateway {
    data_dir: PathBuf,
}

impl FileGateway {
    /// Open a gateway over `data_dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Io`] if the directory cannot be created.
    pub fn new(data_dir: impl Into<PathBuf>) -> CoreResult<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    /// The backing directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path_for(&self, slot: &str) -> CoreResult<PathBuf> {
        let name = sanitize_filename(slot);
        if name.is_empty() || name != slot {
            return Err(CoreError::InvalidSlot(slot.to_string()));
        }
        Ok(self.data_dir.join(format!("{name}.{SLOT_EXTENSION}")))
    }
}

impl PersistenceGateway for FileGateway {
    fn read(&self, slot: &str) -> CoreResult<Option<Vec<u8>>> {
        let path = self.path_for(slot)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, slot: &str, bytes: &[u8]) -> CoreResult<()> {
        let path = self.path_for(slot)?;
        // Readers only ever see a complete file.
        let tmp = path.with_extension(format!("{SLOT_EXTENSION}.tmp"));
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &path)?;
        tracing::trace!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }

    fn delete(&self, slot: &str) -> CoreResult<()> {
        let path = self.path_for(slot)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn slots(&self) -> CoreResult<Vec<String>> {
        let mut slots = Vec::new();
        for entry in std::fs::read_dir(&self.data_dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == SLOT_EXTENSION) {
                let stem = path.file_stem().and_then(|s| s.to_str());
                if let Some(stem) = stem.filter(|s| !s.is_empty() && sanitize_filename(s) == *s) {
                    slots.push(stem.to_string());
                }
            }
        }
        slots.sort();
        Ok(slots)
    }
}

/// In-memory gateway. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryGateway {
    slots: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    reject_writes: Arc<RwLock<bool>>,
}

impl MemoryGateway {
    /// Create an empty gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail (or succeed again).
    pub fn set_reject_writes(&self, reject: bool) {
        *self
            .reject_writes
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = reject;
    }
}

impl PersistenceGateway for MemoryGateway {
    fn read(&self, slot: &str) -> CoreResult<Option<Vec<u8>>> {
        let slots = self
            .slots
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(slots.get(slot).cloned())
    }

    fn write(&self, slot: &str, bytes: &[u8]) -> CoreResult<()> {
        let rejected = *self
            .reject_writes
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if rejected {
            return Err(CoreError::WriteRejected(slot.to_string()));
        }
        let mut slots = self
            .slots
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        slots.insert(slot.to_string(), bytes.to_vec());
        Ok(())
    }

    fn delete(&self, slot: &str) -> CoreResult<()> {
        let mut slots = self
            .slots
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        slots.remove(slot);
        Ok(())
    }

    fn slots(&self) -> CoreResult<Vec<String>> {
        let slots = self
            .slots
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut names: Vec<_> = slots.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

/// Sanitize a slot id for use as a filename.
///
/// Replaces any character that is not alphanumeric, `-`, or `_` with `_`.
fn sanitize_filename(slot: &str) -> String {
    slot.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
