//! String key-value storage shared by the intake form and the viewer.
//!
//! [`MemoryStore`] lives for one process.  [`FileStore`] keeps every key in a
//! single JSON object on disk so a record submitted by one invocation is
//! visible to the next, the way browser-local storage survives page loads.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use thiserror::Error;

/// File name used by [`FileStore`] inside its directory.
pub const STORE_FILE_NAME: &str = "handoff.json";

/// Failures of the backing storage.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access store file {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("store file {} is not a JSON object of strings", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode store contents")]
    Encode(#[from] serde_json::Error),
}

/// Minimal string-to-string storage.
pub trait KeyValueStore {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes `key`. Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;

    /// Removes every key.
    fn clear(&mut self) -> Result<(), StoreError>;
}

/// In-process store backed by a sorted map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.entries.clear();
        Ok(())
    }
}

/// Store persisted as `handoff.json` inside a directory.
///
/// Every operation reads the file afresh and writes go through a temporary
/// file that is renamed over the original, so a crash never leaves a
/// half-written store behind.
#[derive(Clone, Debug)]
pub struct FileStore {
    directory: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `directory`. The directory is created on first write.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Directory holding the store file.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Full path of the store file.
    pub fn path(&self) -> PathBuf {
        self.directory.join(STORE_FILE_NAME)
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let path = self.path();
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&contents).map_err(|source| StoreError::Corrupt { path, source })
    }

    /// Entries to build a write on, and whether a corrupt file was discarded.
    /// The next write replaces a corrupt file; reads still report it.
    fn entries_for_write(&self) -> Result<(BTreeMap<String, String>, bool), StoreError> {
        match self.read_entries() {
            Ok(entries) => Ok((entries, false)),
            Err(StoreError::Corrupt { path, source }) => {
                warn!(
                    "discarding unreadable store file {}: {source}",
                    path.display()
                );
                Ok((BTreeMap::new(), true))
            }
            Err(err) => Err(err),
        }
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| StoreError::Io { path, source }
        };

        fs::create_dir_all(&self.directory).map_err(io_err(&self.directory))?;

        let encoded = serde_json::to_string_pretty(entries)?;
        let path = self.path();
        let staging = self.directory.join(format!("{STORE_FILE_NAME}.tmp"));
        fs::write(&staging, encoded).map_err(io_err(&staging))?;
        fs::rename(&staging, &path).map_err(io_err(&path))?;

        debug!("wrote {} key(s) to {}", entries.len(), path.display());
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let (mut entries, _) = self.entries_for_write()?;
        entries.insert(key.to_owned(), value.to_owned());
        self.write_entries(&entries)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let (mut entries, discarded) = self.entries_for_write()?;
        if entries.remove(key).is_some() || discarded {
            self.write_entries(&entries)?;
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        let path = self.path();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &mut S {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        (**self).clear()
    }
}
