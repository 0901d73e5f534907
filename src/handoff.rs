//! Typed handoff of the profile record from the intake form to the viewer.
//!
//! Two keys are used:
//!
//! * [`RECORD_KEY`] holds the JSON-encoded [`ProfileRecord`].  It stays until the
//!   next submission replaces it or [`ProfileHandoff::clear`] removes it.
//! * [`DIRECT_DOWNLOAD_KEY`] holds `"true"` when the form asked for an immediate
//!   download.  It is consumed by the first viewer load that reads it.

use log::{debug, info};
use thiserror::Error;

use crate::record::ProfileRecord;
use crate::store::{KeyValueStore, StoreError};

/// Key under which the record is stored.
pub const RECORD_KEY: &str = "userData";

/// Key of the one-shot direct download flag.
pub const DIRECT_DOWNLOAD_KEY: &str = "directDownload";

const FLAG_SET: &str = "true";

/// Failures while reading the record back.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The store itself could not be read.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A value exists but is not a profile record.
    #[error("stored profile record is malformed")]
    Malformed(#[source] serde_json::Error),
}

/// Typed view over a [`KeyValueStore`] that knows the handoff keys.
#[derive(Debug)]
pub struct ProfileHandoff<S> {
    store: S,
}

impl<S: KeyValueStore> ProfileHandoff<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consumes the handoff and returns the underlying store.
    pub fn into_inner(self) -> S {
        self.store
    }

    /// Serializes `record` and replaces whatever was stored before.
    pub fn store_record(&mut self, record: &ProfileRecord) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(record)?;
        self.store.set(RECORD_KEY, &encoded)?;
        info!("stored profile record for '{}'", record.name());
        Ok(())
    }

    /// Reads the stored record, `None` when nothing was submitted yet.
    pub fn load_record(&self) -> Result<Option<ProfileRecord>, LoadError> {
        let Some(encoded) = self.store.get(RECORD_KEY)? else {
            return Ok(None);
        };

        let record = serde_json::from_str(&encoded).map_err(LoadError::Malformed)?;
        Ok(Some(record))
    }

    /// Raises the one-shot direct download flag.
    pub fn request_direct_download(&mut self) -> Result<(), StoreError> {
        self.store.set(DIRECT_DOWNLOAD_KEY, FLAG_SET)
    }

    /// Reads and clears the direct download flag.
    ///
    /// Only the exact value `"true"` counts as set; any other value is still cleared.
    pub fn take_direct_download(&mut self) -> Result<bool, StoreError> {
        let Some(value) = self.store.get(DIRECT_DOWNLOAD_KEY)? else {
            return Ok(false);
        };

        self.store.remove(DIRECT_DOWNLOAD_KEY)?;
        debug!("consumed direct download flag ({value:?})");
        Ok(value == FLAG_SET)
    }

    /// Removes both the record and the flag.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.store.remove(RECORD_KEY)?;
        self.store.remove(DIRECT_DOWNLOAD_KEY)
    }
}
