//! Credential persistence
//!
//! A single-slot store for the one [`AuthorizationRecord`] that may exist
//! at a time. Loads fail closed: corrupt or incomplete persisted content is
//! reported as "no record" rather than an error, so a damaged slot behaves
//! exactly like never having signed in.

use std::fs;
use std::io;
use std::path::PathBuf;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::record::AuthorizationRecord;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("credential store io: {0}")]
    Io(#[from] io::Error),

    #[error("credential store encode: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Single-slot persistence for the authorization record.
pub trait CredentialStore: Send + Sync {
    /// Replace the slot with `record`.
    fn save(&self, record: &AuthorizationRecord) -> Result<(), StoreError>;

    /// Read the slot. Returns `None` for a missing, unparseable, or
    /// structurally incomplete record - never an error.
    fn load(&self) -> Option<AuthorizationRecord>;

    /// Empty the slot. Idempotent.
    fn clear(&self) -> Result<(), StoreError>;
}

/// File-backed store holding the record as a flat JSON object.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialStore for FileCredentialStore {
    fn save(&self, record: &AuthorizationRecord) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let body = serde_json::to_string(record)?;
        fs::write(&self.path, body)?;
        Ok(())
    }

    fn load(&self) -> Option<AuthorizationRecord> {
        let body = match fs::read_to_string(&self.path) {
            Ok(body) => body,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "could not read credential slot");
                return None;
            }
        };

        let record: AuthorizationRecord = match serde_json::from_str(&body) {
            Ok(record) => record,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "discarding unparseable credential slot");
                return None;
            }
        };

        if !record.is_complete() {
            warn!(path = %self.path.display(), "discarding incomplete credential record");
            return None;
        }

        Some(record)
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<AuthorizationRecord>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct with a pre-seeded record.
    pub fn with_record(record: AuthorizationRecord) -> Self {
        let store = Self::new();
        *store.slot.lock() = Some(record);
        store
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn save(&self, record: &AuthorizationRecord) -> Result<(), StoreError> {
        *self.slot.lock() = Some(record.clone());
        Ok(())
    }

    fn load(&self) -> Option<AuthorizationRecord> {
        let slot = self.slot.lock();
        match &*slot {
            Some(record) if record.is_complete() => Some(record.clone()),
            Some(_) => {
                debug!("discarding incomplete in-memory credential record");
                None
            }
            None => None,
        }
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.slot.lock() = None;
        Ok(())
    }
}
