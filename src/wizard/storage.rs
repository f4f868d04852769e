//! Durable storage for the wizard progress record

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::error::StorageError;
use super::progress::{self, WizardProgress};
use crate::config::Config;

/// Keyed storage holding a single progress record
pub trait ProgressStorage: Send + Sync {
    /// Read the record; `None` when nothing has been written yet
    fn load(&self) -> Result<Option<WizardProgress>, StorageError>;

    fn save(&self, progress: &WizardProgress) -> Result<(), StorageError>;

    /// Remove the record entirely
    fn clear(&self) -> Result<(), StorageError>;
}

impl<T: ProgressStorage + ?Sized> ProgressStorage for Arc<T> {
    fn load(&self) -> Result<Option<WizardProgress>, StorageError> {
        (**self).load()
    }

    fn save(&self, progress: &WizardProgress) -> Result<(), StorageError> {
        (**self).save(progress)
    }

    fn clear(&self) -> Result<(), StorageError> {
        (**self).clear()
    }
}

/// JSON file on disk
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Storage at `<paths.state>/<storage.key>.json`
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.progress_file())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProgressStorage for FileStorage {
    fn load(&self) -> Result<Option<WizardProgress>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => progress::decode(&contents).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, progress: &WizardProgress) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = progress::encode(progress)?;

        // Write then rename; readers never see a partial record
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), "saved wizard progress");
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process storage; keeps the encoded record so the on-disk format is
/// exercised
#[derive(Debug, Default)]
pub struct MemoryStorage {
    record: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a raw record, e.g. one written by an older build
    pub fn with_record(record: impl Into<String>) -> Self {
        Self {
            record: Mutex::new(Some(record.into())),
        }
    }

    /// The raw record as last written
    pub fn raw(&self) -> Option<String> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.record
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl ProgressStorage for MemoryStorage {
    fn load(&self) -> Result<Option<WizardProgress>, StorageError> {
        self.lock()
            .as_deref()
            .map(progress::decode)
            .transpose()
    }

    fn save(&self, progress: &WizardProgress) -> Result<(), StorageError> {
        let encoded = progress::encode(progress)?;
        *self.lock() = Some(encoded);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.lock() = None;
        Ok(())
    }
}
