//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services as
//! an `Arc<CoreConfig>`. Core operations never read process-wide environment variables.

use crate::constants::DEFAULT_STORAGE_DIR;
use crate::storage::Collection;
use crate::{MmsError, MmsResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    storage_dir: PathBuf,
    seed_on_empty: bool,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`MmsError::InvalidInput`] if `storage_dir` is empty or names an existing
    /// non-directory path.
    pub fn new(storage_dir: PathBuf) -> MmsResult<Self> {
        if storage_dir.as_os_str().is_empty() {
            return Err(MmsError::InvalidInput(
                "storage directory cannot be empty".into(),
            ));
        }

        if storage_dir.exists() && !storage_dir.is_dir() {
            return Err(MmsError::InvalidInput(format!(
                "storage path is not a directory: {}",
                storage_dir.display()
            )));
        }

        Ok(Self {
            storage_dir,
            seed_on_empty: true,
        })
    }

    /// Disables the first-run baseline seeding. Used by tests that need an empty registry.
    pub fn without_seed_data(mut self) -> Self {
        self.seed_on_empty = false;
        self
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn seed_on_empty(&self) -> bool {
        self.seed_on_empty
    }

    /// Path of the flat-record file backing `collection`.
    pub fn collection_path(&self, collection: Collection) -> PathBuf {
        self.storage_dir.join(collection.filename())
    }
}

/// Resolve the storage directory from an optional override value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_STORAGE_DIR`].
pub fn storage_dir_from_env_value(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR))
}
