//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services as an
//! `Arc<CoreConfig>`. Nothing in the core reads environment variables while handling a request.

use crate::constants::{LISTINGS_DIR_NAME, USERS_FILENAME};
use crate::paths::ListingMediaDir;
use crate::{ListingError, ListingResult};
use rently_types::ListingId;
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    upload_root: PathBuf,
    data_dir: PathBuf,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`ListingError::InvalidInput`] if either path is empty.
    pub fn new(upload_root: PathBuf, data_dir: PathBuf) -> ListingResult<Self> {
        if upload_root.as_os_str().is_empty() {
            return Err(ListingError::InvalidInput(
                "upload_root cannot be empty".into(),
            ));
        }
        if data_dir.as_os_str().is_empty() {
            return Err(ListingError::InvalidInput("data_dir cannot be empty".into()));
        }

        Ok(Self {
            upload_root,
            data_dir,
        })
    }

    pub fn upload_root(&self) -> &Path {
        &self.upload_root
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Directory holding one YAML file per listing.
    pub fn listings_dir(&self) -> PathBuf {
        self.data_dir.join(LISTINGS_DIR_NAME)
    }

    pub fn users_file(&self) -> PathBuf {
        self.data_dir.join(USERS_FILENAME)
    }

    /// `<upload_root>/annunci`
    pub fn media_root(&self) -> PathBuf {
        self.upload_root.join(ListingMediaDir::NAME)
    }

    /// `<upload_root>/annunci/<id>`
    pub fn listing_media_dir(&self, id: ListingId) -> PathBuf {
        self.upload_root.join(ListingMediaDir::relative(id))
    }
}

/// Resolve a path setting from an optional environment value.
///
/// Unset or blank values fall back to `default`. Surrounding whitespace is trimmed.
pub fn path_from_env_value(value: Option<String>, default: &str) -> PathBuf {
    match value {
        Some(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => PathBuf::from(default),
    }
}
