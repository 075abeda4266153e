//! Rently Media Store
//!
//! This crate manages the filesystem subtree that holds listing images.
//!
//! ## Design Principles
//!
//! - Every listing owns one media directory, and that directory holds at most one live image
//! - Directories are created lazily, on the first image write
//! - Files are never silently overwritten; replacing an image clears the directory first
//! - There is no process-wide "current directory": [`MediaStore::init`] returns a [`MediaDir`]
//!   handle and every file operation is scoped to that handle
//!
//! ## Storage Layout
//!
//! ```text
//! <upload_root>/
//! └── annunci/
//!     └── <listing_id>/
//!         └── Ab3dE9xY0qLm.jpg
//! ```
//!
//! The layout below the upload root is decided by the caller; this crate only guarantees that
//! every resolved directory stays inside the upload root.
//!
//! ## Example Usage
//!
//! ```no_run
//! use rently_files::{extension_of, generate_random_name, MediaStore};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MediaStore::new("uploads");
//! let dir = store.init("annunci/42")?;
//!
//! let file_name = format!("{}.{}", generate_random_name(), extension_of("chair.jpg")?);
//! dir.save(b"...image bytes...", &file_name)?;
//! # Ok(())
//! # }
//! ```

mod names;
mod store;

pub use names::{extension_of, generate_random_name, RANDOM_NAME_LEN};
pub use store::{detect_media_type, MediaDir, MediaEntries, MediaStore, StoredFile};

/// Errors that can occur during media storage operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Path validation failed (directory traversal or unsafe file name)
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// The media directory could not be created
    #[error("Could not initialise media directory {}: {source}", path.display())]
    InitFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file with the same name already exists in the media directory
    #[error("File {0} already exists in media directory")]
    FileAlreadyExists(String),

    /// The requested file or directory does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The original file name carries no extension separator
    #[error("File name has no extension: '{0}'")]
    MalformedFileName(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for media storage operations.
pub type FilesResult<T> = Result<T, FilesError>;
