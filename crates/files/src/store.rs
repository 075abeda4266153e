//! Listing-scoped media storage implementation
//!
//! This module provides the [`MediaStore`] and the [`MediaDir`] handles it hands out.
//!
//! # Scoping
//!
//! A `MediaStore` only knows the upload root. Calling [`MediaStore::init`] resolves one
//! directory below that root, creates it, and returns a `MediaDir` bound to it. All file
//! operations live on the handle, so concurrent callers working on different listings can
//! share a single `MediaStore` without ever observing each other's directory.
//!
//! # Security Model
//!
//! - Paths are made absolute and lexically normalised before use
//! - A resolved directory must stay inside the upload root
//! - File names handed to a `MediaDir` must be a single path component
//!
//! # Implementation Notes
//!
//! - `MediaStore` performs no I/O in its constructor
//! - [`MediaStore::dir`] resolves a handle without creating anything, for read and delete paths
//! - Writes use create-new semantics; nothing is ever overwritten in place

use crate::{FilesError, FilesResult};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};

/// Metadata for a stored image
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct StoredFile {
    /// File name relative to the media directory
    pub file_name: String,

    /// Size of the file in bytes
    pub size_bytes: u64,

    /// Detected media type (MIME type), if available
    ///
    /// This is a best-effort detection from the leading bytes and should not be considered
    /// authoritative.
    pub media_type: Option<String>,
}

/// Entry point for media storage below one upload root.
#[derive(Debug, Clone)]
pub struct MediaStore {
    upload_root: PathBuf,
}

impl MediaStore {
    /// Creates a store rooted at `upload_root`.
    ///
    /// The root does not need to exist yet; it is created together with the first
    /// directory initialised below it.
    pub fn new(upload_root: impl Into<PathBuf>) -> Self {
        Self {
            upload_root: upload_root.into(),
        }
    }

    /// Returns the upload root as configured.
    pub fn upload_root(&self) -> &Path {
        &self.upload_root
    }

    /// Resolves `path` and creates the directory (and any missing ancestors).
    ///
    /// Relative paths are resolved under the upload root. An already existing directory is
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - the resolved path escapes the upload root ([`FilesError::InvalidPath`])
    /// - the directory cannot be created ([`FilesError::InitFailed`])
    pub fn init(&self, path: impl AsRef<Path>) -> FilesResult<MediaDir> {
        let root = self.resolve(path.as_ref())?;

        fs::create_dir_all(&root).map_err(|source| FilesError::InitFailed {
            path: root.clone(),
            source,
        })?;

        tracing::debug!("initialised media directory {}", root.display());
        Ok(MediaDir { root })
    }

    /// Resolves `path` to a handle without touching the filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidPath`] if the resolved path escapes the upload root, or
    /// an I/O error if the current directory cannot be determined.
    pub fn dir(&self, path: impl AsRef<Path>) -> FilesResult<MediaDir> {
        Ok(MediaDir {
            root: self.resolve(path.as_ref())?,
        })
    }

    fn resolve(&self, path: &Path) -> FilesResult<PathBuf> {
        let upload_root = normalize(&std::path::absolute(&self.upload_root)?);

        let candidate = if path.is_absolute() {
            normalize(path)
        } else {
            normalize(&upload_root.join(path))
        };

        if !candidate.starts_with(&upload_root) {
            return Err(FilesError::InvalidPath(format!(
                "{} is outside the upload root {}",
                candidate.display(),
                upload_root.display()
            )));
        }

        Ok(candidate)
    }
}

/// Handle to one resolved media directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDir {
    root: PathBuf,
}

impl MediaDir {
    /// Returns the absolute path of this directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns true if the directory currently exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Writes `bytes` to `<root>/<file_name>`.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - `file_name` is not a single plain path component ([`FilesError::InvalidPath`])
    /// - a file with that name already exists ([`FilesError::FileAlreadyExists`])
    /// - the directory does not exist or the write fails (I/O)
    pub fn save(&self, bytes: &[u8], file_name: &str) -> FilesResult<StoredFile> {
        let target = self.file_path(file_name)?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => FilesError::FileAlreadyExists(file_name.to_owned()),
                _ => FilesError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to create {}: {}", target.display(), e),
                )),
            })?;

        let written = file.write_all(bytes).and_then(|()| file.sync_all());
        drop(file);

        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&target) {
                tracing::warn!(
                    "failed to remove partially written {}: {}",
                    target.display(),
                    cleanup
                );
            }
            return Err(FilesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write {}: {}", target.display(), e),
            )));
        }

        Ok(StoredFile {
            file_name: file_name.to_owned(),
            size_bytes: bytes.len() as u64,
            media_type: detect_media_type(bytes).map(str::to_owned),
        })
    }

    /// Clears the directory and stores `bytes` as its only file.
    ///
    /// The directory is removed entirely, re-created, then written. If the write fails the
    /// directory is left empty.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`Self::delete_all`], directory re-creation
    /// ([`FilesError::InitFailed`]) or [`Self::save`].
    pub fn replace(&self, bytes: &[u8], file_name: &str) -> FilesResult<StoredFile> {
        // Reject a bad name before anything is removed.
        self.file_path(file_name)?;

        self.delete_all()?;
        fs::create_dir_all(&self.root).map_err(|source| FilesError::InitFailed {
            path: self.root.clone(),
            source,
        })?;
        self.save(bytes, file_name)
    }

    /// Recursively removes the directory and everything in it.
    ///
    /// Removing a directory that does not exist succeeds.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if removal fails for any reason other than absence.
    pub fn delete_all(&self) -> FilesResult<()> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => {
                tracing::debug!("removed media directory {}", self.root.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FilesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to remove {}: {}", self.root.display(), e),
            ))),
        }
    }

    /// Lists the entries of the directory as paths relative to it.
    ///
    /// The returned iterator reads the directory lazily. Call again to restart.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::NotFound`] if the directory does not exist.
    pub fn load_all(&self) -> FilesResult<MediaEntries> {
        match fs::read_dir(&self.root) {
            Ok(inner) => Ok(MediaEntries { inner }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(FilesError::NotFound(self.root.display().to_string()))
            }
            Err(e) => Err(FilesError::Io(e)),
        }
    }

    /// Opens `<root>/<file_name>` for reading.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::NotFound`] if the file does not exist, [`FilesError::InvalidPath`]
    /// for unsafe names, or an I/O error if it cannot be opened.
    pub fn load(&self, file_name: &str) -> FilesResult<File> {
        let path = self.file_path(file_name)?;

        File::open(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => FilesError::NotFound(path.display().to_string()),
            _ => FilesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to open {}: {}", path.display(), e),
            )),
        })
    }

    fn file_path(&self, file_name: &str) -> FilesResult<PathBuf> {
        let mut components = Path::new(file_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) if !file_name.contains('\\') => {
                Ok(self.root.join(file_name))
            }
            _ => Err(FilesError::InvalidPath(format!(
                "'{}' is not a plain file name",
                file_name
            ))),
        }
    }
}

/// Lazy listing of a media directory, yielding paths relative to it.
#[derive(Debug)]
pub struct MediaEntries {
    inner: fs::ReadDir,
}

impl Iterator for MediaEntries {
    type Item = FilesResult<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|entry| {
            entry
                .map(|e| PathBuf::from(e.file_name()))
                .map_err(FilesError::Io)
        })
    }
}

/// Best-effort media type detection from the leading bytes of a file.
pub fn detect_media_type(bytes: &[u8]) -> Option<&'static str> {
    infer::get(bytes).map(|kind| kind.mime_type())
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
