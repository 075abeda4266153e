//! Consistency audit between listing records and media directories.

use crate::manager::ListingManager;
use crate::paths::ListingMediaDir;
use crate::{ListingError, ListingResult};
use rently_files::FilesError;
use rently_types::ListingId;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// A mismatch between a listing record and the media store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Inconsistency {
    /// The record names a file that is not in its media directory.
    DanglingImage { id: ListingId, file_name: String },
    /// The media directory holds more than one file.
    MultipleImages { id: ListingId, files: Vec<String> },
    /// The record has no image but its media directory holds files.
    UnreferencedFiles { id: ListingId, files: Vec<String> },
    /// A media directory with no matching record.
    OrphanDirectory { path: PathBuf },
}

impl fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inconsistency::DanglingImage { id, file_name } => {
                write!(f, "listing {} names missing image {}", id, file_name)
            }
            Inconsistency::MultipleImages { id, files } => {
                write!(f, "listing {} has {} images: {}", id, files.len(), files.join(", "))
            }
            Inconsistency::UnreferencedFiles { id, files } => {
                write!(f, "listing {} has no image but holds: {}", id, files.join(", "))
            }
            Inconsistency::OrphanDirectory { path } => {
                write!(f, "media directory {} has no listing", path.display())
            }
        }
    }
}

impl ListingManager {
    /// Compares every record with every media directory and reports mismatches.
    ///
    /// Nothing is repaired.
    ///
    /// # Errors
    ///
    /// Returns repository errors and [`ListingError::StorageRead`] if a directory cannot be
    /// listed for a reason other than absence.
    pub fn audit(&self) -> ListingResult<Vec<Inconsistency>> {
        let mut findings = Vec::new();
        let mut known = BTreeSet::new();

        for listing in self.listings().all()? {
            known.insert(listing.id);
            let files = self.media_files(listing.id)?;

            match &listing.image {
                Some(name) if !files.contains(name) => {
                    findings.push(Inconsistency::DanglingImage {
                        id: listing.id,
                        file_name: name.clone(),
                    });
                }
                None if !files.is_empty() => {
                    findings.push(Inconsistency::UnreferencedFiles {
                        id: listing.id,
                        files: files.clone(),
                    });
                }
                _ => {}
            }

            if files.len() > 1 {
                findings.push(Inconsistency::MultipleImages {
                    id: listing.id,
                    files,
                });
            }
        }

        let media_root = self
            .store()
            .dir(ListingMediaDir::NAME)
            .map_err(ListingError::StorageRead)?;
        match media_root.load_all() {
            Ok(entries) => {
                for entry in entries {
                    let entry = entry.map_err(ListingError::StorageRead)?;
                    let has_record = entry
                        .to_str()
                        .and_then(|name| name.parse::<ListingId>().ok())
                        .is_some_and(|id| known.contains(&id));
                    if !has_record {
                        findings.push(Inconsistency::OrphanDirectory {
                            path: media_root.root().join(entry),
                        });
                    }
                }
            }
            Err(FilesError::NotFound(_)) => {}
            Err(e) => return Err(ListingError::StorageRead(e)),
        }

        for finding in &findings {
            tracing::warn!("inconsistent state: {}", finding);
        }
        Ok(findings)
    }

    /// Sorted file names in a listing's media directory; empty if it does not exist.
    fn media_files(&self, id: ListingId) -> ListingResult<Vec<String>> {
        let dir = self
            .store()
            .dir(ListingMediaDir::relative(id))
            .map_err(ListingError::StorageRead)?;

        let entries = match dir.load_all() {
            Ok(entries) => entries,
            Err(FilesError::NotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(ListingError::StorageRead(e)),
        };

        let mut files = entries
            .map(|entry| entry.map(|path| path.to_string_lossy().into_owned()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(ListingError::StorageRead)?;
        files.sort();
        Ok(files)
    }
}
