//! YAML file repositories.
//!
//! ```text
//! <data_dir>/
//! ├── listings/
//! │   ├── .next_id
//! │   ├── 1.yaml
//! │   └── 2.yaml
//! └── users.yaml
//! ```
//!
//! Each listing lives in its own file, written to a temporary sibling and renamed into place so a
//! reader never sees a half-written record. `.next_id` holds the id the next insert will use,
//! so ids of deleted listings are never handed out again.

use super::{ListingRepository, RepositoryError, RepositoryResult, UserDirectory};
use crate::listing::{Listing, NewListing, User};
use rently_types::{ListingId, UserId};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const RECORD_EXTENSION: &str = "yaml";
const TEMP_SUFFIX: &str = ".tmp";
const NEXT_ID_FILENAME: &str = ".next_id";

/// Listing repository storing one YAML file per record.
#[derive(Debug)]
pub struct YamlListingRepository {
    dir: PathBuf,
    // Serializes id allocation and writes; reads go straight to disk.
    write_lock: Mutex<()>,
}

impl YamlListingRepository {
    /// Opens (creating if needed) the listing directory.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Write`] if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> RepositoryResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(RepositoryError::Write)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: ListingId) -> PathBuf {
        self.dir.join(format!("{}.{}", id, RECORD_EXTENSION))
    }

    fn lock(&self) -> RepositoryResult<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| RepositoryError::Unavailable("listing write lock poisoned".into()))
    }

    fn read_record(path: &Path) -> RepositoryResult<Option<Listing>> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RepositoryError::Read(e)),
        };
        serde_yaml::from_str(&contents)
            .map(Some)
            .map_err(RepositoryError::YamlDeserialization)
    }

    /// Writes `contents` to a temporary sibling of `path` and renames it into place.
    fn write_atomically(path: &Path, contents: String) -> RepositoryResult<()> {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(TEMP_SUFFIX);
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, contents).map_err(RepositoryError::Write)?;
        if let Err(e) = fs::rename(&tmp, path) {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                tracing::warn!(
                    "failed to remove temporary file {}: {}",
                    tmp.display(),
                    cleanup
                );
            }
            return Err(RepositoryError::Write(e));
        }
        Ok(())
    }

    fn write_record(&self, listing: &Listing) -> RepositoryResult<()> {
        let yaml = serde_yaml::to_string(listing).map_err(RepositoryError::YamlSerialization)?;
        Self::write_atomically(&self.record_path(listing.id), yaml)
    }

    /// The persisted high-water mark, if one has been written.
    fn read_next_id(&self) -> RepositoryResult<Option<u64>> {
        match fs::read_to_string(self.dir.join(NEXT_ID_FILENAME)) {
            Ok(contents) => serde_yaml::from_str(&contents)
                .map(Some)
                .map_err(RepositoryError::YamlDeserialization),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RepositoryError::Read(e)),
        }
    }

    fn write_next_id(&self, next: u64) -> RepositoryResult<()> {
        let yaml = serde_yaml::to_string(&next).map_err(RepositoryError::YamlSerialization)?;
        Self::write_atomically(&self.dir.join(NEXT_ID_FILENAME), yaml)
    }

    /// Ids of every record file, ascending. Files that are not `<id>.yaml` are ignored.
    fn record_ids(&self) -> RepositoryResult<Vec<ListingId>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(RepositoryError::Read(e)),
        };

        let mut ids: Vec<ListingId> = entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name();
                let stem = name.to_str()?.strip_suffix(".yaml")?.to_owned();
                stem.parse::<ListingId>().ok()
            })
            .collect();
        ids.sort();
        Ok(ids)
    }
}

impl ListingRepository for YamlListingRepository {
    fn get_by_id(&self, id: ListingId) -> RepositoryResult<Option<Listing>> {
        Self::read_record(&self.record_path(id))
    }

    fn get_all_by_owner(&self, owner: UserId) -> RepositoryResult<Vec<Listing>> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|listing| listing.owner == Some(owner))
            .collect())
    }

    fn insert(&self, listing: NewListing) -> RepositoryResult<Listing> {
        let _guard = self.lock()?;

        // Records written before the mark existed still push it forward.
        let after_records = self
            .record_ids()?
            .last()
            .map_or(1, |last| last.get() + 1);
        let next = self
            .read_next_id()?
            .map_or(after_records, |mark| mark.max(after_records));
        let id = ListingId::new(next).map_err(|e| RepositoryError::Unavailable(e.to_string()))?;
        let following = next
            .checked_add(1)
            .ok_or_else(|| RepositoryError::Unavailable("listing ids exhausted".into()))?;

        // Mark before record, so an interrupted insert skips the id rather than reusing it.
        self.write_next_id(following)?;

        let stored = Listing {
            id,
            details: listing.details,
            owner: listing.owner,
            image: None,
        };
        self.write_record(&stored)?;
        tracing::debug!("wrote new listing record {}", self.record_path(id).display());
        Ok(stored)
    }

    fn update(&self, listing: Listing) -> RepositoryResult<Listing> {
        let _guard = self.lock()?;

        if !self.record_path(listing.id).is_file() {
            return Err(RepositoryError::NotFound(listing.id));
        }
        self.write_record(&listing)?;
        Ok(listing)
    }

    fn delete_by_id(&self, id: ListingId) -> RepositoryResult<()> {
        let _guard = self.lock()?;

        match fs::remove_file(self.record_path(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(RepositoryError::NotFound(id)),
            Err(e) => Err(RepositoryError::Write(e)),
        }
    }

    fn all(&self) -> RepositoryResult<Vec<Listing>> {
        let mut listings = Vec::new();
        for id in self.record_ids()? {
            match Self::read_record(&self.record_path(id)) {
                Ok(Some(listing)) => listings.push(listing),
                // Deleted between the directory scan and the read.
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("skipping unreadable listing record {}: {}", id, e);
                }
            }
        }
        Ok(listings)
    }
}

/// User directory read from a YAML list of users.
///
/// The file is read on every lookup, so edits are picked up without a restart. A missing file
/// means there are no users.
#[derive(Debug, Clone)]
pub struct YamlUserDirectory {
    path: PathBuf,
}

impl YamlUserDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> RepositoryResult<Vec<User>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                serde_yaml::from_str(&contents).map_err(RepositoryError::YamlDeserialization)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(RepositoryError::Read(e)),
        }
    }
}

impl UserDirectory for YamlUserDirectory {
    fn get_by_id(&self, id: UserId) -> RepositoryResult<Option<User>> {
        Ok(self.load()?.into_iter().find(|user| user.id == id))
    }
}
