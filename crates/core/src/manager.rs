//! Listing lifecycle workflows.
//!
//! [`ListingManager`] is the only component that touches both the listing repository and the
//! media store. Every workflow runs its steps in a fixed order and validates input before the
//! first write.
//!
//! ## Consistency
//!
//! - **Create** runs insert, directory init, save and record update in sequence. If any step
//!   after the insert fails, the media directory and the record are removed again before the
//!   original error is returned.
//! - **Update** replaces the image by clearing the directory and then saving. A failure between
//!   the two leaves the record naming a file that no longer exists; this is logged and reported
//!   by [`ListingManager::audit`], not repaired.
//! - **Delete** removes the record and then the media directory.
//!
//! Mutations of the same listing are serialized through [`ListingLocks`].

use crate::config::CoreConfig;
use crate::listing::{ImageUpload, Listing, ListingPayload, ListingView, NewListing};
use crate::locks::ListingLocks;
use crate::paths::ListingMediaDir;
use crate::repositories::{ListingRepository, RepositoryError, UserDirectory};
use crate::validation::validate_listing_fields;
use crate::{ListingError, ListingResult};
use rently_files::{
    detect_media_type, extension_of, generate_random_name, FilesError, MediaDir, MediaStore,
};
use rently_types::{ListingId, UserId};
use std::fs::File;
use std::io::Read;
use std::sync::Arc;

#[cfg(test)]
use std::collections::HashSet;
#[cfg(test)]
use std::sync::{LazyLock, Mutex};

#[cfg(test)]
static FORCE_CLEANUP_ERROR_FOR_THREADS: LazyLock<Mutex<HashSet<std::thread::ThreadId>>> =
    LazyLock::new(|| Mutex::new(HashSet::new()));

#[cfg(test)]
pub(crate) fn force_cleanup_error_for_current_thread() {
    let mut guard = FORCE_CLEANUP_ERROR_FOR_THREADS
        .lock()
        .expect("FORCE_CLEANUP_ERROR_FOR_THREADS mutex poisoned");
    guard.insert(std::thread::current().id());
}

/// Removes a listing's media directory.
///
/// In test mode, it can be forced to fail for specific threads to test error handling.
fn remove_listing_media(dir: &MediaDir) -> ListingResult<()> {
    #[cfg(test)]
    {
        let current_id = std::thread::current().id();
        let mut guard = FORCE_CLEANUP_ERROR_FOR_THREADS
            .lock()
            .expect("FORCE_CLEANUP_ERROR_FOR_THREADS mutex poisoned");

        if guard.remove(&current_id) {
            return Err(ListingError::StorageDelete(FilesError::Io(
                std::io::Error::other("forced cleanup failure (test hook)"),
            )));
        }
    }

    dir.delete_all().map_err(ListingError::StorageDelete)
}

/// Builds the stored name for an upload: a random base plus the upload's extension.
fn stored_file_name(original_filename: &str) -> ListingResult<String> {
    let extension = extension_of(original_filename).map_err(|e| match e {
        FilesError::MalformedFileName(name) => {
            ListingError::MalformedInput(format!("file name '{}' has no extension", name))
        }
        other => ListingError::MalformedInput(other.to_string()),
    })?;
    Ok(format!("{}.{}", generate_random_name(), extension))
}

/// An image read back from a listing's media directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageContent {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub media_type: Option<&'static str>,
}

/// Orchestrates listing records and their images.
pub struct ListingManager {
    cfg: Arc<CoreConfig>,
    listings: Arc<dyn ListingRepository>,
    users: Arc<dyn UserDirectory>,
    store: MediaStore,
    locks: ListingLocks,
}

impl ListingManager {
    pub fn new(
        cfg: Arc<CoreConfig>,
        listings: Arc<dyn ListingRepository>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        let store = MediaStore::new(cfg.upload_root());
        Self {
            cfg,
            listings,
            users,
            store,
            locks: ListingLocks::new(),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    /// Creates a listing with its image.
    ///
    /// # Errors
    ///
    /// Returns a `ListingError` if:
    /// - a pattern-checked field does not match ([`ListingError::Validation`])
    /// - category or condition is unknown ([`ListingError::UnknownVariant`])
    /// - city, price or end date cannot be parsed ([`ListingError::InvalidInput`])
    /// - the upload name has no extension ([`ListingError::MalformedInput`])
    /// - the media directory cannot be created ([`ListingError::StorageInit`])
    /// - the image cannot be written ([`ListingError::StorageWrite`])
    /// - the repository fails ([`ListingError::Repository`])
    /// - removal of a partially-created listing fails
    ///   ([`ListingError::CleanupAfterCreateFailed`])
    ///
    /// The first four are detected before anything is written.
    ///
    /// # Rollback
    ///
    /// If a step after the record insert fails, the listing's media directory and record are
    /// removed and the original error is returned. If that cleanup also fails,
    /// [`ListingError::CleanupAfterCreateFailed`] carries both errors.
    pub fn create(&self, payload: &ListingPayload, image: &ImageUpload) -> ListingResult<Listing> {
        validate_listing_fields(payload)?;
        let details = payload.parse_details()?;
        let owner = self.resolve_owner(payload.owner_id);

        let inserted = self.listings.insert(NewListing { details, owner })?;
        let id = inserted.id;
        tracing::debug!("inserted listing {} without image", id);

        self.locks.with_lock(id, || {
            match self.attach_new_image(inserted, image) {
                Ok(listing) => {
                    tracing::info!("created listing {}", id);
                    Ok(listing)
                }
                Err(create_error) => Err(self.undo_create(id, create_error)),
            }
        })
    }

    fn attach_new_image(&self, mut listing: Listing, image: &ImageUpload) -> ListingResult<Listing> {
        let dir = self
            .store
            .init(ListingMediaDir::relative(listing.id))
            .map_err(ListingError::StorageInit)?;

        let file_name = stored_file_name(&image.original_filename)?;
        let stale = dir
            .load_all()
            .map_err(ListingError::StorageRead)?
            .next()
            .is_some();
        let stored = if stale {
            tracing::warn!(
                "media directory {} of new listing {} is not empty, clearing it",
                dir.root().display(),
                listing.id
            );
            dir.replace(&image.bytes, &file_name)
        } else {
            dir.save(&image.bytes, &file_name)
        }
        .map_err(ListingError::StorageWrite)?;
        tracing::debug!(
            "saved {} ({} bytes) for listing {}",
            stored.file_name,
            stored.size_bytes,
            listing.id
        );

        listing.image = Some(stored.file_name);
        Ok(self.listings.update(listing)?)
    }

    fn undo_create(&self, id: ListingId, create_error: ListingError) -> ListingError {
        tracing::warn!(
            "create of listing {} failed, removing partial listing: {}",
            id,
            create_error
        );

        let path = self.cfg.listing_media_dir(id);
        match self.remove_partial_listing(id) {
            Ok(()) => create_error,
            Err(cleanup_error) => {
                tracing::warn!(
                    "inconsistent state: listing {} may remain without an image at {}: {}",
                    id,
                    path.display(),
                    cleanup_error
                );
                ListingError::CleanupAfterCreateFailed {
                    id,
                    path,
                    create_error: Box::new(create_error),
                    cleanup_error: Box::new(cleanup_error),
                }
            }
        }
    }

    /// Removes the media directory and then the record of a listing whose create failed.
    fn remove_partial_listing(&self, id: ListingId) -> ListingResult<()> {
        let dir = self
            .store
            .dir(ListingMediaDir::relative(id))
            .map_err(ListingError::StorageDelete)?;
        remove_listing_media(&dir)?;

        match self.listings.delete_by_id(id) {
            Ok(()) | Err(RepositoryError::NotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Replaces every attribute of a listing and, optionally, its image.
    ///
    /// # Errors
    ///
    /// Returns [`ListingError::NotFound`] if the listing does not exist, the same input errors
    /// as [`Self::create`] before anything is written, and storage or repository errors after.
    pub fn update(
        &self,
        id: ListingId,
        payload: &ListingPayload,
        image: Option<&ImageUpload>,
    ) -> ListingResult<Listing> {
        self.locks.with_lock(id, || {
            let mut listing = self.get(id)?;

            validate_listing_fields(payload)?;
            listing.details = payload.parse_details()?;
            // Only the extension is needed here; checking it now keeps a bad upload name from
            // leaving the record half-updated.
            let file_name = image
                .map(|image| stored_file_name(&image.original_filename))
                .transpose()?;

            if let Some(owner) = self.resolve_owner(payload.owner_id) {
                listing.owner = Some(owner);
            }

            let listing = self.listings.update(listing)?;
            tracing::debug!("updated attributes of listing {}", id);

            match (image, file_name) {
                (Some(image), Some(file_name)) => self.replace_image(listing, image, file_name),
                _ => Ok(listing),
            }
        })
    }

    fn replace_image(
        &self,
        mut listing: Listing,
        image: &ImageUpload,
        file_name: String,
    ) -> ListingResult<Listing> {
        let dir = self
            .store
            .init(ListingMediaDir::relative(listing.id))
            .map_err(ListingError::StorageInit)?;

        let stored = match dir.replace(&image.bytes, &file_name) {
            Ok(stored) => stored,
            Err(e) => {
                if let Some(previous) = &listing.image {
                    tracing::warn!(
                        "inconsistent state: listing {} names {} but its media directory may be empty: {}",
                        listing.id,
                        previous,
                        e
                    );
                }
                return Err(ListingError::StorageWrite(e));
            }
        };

        let id = listing.id;
        listing.image = Some(stored.file_name);
        self.listings.update(listing).map_err(|e| {
            tracing::warn!(
                "inconsistent state: new image for listing {} stored but record not updated: {}",
                id,
                e
            );
            e.into()
        })
    }

    /// Deletes a listing record and its media directory.
    ///
    /// A failure to remove the directory after the record is gone is logged and does not fail
    /// the call.
    ///
    /// # Errors
    ///
    /// Returns [`ListingError::NotFound`] if the listing does not exist.
    pub fn delete(&self, id: ListingId) -> ListingResult<()> {
        self.locks.with_lock(id, || {
            self.get(id)?;
            self.listings.delete_by_id(id)?;

            let removed = self
                .store
                .dir(ListingMediaDir::relative(id))
                .map_err(ListingError::StorageDelete)
                .and_then(|dir| remove_listing_media(&dir));
            if let Err(e) = removed {
                tracing::warn!(
                    "inconsistent state: listing {} deleted but {} remains: {}",
                    id,
                    self.cfg.listing_media_dir(id).display(),
                    e
                );
            }

            tracing::info!("deleted listing {}", id);
            Ok(())
        })
    }

    /// # Errors
    ///
    /// Returns [`ListingError::NotFound`] if the listing does not exist.
    pub fn get(&self, id: ListingId) -> ListingResult<Listing> {
        self.listings.get_by_id(id)?.ok_or(ListingError::NotFound(id))
    }

    /// Every listing owned by `owner`, ordered by id.
    pub fn list_by_owner(&self, owner: UserId) -> ListingResult<Vec<Listing>> {
        let mut listings = self.listings.get_all_by_owner(owner)?;
        listings.sort_by_key(|listing| listing.id);
        Ok(listings)
    }

    pub fn view(&self, listing: &Listing) -> ListingView {
        ListingView::from(listing)
    }

    /// Opens a listing's image for reading.
    ///
    /// # Errors
    ///
    /// Returns [`ListingError::NotFound`] if the listing does not exist, has no image, or its
    /// image file is missing.
    pub fn open_image(&self, id: ListingId) -> ListingResult<(File, String)> {
        let listing = self.get(id)?;
        let file_name = listing.image.ok_or(ListingError::NotFound(id))?;

        let dir = self
            .store
            .dir(ListingMediaDir::relative(id))
            .map_err(ListingError::StorageRead)?;
        let file = dir.load(&file_name).map_err(|e| match e {
            FilesError::NotFound(path) => {
                tracing::warn!("inconsistent state: listing {} names missing {}", id, path);
                ListingError::NotFound(id)
            }
            other => ListingError::StorageRead(other),
        })?;

        Ok((file, file_name))
    }

    /// Reads a listing's image into memory and detects its media type.
    ///
    /// # Errors
    ///
    /// As [`Self::open_image`], plus [`ListingError::StorageRead`] if reading fails.
    pub fn read_image(&self, id: ListingId) -> ListingResult<ImageContent> {
        let (mut file, file_name) = self.open_image(id)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|e| ListingError::StorageRead(FilesError::Io(e)))?;

        Ok(ImageContent {
            media_type: detect_media_type(&bytes),
            file_name,
            bytes,
        })
    }

    pub(crate) fn listings(&self) -> &dyn ListingRepository {
        self.listings.as_ref()
    }

    pub(crate) fn store(&self) -> &MediaStore {
        &self.store
    }

    /// Owner lookup. Unknown owners and directory failures both yield `None`.
    fn resolve_owner(&self, owner_id: Option<UserId>) -> Option<UserId> {
        let owner_id = owner_id?;
        match self.users.get_by_id(owner_id) {
            Ok(Some(user)) => Some(user.id),
            Ok(None) => {
                tracing::warn!("owner {} not found, continuing without owner", owner_id);
                None
            }
            Err(e) => {
                tracing::warn!(
                    "owner lookup for {} failed, continuing without owner: {}",
                    owner_id,
                    e
                );
                None
            }
        }
    }
}
