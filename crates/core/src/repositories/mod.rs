//! Listing and user storage.
//!
//! The listing manager only talks to storage through the [`ListingRepository`] and
//! [`UserDirectory`] traits. Each call is atomic for the row it touches; nothing here spans more
//! than one call, so multi-step consistency is the manager's job.
//!
//! Two implementations of each are provided:
//! - [`memory`]: process-local maps, for tests and embedding
//! - [`yaml`]: one YAML file per listing under the data directory, plus a `users.yaml` list

pub mod memory;
pub mod yaml;

pub use memory::{InMemoryListingRepository, InMemoryUserDirectory};
pub use yaml::{YamlListingRepository, YamlUserDirectory};

use crate::listing::{Listing, NewListing, User};
use rently_types::{ListingId, UserId};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("listing {0} does not exist")]
    NotFound(ListingId),
    #[error("failed to read listing storage: {0}")]
    Read(std::io::Error),
    #[error("failed to write listing storage: {0}")]
    Write(std::io::Error),
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Persistent store of listing records.
pub trait ListingRepository: Send + Sync {
    fn get_by_id(&self, id: ListingId) -> RepositoryResult<Option<Listing>>;

    fn get_all_by_owner(&self, owner: UserId) -> RepositoryResult<Vec<Listing>>;

    /// Stores a new record and allocates its id.
    fn insert(&self, listing: NewListing) -> RepositoryResult<Listing>;

    /// Overwrites an existing record.
    ///
    /// Returns [`RepositoryError::NotFound`] if no record has that id.
    fn update(&self, listing: Listing) -> RepositoryResult<Listing>;

    /// Returns [`RepositoryError::NotFound`] if no record has that id.
    fn delete_by_id(&self, id: ListingId) -> RepositoryResult<()>;

    /// Every stored record, ordered by id.
    fn all(&self) -> RepositoryResult<Vec<Listing>>;
}

/// Lookup of listing owners.
pub trait UserDirectory: Send + Sync {
    fn get_by_id(&self, id: UserId) -> RepositoryResult<Option<User>>;
}
