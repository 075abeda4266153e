//! In-memory repositories.

use super::{ListingRepository, RepositoryError, RepositoryResult, UserDirectory};
use crate::listing::{Listing, NewListing, User};
use rently_types::{ListingId, UserId};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, RwLock};

#[derive(Debug, Default)]
struct ListingTable {
    last_id: u64,
    rows: BTreeMap<ListingId, Listing>,
}

/// Listing repository backed by a `BTreeMap`.
///
/// Ids increase monotonically and are never reused, even after a delete.
#[derive(Debug, Default)]
pub struct InMemoryListingRepository {
    table: Mutex<ListingTable>,
}

impl InMemoryListingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> RepositoryResult<MutexGuard<'_, ListingTable>> {
        self.table
            .lock()
            .map_err(|_| RepositoryError::Unavailable("listing table lock poisoned".into()))
    }
}

impl ListingRepository for InMemoryListingRepository {
    fn get_by_id(&self, id: ListingId) -> RepositoryResult<Option<Listing>> {
        Ok(self.table()?.rows.get(&id).cloned())
    }

    fn get_all_by_owner(&self, owner: UserId) -> RepositoryResult<Vec<Listing>> {
        Ok(self
            .table()?
            .rows
            .values()
            .filter(|listing| listing.owner == Some(owner))
            .cloned()
            .collect())
    }

    fn insert(&self, listing: NewListing) -> RepositoryResult<Listing> {
        let mut table = self.table()?;
        let id = ListingId::new(table.last_id + 1)
            .map_err(|e| RepositoryError::Unavailable(e.to_string()))?;
        table.last_id = id.get();

        let stored = Listing {
            id,
            details: listing.details,
            owner: listing.owner,
            image: None,
        };
        table.rows.insert(id, stored.clone());
        Ok(stored)
    }

    fn update(&self, listing: Listing) -> RepositoryResult<Listing> {
        let mut table = self.table()?;
        match table.rows.get_mut(&listing.id) {
            Some(row) => {
                *row = listing.clone();
                Ok(listing)
            }
            None => Err(RepositoryError::NotFound(listing.id)),
        }
    }

    fn delete_by_id(&self, id: ListingId) -> RepositoryResult<()> {
        self.table()?
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound(id))
    }

    fn all(&self) -> RepositoryResult<Vec<Listing>> {
        Ok(self.table()?.rows.values().cloned().collect())
    }
}

/// User directory backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        Self {
            users: RwLock::new(users.into_iter().map(|u| (u.id, u)).collect()),
        }
    }

    /// Adds or replaces a user.
    pub fn insert(&self, user: User) -> RepositoryResult<()> {
        self.users
            .write()
            .map_err(|_| RepositoryError::Unavailable("user table lock poisoned".into()))?
            .insert(user.id, user);
        Ok(())
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn get_by_id(&self, id: UserId) -> RepositoryResult<Option<User>> {
        Ok(self
            .users
            .read()
            .map_err(|_| RepositoryError::Unavailable("user table lock poisoned".into()))?
            .get(&id)
            .cloned())
    }
}
