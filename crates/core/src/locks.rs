//! Per-listing mutual exclusion.

use rently_types::ListingId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Table of one mutex per listing id.
///
/// Entries are created on demand and dropped once no caller holds or waits for them, so the
/// table only grows with the number of listings being mutated concurrently.
#[derive(Debug, Default)]
pub struct ListingLocks {
    table: Mutex<HashMap<ListingId, Arc<Mutex<()>>>>,
}

impl ListingLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` while holding the lock for `id`.
    ///
    /// Calls for different ids do not block each other. A panic inside `f` poisons nothing:
    /// the lock carries no data, so a poisoned mutex is simply taken over.
    pub fn with_lock<T>(&self, id: ListingId, f: impl FnOnce() -> T) -> T {
        let entry = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(table.entry(id).or_default())
        };

        let result = {
            let _guard = entry.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };

        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the table plus ours: nobody else is waiting.
        if Arc::strong_count(&entry) == 2 {
            table.remove(&id);
        }
        result
    }

    /// Number of ids currently present in the table.
    pub fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
