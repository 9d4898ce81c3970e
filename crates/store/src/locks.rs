//! Per-row locks.
//!
//! Every mutation of a document, and of the returns against one source
//! document, runs while holding that row's lock. At most one lock is held
//! at a time, so there is no ordering to get wrong.

use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use uuid::Uuid;

use crate::error::StoreError;

/// Lazily created mutex per row key.
#[derive(Debug, Default)]
pub struct RowLocks {
    rows: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl RowLocks {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` while holding the lock for `key`.
    pub fn with_row<T>(
        &self,
        key: Uuid,
        f: impl FnOnce() -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        // Clone the handle so the map shard is not borrowed while we wait.
        let row = Arc::clone(self.rows.entry(key).or_default().value());
        let _guard = row.lock().map_err(|_| StoreError::LockPoisoned)?;
        f()
    }

    /// Number of rows that have been locked at least once.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if no row was ever locked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
