//! The authoritative back office.
//!
//! Holds documents and returns as whole aggregates. Each mutation runs under
//! the row lock of the record it changes: the snapshot is read, the engine
//! decides, side effects are applied to the collaborators all-or-nothing and
//! only then is the new state written. A rejected or failed operation leaves
//! nothing behind.

pub mod documents;
mod returns;

use std::sync::{Mutex, MutexGuard};

use dashmap::DashMap;
use karat_core::effects::SideEffect;
use karat_core::lifecycle::Document;
use karat_core::returns::Return;
use karat_core::valuation::ValuationEngine;
use karat_shared::AppConfig;
use karat_shared::types::{DocumentId, ReturnId};
use tracing::debug;
use uuid::Uuid;

use crate::collaborators::InMemoryCollaborators;
use crate::error::StoreError;
use crate::locks::RowLocks;

/// In-memory back office with per-row locking.
#[derive(Debug, Default)]
pub struct BackOffice {
    documents: DashMap<DocumentId, Document>,
    returns: DashMap<ReturnId, Return>,
    locks: RowLocks,
    collaborators: Mutex<InMemoryCollaborators>,
    engine: ValuationEngine,
}

impl BackOffice {
    /// Creates an empty back office valuing with `engine`.
    #[must_use]
    pub fn new(engine: ValuationEngine) -> Self {
        Self {
            engine,
            ..Self::default()
        }
    }

    /// Creates an empty back office from configuration.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(ValuationEngine::new(config.valuation.precision))
    }

    /// Starts from existing collaborator state.
    #[must_use]
    pub fn with_collaborators(mut self, collaborators: InMemoryCollaborators) -> Self {
        self.collaborators = Mutex::new(collaborators);
        self
    }

    /// The valuation engine in use.
    #[must_use]
    pub fn engine(&self) -> &ValuationEngine {
        &self.engine
    }

    /// A copy of the current collaborator state.
    pub fn collaborators(&self) -> Result<InMemoryCollaborators, StoreError> {
        Ok(self.lock_collaborators()?.clone())
    }

    /// Runs `f` with mutable access to the collaborators.
    pub fn with_collaborators_mut<T>(
        &self,
        f: impl FnOnce(&mut InMemoryCollaborators) -> T,
    ) -> Result<T, StoreError> {
        let mut guard = self.lock_collaborators()?;
        Ok(f(&mut guard))
    }

    fn lock_collaborators(&self) -> Result<MutexGuard<'_, InMemoryCollaborators>, StoreError> {
        self.collaborators.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Applies effects all-or-nothing. Called with the row lock held.
    fn dispatch(&self, effects: &[SideEffect]) -> Result<(), StoreError> {
        if effects.is_empty() {
            return Ok(());
        }
        let applied = self.lock_collaborators()?.apply_atomically(effects)?;
        debug!(declared = effects.len(), applied, "Side effects dispatched");
        Ok(())
    }

    fn load_document(&self, id: DocumentId) -> Result<Document, StoreError> {
        self.documents
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::DocumentNotFound(id))
    }

    fn load_return(&self, id: ReturnId) -> Result<Return, StoreError> {
        self.returns
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::ReturnNotFound(id))
    }

    /// Writes `updated` if the stored version is still `read_version`.
    fn save_document(&self, read_version: u64, updated: Document) -> Result<(), StoreError> {
        let mut entry = self
            .documents
            .get_mut(&updated.id)
            .ok_or(StoreError::DocumentNotFound(updated.id))?;
        check_version(updated.id.into_inner(), read_version, entry.version)?;
        *entry = updated;
        Ok(())
    }

    fn save_return(&self, read_version: u64, updated: Return) -> Result<(), StoreError> {
        let mut entry = self
            .returns
            .get_mut(&updated.id)
            .ok_or(StoreError::ReturnNotFound(updated.id))?;
        check_version(updated.id.into_inner(), read_version, entry.version)?;
        *entry = updated;
        Ok(())
    }
}

fn check_version(id: Uuid, expected: u64, actual: u64) -> Result<(), StoreError> {
    if expected == actual {
        Ok(())
    } else {
        Err(StoreError::VersionMismatch {
            id,
            expected,
            actual,
        })
    }
}
