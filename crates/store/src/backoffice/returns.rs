//! Return operations.
//!
//! All returns against one source document share that document's row lock,
//! so remaining balances are read and reserved without interleaving.

use std::collections::BTreeMap;

use chrono::Utc;
use karat_core::lifecycle::{Document, TransitionContext};
use karat_core::returns::{
    NewReturn, RefundDetails, RemainingBalance, Return, ReturnFinalization, ReturnItem,
    ReturnsLedger, compute_remaining,
};
use karat_core::valuation::ValuationEngine;
use karat_shared::types::{DocumentId, LineItemId, ReturnId, UserId};
use tracing::{info, warn};
use uuid::Uuid;

use super::BackOffice;
use crate::error::StoreError;

impl BackOffice {
    /// Ids of every return referencing `document_id`, drafts included.
    pub(crate) fn returns_referencing(&self, document_id: DocumentId) -> Vec<ReturnId> {
        self.returns
            .iter()
            .filter(|entry| entry.references(document_id))
            .map(|entry| entry.id)
            .collect()
    }

    fn returns_against(&self, document_id: DocumentId) -> Vec<Return> {
        self.returns
            .iter()
            .filter(|entry| entry.references(document_id))
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Source snapshot and sibling returns for a return with this reference.
    fn source_context(&self, source_id: Option<DocumentId>) -> Result<(Option<Document>, Vec<Return>), StoreError> {
        match source_id {
            Some(id) => Ok((Some(self.load_document(id)?), self.returns_against(id))),
            None => Ok((None, Vec::new())),
        }
    }

    /// Row key for a return: its source document, or its own id when manual.
    fn return_lock_key(ret_id: ReturnId, source_id: Option<DocumentId>) -> Uuid {
        source_id.map_or(ret_id.into_inner(), DocumentId::into_inner)
    }

    /// Returns a copy of the return.
    pub fn get_return(&self, id: ReturnId) -> Result<Return, StoreError> {
        self.load_return(id)
    }

    /// Remaining returnable balance on each line of `source_id`.
    pub fn remaining(
        &self,
        source_id: DocumentId,
    ) -> Result<BTreeMap<LineItemId, RemainingBalance>, StoreError> {
        self.locks.with_row(source_id.into_inner(), || {
            let source = self.load_document(source_id)?;
            let returns = self.returns_against(source_id);
            Ok(compute_remaining(&source, &returns, None, &self.engine)?)
        })
    }

    /// Creates a draft return, reserving its items.
    pub fn create_return(&self, request: NewReturn) -> Result<Return, StoreError> {
        let Some(source_id) = request.reference.document_id else {
            // Nothing to reserve; the draft is only locked under its own id.
            let ret = Self::draft_return(request, None, &[], &self.engine)?;
            return self
                .locks
                .with_row(Self::return_lock_key(ret.id, None), || Ok(self.insert_return(ret)));
        };
        self.locks.with_row(source_id.into_inner(), || {
            let (source, siblings) = self.source_context(Some(source_id))?;
            let ret = Self::draft_return(request, source.as_ref(), &siblings, &self.engine)?;
            Ok(self.insert_return(ret))
        })
    }

    fn draft_return(
        request: NewReturn,
        source: Option<&Document>,
        siblings: &[Return],
        engine: &ValuationEngine,
    ) -> Result<Return, StoreError> {
        Ok(ReturnsLedger::create_draft(request, source, siblings, engine, Utc::now())
            .inspect_err(|err| warn!(error = %err, "Return draft rejected"))?)
    }

    fn insert_return(&self, ret: Return) -> Return {
        self.returns.insert(ret.id, ret.clone());
        info!(
            return_id = %ret.id,
            return_type = %ret.return_type,
            items = ret.items.len(),
            "Return draft created"
        );
        ret
    }

    /// Replaces the items of a draft return.
    pub fn update_return_items(
        &self,
        id: ReturnId,
        expected_version: u64,
        items: Vec<ReturnItem>,
    ) -> Result<Return, StoreError> {
        let source_id = self.load_return(id)?.reference.document_id;
        self.locks.with_row(Self::return_lock_key(id, source_id), || {
            let current = self.load_return(id)?;
            super::check_version(id.into_inner(), expected_version, current.version)?;
            let (source, siblings) = self.source_context(source_id)?;
            let updated = ReturnsLedger::update_items(&current, items, source.as_ref(), &siblings, &self.engine)
                .inspect_err(|err| warn!(return_id = %id, error = %err, "Return items rejected"))?;
            self.save_return(current.version, updated.clone())?;
            info!(return_id = %id, version = updated.version, "Return items updated");
            Ok(updated)
        })
    }

    /// Replaces the refund fields of a draft return.
    pub fn update_return_refund(
        &self,
        id: ReturnId,
        expected_version: u64,
        refund: RefundDetails,
    ) -> Result<Return, StoreError> {
        let source_id = self.load_return(id)?.reference.document_id;
        self.locks.with_row(Self::return_lock_key(id, source_id), || {
            let current = self.load_return(id)?;
            super::check_version(id.into_inner(), expected_version, current.version)?;
            let updated = ReturnsLedger::update_refund(&current, refund)?;
            self.save_return(current.version, updated.clone())?;
            Ok(updated)
        })
    }

    /// Finalizes a return and settles its refund.
    pub fn finalize_return(&self, id: ReturnId, actor: UserId) -> Result<ReturnFinalization, StoreError> {
        let source_id = self.load_return(id)?.reference.document_id;
        self.locks.with_row(Self::return_lock_key(id, source_id), || {
            let current = self.load_return(id)?;
            let (source, siblings) = self.source_context(source_id)?;
            let ctx = TransitionContext::new(actor);
            let done = ReturnsLedger::finalize(&current, source.as_ref(), &siblings, &ctx, &self.engine)
                .inspect_err(|err| warn!(return_id = %id, error = %err, "Return finalize rejected"))?;
            self.dispatch(&done.side_effects)?;
            self.save_return(current.version, done.ret.clone())?;
            info!(
                return_id = %id,
                effects = done.side_effects.len(),
                "Return finalized"
            );
            Ok(done)
        })
    }

    /// Deletes a draft return, releasing its reservation.
    pub fn delete_return(&self, id: ReturnId) -> Result<(), StoreError> {
        let source_id = self.load_return(id)?.reference.document_id;
        self.locks.with_row(Self::return_lock_key(id, source_id), || {
            let current = self.load_return(id)?;
            ReturnsLedger::delete_draft(&current)?;
            self.returns.remove(&id);
            info!(return_id = %id, "Return draft deleted");
            Ok(())
        })
    }
}
