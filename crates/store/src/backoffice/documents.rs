//! Document operations.

use chrono::Utc;
use karat_core::lifecycle::{
    self, Conversion, DeletionImpact, Document, DocumentStatus, LifecycleService, PaymentOutcome,
    PaymentRequest, TransitionContext, TransitionOutcome,
};
use karat_core::valuation::{DocumentValuation, LineItem};
use karat_shared::types::{DocumentId, UserId};
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::BackOffice;
use crate::error::StoreError;

/// Replacement line items and pricing for a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftEdit {
    /// New line items.
    pub line_items: Vec<LineItem>,
    /// New metal rate.
    pub gold_rate: Decimal,
    /// New discount.
    pub discount_amount: Decimal,
    /// New round-off.
    pub round_off_amount: Option<Decimal>,
}

impl BackOffice {
    /// Stores a new document.
    pub fn insert_document(&self, document: Document) -> Result<(), StoreError> {
        use dashmap::mapref::entry::Entry;

        match self.documents.entry(document.id) {
            Entry::Occupied(_) => Err(StoreError::DuplicateId(document.id.into_inner())),
            Entry::Vacant(slot) => {
                info!(document_id = %document.id, kind = %document.kind, "Document created");
                slot.insert(document);
                Ok(())
            }
        }
    }

    /// Returns a copy of the document.
    pub fn get_document(&self, id: DocumentId) -> Result<Document, StoreError> {
        self.load_document(id)
    }

    /// Values the document as stored.
    pub fn valuation(&self, id: DocumentId) -> Result<DocumentValuation, StoreError> {
        let document = self.load_document(id)?;
        document
            .valuation(&self.engine)
            .map_err(|source| lifecycle::LifecycleError::Valuation {
                document_id: id,
                source,
            })
            .map_err(StoreError::from)
    }

    /// Replaces line items and pricing on an editable document.
    ///
    /// `expected_version` is the version the caller edited.
    pub fn update_draft(
        &self,
        id: DocumentId,
        expected_version: u64,
        edit: DraftEdit,
    ) -> Result<Document, StoreError> {
        self.locks.with_row(id.into_inner(), || {
            let current = self.load_document(id)?;
            super::check_version(id.into_inner(), expected_version, current.version)?;
            let updated = LifecycleService::replace_line_items(
                &current,
                edit.line_items,
                edit.gold_rate,
                edit.discount_amount,
                edit.round_off_amount,
                &self.engine,
            )?;
            self.save_document(current.version, updated.clone())?;
            info!(document_id = %id, version = updated.version, "Draft updated");
            Ok(updated)
        })
    }

    /// Moves a document to `target`.
    ///
    /// For job card delivery the linked invoice is read from the store.
    pub fn transition(
        &self,
        id: DocumentId,
        target: DocumentStatus,
        actor: UserId,
    ) -> Result<TransitionOutcome, StoreError> {
        self.locks.with_row(id.into_inner(), || {
            let current = self.load_document(id)?;
            let mut ctx = TransitionContext::new(actor);
            if target == DocumentStatus::Delivered
                && let Some(invoice_id) = current.converted_invoice_id
                && let Ok(invoice) = self.load_document(invoice_id)
                && let Ok(linked) = invoice.as_linked_invoice(&self.engine)
            {
                ctx = ctx.with_linked_invoice(linked);
            }

            let outcome = LifecycleService::transition(&current, target, &ctx, &self.engine)
                .inspect_err(|err| {
                    warn!(document_id = %id, target = %target, error = %err, "Transition rejected");
                })?;
            self.dispatch(&outcome.side_effects)?;
            self.save_document(current.version, outcome.document.clone())?;
            info!(
                document_id = %id,
                from = %current.status,
                to = %outcome.document.status,
                effects = outcome.side_effects.len(),
                "Document transitioned"
            );
            Ok(outcome)
        })
    }

    /// Finalizes an invoice or purchase.
    pub fn finalize(&self, id: DocumentId, actor: UserId) -> Result<TransitionOutcome, StoreError> {
        self.transition(id, DocumentStatus::Finalized, actor)
    }

    /// Applies a payment to an invoice or purchase.
    pub fn apply_payment(
        &self,
        id: DocumentId,
        payment: PaymentRequest,
    ) -> Result<PaymentOutcome, StoreError> {
        self.locks.with_row(id.into_inner(), || {
            let current = self.load_document(id)?;
            let outcome = lifecycle::apply_payment(&current, &payment, &self.engine).inspect_err(|err| {
                warn!(document_id = %id, error = %err, "Payment rejected");
            })?;
            self.dispatch(&outcome.side_effects)?;
            self.save_document(current.version, outcome.document.clone())?;
            info!(
                document_id = %id,
                amount = %payment.amount,
                balance_due = %outcome.balance_due,
                status = %outcome.payment_status,
                "Payment applied"
            );
            Ok(outcome)
        })
    }

    /// Converts a job card into a draft invoice, at most once.
    pub fn convert_job_card(&self, id: DocumentId) -> Result<Conversion, StoreError> {
        // Reject reconversion before taking the lock.
        lifecycle::ensure_convertible(&self.load_document(id)?)?;

        self.locks.with_row(id.into_inner(), || {
            let current = self.load_document(id)?;
            let conversion = lifecycle::convert_to_invoice(&current, Utc::now())?;
            self.insert_document(conversion.invoice.clone())?;
            self.save_document(current.version, conversion.job_card.clone())?;
            info!(
                job_card_id = %id,
                invoice_id = %conversion.invoice.id,
                "Job card converted"
            );
            Ok(conversion)
        })
    }

    /// Reports what deleting the document would affect.
    pub fn deletion_impact(&self, id: DocumentId) -> Result<DeletionImpact, StoreError> {
        self.locks.with_row(id.into_inner(), || {
            let current = self.load_document(id)?;
            Ok(lifecycle::impact(&current, self.returns_referencing(id)))
        })
    }

    /// Deletes a draft after the caller confirmed `confirmed`.
    pub fn delete_document(
        &self,
        id: DocumentId,
        confirmed: &DeletionImpact,
    ) -> Result<Document, StoreError> {
        self.locks.with_row(id.into_inner(), || {
            let current = self.load_document(id)?;
            // Returns created since the report was taken also block.
            let fresh = lifecycle::impact(&current, self.returns_referencing(id));
            if fresh != *confirmed {
                warn!(document_id = %id, "Deletion impact changed since confirmation");
                return Err(lifecycle::LifecycleError::StaleImpactReport { document_id: id }.into());
            }
            let removed = lifecycle::delete(&current, confirmed)?;
            self.save_document(current.version, removed.clone())?;
            info!(document_id = %id, "Document removed");
            Ok(removed)
        })
    }
}
