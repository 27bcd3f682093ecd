//! PaymentLedger port - Authoritative payment records.
//!
//! Status changes never happen as a bare write. `apply_transition` takes the
//! per-payment lock, consults the state machine, writes the status, appends the
//! audit entry and (for webhooks) marks the event processed as one unit.

use async_trait::async_trait;

use crate::domain::audit::{AuditDraft, AuditLogEntry};
use crate::domain::foundation::{AcademyId, DomainError, PaymentId};
use crate::domain::payment::{Payment, PaymentChange, TransitionOutcome};

/// Everything needed to change one payment atomically.
#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub payment_id: PaymentId,
    pub change: PaymentChange,
    /// Completed into exactly one audit entry from the computed outcome.
    pub audit: AuditDraft,
    /// Webhook event to mark processed in the same unit.
    pub event_id: Option<String>,
    /// Transaction id to record on the payment when it has none yet.
    pub transaction_id: Option<String>,
}

/// Port for payment persistence.
#[async_trait]
pub trait PaymentLedger: Send + Sync {
    /// Inserts a new payment together with its `created` audit entry.
    async fn create(&self, payment: &Payment, entry: &AuditLogEntry) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError>;

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, DomainError>;

    /// Looks up by gateway reference code, scoped to the academy when one is given.
    async fn find_by_reference(
        &self,
        academy_id: Option<&AcademyId>,
        reference_code: &str,
    ) -> Result<Option<Payment>, DomainError>;

    /// Applies a change under the payment's exclusive lock.
    ///
    /// A rejected change is `Ok` with `accepted = false`; its audit entry is
    /// still written and the attached event is still marked processed.
    ///
    /// # Errors
    ///
    /// - `PaymentNotFound` if the payment does not exist
    /// - `WebhookEventNotFound` if the attached event was never recorded
    /// - `WebhookEventProcessed` if the attached event is already processed;
    ///   nothing is written, so one event changes a payment at most once
    /// - `DatabaseError` if storage fails; nothing is written in that case
    async fn apply_transition(
        &self,
        request: TransitionRequest,
    ) -> Result<TransitionOutcome, DomainError>;
}
