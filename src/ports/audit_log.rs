//! AuditLog port - Append-only payment audit trail.
//!
//! The port has no update or delete operation.

use async_trait::async_trait;

use crate::domain::audit::{AuditAction, AuditLogEntry};
use crate::domain::foundation::{DomainError, PaymentId};

#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Appends one entry.
    async fn append(&self, entry: &AuditLogEntry) -> Result<(), DomainError>;

    /// Entries for a payment, oldest first, optionally filtered by action.
    async fn list_for_payment(
        &self,
        payment_id: &PaymentId,
        action: Option<AuditAction>,
    ) -> Result<Vec<AuditLogEntry>, DomainError>;
}
