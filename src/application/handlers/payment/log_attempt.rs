//! LogAttemptHandler - Bookkeeping for gateway SDK calls made for a payment.

use std::sync::Arc;

use tracing::info;

use crate::domain::audit::{Actor, AuditAction, AuditLogEntry, RequestContext};
use crate::domain::foundation::{PaymentId, Timestamp, UserId};
use crate::domain::payment::PaymentError;
use crate::ports::{AuditLog, PaymentLedger};

/// Whether the gateway call was started or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptKind {
    Initiated,
    Failed,
}

impl AttemptKind {
    fn action(self) -> AuditAction {
        match self {
            AttemptKind::Initiated => AuditAction::AttemptInitiated,
            AttemptKind::Failed => AuditAction::AttemptFailed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogAttemptCommand {
    pub payment_id: PaymentId,
    pub kind: AttemptKind,
    pub actor: Option<UserId>,
    pub notes: Option<String>,
    /// Gateway response or request details, stored opaque.
    pub extra: Option<serde_json::Value>,
    pub context: RequestContext,
}

/// Handler for attempt logging. Writes exactly one entry and never changes status.
pub struct LogAttemptHandler {
    ledger: Arc<dyn PaymentLedger>,
    audit: Arc<dyn AuditLog>,
}

impl LogAttemptHandler {
    pub fn new(ledger: Arc<dyn PaymentLedger>, audit: Arc<dyn AuditLog>) -> Self {
        Self { ledger, audit }
    }

    pub async fn handle(&self, cmd: LogAttemptCommand) -> Result<AuditLogEntry, PaymentError> {
        let payment = self
            .ledger
            .find_by_id(&cmd.payment_id)
            .await?
            .ok_or(PaymentError::NotFound(cmd.payment_id))?;

        let entry = AuditLogEntry::attempt(
            &payment,
            cmd.kind.action(),
            Actor::from_user_id(cmd.actor),
            cmd.context,
            cmd.notes,
            cmd.extra,
            Timestamp::now(),
        );
        self.audit.append(&entry).await?;

        info!(payment_id = %payment.id, action = %entry.action, "Payment attempt logged");
        Ok(entry)
    }
}
