//! Read-side handlers for audit consumers and operators.

use std::sync::Arc;

use crate::domain::audit::{AuditAction, AuditLogEntry};
use crate::domain::foundation::PaymentId;
use crate::domain::payment::PaymentError;
use crate::domain::webhook::WebhookEvent;
use crate::ports::{AuditLog, PaymentLedger, WebhookEventRepository};

/// Upper bound for one page of unresolved events.
pub const MAX_UNRESOLVED_LIMIT: u32 = 500;

const DEFAULT_UNRESOLVED_LIMIT: u32 = 50;

/// Returns a payment's audit trail, oldest first.
pub struct GetAuditTrailHandler {
    ledger: Arc<dyn PaymentLedger>,
    audit: Arc<dyn AuditLog>,
}

impl GetAuditTrailHandler {
    pub fn new(ledger: Arc<dyn PaymentLedger>, audit: Arc<dyn AuditLog>) -> Self {
        Self { ledger, audit }
    }

    pub async fn handle(
        &self,
        payment_id: PaymentId,
        action: Option<AuditAction>,
    ) -> Result<Vec<AuditLogEntry>, PaymentError> {
        if self.ledger.find_by_id(&payment_id).await?.is_none() {
            return Err(PaymentError::NotFound(payment_id));
        }
        Ok(self.audit.list_for_payment(&payment_id, action).await?)
    }
}

/// Lists webhook events that are unprocessed or failed.
pub struct ListUnresolvedEventsHandler {
    events: Arc<dyn WebhookEventRepository>,
}

impl ListUnresolvedEventsHandler {
    pub fn new(events: Arc<dyn WebhookEventRepository>) -> Self {
        Self { events }
    }

    pub async fn handle(&self, limit: Option<u32>) -> Result<Vec<WebhookEvent>, PaymentError> {
        let limit = limit
            .unwrap_or(DEFAULT_UNRESOLVED_LIMIT)
            .clamp(1, MAX_UNRESOLVED_LIMIT);
        Ok(self.events.list_unresolved(limit).await?)
    }
}
