//! LogRefundHandler - Records an admin-initiated refund against a payment.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::audit::{Actor, AuditAction, AuditDraft, AuditMetadata, RequestContext};
use crate::domain::foundation::{PaymentId, UserId};
use crate::domain::payment::{PaymentChange, PaymentError, PaymentStatus};
use crate::ports::{PaymentLedger, TransitionRequest};

/// Command to refund part or all of a payment.
#[derive(Debug, Clone)]
pub struct LogRefundCommand {
    pub payment_id: PaymentId,
    /// Refund amount in the payment's minor units.
    pub amount_minor: i64,
    pub actor: Option<UserId>,
    pub reason: Option<String>,
    pub context: RequestContext,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRefundResult {
    pub payment_id: PaymentId,
    pub previous_status: PaymentStatus,
    pub current_status: PaymentStatus,
}

/// Handler for refund logging.
///
/// Exactly one `refunded` audit entry is written per call that reaches the
/// ledger, whether the refund is accepted or not.
pub struct LogRefundHandler {
    ledger: Arc<dyn PaymentLedger>,
}

impl LogRefundHandler {
    pub fn new(ledger: Arc<dyn PaymentLedger>) -> Self {
        Self { ledger }
    }

    pub async fn handle(&self, cmd: LogRefundCommand) -> Result<LogRefundResult, PaymentError> {
        if cmd.amount_minor <= 0 {
            return Err(PaymentError::validation(
                "amount",
                "Refund amount must be positive",
            ));
        }

        let request = TransitionRequest {
            payment_id: cmd.payment_id,
            change: PaymentChange::Refund {
                amount_minor: cmd.amount_minor,
            },
            audit: AuditDraft {
                actor: Actor::from_user_id(cmd.actor),
                on_accepted: AuditAction::Refunded,
                on_rejected: AuditAction::Refunded,
                transaction_id: None,
                context: cmd.context,
                notes: cmd.reason,
                metadata: AuditMetadata {
                    refund_amount_minor: Some(cmd.amount_minor),
                    ..AuditMetadata::default()
                },
            },
            event_id: None,
            transaction_id: None,
        };

        let outcome = self.ledger.apply_transition(request).await?;

        if !outcome.accepted {
            let reason = outcome
                .rejection_reason
                .unwrap_or_else(|| "Refund rejected".to_string());
            warn!(payment_id = %cmd.payment_id, amount = cmd.amount_minor, %reason, "Refund rejected");
            return Err(PaymentError::rejected(reason));
        }

        info!(
            payment_id = %cmd.payment_id,
            amount = cmd.amount_minor,
            status = %outcome.current_status,
            "Refund recorded"
        );

        Ok(LogRefundResult {
            payment_id: cmd.payment_id,
            previous_status: outcome.previous_status,
            current_status: outcome.current_status,
        })
    }
}
