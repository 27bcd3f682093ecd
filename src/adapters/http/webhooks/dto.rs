//! Response and query types for webhook endpoints.

use serde::{Deserialize, Serialize};

use crate::application::ReconcileOutcome;
use crate::domain::foundation::PaymentId;
use crate::domain::webhook::{WebhookError, WebhookEvent};

/// How a delivery was handled, as reported to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    Success,
    Ignored,
    Error,
}

/// Body of every webhook response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub status: AckStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<PaymentId>,
}

impl WebhookAck {
    fn new(status: AckStatus, message: impl Into<String>, payment_id: Option<PaymentId>) -> Self {
        Self {
            status,
            message: message.into(),
            payment_id,
        }
    }
}

impl From<ReconcileOutcome> for WebhookAck {
    fn from(outcome: ReconcileOutcome) -> Self {
        match outcome {
            ReconcileOutcome::Processed {
                payment_id,
                current_status,
                ..
            } => WebhookAck::new(
                AckStatus::Success,
                format!("Payment updated to {}", current_status),
                Some(payment_id),
            ),
            ReconcileOutcome::AlreadyProcessed { .. } => {
                WebhookAck::new(AckStatus::Ignored, "Event already processed", None)
            }
            ReconcileOutcome::Unmatched { .. } => {
                WebhookAck::new(AckStatus::Error, "Payment not found", None)
            }
            ReconcileOutcome::Rejected {
                payment_id, reason, ..
            } => WebhookAck::new(AckStatus::Error, reason, Some(payment_id)),
            ReconcileOutcome::TransitionRejected {
                payment_id,
                current_status,
                attempted_status,
                ..
            } => WebhookAck::new(
                AckStatus::Ignored,
                format!(
                    "Transition from {} to {} not allowed",
                    current_status, attempted_status
                ),
                Some(payment_id),
            ),
            ReconcileOutcome::Failed { .. } => {
                WebhookAck::new(AckStatus::Error, "Webhook could not be processed", None)
            }
        }
    }
}

impl From<&WebhookError> for WebhookAck {
    fn from(err: &WebhookError) -> Self {
        WebhookAck::new(AckStatus::Error, err.to_string(), None)
    }
}

/// Paymob sends its HMAC as a query parameter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymobQuery {
    pub hmac: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnresolvedQuery {
    pub limit: Option<u32>,
}

/// Operator view of a stored webhook event. The raw payload is left out.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookEventResponse {
    pub event_id: String,
    pub gateway: String,
    pub event_type: String,
    pub transaction_id: String,
    pub payment_id: Option<PaymentId>,
    pub reported_status: String,
    pub amount: String,
    pub currency: String,
    pub processed: bool,
    pub processed_at: Option<String>,
    pub error_message: Option<String>,
    pub received_at: String,
}

impl From<WebhookEvent> for WebhookEventResponse {
    fn from(event: WebhookEvent) -> Self {
        Self {
            amount: event.amount.to_major_string(),
            currency: event.amount.currency.code().to_string(),
            event_id: event.event_id,
            gateway: event.gateway.as_str().to_string(),
            event_type: event.event_type,
            transaction_id: event.transaction_id,
            payment_id: event.payment_id,
            reported_status: event.reported_status,
            processed: event.processed,
            processed_at: event.processed_at.map(|t| t.as_datetime().to_rfc3339()),
            error_message: event.error_message,
            received_at: event.received_at.as_datetime().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UnresolvedEventsResponse {
    pub events: Vec<WebhookEventResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::PaymentStatus;

    #[test]
    fn processed_outcome_is_success_with_payment_id() {
        let id = PaymentId::new();
        let ack = WebhookAck::from(ReconcileOutcome::Processed {
            event_id: "evt_1".to_string(),
            payment_id: id,
            previous_status: PaymentStatus::Pending,
            current_status: PaymentStatus::Paid,
        });

        let json = serde_json::to_value(&ack).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["payment_id"], id.to_string());
    }

    #[test]
    fn duplicate_is_ignored_without_payment_id() {
        let ack = WebhookAck::from(ReconcileOutcome::AlreadyProcessed {
            event_id: "evt_1".to_string(),
        });
        let json = serde_json::to_value(&ack).unwrap();
        assert_eq!(json["status"], "ignored");
        assert!(json.get("payment_id").is_none());
    }

    #[test]
    fn unmatched_is_reported_as_error() {
        let ack = WebhookAck::from(ReconcileOutcome::Unmatched {
            event_id: "evt_1".to_string(),
        });
        assert_eq!(ack.status, AckStatus::Error);
        assert_eq!(ack.message, "Payment not found");
    }

    #[test]
    fn failed_outcome_hides_internal_reason() {
        let ack = WebhookAck::from(ReconcileOutcome::Failed {
            event_id: "evt_1".to_string(),
            reason: "Processing failed: [INTERNAL_ERROR] corrupt row".to_string(),
        });
        assert_eq!(ack.status, AckStatus::Error);
        assert!(!ack.message.contains("corrupt"));
    }
}
