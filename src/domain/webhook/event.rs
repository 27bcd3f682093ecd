//! Stored record of an inbound gateway notification.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AcademyId, Money, PaymentId, Timestamp};
use crate::domain::payment::Gateway;

use super::ParsedWebhook;

/// A webhook event about to be recorded. Always stored unprocessed.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWebhookEvent {
    pub gateway: Gateway,
    pub event_type: String,
    pub event_id: String,
    pub transaction_id: String,
    pub payment_id: Option<PaymentId>,
    pub academy_id: Option<AcademyId>,
    pub reported_status: String,
    pub amount: Money,
    pub payload: serde_json::Value,
    pub received_at: Timestamp,
}

impl NewWebhookEvent {
    /// Builds the record for a parsed notification matched to `payment_id` (if any).
    pub fn from_parsed(
        parsed: &ParsedWebhook,
        payment_id: Option<PaymentId>,
        academy_id: Option<AcademyId>,
        received_at: Timestamp,
    ) -> Self {
        Self {
            gateway: parsed.gateway,
            event_type: parsed.event_type.clone(),
            event_id: parsed.event_id.clone(),
            transaction_id: parsed.transaction_id.clone(),
            payment_id,
            academy_id: academy_id.or(parsed.academy_id_hint),
            reported_status: parsed.reported_status.clone(),
            amount: parsed.amount,
            payload: parsed.payload.clone(),
            received_at,
        }
    }
}

/// A webhook event as stored.
///
/// Created with `processed = false`, flipped to `true` exactly once, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub gateway: Gateway,
    pub event_type: String,
    pub event_id: String,
    pub transaction_id: String,
    pub payment_id: Option<PaymentId>,
    pub academy_id: Option<AcademyId>,
    pub reported_status: String,
    pub amount: Money,
    pub payload: serde_json::Value,
    pub processed: bool,
    pub processed_at: Option<Timestamp>,
    pub error_message: Option<String>,
    pub received_at: Timestamp,
}

impl WebhookEvent {
    /// Materializes a freshly recorded, unprocessed event.
    pub fn recorded(new: NewWebhookEvent) -> Self {
        Self {
            gateway: new.gateway,
            event_type: new.event_type,
            event_id: new.event_id,
            transaction_id: new.transaction_id,
            payment_id: new.payment_id,
            academy_id: new.academy_id,
            reported_status: new.reported_status,
            amount: new.amount,
            payload: new.payload,
            processed: false,
            processed_at: None,
            error_message: None,
            received_at: new.received_at,
        }
    }

    /// Marks the event handled successfully.
    pub fn mark_processed(&mut self, now: Timestamp) {
        self.processed = true;
        self.processed_at = Some(now);
        self.error_message = None;
    }

    /// Marks the event handled with a terminal failure.
    pub fn mark_failed(&mut self, error: impl Into<String>, now: Timestamp) {
        self.processed = true;
        self.processed_at = Some(now);
        self.error_message = Some(error.into());
    }

    /// Recorded but never finished, as a transient failure leaves it. A
    /// redelivery of this event completes it instead of being a duplicate.
    pub fn awaits_completion(&self) -> bool {
        !self.processed && self.error_message.is_none()
    }

    /// Unprocessed, or processed with an error.
    pub fn is_unresolved(&self) -> bool {
        !self.processed || self.error_message.is_some()
    }
}
