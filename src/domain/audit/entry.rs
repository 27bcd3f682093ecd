//! Audit log entries for payments.
//!
//! Entries are append-only. Nothing in the crate updates or deletes one once
//! it has been written.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{
    AuditEntryId, Money, PaymentId, Timestamp, UserId, ValidationError,
};
use crate::domain::payment::{Gateway, Payment, PaymentStatus, TransitionOutcome};

/// What happened to the payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    StatusChanged,
    /// A gateway notification arrived but did not change the status.
    WebhookReceived,
    Refunded,
    AttemptInitiated,
    AttemptFailed,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Created => "created",
            AuditAction::StatusChanged => "status_changed",
            AuditAction::WebhookReceived => "webhook_received",
            AuditAction::Refunded => "refunded",
            AuditAction::AttemptInitiated => "attempt_initiated",
            AuditAction::AttemptFailed => "attempt_failed",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(AuditAction::Created),
            "status_changed" => Ok(AuditAction::StatusChanged),
            "webhook_received" => Ok(AuditAction::WebhookReceived),
            "refunded" => Ok(AuditAction::Refunded),
            "attempt_initiated" => Ok(AuditAction::AttemptInitiated),
            "attempt_failed" => Ok(AuditAction::AttemptFailed),
            other => Err(ValidationError::invalid_format(
                "action",
                format!("unknown audit action '{}'", other),
            )),
        }
    }
}

/// Who caused the entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Actor {
    /// Gateway callbacks and other unattended paths.
    System,
    User(UserId),
}

impl Actor {
    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Actor::System => None,
            Actor::User(id) => Some(id),
        }
    }

    pub fn from_user_id(user_id: Option<UserId>) -> Self {
        user_id.map(Actor::User).unwrap_or(Actor::System)
    }
}

/// Network origin of the request that produced the entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Structured metadata. `extra` is opaque passthrough and never interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<Gateway>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempted_status: Option<PaymentStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_amount_minor: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

/// One immutable line of a payment's audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: AuditEntryId,
    pub payment_id: PaymentId,
    pub actor: Actor,
    pub action: AuditAction,
    pub status_from: Option<PaymentStatus>,
    pub status_to: Option<PaymentStatus>,
    /// Payment amount at the time of the entry.
    pub amount: Money,
    pub transaction_id: Option<String>,
    pub context: RequestContext,
    pub notes: Option<String>,
    pub metadata: AuditMetadata,
    pub created_at: Timestamp,
}

impl AuditLogEntry {
    /// Entry written alongside a newly created payment.
    pub fn created(payment: &Payment, actor: Actor, context: RequestContext) -> Self {
        Self {
            id: AuditEntryId::new(),
            payment_id: payment.id,
            actor,
            action: AuditAction::Created,
            status_from: None,
            status_to: Some(payment.status),
            amount: payment.amount,
            transaction_id: payment.transaction_id.clone(),
            context,
            notes: None,
            metadata: AuditMetadata {
                gateway: Some(payment.gateway),
                ..AuditMetadata::default()
            },
            created_at: payment.created_at,
        }
    }

    /// Bookkeeping entry for a gateway SDK call. Never changes status.
    pub fn attempt(
        payment: &Payment,
        action: AuditAction,
        actor: Actor,
        context: RequestContext,
        notes: Option<String>,
        extra: Option<serde_json::Value>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: AuditEntryId::new(),
            payment_id: payment.id,
            actor,
            action,
            status_from: Some(payment.status),
            status_to: None,
            amount: payment.amount,
            transaction_id: payment.transaction_id.clone(),
            context,
            notes,
            metadata: AuditMetadata {
                gateway: Some(payment.gateway),
                extra,
                ..AuditMetadata::default()
            },
            created_at: now,
        }
    }
}

/// The caller-supplied half of a transition's audit entry.
///
/// The ledger completes it from the outcome it computed under the payment lock,
/// so the entry always describes what actually happened.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditDraft {
    pub actor: Actor,
    /// Action recorded when the change is applied.
    pub on_accepted: AuditAction,
    /// Action recorded when the change is refused.
    pub on_rejected: AuditAction,
    pub transaction_id: Option<String>,
    pub context: RequestContext,
    pub notes: Option<String>,
    pub metadata: AuditMetadata,
}

impl AuditDraft {
    /// Completes the entry. `payment` is the state after the change.
    pub fn complete(
        self,
        payment: &Payment,
        outcome: &TransitionOutcome,
        now: Timestamp,
    ) -> AuditLogEntry {
        let (action, status_to) = if outcome.accepted {
            (self.on_accepted, Some(outcome.current_status))
        } else {
            (self.on_rejected, None)
        };

        let notes = match (&outcome.rejection_reason, self.notes) {
            (Some(reason), Some(notes)) => Some(format!("{} ({})", notes, reason)),
            (Some(reason), None) => Some(reason.clone()),
            (None, notes) => notes,
        };

        let mut metadata = self.metadata;
        if !outcome.accepted {
            metadata.attempted_status = Some(outcome.attempted_status);
        }

        AuditLogEntry {
            id: AuditEntryId::new(),
            payment_id: payment.id,
            actor: self.actor,
            action,
            status_from: Some(outcome.previous_status),
            status_to,
            amount: payment.amount,
            transaction_id: self
                .transaction_id
                .or_else(|| payment.transaction_id.clone()),
            context: self.context,
            notes,
            metadata,
            created_at: now,
        }
    }
}
