//! Request and response types for payment endpoints.
//!
//! Amounts travel as major-unit decimal strings (`"50.00"`) with a currency
//! code; refunds take integer minor units to match the ledger.

use serde::{Deserialize, Serialize};

use crate::application::{AttemptKind, LogRefundResult};
use crate::domain::audit::{AuditLogEntry, AuditMetadata};
use crate::domain::foundation::{AcademyId, AuditEntryId, Currency, PaymentId};
use crate::domain::payment::{Gateway, Payment, PaymentStatus};

// ════════════════════════════════════════════════════════════════════════════════
// Requests
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentRequest {
    pub academy_id: AcademyId,
    /// Major units, e.g. `"50.00"`.
    pub amount: String,
    pub currency: Currency,
    pub gateway: Gateway,
    #[serde(default)]
    pub code_prefix: Option<String>,
    #[serde(default)]
    pub reference_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefundRequest {
    pub amount_minor: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptKindRequest {
    Initiated,
    Failed,
}

impl From<AttemptKindRequest> for AttemptKind {
    fn from(kind: AttemptKindRequest) -> Self {
        match kind {
            AttemptKindRequest::Initiated => AttemptKind::Initiated,
            AttemptKindRequest::Failed => AttemptKind::Failed,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttemptRequest {
    pub kind: AttemptKindRequest,
    #[serde(default)]
    pub notes: Option<String>,
    /// Gateway request or response details.
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    pub action: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Responses
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub id: PaymentId,
    pub academy_id: AcademyId,
    pub user_id: Option<String>,
    pub payment_code: String,
    pub amount: String,
    pub amount_minor: i64,
    pub refunded_minor: i64,
    pub currency: Currency,
    pub status: PaymentStatus,
    pub gateway: Gateway,
    pub transaction_id: Option<String>,
    pub reference_code: Option<String>,
    pub receipt_number: Option<String>,
    pub paid_at: Option<String>,
    pub created_at: String,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        Self {
            id: p.id,
            academy_id: p.academy_id,
            user_id: p.user_id.map(|u| u.as_str().to_string()),
            payment_code: p.payment_code.as_str().to_string(),
            amount: p.amount.to_major_string(),
            amount_minor: p.amount.amount_minor,
            refunded_minor: p.refunded_minor,
            currency: p.amount.currency,
            status: p.status,
            gateway: p.gateway,
            transaction_id: p.transaction_id,
            reference_code: p.reference_code,
            receipt_number: p.receipt_number,
            paid_at: p.paid_at.map(|t| t.as_datetime().to_rfc3339()),
            created_at: p.created_at.as_datetime().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundResponse {
    pub payment_id: PaymentId,
    pub previous_status: PaymentStatus,
    pub current_status: PaymentStatus,
}

impl From<LogRefundResult> for RefundResponse {
    fn from(r: LogRefundResult) -> Self {
        Self {
            payment_id: r.payment_id,
            previous_status: r.previous_status,
            current_status: r.current_status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntryResponse {
    pub id: AuditEntryId,
    pub payment_id: PaymentId,
    /// `None` for system actions.
    pub user_id: Option<String>,
    pub action: String,
    pub status_from: Option<PaymentStatus>,
    pub status_to: Option<PaymentStatus>,
    pub amount: String,
    pub currency: Currency,
    pub transaction_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub notes: Option<String>,
    pub metadata: AuditMetadata,
    pub created_at: String,
}

impl From<AuditLogEntry> for AuditEntryResponse {
    fn from(e: AuditLogEntry) -> Self {
        Self {
            id: e.id,
            payment_id: e.payment_id,
            user_id: e.actor.user_id().map(|u| u.as_str().to_string()),
            action: e.action.as_str().to_string(),
            status_from: e.status_from,
            status_to: e.status_to,
            amount: e.amount.to_major_string(),
            currency: e.amount.currency,
            transaction_id: e.transaction_id,
            ip_address: e.context.ip_address,
            user_agent: e.context.user_agent,
            notes: e.notes,
            metadata: e.metadata,
            created_at: e.created_at.as_datetime().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditTrailResponse {
    pub entries: Vec<AuditEntryResponse>,
}

/// Error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error_code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}
