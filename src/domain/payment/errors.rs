//! Payment-specific error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | NotFound | 404 |
//! | ValidationFailed | 400 |
//! | Rejected | 409 |
//! | Forbidden | 403 |
//! | Infrastructure | 500 |

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, PaymentId};

/// Errors returned by payment commands (create, refund, attempt logging).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    #[error("Payment not found: {0}")]
    NotFound(PaymentId),

    #[error("Validation failed for '{field}': {message}")]
    ValidationFailed { field: String, message: String },

    /// The ledger refused the change; the attempt is still on the audit trail.
    #[error("Payment change rejected: {reason}")]
    Rejected { reason: String },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Error: {0}")]
    Infrastructure(String),
}

impl PaymentError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        PaymentError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        PaymentError::Rejected {
            reason: reason.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        PaymentError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            PaymentError::NotFound(_) => ErrorCode::PaymentNotFound,
            PaymentError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            PaymentError::Rejected { .. } => ErrorCode::InvalidStateTransition,
            PaymentError::Forbidden(_) => ErrorCode::Forbidden,
            PaymentError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }
}

impl From<DomainError> for PaymentError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::PaymentNotFound => match err.details.get("payment_id").and_then(|id| id.parse().ok()) {
                Some(id) => PaymentError::NotFound(id),
                None => PaymentError::Infrastructure(err.to_string()),
            },
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat => PaymentError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            ErrorCode::InvalidStateTransition => PaymentError::Rejected {
                reason: err.message,
            },
            ErrorCode::Forbidden | ErrorCode::Unauthorized => PaymentError::Forbidden(err.message),
            _ => PaymentError::Infrastructure(err.to_string()),
        }
    }
}
