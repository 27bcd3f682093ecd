//! Webhook error types for gateway notification handling.
//!
//! Status codes decide whether the gateway retries:
//! - 2xx: acknowledged, no retry
//! - 4xx: the request itself is bad, no retry
//! - 5xx: outcome unknown, gateway retries

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Errors that occur during webhook processing.
///
/// Duplicates, unmatched payments and rejected transitions are not errors;
/// they are `ReconcileOutcome` values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    /// Signature missing or not matching the gateway secret.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Source address not on the gateway's allow-list.
    #[error("Unauthorized source: {0}")]
    UnauthorizedSource(String),

    /// Body is not valid JSON or a field has the wrong shape.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Required field missing from webhook payload.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Storage failed; the event was left unprocessed.
    #[error("Database error: {0}")]
    Database(String),

    /// An I/O call exceeded its deadline; the event was left unprocessed.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Unexpected failure. Before the event is recorded it surfaces as is;
    /// after, the event is marked failed and the delivery acknowledged.
    #[error("Processing failed: {0}")]
    Processing(String),
}

impl WebhookError {
    /// Returns true if the gateway should retry delivering this webhook.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WebhookError::Database(_) | WebhookError::Timeout(_))
    }

    /// Maps the error to an HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidSignature
            | WebhookError::MalformedPayload(_)
            | WebhookError::MissingField(_) => StatusCode::BAD_REQUEST,

            WebhookError::UnauthorizedSource(_) => StatusCode::FORBIDDEN,

            WebhookError::Database(_)
            | WebhookError::Timeout(_)
            | WebhookError::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::DatabaseError => WebhookError::Database(err.message),
            ErrorCode::Timeout => WebhookError::Timeout(err.message),
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat => WebhookError::MalformedPayload(err.message),
            _ => WebhookError::Processing(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ══════════════════════════════════════════════════════════════
    // Display
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn invalid_signature_displays_correctly() {
        assert_eq!(WebhookError::InvalidSignature.to_string(), "Invalid signature");
    }

    #[test]
    fn missing_field_displays_field_name() {
        let err = WebhookError::MissingField("obj.id");
        assert_eq!(err.to_string(), "Missing field: obj.id");
    }

    // ══════════════════════════════════════════════════════════════
    // Status codes and retryability
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn client_errors_map_to_4xx() {
        assert_eq!(WebhookError::InvalidSignature.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            WebhookError::MalformedPayload("bad json".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WebhookError::UnauthorizedSource("10.0.0.1".into()).status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn transient_errors_are_retryable_5xx() {
        for err in [
            WebhookError::Database("conn reset".into()),
            WebhookError::Timeout("lookup".into()),
        ] {
            assert!(err.is_retryable());
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        }
        assert!(!WebhookError::InvalidSignature.is_retryable());
        assert!(!WebhookError::Processing("boom".into()).is_retryable());
    }

    #[test]
    fn domain_errors_keep_their_transience() {
        let db: WebhookError = DomainError::database("down").into();
        assert!(db.is_retryable());

        let timeout: WebhookError = DomainError::new(ErrorCode::Timeout, "slow").into();
        assert!(timeout.is_retryable());

        let other: WebhookError = DomainError::new(ErrorCode::PaymentNotFound, "gone").into();
        assert!(matches!(other, WebhookError::Processing(_)));
    }
}
