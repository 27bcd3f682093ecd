//! Axum router for payment endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{create_payment, get_audit_trail, log_attempt, log_refund, PaymentsAppState};

/// Create the payment router, mounted at `/api/payments`.
///
/// # Routes
/// - `POST /` - Create a pending payment
/// - `GET /:id/audit?action=` - Audit trail
/// - `POST /:id/refunds` - Record a refund
/// - `POST /:id/attempts` - Record a gateway attempt
pub fn payments_router() -> Router<PaymentsAppState> {
    Router::new()
        .route("/", post(create_payment))
        .route("/:id/audit", get(get_audit_trail))
        .route("/:id/refunds", post(log_refund))
        .route("/:id/attempts", post(log_attempt))
}
