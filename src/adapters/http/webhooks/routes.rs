//! Axum router for webhook endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    easykash_webhook, list_unresolved_events, paymob_webhook, tap_webhook, WebhookAppState,
};

/// Create the webhook router, mounted at `/api/webhooks`.
///
/// # Routes
///
/// ## Gateway Endpoints (no auth, signature verified)
/// - `POST /paymob`
/// - `POST /tap`
/// - `POST /easykash`
///
/// ## Operator Endpoints
/// - `GET /events/unresolved?limit=` - Unprocessed or failed events, oldest first
pub fn webhook_router() -> Router<WebhookAppState> {
    Router::new()
        .route("/paymob", post(paymob_webhook))
        .route("/tap", post(tap_webhook))
        .route("/easykash", post(easykash_webhook))
        .route("/events/unresolved", get(list_unresolved_events))
}
