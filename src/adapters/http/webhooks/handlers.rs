//! HTTP handlers for gateway webhook endpoints.
//!
//! Every delivery goes through the same path: source IP check, then the
//! reconcile handler, then a `{status, message, payment_id?}` body. Gateways
//! retry on non-2xx, so only malformed, unauthorized and transient failures
//! produce error statuses.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::adapters::http::middleware::{GatewayAllowList, RequestMeta};
use crate::adapters::http::payments::PaymentApiError;
use crate::application::{ListUnresolvedEventsHandler, ReconcileWebhookCommand, ReconcileWebhookHandler};
use crate::domain::payment::Gateway;
use crate::domain::webhook::WebhookError;
use crate::ports::WebhookEventRepository;

use super::dto::{
    PaymobQuery, UnresolvedEventsResponse, UnresolvedQuery, WebhookAck, WebhookEventResponse,
};

/// Header carrying Tap's signature.
pub const TAP_SIGNATURE_HEADER: &str = "hashstring";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct WebhookAppState {
    pub reconcile: Arc<ReconcileWebhookHandler>,
    pub events: Arc<dyn WebhookEventRepository>,
    pub allow_list: Arc<GatewayAllowList>,
}

impl WebhookAppState {
    pub fn unresolved_handler(&self) -> ListUnresolvedEventsHandler {
        ListUnresolvedEventsHandler::new(self.events.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Gateway Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/webhooks/paymob - Paymob transaction callback
pub async fn paymob_webhook(
    State(state): State<WebhookAppState>,
    meta: RequestMeta,
    Query(query): Query<PaymobQuery>,
    body: Bytes,
) -> Result<Response, WebhookApiError> {
    receive(&state, Gateway::Paymob, meta, query.hmac, body).await
}

/// POST /api/webhooks/tap - Tap charge callback
pub async fn tap_webhook(
    State(state): State<WebhookAppState>,
    meta: RequestMeta,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, WebhookApiError> {
    let signature = headers
        .get(TAP_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    receive(&state, Gateway::Tap, meta, signature, body).await
}

/// POST /api/webhooks/easykash - EasyKash callback; the signature is in the body
pub async fn easykash_webhook(
    State(state): State<WebhookAppState>,
    meta: RequestMeta,
    body: Bytes,
) -> Result<Response, WebhookApiError> {
    receive(&state, Gateway::EasyKash, meta, None, body).await
}

async fn receive(
    state: &WebhookAppState,
    gateway: Gateway,
    meta: RequestMeta,
    signature: Option<String>,
    body: Bytes,
) -> Result<Response, WebhookApiError> {
    let source = state.allow_list.source_ip(&meta);
    if !state.allow_list.permits(gateway, source) {
        warn!(
            gateway = %gateway,
            source = ?source,
            forwarded_for = ?meta.forwarded_for,
            "Webhook from unlisted source"
        );
        let source = source.map_or_else(|| "unknown".to_string(), |ip| ip.to_string());
        return Err(WebhookError::UnauthorizedSource(source).into());
    }

    let cmd = ReconcileWebhookCommand {
        gateway,
        body: body.to_vec(),
        signature,
        context: meta.context,
    };
    let outcome = state.reconcile.handle(cmd).await?;

    Ok((StatusCode::OK, Json(WebhookAck::from(outcome))).into_response())
}

// ════════════════════════════════════════════════════════════════════════════════
// Operator Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/webhooks/events/unresolved - Events not yet processed, or failed
pub async fn list_unresolved_events(
    State(state): State<WebhookAppState>,
    Query(query): Query<UnresolvedQuery>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let events = state.unresolved_handler().handle(query.limit).await?;
    Ok(Json(UnresolvedEventsResponse {
        events: events.into_iter().map(WebhookEventResponse::from).collect(),
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// Converts webhook errors to responses in the acknowledgement shape.
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        let mut ack = WebhookAck::from(&self.0);
        if status.is_server_error() {
            ack.message = "Temporary failure, retry later".to_string();
        }
        (status, Json(ack)).into_response()
    }
}
