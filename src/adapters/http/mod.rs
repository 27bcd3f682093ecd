//! HTTP adapters - REST API implementations.
//!
//! Each module has its own state, handlers and router. [`app_router`] mounts
//! them under `/api` and applies the cross-cutting tower layers.

pub mod middleware;
pub mod payments;
pub mod webhooks;

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub use payments::{payments_router, PaymentsAppState};
pub use webhooks::{webhook_router, WebhookAppState};

/// Limits applied to every route.
#[derive(Debug, Clone, Copy)]
pub struct HttpLimits {
    pub request_timeout: Duration,
    pub max_body_bytes: usize,
}

impl Default for HttpLimits {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_body_bytes: 256 * 1024,
        }
    }
}

/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Build the complete application router.
///
/// # Example
///
/// ```ignore
/// let app = app_router(webhook_state, payments_state, HttpLimits::default());
/// axum::serve(listener, app).await?;
/// ```
pub fn app_router(
    webhooks: WebhookAppState,
    payments: PaymentsAppState,
    limits: HttpLimits,
) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/webhooks", webhook_router().with_state(webhooks))
        .nest("/api/payments", payments_router().with_state(payments))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(limits.max_body_bytes))
        .layer(TimeoutLayer::new(limits.request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
