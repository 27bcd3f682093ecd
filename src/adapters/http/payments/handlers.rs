//! HTTP handlers for payment endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use std::sync::Arc;

use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::adapters::http::middleware::RequestMeta;
use crate::application::{
    CreatePaymentCommand, CreatePaymentHandler, GetAuditTrailHandler, LogAttemptCommand,
    LogAttemptHandler, LogRefundCommand, LogRefundHandler,
};
use crate::domain::audit::AuditAction;
use crate::domain::foundation::{DomainError, Money, PaymentId};
use crate::domain::payment::PaymentError;
use crate::ports::{AuditLog, PaymentLedger};

use super::dto::{
    AttemptRequest, AuditEntryResponse, AuditQuery, AuditTrailResponse, CreatePaymentRequest,
    ErrorResponse, PaymentResponse, RefundRequest, RefundResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for payment endpoints. Handlers are built per request.
#[derive(Clone)]
pub struct PaymentsAppState {
    pub ledger: Arc<dyn PaymentLedger>,
    pub audit: Arc<dyn AuditLog>,
}

impl PaymentsAppState {
    pub fn create_payment_handler(&self) -> CreatePaymentHandler {
        CreatePaymentHandler::new(self.ledger.clone())
    }

    pub fn log_refund_handler(&self) -> LogRefundHandler {
        LogRefundHandler::new(self.ledger.clone())
    }

    pub fn log_attempt_handler(&self) -> LogAttemptHandler {
        LogAttemptHandler::new(self.ledger.clone(), self.audit.clone())
    }

    pub fn audit_trail_handler(&self) -> GetAuditTrailHandler {
        GetAuditTrailHandler::new(self.ledger.clone(), self.audit.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/payments - Open a pending payment at checkout
pub async fn create_payment(
    State(state): State<PaymentsAppState>,
    meta: RequestMeta,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let amount = Money::parse_major(&request.amount, request.currency)
        .map_err(|e| PaymentError::validation("amount", e.to_string()))?;

    let cmd = CreatePaymentCommand {
        academy_id: request.academy_id,
        user_id: meta.actor,
        amount,
        gateway: request.gateway,
        code_prefix: request.code_prefix,
        reference_code: request.reference_code,
        context: meta.context,
    };
    let payment = state.create_payment_handler().handle(cmd).await?;

    Ok((StatusCode::CREATED, Json(PaymentResponse::from(payment))))
}

/// POST /api/payments/{id}/refunds - Record a full or partial refund
pub async fn log_refund(
    State(state): State<PaymentsAppState>,
    Path(payment_id): Path<PaymentId>,
    meta: RequestMeta,
    Json(request): Json<RefundRequest>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let cmd = LogRefundCommand {
        payment_id,
        amount_minor: request.amount_minor,
        actor: meta.actor,
        reason: request.reason,
        context: meta.context,
    };
    let result = state.log_refund_handler().handle(cmd).await?;

    Ok(Json(RefundResponse::from(result)))
}

/// POST /api/payments/{id}/attempts - Record a gateway attempt
pub async fn log_attempt(
    State(state): State<PaymentsAppState>,
    Path(payment_id): Path<PaymentId>,
    meta: RequestMeta,
    Json(request): Json<AttemptRequest>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let cmd = LogAttemptCommand {
        payment_id,
        kind: request.kind.into(),
        actor: meta.actor,
        notes: request.notes,
        extra: request.details,
        context: meta.context,
    };
    let entry = state.log_attempt_handler().handle(cmd).await?;

    Ok((StatusCode::CREATED, Json(AuditEntryResponse::from(entry))))
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/payments/{id}/audit?action= - Audit trail, oldest first
pub async fn get_audit_trail(
    State(state): State<PaymentsAppState>,
    Path(payment_id): Path<PaymentId>,
    Query(query): Query<AuditQuery>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let action = query
        .action
        .as_deref()
        .map(str::parse::<AuditAction>)
        .transpose()
        .map_err(|e| PaymentError::validation("action", e.to_string()))?;

    let entries = state.audit_trail_handler().handle(payment_id, action).await?;

    Ok(Json(AuditTrailResponse {
        entries: entries.into_iter().map(AuditEntryResponse::from).collect(),
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts payment errors to HTTP responses.
#[derive(Debug)]
pub struct PaymentApiError(PaymentError);

impl From<PaymentError> for PaymentApiError {
    fn from(err: PaymentError) -> Self {
        Self(err)
    }
}

impl From<DomainError> for PaymentApiError {
    fn from(err: DomainError) -> Self {
        Self(PaymentError::from(err))
    }
}

impl IntoResponse for PaymentApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PaymentError::NotFound(_) => StatusCode::NOT_FOUND,
            PaymentError::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            PaymentError::Rejected { .. } => StatusCode::CONFLICT,
            PaymentError::Forbidden(_) => StatusCode::FORBIDDEN,
            PaymentError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = match &self.0 {
            PaymentError::Infrastructure(_) => "Internal error".to_string(),
            other => other.to_string(),
        };
        let body = ErrorResponse::new(self.0.code().to_string(), message);
        (status, Json(body)).into_response()
    }
}
