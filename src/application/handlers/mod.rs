//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod payment;

pub use payment::{
    AttemptKind, CreatePaymentCommand, CreatePaymentHandler, GetAuditTrailHandler,
    ListUnresolvedEventsHandler, LogAttemptCommand, LogAttemptHandler, LogRefundCommand,
    LogRefundHandler, LogRefundResult, ReconcileOutcome, ReconcileWebhookCommand,
    ReconcileWebhookHandler,
};
