//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.

pub mod handlers;

pub use handlers::{
    AttemptKind, CreatePaymentCommand, CreatePaymentHandler, GetAuditTrailHandler,
    ListUnresolvedEventsHandler, LogAttemptCommand, LogAttemptHandler, LogRefundCommand,
    LogRefundHandler, LogRefundResult, ReconcileOutcome, ReconcileWebhookCommand,
    ReconcileWebhookHandler,
};
