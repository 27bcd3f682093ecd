//! Payment handlers.
//!
//! ## Commands
//! - Reconciling gateway webhooks
//! - Creating payments at checkout
//! - Logging refunds and gateway attempts
//!
//! ## Queries
//! - Reading a payment's audit trail
//! - Listing unresolved webhook events

mod create_payment;
mod log_attempt;
mod log_refund;
mod queries;
mod reconcile_webhook;

pub use create_payment::{CreatePaymentCommand, CreatePaymentHandler};
pub use log_attempt::{AttemptKind, LogAttemptCommand, LogAttemptHandler};
pub use log_refund::{LogRefundCommand, LogRefundHandler, LogRefundResult};
pub use queries::{GetAuditTrailHandler, ListUnresolvedEventsHandler};
pub use reconcile_webhook::{
    ReconcileOutcome, ReconcileWebhookCommand, ReconcileWebhookHandler, DEFAULT_IO_TIMEOUT,
};
