//! PostgreSQL adapters - Database implementations for the payment ports.
//!
//! - `PostgresPaymentLedger` - Payments plus the transactional transition unit
//! - `PostgresWebhookEventRepository` - Idempotent webhook event storage
//! - `PostgresAuditLog` - Append-only audit trail

mod audit_log_repository;
mod payment_ledger;
mod webhook_event_repository;

pub use audit_log_repository::PostgresAuditLog;
pub use payment_ledger::PostgresPaymentLedger;
pub use webhook_event_repository::PostgresWebhookEventRepository;
