//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `WebhookEventRepository` - Gateway webhook idempotency and operator visibility
//! - `PaymentLedger` - Payment records and atomic status transitions
//! - `AuditLog` - Append-only payment audit trail

mod audit_log;
mod payment_ledger;
mod webhook_event_repository;

pub use audit_log::AuditLog;
pub use payment_ledger::{PaymentLedger, TransitionRequest};
pub use webhook_event_repository::{SaveResult, WebhookEventRepository};
