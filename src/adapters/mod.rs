//! Adapters - Implementations of port interfaces.
//!
//! - `http` - axum routers for webhooks and payment endpoints
//! - `memory` - In-memory store for tests and database-less runs
//! - `postgres` - sqlx/PostgreSQL persistence

pub mod http;
pub mod memory;
pub mod postgres;

pub use memory::InMemoryPaymentStore;
pub use postgres::{PostgresAuditLog, PostgresPaymentLedger, PostgresWebhookEventRepository};
