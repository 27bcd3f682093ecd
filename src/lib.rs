//! Academy Payments - Gateway webhook ingestion and reconciliation
//!
//! Receives Paymob, Tap and EasyKash webhooks for a multi-tenant academy
//! platform, applies them idempotently to payment records, and keeps an
//! append-only audit trail of every status change, refund and attempt.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
