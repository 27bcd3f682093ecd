//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (IDs, money, timestamps, errors, state machine)
//! - `payment` - Payment aggregate, status transitions and payment codes
//! - `webhook` - Gateway payload mapping, signatures and stored webhook events
//! - `audit` - Append-only audit entries

pub mod audit;
pub mod foundation;
pub mod payment;
pub mod webhook;
