//! Payment domain module.
//!
//! # Module Structure
//!
//! - `aggregate` - Payment aggregate and transition outcomes
//! - `status` - PaymentStatus state machine
//! - `gateway` - Supported payment gateways
//! - `code` - Human-readable payment codes
//! - `errors` - Command errors

mod aggregate;
mod code;
mod errors;
mod gateway;
mod status;

pub use aggregate::{Payment, PaymentChange, TransitionOutcome};
pub use code::{PaymentCode, DEFAULT_PREFIX};
pub use errors::PaymentError;
pub use gateway::Gateway;
pub use status::PaymentStatus;
