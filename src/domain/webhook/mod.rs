//! Webhook domain module.
//!
//! Turns gateway notifications into `ParsedWebhook` values and describes how
//! they are recorded.
//!
//! # Module Structure
//!
//! - `payload` - Gateway-neutral parsed notification
//! - `mapping` - Paymob / Tap / EasyKash field mappings
//! - `signature` - HMAC signature verification
//! - `event` - Stored webhook event record
//! - `errors` - WebhookError with HTTP mapping

mod errors;
mod event;
mod mapping;
mod payload;
mod signature;

pub use errors::WebhookError;
pub use event::{NewWebhookEvent, WebhookEvent};
pub use payload::ParsedWebhook;
pub use signature::SignatureVerifier;

pub(crate) use payload::{body_json, scalar_at};
