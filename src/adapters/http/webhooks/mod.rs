//! HTTP adapter for gateway webhooks.
//!
//! - `POST /api/webhooks/paymob` - HMAC in the `hmac` query parameter
//! - `POST /api/webhooks/tap` - HMAC in the `hashstring` header
//! - `POST /api/webhooks/easykash` - HMAC in the body's `signatureHash`
//! - `GET /api/webhooks/events/unresolved` - Operator visibility

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::{AckStatus, WebhookAck};
pub use handlers::{WebhookApiError, WebhookAppState, TAP_SIGNATURE_HEADER};
pub use routes::webhook_router;
