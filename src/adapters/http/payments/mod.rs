//! HTTP adapter for payment endpoints.
//!
//! - `POST /api/payments` - Create a pending payment at checkout
//! - `GET /api/payments/{id}/audit` - Audit consumer read access
//! - `POST /api/payments/{id}/refunds` - Internal refund logging
//! - `POST /api/payments/{id}/attempts` - Internal attempt logging

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::ErrorResponse;
pub use handlers::{PaymentApiError, PaymentsAppState};
pub use routes::payments_router;
