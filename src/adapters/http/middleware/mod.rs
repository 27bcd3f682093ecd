//! HTTP middleware and extractors for axum.
//!
//! - `request_meta` - Caller metadata for audit entries and the webhook IP allow-list

pub mod request_meta;

pub use request_meta::{extract_client_ip, GatewayAllowList, RequestMeta};
