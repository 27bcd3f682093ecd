//! Gateway-neutral view of a webhook notification.

use serde_json::Value;

use crate::domain::foundation::{AcademyId, Money, PaymentId};
use crate::domain::payment::{Gateway, PaymentStatus};

use super::mapping;
use super::WebhookError;

/// A notification after gateway-specific mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedWebhook {
    pub gateway: Gateway,
    /// Idempotency key, unique across all gateways.
    pub event_id: String,
    pub event_type: String,
    pub transaction_id: String,
    /// Status string as the gateway sent it.
    pub reported_status: String,
    /// Internal status the reported status maps to.
    pub target_status: PaymentStatus,
    pub amount: Money,
    pub payment_id_hint: Option<PaymentId>,
    pub academy_id_hint: Option<AcademyId>,
    pub reference_code: Option<String>,
    /// Raw payload with sensitive fields stripped. Stored opaque.
    pub payload: Value,
}

impl ParsedWebhook {
    /// Maps a decoded body for `gateway`.
    ///
    /// # Errors
    ///
    /// - `MalformedPayload` if the body is not a JSON object or a field has the wrong shape
    /// - `MissingField` if the event id or transaction id cannot be derived
    pub fn from_value(gateway: Gateway, value: Value) -> Result<Self, WebhookError> {
        if !value.is_object() {
            return Err(WebhookError::MalformedPayload(
                "payload must be a JSON object".to_string(),
            ));
        }

        match gateway {
            Gateway::Paymob => mapping::paymob(value),
            Gateway::Tap => mapping::tap(value),
            Gateway::EasyKash => mapping::easykash(value),
        }
    }
}

/// Decodes a raw request body. Signatures are checked on this value before mapping.
pub(crate) fn body_json(body: &[u8]) -> Result<Value, WebhookError> {
    serde_json::from_slice(body).map_err(|e| WebhookError::MalformedPayload(e.to_string()))
}

/// Reads a scalar at a dotted path as a string. Empty strings count as absent.
pub(crate) fn scalar_at(value: &Value, path: &str) -> Option<String> {
    let mut node = value;
    for key in path.split('.') {
        node = node.get(key)?;
    }
    match node {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Reads a boolean flag, accepting `true`/`"true"`.
pub(crate) fn flag_at(value: &Value, path: &str) -> bool {
    matches!(scalar_at(value, path).as_deref(), Some("true"))
}

/// Reads a UUID-shaped hint. Anything else is ignored rather than rejected.
pub(crate) fn uuid_hint<T: std::str::FromStr>(value: &Value, path: &str) -> Option<T> {
    scalar_at(value, path).and_then(|s| s.parse().ok())
}
