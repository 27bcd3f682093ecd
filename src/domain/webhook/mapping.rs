//! Per-gateway field mappings onto `ParsedWebhook`.

use serde_json::Value;

use crate::domain::foundation::{Currency, Money};
use crate::domain::payment::{Gateway, PaymentStatus};

use super::payload::{flag_at, scalar_at, uuid_hint};
use super::{ParsedWebhook, WebhookError};

/// Fields never persisted from a Tap charge.
const TAP_SENSITIVE_FIELDS: [&str; 3] = ["card", "source", "hashstring"];

/// Fields never persisted from an EasyKash callback.
const EASYKASH_SENSITIVE_FIELDS: [&str; 1] = ["signatureHash"];

fn currency_at(value: &Value, path: &str, default: Currency) -> Result<Currency, WebhookError> {
    match scalar_at(value, path) {
        Some(code) => code
            .parse()
            .map_err(|e: crate::domain::foundation::ValidationError| {
                WebhookError::MalformedPayload(e.to_string())
            }),
        None => Ok(default),
    }
}

fn major_amount_at(
    value: &Value,
    path: &'static str,
    currency: Currency,
) -> Result<Money, WebhookError> {
    let raw = scalar_at(value, path).ok_or(WebhookError::MissingField(path))?;
    Money::parse_major(&raw, currency).map_err(|e| WebhookError::MalformedPayload(e.to_string()))
}

fn strip(mut value: Value, fields: &[&str]) -> Value {
    if let Some(map) = value.as_object_mut() {
        for field in fields {
            map.remove(*field);
        }
    }
    value
}

/// Paymob transaction callback: `{"type": ..., "obj": {...}}`, amounts in minor units.
pub(crate) fn paymob(value: Value) -> Result<ParsedWebhook, WebhookError> {
    let transaction_id = scalar_at(&value, "obj.id").ok_or(WebhookError::MissingField("obj.id"))?;

    let target_status = if flag_at(&value, "obj.is_refunded") {
        PaymentStatus::Refunded
    } else if flag_at(&value, "obj.is_voided") {
        PaymentStatus::Cancelled
    } else if flag_at(&value, "obj.pending") {
        PaymentStatus::Pending
    } else if flag_at(&value, "obj.success") {
        PaymentStatus::Paid
    } else {
        PaymentStatus::Failed
    };

    let currency = currency_at(&value, "obj.currency", Currency::Egp)?;
    let amount_minor: i64 = scalar_at(&value, "obj.amount_cents")
        .ok_or(WebhookError::MissingField("obj.amount_cents"))?
        .parse()
        .map_err(|_| {
            WebhookError::MalformedPayload("obj.amount_cents must be an integer".to_string())
        })?;
    if amount_minor < 0 {
        return Err(WebhookError::MalformedPayload(
            "obj.amount_cents must not be negative".to_string(),
        ));
    }

    Ok(ParsedWebhook {
        gateway: Gateway::Paymob,
        event_id: format!("paymob_{}_{}", transaction_id, target_status),
        event_type: scalar_at(&value, "type").unwrap_or_else(|| "TRANSACTION".to_string()),
        transaction_id,
        reported_status: target_status.as_str().to_string(),
        target_status,
        amount: Money::new(amount_minor, currency),
        payment_id_hint: uuid_hint(&value, "obj.order.merchant_order_id"),
        academy_id_hint: None,
        reference_code: None,
        payload: value,
    })
}

fn tap_status(status: &str) -> PaymentStatus {
    match status {
        "CAPTURED" => PaymentStatus::Paid,
        "AUTHORIZED" => PaymentStatus::Authorized,
        "INITIATED" | "IN_PROGRESS" => PaymentStatus::Pending,
        "CANCELLED" | "VOID" => PaymentStatus::Cancelled,
        "REFUNDED" => PaymentStatus::Refunded,
        _ => PaymentStatus::Failed,
    }
}

/// Tap charge object, amounts in major units.
pub(crate) fn tap(value: Value) -> Result<ParsedWebhook, WebhookError> {
    let transaction_id = scalar_at(&value, "id").ok_or(WebhookError::MissingField("id"))?;
    let reported_status = scalar_at(&value, "status")
        .ok_or(WebhookError::MissingField("status"))?
        .to_ascii_uppercase();

    let currency = currency_at(&value, "currency", Currency::Sar)?;
    let amount = major_amount_at(&value, "amount", currency)?;

    Ok(ParsedWebhook {
        gateway: Gateway::Tap,
        event_id: format!("tap_{}_{}", transaction_id, reported_status),
        event_type: scalar_at(&value, "object").unwrap_or_else(|| "charge".to_string()),
        target_status: tap_status(&reported_status),
        transaction_id,
        reported_status,
        amount,
        payment_id_hint: uuid_hint(&value, "metadata.payment_id"),
        academy_id_hint: uuid_hint(&value, "metadata.academy_id"),
        reference_code: scalar_at(&value, "reference.order"),
        payload: strip(value, &TAP_SENSITIVE_FIELDS),
    })
}

fn easykash_status(status: &str) -> PaymentStatus {
    match status {
        "PAID" | "DELIVERED" => PaymentStatus::Paid,
        "NEW" | "PENDING" => PaymentStatus::Pending,
        "CANCELED" | "EXPIRED" => PaymentStatus::Cancelled,
        "REFUNDED" => PaymentStatus::Refunded,
        _ => PaymentStatus::Failed,
    }
}

/// EasyKash callback, amounts in major units, currency defaults to EGP.
pub(crate) fn easykash(value: Value) -> Result<ParsedWebhook, WebhookError> {
    let transaction_id =
        scalar_at(&value, "easykashRef").ok_or(WebhookError::MissingField("easykashRef"))?;
    let reported_status = scalar_at(&value, "status")
        .ok_or(WebhookError::MissingField("status"))?
        .to_ascii_uppercase();

    let currency = currency_at(&value, "currency", Currency::Egp)?;
    let amount = major_amount_at(&value, "Amount", currency)?;

    Ok(ParsedWebhook {
        gateway: Gateway::EasyKash,
        event_id: format!("easykash_{}_{}", transaction_id, reported_status),
        event_type: "payment".to_string(),
        target_status: easykash_status(&reported_status),
        transaction_id,
        reported_status,
        amount,
        payment_id_hint: None,
        academy_id_hint: None,
        reference_code: scalar_at(&value, "customerReference"),
        payload: strip(value, &EASYKASH_SENSITIVE_FIELDS),
    })
}
