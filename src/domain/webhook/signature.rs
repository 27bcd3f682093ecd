//! Gateway webhook signature verification.
//!
//! Each gateway signs a fixed concatenation of payload fields with a shared
//! secret and sends the hex digest alongside the request:
//!
//! | Gateway | Digest | Carried in |
//! |---------|--------|------------|
//! | Paymob | HMAC-SHA512 | `hmac` query parameter |
//! | Tap | HMAC-SHA256 | `hashstring` header |
//! | EasyKash | HMAC-SHA512 | `signatureHash` body field |

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use sha2::{Sha256, Sha512};
use subtle::ConstantTimeEq;

use crate::domain::foundation::{Currency, Money};
use crate::domain::payment::Gateway;

use super::payload::scalar_at;
use super::WebhookError;

/// `obj` fields Paymob concatenates, in Paymob's documented order.
const PAYMOB_HMAC_FIELDS: [&str; 20] = [
    "amount_cents",
    "created_at",
    "currency",
    "error_occured",
    "has_parent_transaction",
    "id",
    "integration_id",
    "is_3d_secure",
    "is_auth",
    "is_capture",
    "is_refunded",
    "is_standalone_payment",
    "is_voided",
    "order.id",
    "owner",
    "pending",
    "source_data.pan",
    "source_data.sub_type",
    "source_data.type",
    "success",
];

/// EasyKash fields, in EasyKash's required order.
const EASYKASH_HMAC_FIELDS: [&str; 7] = [
    "ProductCode",
    "Amount",
    "ProductType",
    "PaymentMethod",
    "status",
    "easykashRef",
    "customerReference",
];

/// Verifier for one gateway's webhook signatures.
pub struct SignatureVerifier {
    gateway: Gateway,
    secret: SecretString,
}

impl SignatureVerifier {
    pub fn new(gateway: Gateway, secret: impl Into<String>) -> Self {
        Self {
            gateway,
            secret: SecretString::new(secret.into()),
        }
    }

    /// Verifies `provided` (hex) against the payload.
    ///
    /// # Errors
    ///
    /// `InvalidSignature` when the signature is missing, not hex, or does not match.
    pub fn verify(&self, payload: &Value, provided: Option<&str>) -> Result<(), WebhookError> {
        let provided = provided
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(WebhookError::InvalidSignature)?;
        let provided = hex::decode(provided).map_err(|_| WebhookError::InvalidSignature)?;
        let expected = self.digest(payload)?;

        if constant_time_compare(&expected, &provided) {
            Ok(())
        } else {
            Err(WebhookError::InvalidSignature)
        }
    }

    /// Computes the hex signature the gateway would send for `payload`.
    pub fn sign(&self, payload: &Value) -> Result<String, WebhookError> {
        Ok(hex::encode(self.digest(payload)?))
    }

    fn digest(&self, payload: &Value) -> Result<Vec<u8>, WebhookError> {
        let message = signed_message(self.gateway, payload);
        match self.gateway {
            Gateway::Tap => hmac_digest::<Hmac<Sha256>>(self.secret.expose_secret(), &message),
            Gateway::Paymob | Gateway::EasyKash => {
                hmac_digest::<Hmac<Sha512>>(self.secret.expose_secret(), &message)
            }
        }
    }
}

fn hmac_digest<M: Mac + hmac::digest::KeyInit>(
    secret: &str,
    message: &str,
) -> Result<Vec<u8>, WebhookError> {
    let mut mac = <M as hmac::digest::KeyInit>::new_from_slice(secret.as_bytes())
        .map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(message.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Builds the exact string the gateway signs.
fn signed_message(gateway: Gateway, payload: &Value) -> String {
    let field = |path: &str| scalar_at(payload, path).unwrap_or_default();

    match gateway {
        Gateway::Paymob => PAYMOB_HMAC_FIELDS
            .iter()
            .map(|f| field(&format!("obj.{}", f)))
            .collect(),
        Gateway::EasyKash => EASYKASH_HMAC_FIELDS.iter().map(|f| field(f)).collect(),
        Gateway::Tap => {
            let currency = field("currency");
            let amount = tap_amount(&field("amount"), &currency);
            format!(
                "x_id{}x_amount{}x_currency{}x_gateway_reference{}x_payment_reference{}x_status{}x_created{}",
                field("id"),
                amount,
                currency,
                field("reference.gateway"),
                field("reference.payment"),
                field("status"),
                field("transaction.created"),
            )
        }
    }
}

/// Tap signs the amount rounded to the currency's digits.
fn tap_amount(raw: &str, currency: &str) -> String {
    currency
        .parse::<Currency>()
        .ok()
        .and_then(|c| Money::parse_major(raw, c).ok())
        .map(|m| m.to_major_string())
        .unwrap_or_else(|| raw.to_string())
}

/// Performs constant-time comparison of two byte slices.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TEST_SECRET: &str = "whsec_academy_test";

    fn paymob_payload() -> Value {
        json!({
            "type": "TRANSACTION",
            "obj": {
                "id": 192036465,
                "amount_cents": 50000,
                "created_at": "2024-01-15T10:30:52",
                "currency": "EGP",
                "error_occured": false,
                "has_parent_transaction": false,
                "integration_id": 4321,
                "is_3d_secure": true,
                "is_auth": false,
                "is_capture": false,
                "is_refunded": false,
                "is_standalone_payment": true,
                "is_voided": false,
                "order": {"id": 217503754},
                "owner": 302852,
                "pending": false,
                "source_data": {"pan": "2346", "sub_type": "MasterCard", "type": "card"},
                "success": true
            }
        })
    }

    // ══════════════════════════════════════════════════════════════
    // Signed message construction
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn paymob_message_concatenates_documented_fields() {
        let message = signed_message(Gateway::Paymob, &paymob_payload());
        assert_eq!(
            message,
            "500002024-01-15T10:30:52EGPfalsefalse1920364654321truefalsefalsefalsetruefalse217503754302852false2346MasterCardcardtrue"
        );
    }

    #[test]
    fn tap_message_uses_prefixed_fields_and_currency_digits() {
        let payload = json!({
            "id": "chg_1",
            "amount": 50,
            "currency": "SAR",
            "reference": {"gateway": "g1", "payment": "p1"},
            "status": "CAPTURED",
            "transaction": {"created": "1705314652000"}
        });
        assert_eq!(
            signed_message(Gateway::Tap, &payload),
            "x_idchg_1x_amount50.00x_currencySARx_gateway_referenceg1x_payment_referencep1x_statusCAPTUREDx_created1705314652000"
        );
    }

    #[test]
    fn easykash_message_treats_missing_fields_as_empty() {
        let payload = json!({"ProductCode": "EDU1", "Amount": "10.00", "status": "PAID", "easykashRef": "77"});
        assert_eq!(signed_message(Gateway::EasyKash, &payload), "EDU110.00PAID77");
    }

    // ══════════════════════════════════════════════════════════════
    // Verification
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn valid_signature_verifies_for_each_gateway() {
        let payloads = [
            (Gateway::Paymob, paymob_payload()),
            (Gateway::Tap, json!({"id": "chg_1", "amount": "10.5", "currency": "KWD", "status": "CAPTURED"})),
            (Gateway::EasyKash, json!({"easykashRef": "1", "status": "PAID", "Amount": "5.00"})),
        ];
        for (gateway, payload) in payloads {
            let verifier = SignatureVerifier::new(gateway, TEST_SECRET);
            let signature = verifier.sign(&payload).unwrap();
            assert!(verifier.verify(&payload, Some(&signature)).is_ok(), "{}", gateway);
        }
    }

    #[test]
    fn uppercase_hex_is_accepted() {
        let verifier = SignatureVerifier::new(Gateway::Paymob, TEST_SECRET);
        let signature = verifier.sign(&paymob_payload()).unwrap().to_uppercase();
        assert!(verifier.verify(&paymob_payload(), Some(&signature)).is_ok());
    }

    #[test]
    fn tampered_payload_fails() {
        let verifier = SignatureVerifier::new(Gateway::Paymob, TEST_SECRET);
        let signature = verifier.sign(&paymob_payload()).unwrap();

        let mut tampered = paymob_payload();
        tampered["obj"]["amount_cents"] = json!(1);

        assert_eq!(
            verifier.verify(&tampered, Some(&signature)),
            Err(WebhookError::InvalidSignature)
        );
    }

    #[test]
    fn wrong_secret_fails() {
        let signer = SignatureVerifier::new(Gateway::EasyKash, "other_secret");
        let verifier = SignatureVerifier::new(Gateway::EasyKash, TEST_SECRET);
        let payload = json!({"easykashRef": "1", "status": "PAID"});
        let signature = signer.sign(&payload).unwrap();
        assert!(verifier.verify(&payload, Some(&signature)).is_err());
    }

    #[test]
    fn missing_or_non_hex_signature_fails() {
        let verifier = SignatureVerifier::new(Gateway::Tap, TEST_SECRET);
        let payload = json!({"id": "chg_1"});
        assert_eq!(verifier.verify(&payload, None), Err(WebhookError::InvalidSignature));
        assert_eq!(verifier.verify(&payload, Some("  ")), Err(WebhookError::InvalidSignature));
        assert_eq!(
            verifier.verify(&payload, Some("zz-not-hex")),
            Err(WebhookError::InvalidSignature)
        );
    }

    #[test]
    fn constant_time_compare_rejects_length_mismatch() {
        assert!(!constant_time_compare(&[1, 2, 3], &[1, 2]));
        assert!(constant_time_compare(&[1, 2, 3], &[1, 2, 3]));
    }
}
