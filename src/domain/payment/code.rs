//! Human-readable payment codes.
//!
//! Format: `PREFIX-AAAA-yymmddHHMMSS-RAND`, e.g. `ASP-3F2A-240115103052-K7QX`.
//! The academy segment is the first four hex digits of the academy id.

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{AcademyId, Timestamp, ValidationError};

/// Default prefix for checkout payments.
pub const DEFAULT_PREFIX: &str = "PAY";

const RANDOM_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentCode(String);

impl PaymentCode {
    /// Generates a new code for the academy at `now`.
    ///
    /// # Errors
    ///
    /// `InvalidFormat` if the prefix is not 2 to 5 ASCII uppercase letters.
    pub fn generate(
        prefix: &str,
        academy_id: &AcademyId,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        validate_prefix(prefix)?;

        let academy: String = academy_id
            .as_uuid()
            .simple()
            .to_string()
            .chars()
            .take(4)
            .collect::<String>()
            .to_ascii_uppercase();

        let random: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(RANDOM_LEN)
            .map(|b| char::from(b).to_ascii_uppercase())
            .collect();

        Ok(Self(format!(
            "{}-{}-{}-{}",
            prefix,
            academy,
            now.compact(),
            random
        )))
    }

    /// Wraps a code loaded from storage.
    pub fn from_stored(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaymentCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn validate_prefix(prefix: &str) -> Result<(), ValidationError> {
    let ok = (2..=5).contains(&prefix.len()) && prefix.chars().all(|c| c.is_ascii_uppercase());
    if ok {
        Ok(())
    } else {
        Err(ValidationError::invalid_format(
            "prefix",
            "must be 2-5 uppercase ASCII letters",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn code_has_four_segments() {
        let academy = AcademyId::from_uuid(Uuid::parse_str("3f2a0000-0000-4000-8000-000000000000").unwrap());
        let now = Timestamp::from_unix_secs(1705314652).unwrap();

        let code = PaymentCode::generate("ASP", &academy, now).unwrap();
        let parts: Vec<&str> = code.as_str().split('-').collect();

        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "ASP");
        assert_eq!(parts[1], "3F2A");
        assert_eq!(parts[2], "240115103052");
        assert_eq!(parts[3].len(), 4);
        assert!(parts[3]
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn rejects_bad_prefixes() {
        let academy = AcademyId::new();
        let now = Timestamp::now();
        assert!(PaymentCode::generate("pay", &academy, now).is_err());
        assert!(PaymentCode::generate("P", &academy, now).is_err());
        assert!(PaymentCode::generate("TOOLONG", &academy, now).is_err());
        assert!(PaymentCode::generate(DEFAULT_PREFIX, &academy, now).is_ok());
    }
}
