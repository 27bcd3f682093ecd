//! Money value object.
//!
//! Amounts are integer minor units end-to-end. Gateways that report major-unit
//! decimals are converted exactly through `rust_decimal`; a value carrying more
//! precision than the currency allows is rejected, never rounded.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// ISO 4217 currencies accepted by the academy gateways.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Sar,
    Egp,
    Usd,
    Aed,
    Kwd,
    Bhd,
    Omr,
    Jod,
}

impl Currency {
    /// Number of minor-unit digits.
    pub fn exponent(&self) -> u32 {
        match self {
            Currency::Kwd | Currency::Bhd | Currency::Omr | Currency::Jod => 3,
            _ => 2,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Sar => "SAR",
            Currency::Egp => "EGP",
            Currency::Usd => "USD",
            Currency::Aed => "AED",
            Currency::Kwd => "KWD",
            Currency::Bhd => "BHD",
            Currency::Omr => "OMR",
            Currency::Jod => "JOD",
        }
    }

    pub const ALL: [Currency; 8] = [
        Currency::Sar,
        Currency::Egp,
        Currency::Usd,
        Currency::Aed,
        Currency::Kwd,
        Currency::Bhd,
        Currency::Omr,
        Currency::Jod,
    ];
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Currency::ALL
            .into_iter()
            .find(|c| c.code() == upper)
            .ok_or_else(|| {
                ValidationError::invalid_format("currency", format!("unsupported currency '{}'", s))
            })
    }
}

/// An amount in integer minor units of a currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    pub amount_minor: i64,
    pub currency: Currency,
}

impl Money {
    pub fn new(amount_minor: i64, currency: Currency) -> Self {
        Self {
            amount_minor,
            currency,
        }
    }

    /// Converts a major-unit decimal (e.g. `50.00` SAR) to minor units.
    ///
    /// # Errors
    ///
    /// - `OutOfRange` for negative values or values that overflow `i64`
    /// - `InvalidFormat` when the value has more fractional digits than the currency
    pub fn from_major(amount: Decimal, currency: Currency) -> Result<Self, ValidationError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(ValidationError::out_of_range(
                "amount",
                0,
                i64::MAX,
                amount.trunc().to_i64().unwrap_or(i64::MIN),
            ));
        }

        let scaled = amount
            .checked_mul(Decimal::from(10_i64.pow(currency.exponent())))
            .ok_or_else(|| ValidationError::invalid_format("amount", "amount too large"))?;

        if !scaled.fract().is_zero() {
            return Err(ValidationError::invalid_format(
                "amount",
                format!(
                    "{} has more than {} decimal places for {}",
                    amount,
                    currency.exponent(),
                    currency
                ),
            ));
        }

        let minor = scaled
            .to_i64()
            .ok_or_else(|| ValidationError::invalid_format("amount", "amount too large"))?;

        Ok(Self::new(minor, currency))
    }

    /// Parses a major-unit decimal string such as `"50.00"`.
    pub fn parse_major(raw: &str, currency: Currency) -> Result<Self, ValidationError> {
        let amount = Decimal::from_str(raw.trim()).map_err(|e| {
            ValidationError::invalid_format("amount", format!("'{}' is not a decimal: {}", raw, e))
        })?;
        Self::from_major(amount, currency)
    }

    /// Formats the amount in major units with the currency's digits. Display only.
    pub fn to_major_string(&self) -> String {
        Decimal::new(self.amount_minor, self.currency.exponent()).to_string()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.to_major_string(), self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn exponent_is_three_for_gulf_dinars() {
        assert_eq!(Currency::Kwd.exponent(), 3);
        assert_eq!(Currency::Bhd.exponent(), 3);
        assert_eq!(Currency::Sar.exponent(), 2);
        assert_eq!(Currency::Egp.exponent(), 2);
    }

    #[test]
    fn parses_currency_case_insensitively() {
        assert_eq!("sar".parse::<Currency>().unwrap(), Currency::Sar);
        assert_eq!(" EGP ".parse::<Currency>().unwrap(), Currency::Egp);
        assert!("XYZ".parse::<Currency>().is_err());
    }

    #[test]
    fn major_string_converts_exactly() {
        let m = Money::parse_major("50.00", Currency::Sar).unwrap();
        assert_eq!(m.amount_minor, 5000);

        let m = Money::parse_major("1.005", Currency::Kwd).unwrap();
        assert_eq!(m.amount_minor, 1005);

        let m = Money::parse_major("19.9", Currency::Usd).unwrap();
        assert_eq!(m.amount_minor, 1990);
    }

    #[test]
    fn excess_precision_is_rejected() {
        assert!(matches!(
            Money::parse_major("10.001", Currency::Sar),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn negative_amount_is_rejected() {
        assert!(matches!(
            Money::parse_major("-5.00", Currency::Egp),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(Money::parse_major("fifty", Currency::Sar).is_err());
    }

    #[test]
    fn major_string_uses_currency_digits() {
        assert_eq!(Money::new(5000, Currency::Sar).to_major_string(), "50.00");
        assert_eq!(Money::new(1500, Currency::Kwd).to_major_string(), "1.500");
        assert_eq!(Money::new(7, Currency::Egp).to_string(), "0.07 EGP");
    }

    proptest! {
        #[test]
        fn minor_units_survive_major_formatting(minor in 0i64..1_000_000_000_000, idx in 0usize..8) {
            let currency = Currency::ALL[idx];
            let shown = Money::new(minor, currency).to_major_string();
            let parsed = Money::parse_major(&shown, currency).unwrap();
            prop_assert_eq!(parsed.amount_minor, minor);
        }

        #[test]
        fn extra_nonzero_digit_is_always_rejected(minor in 0i64..1_000_000_000, digit in 1u8..10, idx in 0usize..8) {
            let currency = Currency::ALL[idx];
            let shown = format!("{}{}", Money::new(minor, currency).to_major_string(), digit);
            prop_assert!(Money::parse_major(&shown, currency).is_err());
        }
    }
}
