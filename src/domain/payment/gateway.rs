//! Payment gateways the academy platform integrates with.

use crate::domain::foundation::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gateway {
    /// Paymob (Egypt). Amounts arrive in minor units.
    Paymob,
    /// Tap Payments (Gulf). Amounts arrive in major units.
    Tap,
    /// EasyKash (Egypt). Amounts arrive in major units.
    #[serde(rename = "easykash")]
    EasyKash,
}

impl Gateway {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gateway::Paymob => "paymob",
            Gateway::Tap => "tap",
            Gateway::EasyKash => "easykash",
        }
    }
}

impl fmt::Display for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gateway {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "paymob" => Ok(Gateway::Paymob),
            "tap" => Ok(Gateway::Tap),
            "easykash" => Ok(Gateway::EasyKash),
            other => Err(ValidationError::invalid_format(
                "gateway",
                format!("unknown gateway '{}'", other),
            )),
        }
    }
}
