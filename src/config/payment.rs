//! Payment gateway configuration

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

use crate::domain::payment::Gateway;

use super::error::ValidationError;

/// Settings for one gateway's webhook endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayConfig {
    /// Shared HMAC secret. Without it signatures are not checked.
    pub hmac_secret: Option<SecretString>,

    /// Comma-separated source IPs allowed to call the webhook. Empty allows all.
    pub allowed_ips: Option<String>,
}

impl GatewayConfig {
    /// Parses the allow-list.
    pub fn allowed_ips(&self, gateway: Gateway) -> Result<Vec<IpAddr>, ValidationError> {
        parse_ip_list(self.allowed_ips.as_deref(), |value| {
            ValidationError::InvalidAllowedIp {
                gateway: gateway.as_str(),
                value,
            }
        })
    }
}

fn parse_ip_list(
    raw: Option<&str>,
    invalid: impl Fn(String) -> ValidationError,
) -> Result<Vec<IpAddr>, ValidationError> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<IpAddr>().map_err(|_| invalid(s.to_string())))
        .collect()
}

/// Payment configuration (Paymob, Tap, EasyKash)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    #[serde(default)]
    pub paymob: GatewayConfig,

    #[serde(default)]
    pub tap: GatewayConfig,

    #[serde(default)]
    pub easykash: GatewayConfig,

    /// Comma-separated reverse proxies whose `X-Forwarded-For` is believed
    /// when checking allow-lists. Empty means the socket peer is the source.
    #[serde(default)]
    pub trusted_proxies: Option<String>,

    /// Upper bound in seconds for each storage call made while reconciling
    #[serde(default = "default_lookup_timeout")]
    pub lookup_timeout_secs: u64,
}

impl PaymentConfig {
    pub fn gateway(&self, gateway: Gateway) -> &GatewayConfig {
        match gateway {
            Gateway::Paymob => &self.paymob,
            Gateway::Tap => &self.tap,
            Gateway::EasyKash => &self.easykash,
        }
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    pub fn trusted_proxies(&self) -> Result<Vec<IpAddr>, ValidationError> {
        parse_ip_list(
            self.trusted_proxies.as_deref(),
            ValidationError::InvalidTrustedProxy,
        )
    }

    /// Allow-lists for every gateway that has one.
    pub fn allow_lists(&self) -> Result<HashMap<Gateway, Vec<IpAddr>>, ValidationError> {
        let mut lists = HashMap::new();
        for gateway in [Gateway::Paymob, Gateway::Tap, Gateway::EasyKash] {
            let ips = self.gateway(gateway).allowed_ips(gateway)?;
            if !ips.is_empty() {
                lists.insert(gateway, ips);
            }
        }
        Ok(lists)
    }

    /// Validate payment configuration
    ///
    /// Production requires a secret for every gateway; elsewhere a missing
    /// secret only disables verification for that gateway.
    pub fn validate(&self, production: bool) -> Result<(), ValidationError> {
        if self.lookup_timeout_secs == 0 || self.lookup_timeout_secs > 60 {
            return Err(ValidationError::InvalidLookupTimeout);
        }
        self.allow_lists()?;
        self.trusted_proxies()?;

        if production {
            for gateway in [Gateway::Paymob, Gateway::Tap, Gateway::EasyKash] {
                if self.gateway(gateway).hmac_secret.is_none() {
                    return Err(ValidationError::MissingWebhookSecret(gateway.as_str()));
                }
            }
        }
        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            paymob: GatewayConfig::default(),
            tap: GatewayConfig::default(),
            easykash: GatewayConfig::default(),
            trusted_proxies: None,
            lookup_timeout_secs: default_lookup_timeout(),
        }
    }
}

fn default_lookup_timeout() -> u64 {
    5
}
