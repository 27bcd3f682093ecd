//! Request metadata extraction and source-IP allow-listing.
//!
//! `RequestMeta` collects what the audit trail records about a caller: client
//! IP, user agent and the optional acting user from `X-User-Id`. The audit IP
//! honours forwarded headers; the allow-list does not, unless the socket peer
//! is a configured trusted proxy.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::domain::audit::RequestContext;
use crate::domain::foundation::UserId;
use crate::domain::payment::Gateway;

/// Caller metadata for audit entries. Extraction never fails.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub context: RequestContext,
    /// Acting user, absent for system callers.
    pub actor: Option<UserId>,
    /// Address of the TCP peer, when the server recorded it.
    pub peer: Option<IpAddr>,
    /// `X-Forwarded-For` hops, client first.
    pub forwarded_for: Vec<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestMeta
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let connect_info = parts.extensions.get::<ConnectInfo<SocketAddr>>();
        let ip_address = extract_client_ip(&parts.headers, connect_info);
        let forwarded_for = parts
            .headers
            .get("X-Forwarded-For")
            .and_then(|h| h.to_str().ok())
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|hop| !hop.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let user_agent = parts
            .headers
            .get(axum::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let actor = parts
            .headers
            .get("X-User-Id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| UserId::new(s).ok());

        Ok(RequestMeta {
            context: RequestContext {
                ip_address,
                user_agent,
            },
            actor,
            peer: connect_info.map(|ci| ci.0.ip()),
            forwarded_for,
        })
    }
}

/// Client IP for the audit trail, checking forwarded headers first.
///
/// Caller controlled; never use it for access decisions.
///
/// Order of precedence:
/// 1. X-Forwarded-For header (first IP in list)
/// 2. X-Real-IP header
/// 3. ConnectInfo socket address
pub fn extract_client_ip(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
) -> Option<String> {
    if let Some(forwarded) = headers.get("X-Forwarded-For").and_then(|h| h.to_str().ok()) {
        if let Some(first_ip) = forwarded.split(',').next() {
            let first_ip = first_ip.trim();
            if !first_ip.is_empty() {
                return Some(first_ip.to_string());
            }
        }
    }

    if let Some(real_ip) = headers.get("X-Real-IP").and_then(|h| h.to_str().ok()) {
        return Some(real_ip.trim().to_string());
    }

    connect_info.map(|ci| ci.0.ip().to_string())
}

/// Per-gateway source IP allow-list. A gateway with no entries accepts any source.
#[derive(Debug, Clone, Default)]
pub struct GatewayAllowList {
    allowed: HashMap<Gateway, Vec<IpAddr>>,
    trusted_proxies: Vec<IpAddr>,
}

impl GatewayAllowList {
    pub fn new(allowed: HashMap<Gateway, Vec<IpAddr>>) -> Self {
        Self {
            allowed,
            trusted_proxies: Vec::new(),
        }
    }

    /// Proxies whose `X-Forwarded-For` entries are believed.
    pub fn with_trusted_proxies(mut self, proxies: Vec<IpAddr>) -> Self {
        self.trusted_proxies = proxies;
        self
    }

    /// The address a request came from for allow-list purposes.
    ///
    /// The socket peer, unless it is a trusted proxy; then the nearest
    /// forwarded hop that is not itself a trusted proxy. An unparseable hop
    /// yields `None`.
    pub fn source_ip(&self, meta: &RequestMeta) -> Option<IpAddr> {
        let peer = meta.peer?;
        if !self.trusted_proxies.contains(&peer) {
            return Some(peer);
        }
        for hop in meta.forwarded_for.iter().rev() {
            let ip = hop.parse::<IpAddr>().ok()?;
            if !self.trusted_proxies.contains(&ip) {
                return Some(ip);
            }
        }
        Some(peer)
    }

    /// Whether `ip` may deliver webhooks for `gateway`.
    pub fn permits(&self, gateway: Gateway, ip: Option<IpAddr>) -> bool {
        match self.allowed.get(&gateway) {
            None => true,
            Some(list) if list.is_empty() => true,
            Some(list) => ip.map_or(false, |ip| list.contains(&ip)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_for_takes_first_address() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Forwarded-For", HeaderValue::from_static("1.2.3.4, 5.6.7.8"));
        assert_eq!(extract_client_ip(&headers, None), Some("1.2.3.4".to_string()));
    }

    #[test]
    fn real_ip_used_without_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Real-IP", HeaderValue::from_static("9.9.9.9"));
        assert_eq!(extract_client_ip(&headers, None), Some("9.9.9.9".to_string()));
    }

    #[test]
    fn connect_info_is_the_fallback() {
        let addr: SocketAddr = "10.0.0.1:443".parse().unwrap();
        let info = ConnectInfo(addr);
        assert_eq!(
            extract_client_ip(&HeaderMap::new(), Some(&info)),
            Some("10.0.0.1".to_string())
        );
    }

    fn ip(raw: &str) -> IpAddr {
        raw.parse().unwrap()
    }

    fn meta(peer: Option<&str>, forwarded_for: &[&str]) -> RequestMeta {
        RequestMeta {
            peer: peer.map(ip),
            forwarded_for: forwarded_for.iter().map(|s| s.to_string()).collect(),
            ..RequestMeta::default()
        }
    }

    fn paymob_list() -> GatewayAllowList {
        let mut allowed = HashMap::new();
        allowed.insert(Gateway::Paymob, vec![ip("41.33.1.1")]);
        GatewayAllowList::new(allowed)
    }

    #[test]
    fn allow_list_without_entries_accepts_anyone() {
        let list = GatewayAllowList::default();
        assert!(list.permits(Gateway::Tap, None));
        assert!(list.permits(Gateway::Tap, Some(ip("8.8.8.8"))));
    }

    #[test]
    fn allow_list_rejects_unknown_and_missing_sources() {
        let list = paymob_list();

        assert!(list.permits(Gateway::Paymob, Some(ip("41.33.1.1"))));
        assert!(!list.permits(Gateway::Paymob, Some(ip("8.8.8.8"))));
        assert!(!list.permits(Gateway::Paymob, None));
        assert!(list.permits(Gateway::Tap, Some(ip("8.8.8.8"))));
    }

    #[test]
    fn forwarded_for_is_ignored_from_untrusted_peer() {
        let list = paymob_list();
        let spoofed = meta(Some("198.51.100.9"), &["41.33.1.1"]);

        assert_eq!(list.source_ip(&spoofed), Some(ip("198.51.100.9")));
        assert!(!list.permits(Gateway::Paymob, list.source_ip(&spoofed)));
        assert_eq!(list.source_ip(&meta(None, &["41.33.1.1"])), None);
    }

    #[test]
    fn trusted_proxy_forwards_nearest_untrusted_hop() {
        let list = paymob_list().with_trusted_proxies(vec![ip("10.0.0.5"), ip("10.0.0.6")]);

        let via_proxies = meta(Some("10.0.0.5"), &["8.8.8.8", "41.33.1.1", "10.0.0.6"]);
        assert_eq!(list.source_ip(&via_proxies), Some(ip("41.33.1.1")));

        let garbage = meta(Some("10.0.0.5"), &["41.33.1.1", "not-an-ip"]);
        assert_eq!(list.source_ip(&garbage), None);

        let direct = meta(Some("10.0.0.5"), &[]);
        assert_eq!(list.source_ip(&direct), Some(ip("10.0.0.5")));
    }
}
