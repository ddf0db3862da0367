//! Originating client address resolution.

use std::net::IpAddr;

use axum::http::HeaderMap;

/// Proxy header carrying the client address chain.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// When to honor `X-Forwarded-For` over the transport peer address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ForwardedPolicy {
    /// Always honor the header when present (legacy behavior).
    #[default]
    TrustAll,
    /// Honor the header only when the peer is one of these proxies.
    TrustedProxies(Vec<IpAddr>),
    /// Never honor the header.
    Ignore,
}

impl ForwardedPolicy {
    fn honors(&self, peer: Option<IpAddr>) -> bool {
        match self {
            Self::TrustAll => true,
            Self::Ignore => false,
            Self::TrustedProxies(proxies) => peer.is_some_and(|p| proxies.contains(&p)),
        }
    }
}

/// Resolves the client address for a request.
///
/// Takes the first comma-separated, trimmed `X-Forwarded-For` entry when the
/// policy allows it and the entry is non-empty. Otherwise falls back to the
/// peer address, then to an empty string.
#[must_use]
pub fn resolve_client_ip(
    headers: &HeaderMap,
    peer: Option<IpAddr>,
    policy: &ForwardedPolicy,
) -> String {
    if policy.honors(peer) {
        if let Some(forwarded) = first_forwarded(headers) {
            return forwarded;
        }
    }
    peer.map(|ip| ip.to_string()).unwrap_or_default()
}

fn first_forwarded(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(X_FORWARDED_FOR)?.to_str().ok()?;
    let first = raw.split(',').next()?.trim();
    (!first.is_empty()).then(|| first.to_string())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use proptest::prelude::*;

    use super::*;

    fn headers(forwarded: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_str(forwarded).unwrap());
        headers
    }

    fn peer() -> Option<IpAddr> {
        Some("192.168.1.10".parse().unwrap())
    }

    #[test]
    fn first_forwarded_entry_wins() {
        let ip = resolve_client_ip(
            &headers("203.0.113.5, 10.0.0.1"),
            peer(),
            &ForwardedPolicy::TrustAll,
        );
        assert_eq!(ip, "203.0.113.5");
    }

    #[test]
    fn falls_back_to_peer_without_header() {
        let ip = resolve_client_ip(&HeaderMap::new(), peer(), &ForwardedPolicy::TrustAll);
        assert_eq!(ip, "192.168.1.10");
    }

    #[test]
    fn empty_header_falls_back_to_peer() {
        for value in ["", "   ", " , 10.0.0.1"] {
            let ip = resolve_client_ip(&headers(value), peer(), &ForwardedPolicy::TrustAll);
            assert_eq!(ip, "192.168.1.10", "header {value:?}");
        }
    }

    #[test]
    fn unknown_peer_without_header_is_empty() {
        let ip = resolve_client_ip(&HeaderMap::new(), None, &ForwardedPolicy::TrustAll);
        assert_eq!(ip, "");
    }

    #[test]
    fn ignore_policy_uses_peer() {
        let ip = resolve_client_ip(&headers("203.0.113.5"), peer(), &ForwardedPolicy::Ignore);
        assert_eq!(ip, "192.168.1.10");
    }

    #[test]
    fn trusted_proxy_policy() {
        let trusted = ForwardedPolicy::TrustedProxies(vec!["192.168.1.10".parse().unwrap()]);
        let ip = resolve_client_ip(&headers("203.0.113.5"), peer(), &trusted);
        assert_eq!(ip, "203.0.113.5");

        let untrusted = ForwardedPolicy::TrustedProxies(vec!["10.9.9.9".parse().unwrap()]);
        let ip = resolve_client_ip(&headers("203.0.113.5"), peer(), &untrusted);
        assert_eq!(ip, "192.168.1.10");

        let ip = resolve_client_ip(&headers("203.0.113.5"), None, &untrusted);
        assert_eq!(ip, "");
    }

    proptest! {
        #[test]
        fn takes_trimmed_first_token(
            first in "[0-9a-f.:]{1,39}",
            rest in proptest::collection::vec("[0-9.]{1,15}", 0..4),
            pad in " {0,3}",
        ) {
            let mut value = format!("{pad}{first}{pad}");
            for hop in &rest {
                value.push_str(", ");
                value.push_str(hop);
            }
            let ip = resolve_client_ip(&headers(&value), None, &ForwardedPolicy::TrustAll);
            prop_assert_eq!(ip, first);
        }
    }
}
