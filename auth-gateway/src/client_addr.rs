//! Client-address extraction for the HTTP boundary.
//!
//! When the deployment sits behind a trusted reverse proxy, the real client address is
//! the leftmost non-private address in `X-Forwarded-For`; otherwise it is the transport
//! peer address. Trusting the header at all is gated by [`crate::config::Conf::trust_forwarded_for`]
//! so an untrusted deployment cannot have its rate limiter spoofed via a forged header.

use std::net::{IpAddr, SocketAddr};

const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// `true` for addresses that must never be treated as the "real" client (RFC 1918/4193
/// private ranges, loopback, link-local) — these only ever appear as hops added by an
/// internal load balancer, never as an actual client.
fn is_private(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local(),
        IpAddr::V6(v6) => v6.is_loopback() || (v6.segments()[0] & 0xfe00) == 0xfc00,
    }
}

/// Resolves the client address for rate-limiting and audit-log purposes.
pub fn resolve(headers: &axum::http::HeaderMap, peer: SocketAddr, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        if let Some(forwarded) = headers.get(FORWARDED_FOR_HEADER).and_then(|value| value.to_str().ok()) {
            let leftmost_public = forwarded
                .split(',')
                .map(str::trim)
                .filter_map(|hop| hop.parse::<IpAddr>().ok())
                .find(|ip| !is_private(*ip));

            if let Some(ip) = leftmost_public {
                return ip.to_string();
            }
        }
    }

    peer.ip().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_forwarded_for(value: &str) -> axum::http::HeaderMap {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(FORWARDED_FOR_HEADER, value.parse().expect("valid header value"));
        headers
    }

    fn peer() -> SocketAddr {
        "203.0.113.9:54321".parse().expect("valid socket addr")
    }

    #[test]
    fn untrusted_deployment_ignores_the_header() {
        let headers = headers_with_forwarded_for("8.8.8.8");
        assert_eq!(resolve(&headers, peer(), false), "203.0.113.9");
    }

    #[test]
    fn trusted_deployment_picks_the_leftmost_public_hop() {
        let headers = headers_with_forwarded_for("10.0.0.5, 198.51.100.7, 192.168.1.1");
        assert_eq!(resolve(&headers, peer(), true), "198.51.100.7");
    }

    #[test]
    fn trusted_deployment_falls_back_to_peer_when_all_hops_are_private() {
        let headers = headers_with_forwarded_for("10.0.0.5, 192.168.1.1");
        assert_eq!(resolve(&headers, peer(), true), "203.0.113.9");
    }

    #[test]
    fn missing_header_falls_back_to_peer() {
        let headers = axum::http::HeaderMap::new();
        assert_eq!(resolve(&headers, peer(), true), "203.0.113.9");
    }
}
