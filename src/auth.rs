//! API key validation for cross-system requests.
//!
//! One shared secret per integration direction, compared in constant time.
//! Loopback callers in development may omit the key entirely.

use axum::http::{HeaderMap, header};
use std::net::IpAddr;
use subtle::ConstantTimeEq;
use tracing::warn;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Why a credential was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    CredentialRequired,
    InvalidCredential,
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CredentialRequired => write!(f, "credential required"),
            Self::InvalidCredential => write!(f, "invalid credential"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny(DenyReason),
    /// No expected key configured outside development
    MisconfiguredServer,
}

/// Development convenience: loopback callers without a key skip the gateway.
///
/// Evaluated once per request and shared by the validator and the limiter
/// step, so a presented key is always checked.
pub fn development_bypass(presented: Option<&str>, is_local_loopback: bool, is_development: bool) -> bool {
    is_development && is_local_loopback && presented.is_none()
}

pub fn validate(
    presented: Option<&str>,
    is_local_loopback: bool,
    is_development: bool,
    expected: Option<&str>,
) -> AccessDecision {
    if development_bypass(presented, is_local_loopback, is_development) {
        return AccessDecision::Allow;
    }

    let Some(presented) = presented else {
        return AccessDecision::Deny(DenyReason::CredentialRequired);
    };

    let expected = match expected {
        Some(e) if !e.is_empty() => e,
        _ => {
            warn!("expected API key is not configured");
            if is_development {
                return AccessDecision::Allow;
            }
            return AccessDecision::MisconfiguredServer;
        }
    };

    if !constant_time_compare(presented, expected) {
        return AccessDecision::Deny(DenyReason::InvalidCredential);
    }

    AccessDecision::Allow
}

// Compare without leaking how many leading bytes matched
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    let max_len = a.len().max(b.len());

    // different pad bytes so a length mismatch can never compare equal
    let mut a_padded = vec![0u8; max_len];
    let mut b_padded = vec![0xFFu8; max_len];
    a_padded[..a.len()].copy_from_slice(a.as_bytes());
    b_padded[..b.len()].copy_from_slice(b.as_bytes());

    let lengths_equal = a.len().ct_eq(&b.len());
    let contents_equal = a_padded.ct_eq(&b_padded);
    (lengths_equal & contents_equal).into()
}

/// The `X-API-Key` value, if present and non-empty.
pub fn presented_credential(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Whether the request names a loopback host or was forwarded from one.
pub fn is_loopback_request(headers: &HeaderMap) -> bool {
    let host_is_local = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(|host| {
            let name = host_name(host.trim());
            ["localhost", "127.0.0.1", "[::1]"]
                .iter()
                .any(|local| name.eq_ignore_ascii_case(local))
        })
        .unwrap_or(false);

    let forwarded_is_local = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|list| {
            list.split(',')
                .filter_map(|hop| hop.trim().parse::<IpAddr>().ok())
                .any(|ip| ip.is_loopback())
        })
        .unwrap_or(false);

    host_is_local || forwarded_is_local
}

// Host header without its port; bracketed IPv6 keeps the brackets
fn host_name(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) if host[end + 1..].is_empty() || host[end + 1..].starts_with(':') => {
                &host[..=end]
            }
            _ => host,
        };
    }
    host.split_once(':').map_or(host, |(name, _)| name)
}
