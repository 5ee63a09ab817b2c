//! Admission middleware for every cross-system endpoint.
//!
//! Credential validation runs first, so a bad key never consumes a rate
//! limit slot. The first refusal ends the request; handlers only see
//! admitted callers, and their successful responses carry `X-RateLimit-*`
//! headers.

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::auth::{self, AccessDecision, DenyReason};
use crate::config::CredentialSource;
use crate::metrics::{ADMITTED_TOTAL, REJECTED_TOTAL};
use crate::rate_limit::{RateLimitDecision, RateLimitSnapshot, RateLimiter};

pub const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("API key required. Provide X-API-Key header.")]
    CredentialMissing,

    #[error("Unauthorized - Invalid API key")]
    CredentialInvalid,

    #[error("Server configuration error")]
    ServerMisconfigured,

    #[error("Rate limit exceeded")]
    RateLimitExceeded { limit: u32, reset_at: DateTime<Utc> },
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::CredentialMissing | Self::CredentialInvalid => StatusCode::UNAUTHORIZED,
            Self::ServerMisconfigured => StatusCode::INTERNAL_SERVER_ERROR,
            Self::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    fn metric_label(&self) -> &'static str {
        match self {
            Self::CredentialMissing => "credential_missing",
            Self::CredentialInvalid => "credential_invalid",
            Self::ServerMisconfigured => "server_misconfigured",
            Self::RateLimitExceeded { .. } => "rate_limited",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        match self {
            Self::RateLimitExceeded { limit, reset_at } => {
                let body = Json(json!({
                    "error": message,
                    "resetAt": iso_timestamp(reset_at),
                }));
                let mut response = (status, body).into_response();
                apply_rate_limit_headers(
                    response.headers_mut(),
                    &RateLimitSnapshot {
                        limit,
                        remaining: 0,
                        reset_at,
                    },
                );
                response
            }
            _ => (status, Json(json!({ "error": message }))).into_response(),
        }
    }
}

/// A request that passed the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admitted {
    pub credential: Option<String>,
    pub bypassed: bool,
}

/// Validator and limiter bound together, shared by every protected route.
pub struct Gateway {
    limiter: Arc<RateLimiter>,
    credentials: Arc<dyn CredentialSource>,
}

impl Gateway {
    pub fn new(limiter: Arc<RateLimiter>, credentials: Arc<dyn CredentialSource>) -> Self {
        Self {
            limiter,
            credentials,
        }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Decide whether the request described by `headers` may proceed.
    pub fn admit(&self, headers: &HeaderMap) -> Result<Admitted, GatewayError> {
        let presented = auth::presented_credential(headers);
        let loopback = auth::is_loopback_request(headers);
        let development = self.credentials.is_development();

        let result = self.decide(presented, loopback, development);
        match &result {
            Ok(admitted) => {
                ADMITTED_TOTAL.inc();
                debug!(bypassed = admitted.bypassed, "request admitted");
            }
            Err(err) => {
                REJECTED_TOTAL.with_label_values(&[err.metric_label()]).inc();
                info!(status = err.status().as_u16(), reason = %err, "request refused");
            }
        }
        result
    }

    fn decide(
        &self,
        presented: Option<&str>,
        loopback: bool,
        development: bool,
    ) -> Result<Admitted, GatewayError> {
        // one bypass decision feeds both checks
        if auth::development_bypass(presented, loopback, development) {
            return Ok(Admitted {
                credential: None,
                bypassed: true,
            });
        }

        let expected = self.credentials.expected_credential();
        match auth::validate(presented, loopback, development, expected.as_deref()) {
            AccessDecision::Allow => {}
            AccessDecision::Deny(DenyReason::CredentialRequired) => {
                return Err(GatewayError::CredentialMissing);
            }
            AccessDecision::Deny(DenyReason::InvalidCredential) => {
                return Err(GatewayError::CredentialInvalid);
            }
            AccessDecision::MisconfiguredServer => {
                warn!("refusing request: no expected API key configured outside development");
                return Err(GatewayError::ServerMisconfigured);
            }
        }

        match self.limiter.admit(presented) {
            RateLimitDecision::Allowed { .. } | RateLimitDecision::Bypassed => Ok(Admitted {
                credential: presented.map(str::to_string),
                bypassed: false,
            }),
            RateLimitDecision::Rejected { reset_at } => Err(GatewayError::RateLimitExceeded {
                limit: self.limiter.config().max_requests,
                reset_at,
            }),
        }
    }
}

/// axum middleware: admit, run the handler, then attach rate limit headers
/// to a successful response.
pub async fn admission(State(gateway): State<Arc<Gateway>>, req: Request, next: Next) -> Response {
    let admitted = match gateway.admit(req.headers()) {
        Ok(admitted) => admitted,
        Err(err) => return err.into_response(),
    };

    let mut response = next.run(req).await;
    if response.status().is_success() {
        let snapshot = gateway.limiter.snapshot(admitted.credential.as_deref());
        apply_rate_limit_headers(response.headers_mut(), &snapshot);
    }
    response
}

pub fn apply_rate_limit_headers(headers: &mut HeaderMap, snapshot: &RateLimitSnapshot) {
    headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(snapshot.limit));
    headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(snapshot.remaining));
    if let Ok(reset) = HeaderValue::from_str(&iso_timestamp(snapshot.reset_at)) {
        headers.insert(RATE_LIMIT_RESET, reset);
    }
}

// ISO-8601 with millisecond precision and a Z suffix
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticCredentials;
    use crate::rate_limit::{ManualClock, RateLimitConfig};
    use axum::http::header;
    use chrono::TimeZone;
    use std::time::Duration;

    fn gateway(expected: Option<&str>, development: bool, max_requests: u32) -> Gateway {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()));
        let limiter = RateLimiter::with_clock(
            RateLimitConfig {
                max_requests,
                window: Duration::from_secs(60),
            },
            clock,
        );
        Gateway::new(
            Arc::new(limiter),
            Arc::new(StaticCredentials::new(expected, development)),
        )
    }

    fn headers(key: Option<&'static str>, host: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static(host));
        if let Some(key) = key {
            headers.insert("x-api-key", HeaderValue::from_static(key));
        }
        headers
    }

    #[test]
    fn test_invalid_key_never_consumes_slot() {
        let gw = gateway(Some("good"), false, 1);
        for _ in 0..3 {
            assert_eq!(
                gw.admit(&headers(Some("bad"), "peer.example.org")),
                Err(GatewayError::CredentialInvalid)
            );
        }
        assert_eq!(gw.limiter().window_count(), 0);
        assert!(gw.admit(&headers(Some("good"), "peer.example.org")).is_ok());
    }

    #[test]
    fn test_rate_limit_after_valid_key() {
        let gw = gateway(Some("good"), false, 2);
        let h = headers(Some("good"), "peer.example.org");
        assert!(gw.admit(&h).is_ok());
        assert!(gw.admit(&h).is_ok());
        match gw.admit(&h) {
            Err(GatewayError::RateLimitExceeded { limit, .. }) => assert_eq!(limit, 2),
            other => panic!("expected rate limit, got {:?}", other),
        }
    }

    #[test]
    fn test_dev_loopback_bypass_skips_limiter() {
        let gw = gateway(Some("good"), true, 1);
        for _ in 0..5 {
            let admitted = gw.admit(&headers(None, "localhost:5000")).unwrap();
            assert!(admitted.bypassed);
        }
        assert_eq!(gw.limiter().window_count(), 0);
    }

    #[test]
    fn test_missing_and_misconfigured() {
        let gw = gateway(Some("good"), false, 10);
        assert_eq!(
            gw.admit(&headers(None, "localhost:5000")),
            Err(GatewayError::CredentialMissing)
        );

        let gw = gateway(None, false, 10);
        assert_eq!(
            gw.admit(&headers(Some("anything"), "peer.example.org")),
            Err(GatewayError::ServerMisconfigured)
        );
    }

    #[test]
    fn test_iso_timestamp_format() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 1, 0).unwrap();
        assert_eq!(iso_timestamp(at), "2026-03-01T12:01:00.000Z");
    }
}
