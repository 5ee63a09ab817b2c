//! Fixed-window rate limiter keyed by API credential.
//!
//! Each credential gets one window of `window` length in which at most
//! `max_requests` calls are admitted. Expired windows are swept lazily on
//! every admission, so the store only ever holds recently active callers.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

use crate::metrics::RATE_LIMIT_WINDOWS;

/// Limits applied to every credential.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Maximum admitted requests per window
    pub max_requests: u32,
    /// Length of one window
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60),
        }
    }
}

// Source of "now" for the limiter, swapped out in tests
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += to_chrono(by);
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// Rate limit window - tracks requests per credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitWindow {
    pub count: u32,
    pub reset_at: DateTime<Utc>,
}

/// Outcome of a single admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed {
        remaining: u32,
        reset_at: DateTime<Utc>,
    },
    Rejected {
        reset_at: DateTime<Utc>,
    },
    /// Caller presented no credential; admission belongs to the validator
    Bypassed,
}

/// Read-only view of a caller's budget, rendered as `X-RateLimit-*` headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

pub struct RateLimiter {
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
    windows: DashMap<String, RateLimitWindow>, // fingerprint -> window
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            windows: DashMap::new(),
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn admit(&self, credential: Option<&str>) -> RateLimitDecision {
        self.admit_at(credential, self.clock.now())
    }

    /// Count one request against `credential`'s window as of `now`.
    pub fn admit_at(&self, credential: Option<&str>, now: DateTime<Utc>) -> RateLimitDecision {
        let Some(credential) = credential else {
            return RateLimitDecision::Bypassed;
        };

        self.sweep(now);

        let max = self.config.max_requests;
        let fresh_reset = now + to_chrono(self.config.window);

        // a zero budget admits nothing, and count 0 below means "new window"
        if max == 0 {
            return RateLimitDecision::Rejected {
                reset_at: fresh_reset,
            };
        }

        // The entry guard holds the shard lock for the whole read-modify-write
        let mut window = self
            .windows
            .entry(credential_fingerprint(credential))
            .or_insert(RateLimitWindow {
                count: 0,
                reset_at: fresh_reset,
            });

        // new or expired window: start over at 1
        if window.count == 0 || now > window.reset_at {
            window.count = 1;
            window.reset_at = fresh_reset;
            return RateLimitDecision::Allowed {
                remaining: max.saturating_sub(1),
                reset_at: fresh_reset,
            };
        }

        // at the ceiling: reject without counting the attempt
        if window.count >= max {
            debug!(count = window.count, reset_at = %window.reset_at, "rate limit window exhausted");
            return RateLimitDecision::Rejected {
                reset_at: window.reset_at,
            };
        }

        window.count += 1;
        RateLimitDecision::Allowed {
            remaining: max - window.count,
            reset_at: window.reset_at,
        }
    }

    /// Current budget for `credential` without touching the store.
    ///
    /// Callers without a credential, or without a window yet, get a
    /// best-effort view of a fresh window.
    pub fn snapshot(&self, credential: Option<&str>) -> RateLimitSnapshot {
        let now = self.clock.now();
        let limit = self.config.max_requests;

        let window = credential.and_then(|c| {
            self.windows
                .get(&credential_fingerprint(c))
                .map(|w| *w)
        });

        match window {
            Some(w) => RateLimitSnapshot {
                limit,
                remaining: limit.saturating_sub(w.count),
                reset_at: w.reset_at,
            },
            None => RateLimitSnapshot {
                limit,
                remaining: limit.saturating_sub(1),
                reset_at: now + to_chrono(self.config.window),
            },
        }
    }

    pub fn window(&self, credential: &str) -> Option<RateLimitWindow> {
        self.windows.get(&credential_fingerprint(credential)).map(|w| *w)
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    // drop every window whose reset instant is already behind us
    fn sweep(&self, now: DateTime<Utc>) {
        self.windows.retain(|_, w| w.reset_at >= now);
        RATE_LIMIT_WINDOWS.set(self.windows.len() as f64);
    }
}

// Store key for a credential (hash so the raw secret never sits in the map)
pub fn credential_fingerprint(credential: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"rate_limit:");
    hasher.update(credential.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn to_chrono(d: Duration) -> ChronoDuration {
    ChronoDuration::from_std(d).unwrap_or(ChronoDuration::MAX)
}
