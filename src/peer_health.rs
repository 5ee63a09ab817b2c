use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::time::{Duration, interval};
use tracing::{info, warn};

use crate::client::PeerApi;

// Last known reachability of the peer system
pub struct PeerHealth {
    pub url: String,
    healthy: AtomicBool,
    last_checked: Mutex<Option<DateTime<Utc>>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PeerStatus {
    pub url: String,
    pub healthy: bool,
    pub last_checked: Option<DateTime<Utc>>,
}

impl PeerHealth {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            // assume reachable until the first probe says otherwise
            healthy: AtomicBool::new(true),
            last_checked: Mutex::new(None),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    /// Record a probe result, returning whether the state changed.
    pub fn record(&self, healthy: bool) -> bool {
        *self.last_checked.lock().unwrap_or_else(|e| e.into_inner()) = Some(Utc::now());
        self.healthy.swap(healthy, Ordering::Relaxed) != healthy
    }

    pub fn status(&self) -> PeerStatus {
        PeerStatus {
            url: self.url.clone(),
            healthy: self.is_healthy(),
            last_checked: *self.last_checked.lock().unwrap_or_else(|e| e.into_inner()),
        }
    }
}

// Probe the peer on a fixed interval, forever
pub async fn health_checker(peer: Arc<PeerApi>, health: Arc<PeerHealth>, check_interval: Duration) {
    let mut ticker = interval(check_interval);
    info!(peer = %health.url, interval = ?check_interval, "peer health checker started");

    loop {
        ticker.tick().await;

        let healthy = peer.test_connection().await;
        if health.record(healthy) {
            if healthy {
                info!(peer = %health.url, "peer is now healthy");
            } else {
                warn!(peer = %health.url, "peer is now unhealthy");
            }
        }
    }
}
