#![allow(dead_code)]

use axum::Router;
use chrono::{TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use crosslink_gateway::client::PeerApi;
use crosslink_gateway::config::StaticCredentials;
use crosslink_gateway::gateway::Gateway;
use crosslink_gateway::models::WorkRequestSummary;
use crosslink_gateway::rate_limit::{ManualClock, RateLimitConfig, RateLimiter};
use crosslink_gateway::state::AppState;
use crosslink_gateway::records::{
    Attachment, DirectoryLookup, InMemoryRecords, Record, WorkRequestLookup,
};
use serde_json::{Value, json};

pub const API_KEY: &str = "test-shared-secret";

pub struct TestApp {
    pub state: Arc<AppState>,
    pub clock: Arc<ManualClock>,
    pub credentials: Arc<StaticCredentials>,
    pub limiter: Arc<RateLimiter>,
}

pub fn summary(id: i64) -> WorkRequestSummary {
    WorkRequestSummary {
        id,
        address: Some("Plot 9, Canal Road".to_string()),
        description: Some("Manhole cover missing".to_string()),
        status: Some("In Progress".to_string()),
        status_id: Some(2),
        request_date: Some("2026-02-11".to_string()),
        created_date: Some("2026-02-11T09:30:00Z".to_string()),
        complaint_type: Some("Sewerage".to_string()),
    }
}

pub fn row(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

/// Work requests 42 and 7, one video on 42, two divisions and a zone.
pub fn records() -> InMemoryRecords {
    InMemoryRecords::from_summaries([summary(42), summary(7)])
        .with_attachments(
            42,
            Attachment::Videos,
            vec![row(json!({ "id": 501, "link": "https://media.example.org/501.mp4" }))],
        )
        .with_divisions(vec![
            row(json!({ "id": 1, "name": "North", "is_active": true, "department_id": 3 })),
            row(json!({ "id": 2, "name": "East", "is_active": false, "department_id": 3 })),
        ])
        .with_zones(vec![row(json!({ "id": 9, "name": "Zone 9", "is_active": true }))])
}

pub fn build_app(
    expected: Option<&str>,
    development: bool,
    max_requests: u32,
    peer: Option<PeerApi>,
) -> TestApp {
    let store = Arc::new(records());
    build_app_with(expected, development, max_requests, peer, store.clone(), store)
}

pub fn build_app_with(
    expected: Option<&str>,
    development: bool,
    max_requests: u32,
    peer: Option<PeerApi>,
    records: Arc<dyn WorkRequestLookup>,
    directory: Arc<dyn DirectoryLookup>,
) -> TestApp {
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()));
    let limiter = Arc::new(RateLimiter::with_clock(
        RateLimitConfig {
            max_requests,
            window: Duration::from_secs(60),
        },
        clock.clone(),
    ));
    let credentials = Arc::new(StaticCredentials::new(expected, development));
    let gateway = Arc::new(Gateway::new(limiter.clone(), credentials.clone()));

    let state = Arc::new(AppState {
        gateway,
        records,
        directory,
        peer: peer.map(Arc::new),
        peer_health: None,
    });

    TestApp {
        state,
        clock,
        credentials,
        limiter,
    }
}

/// Serve `router` on an ephemeral loopback port and return its base URL.
pub async fn spawn_peer(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}
