use lazy_static::lazy_static;
use prometheus::{
    Encoder, Gauge, Histogram, IntCounter, IntCounterVec, TextEncoder, register_gauge,
    register_histogram, register_int_counter, register_int_counter_vec,
};

lazy_static! {
    pub static ref ADMITTED_TOTAL: IntCounter = register_int_counter!(
        "crosslink_admitted_requests_total",
        "Requests that passed the gateway"
    )
    .unwrap();
    pub static ref REJECTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "crosslink_rejected_requests_total",
        "Requests stopped by the gateway, by reason",
        &["reason"]
    )
    .unwrap();
    pub static ref RATE_LIMIT_WINDOWS: Gauge = register_gauge!(
        "crosslink_rate_limit_windows",
        "Live rate limit windows held in memory"
    )
    .unwrap();
    pub static ref PEER_REQUEST_LATENCY: Histogram = register_histogram!(
        "crosslink_peer_request_latency_seconds",
        "Latency of outbound calls to the peer system"
    )
    .unwrap();
    pub static ref PEER_FAILURES_TOTAL: IntCounter = register_int_counter!(
        "crosslink_peer_failures_total",
        "Outbound calls that ended in a failure envelope"
    )
    .unwrap();
}

// Render every registered metric in the text exposition format
pub fn render() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
