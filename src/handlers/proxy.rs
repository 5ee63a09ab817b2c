//! Local routes that relay to the peer system through the outbound client.
//!
//! The peer's key stays server-side. A peer error status is passed through;
//! an unreachable or unreadable peer answers 502.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use reqwest::Method;
use std::sync::Arc;

use crate::client::{
    ClientError, DivisionFilter, EfilingClient, Envelope, PeerApi, VideoArchivingClient, WorkRequestFilter,
    ZoneFilter,
};
use crate::models::{ErrorBody, VerifyRequest};
use crate::state::AppState;
use crate::verification::VerifyError;

// GET /api/efiling/video-archiving/work-requests
pub async fn search_work_requests_proxy(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<WorkRequestFilter>,
) -> Response {
    let client = match video_archiving(&state) {
        Ok(client) => client,
        Err(response) => return response,
    };

    relay(
        client
            .peer()
            .request("/work-requests", Method::GET, &filter.query(), None)
            .await,
    )
}

// POST /api/efiling/video-archiving/work-requests
pub async fn verify_work_request_proxy(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VerifyRequest>,
) -> Response {
    let client = match video_archiving(&state) {
        Ok(client) => client,
        Err(response) => return response,
    };

    match client.verify_work_request(request.id()).await {
        Ok(response) => Json(response).into_response(),
        Err(VerifyError::Client(e)) => client_error_response(e),
        Err(e) => (StatusCode::BAD_REQUEST, Json(ErrorBody::new(e.to_string()))).into_response(),
    }
}

// GET /api/video-archiving/efiling/divisions
pub async fn divisions_proxy(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<DivisionFilter>,
) -> Response {
    let client = match efiling(&state) {
        Ok(client) => client,
        Err(response) => return response,
    };

    relay(client.peer().request("/divisions", Method::GET, &filter.query(), None).await)
}

// GET /api/video-archiving/efiling/zones
pub async fn zones_proxy(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ZoneFilter>,
) -> Response {
    let client = match efiling(&state) {
        Ok(client) => client,
        Err(response) => return response,
    };

    relay(client.peer().request("/zones", Method::GET, &filter.query(), None).await)
}

fn relay(result: Result<Envelope, ClientError>) -> Response {
    match result {
        Ok(envelope) => Json(envelope).into_response(),
        Err(e) => client_error_response(e),
    }
}

fn client_error_response(e: ClientError) -> Response {
    let status = match &e {
        ClientError::UpstreamStatus { status, .. } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        _ => StatusCode::BAD_GATEWAY,
    };
    (status, Json(ErrorBody::new(e.to_string()))).into_response()
}

fn video_archiving(state: &AppState) -> Result<&VideoArchivingClient, Response> {
    match state.peer.as_deref() {
        Some(PeerApi::VideoArchiving(client)) => Ok(client),
        _ => Err(peer_not_configured()),
    }
}

fn efiling(state: &AppState) -> Result<&EfilingClient, Response> {
    match state.peer.as_deref() {
        Some(PeerApi::Efiling(client)) => Ok(client),
        _ => Err(peer_not_configured()),
    }
}

fn peer_not_configured() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorBody::new("Peer system is not configured")),
    )
        .into_response()
}
