use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::client::PeerApi;
use crate::gateway::admission;
use crate::handlers::{
    divisions_proxy, get_work_request, health_handler, list_divisions, list_work_requests,
    list_zones, metrics_handler, search_work_requests_proxy, verify_work_request,
    verify_work_request_proxy, work_request_before_content, work_request_images,
    work_request_videos, zones_proxy,
};
use crate::state::AppState;

// Assemble every route; cross-system endpoints sit behind the gateway
pub fn build_router(state: Arc<AppState>) -> Router {
    let external = Router::new()
        .route("/api/external/work-requests", get(list_work_requests))
        .route("/api/external/work-requests/verify", post(verify_work_request))
        .route("/api/external/work-requests/{id}", get(get_work_request))
        .route("/api/external/work-requests/{id}/videos", get(work_request_videos))
        .route("/api/external/work-requests/{id}/images", get(work_request_images))
        .route(
            "/api/external/work-requests/{id}/before-content",
            get(work_request_before_content),
        )
        .route("/api/external/divisions", get(list_divisions))
        .route("/api/external/zones", get(list_zones))
        .route_layer(middleware::from_fn_with_state(state.gateway.clone(), admission));

    let mut app = Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .merge(external);

    // relays toward the peer, mounted for whichever side this process plays
    match state.peer.as_deref() {
        Some(PeerApi::VideoArchiving(_)) => {
            app = app.route(
                "/api/efiling/video-archiving/work-requests",
                get(search_work_requests_proxy).post(verify_work_request_proxy),
            );
        }
        Some(PeerApi::Efiling(_)) => {
            app = app
                .route("/api/video-archiving/efiling/divisions", get(divisions_proxy))
                .route("/api/video-archiving/efiling/zones", get(zones_proxy));
        }
        None => {}
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}
