//! Read-only routes the peer system calls, all behind the gateway.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use crate::client::{DEFAULT_SEARCH_LIMIT, DivisionFilter, MAX_SEARCH_LIMIT, ZoneFilter};
use crate::models::ErrorBody;
use crate::records::{Attachment, LookupError, WorkRequestQuery};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct WorkRequestParams {
    pub scope: Option<String>,
    pub search: Option<String>,
    // older name for `search`
    pub filter: Option<String>,
    pub status: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl WorkRequestParams {
    fn query(&self) -> WorkRequestQuery {
        let limit = self
            .limit
            .as_deref()
            .and_then(|l| l.trim().parse::<usize>().ok())
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_SEARCH_LIMIT as usize)
            .min(MAX_SEARCH_LIMIT as usize);
        let offset = self
            .offset
            .as_deref()
            .and_then(|o| o.trim().parse::<usize>().ok())
            .unwrap_or(0);

        WorkRequestQuery {
            search: non_empty(&self.search).or_else(|| non_empty(&self.filter)),
            status: non_empty(&self.status),
            limit,
            offset,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DirectoryParams {
    pub id: Option<String>,
    pub active: Option<String>,
    pub department_id: Option<String>,
}

impl DirectoryParams {
    // anything but "true"/"false" means no filter
    fn active(&self) -> Option<bool> {
        match self.active.as_deref() {
            Some("true") => Some(true),
            Some("false") => Some(false),
            _ => None,
        }
    }
}

// GET /api/external/work-requests
pub async fn list_work_requests(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WorkRequestParams>,
) -> Response {
    if params.scope.as_deref() != Some("efiling") {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Invalid scope. Must provide scope=efiling parameter.",
        );
    }

    let query = params.query();
    match state.records.search(&query).await {
        Ok(page) => Json(json!({
            "success": true,
            "data": page.rows,
            "pagination": {
                "total": page.total,
                "limit": query.limit,
                "offset": query.offset,
                "hasMore": query.offset + query.limit < page.total,
            },
        }))
        .into_response(),
        Err(e) => internal_error("work requests", e),
    }
}

// GET /api/external/work-requests/{id}
pub async fn get_work_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let Some(id) = parse_id(&id) else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid work request ID");
    };

    match state.records.find(id).await {
        Ok(Some(row)) => Json(json!({ "success": true, "data": row })).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Work request not found"),
        Err(e) => internal_error("work request", e),
    }
}

// GET /api/external/work-requests/{id}/videos
pub async fn work_request_videos(state: State<Arc<AppState>>, id: Path<String>) -> Response {
    attachments(state, id, Attachment::Videos).await
}

// GET /api/external/work-requests/{id}/images
pub async fn work_request_images(state: State<Arc<AppState>>, id: Path<String>) -> Response {
    attachments(state, id, Attachment::Images).await
}

// GET /api/external/work-requests/{id}/before-content
pub async fn work_request_before_content(
    state: State<Arc<AppState>>,
    id: Path<String>,
) -> Response {
    attachments(state, id, Attachment::BeforeContent).await
}

async fn attachments(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    kind: Attachment,
) -> Response {
    let Some(id) = parse_id(&id) else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid work request ID");
    };

    match state.records.attachments(id, kind).await {
        Ok(Some(rows)) => Json(json!({ "success": true, "data": rows })).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Work request not found"),
        Err(e) => internal_error("work request attachments", e),
    }
}

// GET /api/external/divisions
pub async fn list_divisions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DirectoryParams>,
) -> Response {
    if let Some(raw) = non_empty(&params.id) {
        let Some(id) = parse_id(&raw) else {
            return error_response(StatusCode::BAD_REQUEST, "Invalid division id");
        };
        return match state.directory.division(id).await {
            Ok(Some(row)) => Json(json!({ "data": row })).into_response(),
            Ok(None) => error_response(StatusCode::NOT_FOUND, "Division not found"),
            Err(e) => internal_error("division", e),
        };
    }

    let filter = DivisionFilter {
        active: params.active(),
        department_id: params
            .department_id
            .as_deref()
            .and_then(|d| d.trim().parse().ok()),
    };
    match state.directory.divisions(&filter).await {
        Ok(rows) => Json(json!({ "count": rows.len(), "data": rows })).into_response(),
        Err(e) => internal_error("divisions", e),
    }
}

// GET /api/external/zones
pub async fn list_zones(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DirectoryParams>,
) -> Response {
    if let Some(raw) = non_empty(&params.id) {
        let Some(id) = parse_id(&raw) else {
            return error_response(StatusCode::BAD_REQUEST, "Invalid zone id");
        };
        return match state.directory.zone(id).await {
            Ok(Some(row)) => Json(json!({ "data": row })).into_response(),
            Ok(None) => error_response(StatusCode::NOT_FOUND, "Zone not found"),
            Err(e) => internal_error("zone", e),
        };
    }

    let filter = ZoneFilter {
        active: params.active(),
    };
    match state.directory.zones(&filter).await {
        Ok(rows) => Json(json!({ "count": rows.len(), "data": rows })).into_response(),
        Err(e) => internal_error("zones", e),
    }
}

fn parse_id(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorBody::new(message))).into_response()
}

fn internal_error(what: &str, e: LookupError) -> Response {
    error!(error = %e, "error fetching {}", what);
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}
