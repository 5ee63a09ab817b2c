use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, error};

use crate::models::{ErrorBody, VerifyRequest, VerifyResponse};
use crate::state::AppState;
use crate::verification::{VerificationResult, VerifyError, verify_local};

// POST /api/external/work-requests/verify
//
// Only the gateway's base credential is required; the answer is a summary,
// never the full record.
pub async fn verify_work_request(
    State(state): State<Arc<AppState>>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            debug!(error = %rejection, "unreadable verify body");
            return (StatusCode::BAD_REQUEST, Json(ErrorBody::new("Invalid request body")))
                .into_response();
        }
    };

    match verify_local(state.records.as_ref(), request.id()).await {
        Ok(result) => {
            debug!(found = result.exists(), "work request verified");
            Json(result.into_response()).into_response()
        }
        Err(e @ (VerifyError::Missing | VerifyError::Malformed(_))) => {
            (StatusCode::BAD_REQUEST, Json(ErrorBody::new(e.to_string()))).into_response()
        }
        Err(e) => {
            error!(error = %e, "error verifying work request");
            let mut failed = VerificationResult::NotFound.into_response();
            failed.error = Some("Internal server error".to_string());
            (StatusCode::INTERNAL_SERVER_ERROR, Json::<VerifyResponse>(failed)).into_response()
        }
    }
}
