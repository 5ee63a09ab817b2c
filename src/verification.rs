//! Cross-system verification of work request identifiers.
//!
//! Before one system links to a record held by the other, it asks the peer
//! whether the identifier resolves. The answer is a short summary, never the
//! full record.

use serde_json::Value;
use thiserror::Error;

use crate::client::ClientError;
use crate::models::{VerifyResponse, WorkRequestSummary};

pub use crate::records::{LookupError, WorkRequestLookup};

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("work_request_id is required")]
    Missing,

    #[error("Invalid work_request_id format")]
    Malformed(String),

    #[error("record lookup failed: {0}")]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum VerificationResult {
    NotFound,
    Found(WorkRequestSummary),
}

impl VerificationResult {
    pub fn exists(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn summary(&self) -> Option<&WorkRequestSummary> {
        match self {
            Self::Found(summary) => Some(summary),
            Self::NotFound => None,
        }
    }

    pub fn into_response(self) -> VerifyResponse {
        match self {
            // no soft-deleted state yet, so valid always mirrors exists
            Self::Found(summary) => VerifyResponse {
                exists: true,
                valid: true,
                data: Some(summary),
                error: None,
            },
            Self::NotFound => VerifyResponse {
                exists: false,
                valid: false,
                data: None,
                error: None,
            },
        }
    }
}

impl From<VerifyResponse> for VerificationResult {
    fn from(response: VerifyResponse) -> Self {
        match response.data {
            Some(summary) if response.exists => Self::Found(summary),
            _ => Self::NotFound,
        }
    }
}

/// Parse a work request id given as a JSON number or numeric string.
///
/// Absent, null, empty and zero ids are "missing"; anything that is not a
/// positive integer is "malformed".
pub fn parse_work_request_id(raw: &Value) -> Result<i64, VerifyError> {
    let id = match raw {
        Value::Null => return Err(VerifyError::Missing),
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| VerifyError::Malformed(n.to_string()))?,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Err(VerifyError::Missing);
            }
            trimmed
                .parse::<i64>()
                .map_err(|_| VerifyError::Malformed(s.clone()))?
        }
        other => return Err(VerifyError::Malformed(other.to_string())),
    };

    match id {
        0 => Err(VerifyError::Missing),
        id if id < 0 => Err(VerifyError::Malformed(id.to_string())),
        id => Ok(id),
    }
}

/// Resolve `raw` against the local record store.
pub async fn verify_local(
    lookup: &dyn WorkRequestLookup,
    raw: &Value,
) -> Result<VerificationResult, VerifyError> {
    let id = parse_work_request_id(raw)?;
    let found = lookup.find_summary(id).await?;
    Ok(match found {
        Some(summary) => VerificationResult::Found(summary),
        None => VerificationResult::NotFound,
    })
}
