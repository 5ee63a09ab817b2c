use serde::{Deserialize, Serialize};
use serde_json::Value;

// Minimal read-only projection of a work request, safe to share with the peer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkRequestSummary {
    pub id: i64,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    // status label, e.g. "Pending"
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub status_id: Option<i64>,
    #[serde(default)]
    pub request_date: Option<String>,
    #[serde(default)]
    pub created_date: Option<String>,
    #[serde(default)]
    pub complaint_type: Option<String>,
}

// Verification request body; the id may arrive as a number or a numeric string
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub work_request_id: Value,
    // older callers send camelCase
    #[serde(default, rename = "workRequestId", skip_serializing_if = "Value::is_null")]
    pub work_request_id_camel: Value,
}

impl VerifyRequest {
    /// The snake_case id unless it is blank, then the camelCase one.
    pub fn id(&self) -> &Value {
        if is_blank(&self.work_request_id) {
            &self.work_request_id_camel
        } else {
            &self.work_request_id
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

// Verification response, identical in both integration directions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub exists: bool,
    pub valid: bool,
    pub data: Option<WorkRequestSummary>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
