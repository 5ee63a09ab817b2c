use reqwest::Method;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{ApiConfigSummary, Envelope, PeerClient};
use crate::models::VerifyResponse;
use crate::verification::{VerificationResult, VerifyError, parse_work_request_id};

pub const DEFAULT_SEARCH_LIMIT: u32 = 100;
pub const MAX_SEARCH_LIMIT: u32 = 500;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkRequestFilter {
    pub search: Option<String>,
    // status id or status name
    pub status: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl WorkRequestFilter {
    /// Query string for the peer's work request search. `scope=efiling` is
    /// always sent and the limit is capped.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let limit = match self.limit {
            Some(limit) if limit > 0 => limit.min(MAX_SEARCH_LIMIT),
            _ => DEFAULT_SEARCH_LIMIT,
        };

        let mut query = vec![("scope", "efiling".to_string()), ("limit", limit.to_string())];
        if let Some(search) = &self.search {
            query.push(("search", search.clone()));
        }
        if let Some(status) = &self.status {
            query.push(("status", status.clone()));
        }
        if let Some(offset) = self.offset.filter(|o| *o > 0) {
            query.push(("offset", offset.to_string()));
        }
        query
    }
}

// Used by e-filing to read work requests held by video archiving
pub struct VideoArchivingClient {
    peer: PeerClient,
}

impl VideoArchivingClient {
    pub fn new(peer: PeerClient) -> Self {
        Self { peer }
    }

    pub fn peer(&self) -> &PeerClient {
        &self.peer
    }

    pub async fn search_work_requests(&self, filter: &WorkRequestFilter) -> Envelope {
        self.peer
            .call("/work-requests", Method::GET, &filter.query(), None)
            .await
    }

    pub async fn work_request(&self, id: i64) -> Envelope {
        if id <= 0 {
            return Envelope::failure("Work request ID is required");
        }
        self.peer
            .call(&format!("/work-requests/{}", id), Method::GET, &[], None)
            .await
    }

    /// Ask the peer whether `raw` names an existing work request.
    ///
    /// The id is checked locally first; a missing or malformed id never
    /// reaches the network.
    pub async fn verify_work_request(&self, raw: &Value) -> Result<VerifyResponse, VerifyError> {
        let id = parse_work_request_id(raw)?;
        let body = json!({ "work_request_id": id });
        let response = self
            .peer
            .request_json::<VerifyResponse>("/work-requests/verify", Method::POST, &[], Some(&body))
            .await?;
        Ok(response)
    }

    pub async fn verify(&self, foreign_id: &str) -> Result<VerificationResult, VerifyError> {
        let response = self
            .verify_work_request(&Value::String(foreign_id.to_string()))
            .await?;
        Ok(VerificationResult::from(response))
    }

    pub async fn test_connection(&self) -> bool {
        let probe = WorkRequestFilter {
            limit: Some(1),
            ..Default::default()
        };
        self.search_work_requests(&probe).await.success
    }

    pub fn config_summary(&self) -> ApiConfigSummary {
        self.peer.config_summary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults_and_caps() {
        let query = WorkRequestFilter::default().query();
        assert_eq!(
            query,
            vec![("scope", "efiling".to_string()), ("limit", "100".to_string())]
        );

        let capped = WorkRequestFilter {
            limit: Some(5000),
            search: Some("canal".into()),
            status: Some("2".into()),
            offset: Some(40),
        }
        .query();
        assert!(capped.contains(&("limit", "500".to_string())));
        assert!(capped.contains(&("search", "canal".to_string())));
        assert!(capped.contains(&("status", "2".to_string())));
        assert!(capped.contains(&("offset", "40".to_string())));
    }
}
