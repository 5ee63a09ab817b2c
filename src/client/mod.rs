//! Outbound client for the peer system's gateway-protected API.
//!
//! Both integration directions share this shape: every call resolves to an
//! [`Envelope`], so callers check `success` instead of handling faults.

mod efiling;
mod video_archiving;

pub use efiling::{DivisionFilter, EfilingClient, ZoneFilter};
pub use video_archiving::{
    DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT, VideoArchivingClient, WorkRequestFilter,
};

use reqwest::{Method, Url, header};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error};

use crate::auth::API_KEY_HEADER;
use crate::metrics::{PEER_FAILURES_TOTAL, PEER_REQUEST_LATENCY};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("{0}")]
    UpstreamUnavailable(String),

    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("{message}")]
    UpstreamStatus { status: u16, message: String },

    #[error("invalid response from peer: {0}")]
    UpstreamMalformed(String),

    #[error("invalid peer URL: {0}")]
    InvalidUrl(String),

    #[error("failed to build HTTP client: {0}")]
    Setup(String),
}

/// Uniform result of a peer call.
///
/// On success `data` holds the unwrapped payload and the payload's other
/// top-level fields are merged alongside it. On failure `data` is null and
/// `error` says why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Envelope {
    pub fn from_payload(payload: Value) -> Self {
        let mut fields = match &payload {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        fields.remove("success");
        let error = fields
            .remove("error")
            .and_then(|e| e.as_str().map(str::to_string));

        // accept both {"data": ...} wrapped and flat payloads
        let data = match fields.remove("data") {
            Some(inner) => inner,
            None => payload,
        };

        Self {
            success: true,
            data,
            error,
            fields,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Value::Null,
            error: Some(error.into()),
            fields: Map::new(),
        }
    }
}

/// What a client is pointed at, without the secret itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiConfigSummary {
    pub api_url: String,
    pub has_api_key: bool,
    pub api_key_set: &'static str,
}

/// The typed client for whichever system this process talks to.
pub enum PeerApi {
    VideoArchiving(VideoArchivingClient),
    Efiling(EfilingClient),
}

impl PeerApi {
    pub fn peer(&self) -> &PeerClient {
        match self {
            Self::VideoArchiving(client) => client.peer(),
            Self::Efiling(client) => client.peer(),
        }
    }

    pub async fn test_connection(&self) -> bool {
        match self {
            Self::VideoArchiving(client) => client.test_connection().await,
            Self::Efiling(client) => client.test_connection().await,
        }
    }
}

pub struct PeerClient {
    http: reqwest::Client,
    name: &'static str,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl PeerClient {
    pub fn new(
        name: &'static str,
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Setup(e.to_string()))?;

        Ok(Self {
            http,
            name,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            timeout,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn config_summary(&self) -> ApiConfigSummary {
        ApiConfigSummary {
            api_url: self.base_url.clone(),
            has_api_key: self.api_key.is_some(),
            api_key_set: if self.api_key.is_some() { "***" } else { "Not set" },
        }
    }

    /// Call `endpoint`, folding every failure into a failure envelope.
    pub async fn call(
        &self,
        endpoint: &str,
        method: Method,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Envelope {
        match self.request(endpoint, method, query, body).await {
            Ok(envelope) => envelope,
            Err(e) => Envelope::failure(e.to_string()),
        }
    }

    pub async fn request(
        &self,
        endpoint: &str,
        method: Method,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Envelope, ClientError> {
        self.fetch(endpoint, method, query, body)
            .await
            .map(Envelope::from_payload)
    }

    /// Like [`request`](Self::request) but decodes the payload into `T`.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        method: Method,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<T, ClientError> {
        let payload = self.fetch(endpoint, method, query, body).await?;
        serde_json::from_value(payload).map_err(|e| ClientError::UpstreamMalformed(e.to_string()))
    }

    async fn fetch(
        &self,
        endpoint: &str,
        method: Method,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, ClientError> {
        let start = Instant::now();
        let result = self.send(endpoint, method, query, body).await;
        PEER_REQUEST_LATENCY.observe(start.elapsed().as_secs_f64());

        if let Err(e) = &result {
            PEER_FAILURES_TOTAL.inc();
            error!(peer = self.name, endpoint, error = %e, "peer request failed");
        }
        result
    }

    async fn send(
        &self,
        endpoint: &str,
        method: Method,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, ClientError> {
        let url = self.url(endpoint, query)?;
        debug!(peer = self.name, %method, %url, "calling peer");

        let is_read = method == Method::GET || method == Method::HEAD;
        let mut request = self
            .http
            .request(method, url)
            .header(header::CONTENT_TYPE, "application/json");

        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        if let (Some(body), false) = (body, is_read) {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let message = match serde_json::from_slice::<Value>(&bytes) {
                Ok(payload) => payload
                    .get("error")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| {
                        format!("API request failed with status {}", status.as_u16())
                    }),
                Err(_) => "Unknown error".to_string(),
            };
            return Err(ClientError::UpstreamStatus {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| ClientError::UpstreamMalformed(e.to_string()))
    }

    fn url(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Url, ClientError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, endpoint))
            .map_err(|e| ClientError::InvalidUrl(e.to_string()))?;

        let pairs: Vec<_> = query.iter().filter(|(_, v)| !v.is_empty()).collect();
        if !pairs.is_empty() {
            let mut serializer = url.query_pairs_mut();
            for (key, value) in pairs {
                serializer.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn transport_error(&self, e: reqwest::Error) -> ClientError {
        if e.is_timeout() {
            ClientError::Timeout(self.timeout)
        } else {
            ClientError::UpstreamUnavailable(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_unwraps_data() {
        let envelope = Envelope::from_payload(json!({ "data": [1, 2], "total": 2 }));
        assert!(envelope.success);
        assert_eq!(envelope.data, json!([1, 2]));
        assert_eq!(envelope.fields.get("total"), Some(&json!(2)));
        assert_eq!(envelope.error, None);
    }

    #[test]
    fn test_envelope_keeps_flat_payload() {
        let payload = json!({ "id": 3, "name": "Zone 3" });
        let envelope = Envelope::from_payload(payload.clone());
        assert_eq!(envelope.data, payload);
        assert_eq!(envelope.fields.get("name"), Some(&json!("Zone 3")));
    }

    #[test]
    fn test_failure_shape() {
        let value = serde_json::to_value(Envelope::failure("boom")).unwrap();
        assert_eq!(value, json!({ "success": false, "data": null, "error": "boom" }));
    }

    #[test]
    fn test_url_skips_empty_params() {
        let client =
            PeerClient::new("test", "http://localhost:3000/api/external/", None, DEFAULT_TIMEOUT)
                .unwrap();
        let url = client
            .url(
                "/work-requests",
                &[("scope", "efiling".to_string()), ("search", String::new())],
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:3000/api/external/work-requests?scope=efiling"
        );

        let bare = client.url("/zones", &[]).unwrap();
        assert_eq!(bare.as_str(), "http://localhost:3000/api/external/zones");
    }

    #[test]
    fn test_config_summary_hides_key() {
        let client =
            PeerClient::new("test", "http://peer", Some("secret".into()), DEFAULT_TIMEOUT).unwrap();
        let summary = client.config_summary();
        assert!(summary.has_api_key);
        assert_eq!(summary.api_key_set, "***");

        let client = PeerClient::new("test", "http://peer", Some(String::new()), DEFAULT_TIMEOUT)
            .unwrap();
        assert_eq!(client.config_summary().api_key_set, "Not set");
    }
}
