use reqwest::Method;
use serde::Deserialize;

use super::{ApiConfigSummary, Envelope, PeerClient};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DivisionFilter {
    pub active: Option<bool>,
    pub department_id: Option<i64>,
}

impl DivisionFilter {
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(active) = self.active {
            query.push(("active", active.to_string()));
        }
        if let Some(department_id) = self.department_id {
            query.push(("department_id", department_id.to_string()));
        }
        query
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ZoneFilter {
    pub active: Option<bool>,
}

impl ZoneFilter {
    pub fn query(&self) -> Vec<(&'static str, String)> {
        self.active
            .map(|active| vec![("active", active.to_string())])
            .unwrap_or_default()
    }
}

// Used by video archiving to read divisions and zones held by e-filing
pub struct EfilingClient {
    peer: PeerClient,
}

impl EfilingClient {
    pub fn new(peer: PeerClient) -> Self {
        Self { peer }
    }

    pub fn peer(&self) -> &PeerClient {
        &self.peer
    }

    pub async fn divisions(&self, filter: &DivisionFilter) -> Envelope {
        self.peer
            .call("/divisions", Method::GET, &filter.query(), None)
            .await
    }

    pub async fn division(&self, id: i64) -> Envelope {
        if id <= 0 {
            return Envelope::failure("Division ID is required");
        }
        self.peer
            .call("/divisions", Method::GET, &[("id", id.to_string())], None)
            .await
    }

    pub async fn zones(&self, filter: &ZoneFilter) -> Envelope {
        self.peer
            .call("/zones", Method::GET, &filter.query(), None)
            .await
    }

    pub async fn zone(&self, id: i64) -> Envelope {
        if id <= 0 {
            return Envelope::failure("Zone ID is required");
        }
        self.peer
            .call("/zones", Method::GET, &[("id", id.to_string())], None)
            .await
    }

    pub async fn test_connection(&self) -> bool {
        let active = DivisionFilter {
            active: Some(true),
            ..Default::default()
        };
        self.divisions(&active).await.success
    }

    pub fn config_summary(&self) -> ApiConfigSummary {
        self.peer.config_summary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_only_send_set_values() {
        assert!(DivisionFilter::default().query().is_empty());
        assert!(ZoneFilter::default().query().is_empty());

        let query = DivisionFilter {
            active: Some(false),
            department_id: Some(4),
        }
        .query();
        assert_eq!(
            query,
            vec![("active", "false".to_string()), ("department_id", "4".to_string())]
        );
    }
}
