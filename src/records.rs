//! Read-only record stores behind the protected external routes.
//!
//! The database side is a collaborator: handlers only see these traits.
//! [`InMemoryRecords`] serves both from a JSON fixture.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;

use crate::client::{DivisionFilter, ZoneFilter};
use crate::models::WorkRequestSummary;

/// One row as the record store hands it out.
pub type Record = Map<String, Value>;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    #[error("failed to load records: {0}")]
    Load(String),
}

/// Media attached to a work request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attachment {
    Videos,
    Images,
    BeforeContent,
}

/// Search over work requests; `limit` is already capped by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkRequestQuery {
    pub search: Option<String>,
    // status id or status name
    pub status: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkRequestPage {
    pub rows: Vec<Record>,
    pub total: usize,
}

#[async_trait]
pub trait WorkRequestLookup: Send + Sync {
    async fn find_summary(&self, id: i64) -> Result<Option<WorkRequestSummary>, LookupError>;

    async fn search(&self, query: &WorkRequestQuery) -> Result<WorkRequestPage, LookupError>;

    async fn find(&self, id: i64) -> Result<Option<Record>, LookupError>;

    /// `None` when the work request itself does not exist.
    async fn attachments(
        &self,
        id: i64,
        kind: Attachment,
    ) -> Result<Option<Vec<Record>>, LookupError>;
}

/// Divisions and zones, the reference data e-filing shares.
#[async_trait]
pub trait DirectoryLookup: Send + Sync {
    async fn divisions(&self, filter: &DivisionFilter) -> Result<Vec<Record>, LookupError>;

    async fn division(&self, id: i64) -> Result<Option<Record>, LookupError>;

    async fn zones(&self, filter: &ZoneFilter) -> Result<Vec<Record>, LookupError>;

    async fn zone(&self, id: i64) -> Result<Option<Record>, LookupError>;
}

// On-disk layout; attachment rows name their work request
#[derive(Debug, Default, Deserialize)]
struct RecordFixture {
    #[serde(default)]
    work_requests: Vec<Record>,
    #[serde(default)]
    videos: Vec<Record>,
    #[serde(default)]
    images: Vec<Record>,
    #[serde(default)]
    before_content: Vec<Record>,
    #[serde(default)]
    divisions: Vec<Record>,
    #[serde(default)]
    zones: Vec<Record>,
}

#[derive(Debug, Default)]
pub struct InMemoryRecords {
    work_requests: BTreeMap<i64, Record>,
    attachments: HashMap<(i64, Attachment), Vec<Record>>,
    divisions: Vec<Record>,
    zones: Vec<Record>,
}

impl InMemoryRecords {
    /// Rows without an integer `id` are skipped.
    pub fn new(work_requests: impl IntoIterator<Item = Record>) -> Self {
        Self {
            work_requests: work_requests
                .into_iter()
                .filter_map(|row| Some((int_field(&row, "id")?, row)))
                .collect(),
            ..Default::default()
        }
    }

    pub fn from_summaries(summaries: impl IntoIterator<Item = WorkRequestSummary>) -> Self {
        Self::new(summaries.into_iter().filter_map(|summary| {
            match serde_json::to_value(summary) {
                Ok(Value::Object(row)) => Some(row),
                _ => None,
            }
        }))
    }

    pub fn from_json_file(path: &Path) -> Result<Self, LookupError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| LookupError::Load(format!("{}: {}", path.display(), e)))?;
        let fixture: RecordFixture = serde_json::from_str(&raw)
            .map_err(|e| LookupError::Load(format!("{}: {}", path.display(), e)))?;

        let mut store = Self::new(fixture.work_requests)
            .with_divisions(fixture.divisions)
            .with_zones(fixture.zones);
        for (kind, rows) in [
            (Attachment::Videos, fixture.videos),
            (Attachment::Images, fixture.images),
            (Attachment::BeforeContent, fixture.before_content),
        ] {
            for row in rows {
                let Some(owner) = int_field(&row, "work_request_id") else {
                    return Err(LookupError::Load(format!(
                        "{:?} row without work_request_id",
                        kind
                    )));
                };
                store.attachments.entry((owner, kind)).or_default().push(row);
            }
        }
        Ok(store)
    }

    pub fn with_attachments(mut self, id: i64, kind: Attachment, rows: Vec<Record>) -> Self {
        self.attachments.entry((id, kind)).or_default().extend(rows);
        self
    }

    pub fn with_divisions(mut self, rows: Vec<Record>) -> Self {
        self.divisions.extend(rows);
        self
    }

    pub fn with_zones(mut self, rows: Vec<Record>) -> Self {
        self.zones.extend(rows);
        self
    }

    pub fn len(&self) -> usize {
        self.work_requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.work_requests.is_empty()
    }
}

fn int_field(row: &Record, key: &str) -> Option<i64> {
    row.get(key).and_then(Value::as_i64)
}

fn text_field<'a>(row: &'a Record, key: &str) -> Option<&'a str> {
    row.get(key).and_then(Value::as_str)
}

fn matches_search(row: &Record, id: i64, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    id.to_string().contains(&needle)
        || ["address", "description", "complaint_type"]
            .iter()
            .filter_map(|key| text_field(row, key))
            .any(|text| text.to_lowercase().contains(&needle))
}

fn matches_status(row: &Record, status: &str) -> bool {
    match status.trim().parse::<i64>() {
        Ok(status_id) => int_field(row, "status_id") == Some(status_id),
        Err(_) => ["status", "status_name"]
            .iter()
            .any(|key| text_field(row, key) == Some(status)),
    }
}

fn by_name(rows: &mut [Record]) {
    rows.sort_by(|a, b| text_field(a, "name").cmp(&text_field(b, "name")));
}

fn find_by_id(rows: &[Record], id: i64) -> Option<Record> {
    rows.iter().find(|row| int_field(row, "id") == Some(id)).cloned()
}

#[async_trait]
impl WorkRequestLookup for InMemoryRecords {
    async fn find_summary(&self, id: i64) -> Result<Option<WorkRequestSummary>, LookupError> {
        self.work_requests
            .get(&id)
            .map(|row| serde_json::from_value(Value::Object(row.clone())))
            .transpose()
            .map_err(|e| LookupError::Load(e.to_string()))
    }

    async fn search(&self, query: &WorkRequestQuery) -> Result<WorkRequestPage, LookupError> {
        // newest first
        let matching: Vec<&Record> = self
            .work_requests
            .iter()
            .rev()
            .filter(|(id, row)| match query.search.as_deref() {
                Some(needle) if !needle.is_empty() => matches_search(row, **id, needle),
                _ => true,
            })
            .filter(|(_, row)| match query.status.as_deref() {
                Some(status) if !status.is_empty() => matches_status(row, status),
                _ => true,
            })
            .map(|(_, row)| row)
            .collect();

        Ok(WorkRequestPage {
            total: matching.len(),
            rows: matching
                .into_iter()
                .skip(query.offset)
                .take(query.limit)
                .cloned()
                .collect(),
        })
    }

    async fn find(&self, id: i64) -> Result<Option<Record>, LookupError> {
        Ok(self.work_requests.get(&id).cloned())
    }

    async fn attachments(
        &self,
        id: i64,
        kind: Attachment,
    ) -> Result<Option<Vec<Record>>, LookupError> {
        if !self.work_requests.contains_key(&id) {
            return Ok(None);
        }
        Ok(Some(
            self.attachments.get(&(id, kind)).cloned().unwrap_or_default(),
        ))
    }
}

#[async_trait]
impl DirectoryLookup for InMemoryRecords {
    async fn divisions(&self, filter: &DivisionFilter) -> Result<Vec<Record>, LookupError> {
        let mut rows: Vec<Record> = self
            .divisions
            .iter()
            .filter(|row| {
                filter
                    .active
                    .is_none_or(|active| row.get("is_active").and_then(Value::as_bool) == Some(active))
            })
            .filter(|row| {
                filter
                    .department_id
                    .is_none_or(|department| int_field(row, "department_id") == Some(department))
            })
            .cloned()
            .collect();
        by_name(&mut rows);
        Ok(rows)
    }

    async fn division(&self, id: i64) -> Result<Option<Record>, LookupError> {
        Ok(find_by_id(&self.divisions, id))
    }

    async fn zones(&self, filter: &ZoneFilter) -> Result<Vec<Record>, LookupError> {
        let mut rows: Vec<Record> = self
            .zones
            .iter()
            .filter(|row| {
                filter
                    .active
                    .is_none_or(|active| row.get("is_active").and_then(Value::as_bool) == Some(active))
            })
            .cloned()
            .collect();
        by_name(&mut rows);
        Ok(rows)
    }

    async fn zone(&self, id: i64) -> Result<Option<Record>, LookupError> {
        Ok(find_by_id(&self.zones, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn row(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn store() -> InMemoryRecords {
        InMemoryRecords::new([
            row(json!({ "id": 1, "address": "Canal Road", "status_id": 1, "status": "Pending" })),
            row(json!({ "id": 2, "description": "Broken drain", "status_id": 2, "status": "In Progress" })),
            row(json!({ "id": 3, "address": "Mall Road", "complaint_type": "Sewerage", "status_id": 2 })),
        ])
    }

    #[tokio::test]
    async fn test_search_filters_and_pages() {
        let store = store();
        let all = store
            .search(&WorkRequestQuery {
                limit: 100,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(all.total, 3);
        assert_eq!(int_field(&all.rows[0], "id"), Some(3));

        let by_status = store
            .search(&WorkRequestQuery {
                status: Some("2".into()),
                limit: 1,
                offset: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_status.total, 2);
        assert_eq!(by_status.rows.len(), 1);
        assert_eq!(int_field(&by_status.rows[0], "id"), Some(2));

        let by_text = store
            .search(&WorkRequestQuery {
                search: Some("canal".into()),
                status: Some("Pending".into()),
                limit: 100,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_text.total, 1);
    }

    #[tokio::test]
    async fn test_attachments_need_an_existing_work_request() {
        let store = store().with_attachments(
            1,
            Attachment::Videos,
            vec![row(json!({ "id": 10, "link": "https://cdn.example.org/v/10.mp4" }))],
        );
        assert_eq!(store.attachments(1, Attachment::Videos).await.unwrap().unwrap().len(), 1);
        assert_eq!(store.attachments(1, Attachment::Images).await.unwrap(), Some(vec![]));
        assert_eq!(store.attachments(99, Attachment::Videos).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_directory_filters() {
        let store = InMemoryRecords::default()
            .with_divisions(vec![
                row(json!({ "id": 2, "name": "North", "is_active": true, "department_id": 4 })),
                row(json!({ "id": 1, "name": "East", "is_active": false, "department_id": 4 })),
            ])
            .with_zones(vec![row(json!({ "id": 5, "name": "Zone 5", "is_active": true }))]);

        let everything = store.divisions(&DivisionFilter::default()).await.unwrap();
        assert_eq!(text_field(&everything[0], "name"), Some("East"));

        let active = store
            .divisions(&DivisionFilter {
                active: Some(true),
                department_id: Some(4),
            })
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert!(store.division(1).await.unwrap().is_some());
        assert!(store.zone(6).await.unwrap().is_none());
        assert!(store.zones(&ZoneFilter { active: Some(false) }).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_from_json_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "{}",
            json!({
                "work_requests": [
                    { "id": 42, "address": "Plot 9", "complaint_type": "Sewerage" },
                    { "address": "no id, skipped" }
                ],
                "videos": [{ "id": 1, "work_request_id": 42, "link": "v.mp4" }],
                "zones": [{ "id": 3, "name": "Zone 3", "is_active": true }]
            })
        )
        .unwrap();

        let store = InMemoryRecords::from_json_file(file.path()).unwrap();
        assert_eq!(store.len(), 1);
        let summary = store.find_summary(42).await.unwrap().unwrap();
        assert_eq!(summary.complaint_type.as_deref(), Some("Sewerage"));
        assert_eq!(store.attachments(42, Attachment::Videos).await.unwrap().unwrap().len(), 1);
        assert!(store.zone(3).await.unwrap().is_some());
    }

    #[test]
    fn test_from_json_file_rejects_bad_input() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[not json").unwrap();
        assert!(matches!(
            InMemoryRecords::from_json_file(file.path()),
            Err(LookupError::Load(_))
        ));

        let mut orphan = NamedTempFile::new().unwrap();
        write!(orphan, "{}", json!({ "images": [{ "id": 1 }] })).unwrap();
        assert!(matches!(
            InMemoryRecords::from_json_file(orphan.path()),
            Err(LookupError::Load(_))
        ));

        let missing = Path::new("/definitely/not/here/records.json");
        assert!(matches!(
            InMemoryRecords::from_json_file(missing),
            Err(LookupError::Load(_))
        ));
    }
}
