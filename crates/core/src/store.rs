//! Record store trait: persistence for interaction records.
//!
//! The store is a collaborator of the pipeline: it supplies snapshots and
//! history windows, and persists merged snapshots. Lookups are plain
//! filtered, paginated queries ordered most-recent-first.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::interaction::{InteractionFields, InteractionRecord};

/// A filtered, paginated history lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryQuery {
    /// Case-insensitive substring of the HCP name.
    pub name_pattern: String,

    /// Inclusive lower date bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,

    /// Inclusive upper date bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,

    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: usize,

    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    10
}

impl HistoryQuery {
    /// First page of history for `name_pattern`, default page size.
    pub fn for_name(name_pattern: impl Into<String>) -> Self {
        Self {
            name_pattern: name_pattern.into(),
            start_date: None,
            end_date: None,
            page: default_page(),
            page_size: default_page_size(),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Whether `record` passes the name and date filters.
    pub fn matches(&self, record: &InteractionRecord) -> bool {
        let name_ok = record
            .fields
            .hcp_name
            .to_lowercase()
            .contains(&self.name_pattern.to_lowercase());
        let after_start = self.start_date.is_none_or(|d| record.fields.date >= d);
        let before_end = self.end_date.is_none_or(|d| record.fields.date <= d);
        name_ok && after_start && before_end
    }

    /// Reject queries no store should run.
    pub fn check(&self) -> Result<(), StoreError> {
        if self.name_pattern.trim().is_empty() {
            return Err(StoreError::QueryFailed("HCP name must be provided".into()));
        }
        if self.page == 0 || self.page_size == 0 {
            return Err(StoreError::QueryFailed(
                "page and page_size must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Row offset of the requested page, saturating for absurd page numbers.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }
}

/// One page of history plus pagination metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPage {
    pub records: Vec<InteractionRecord>,
    pub total_records: usize,
    pub current_page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

impl HistoryPage {
    pub fn new(records: Vec<InteractionRecord>, total_records: usize, query: &HistoryQuery) -> Self {
        Self {
            records,
            total_records,
            current_page: query.page,
            page_size: query.page_size,
            total_pages: total_records.div_ceil(query.page_size),
        }
    }
}

/// The core RecordStore trait.
///
/// Implementations: SQLite (durable), in-memory (tests, ephemeral sessions).
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Fetch a page of records matching the query, most recent first
    /// (date desc, time desc).
    async fn fetch(&self, query: &HistoryQuery) -> std::result::Result<HistoryPage, StoreError>;

    /// Get a record by id.
    async fn get(&self, id: i64) -> std::result::Result<Option<InteractionRecord>, StoreError>;

    /// Insert a new record; the store assigns id, timestamps and version 1.
    async fn create(&self, fields: InteractionFields) -> std::result::Result<InteractionRecord, StoreError>;

    /// Persist changed fields of a record.
    ///
    /// When `expected_version` is set and the stored version differs, nothing
    /// is written and `StoreError::Conflict` is returned.
    async fn apply_fields(
        &self,
        id: i64,
        fields: &Map<String, Value>,
        expected_version: Option<u64>,
    ) -> std::result::Result<InteractionRecord, StoreError>;

    /// All records, most recent first, with offset/limit paging.
    async fn list(&self, offset: usize, limit: usize) -> std::result::Result<Vec<InteractionRecord>, StoreError>;

    /// Total record count.
    async fn count(&self) -> std::result::Result<usize, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::tests::sample_fields;
    use chrono::Utc;

    fn record_on(name: &str, date: NaiveDate) -> InteractionRecord {
        let mut fields = sample_fields();
        fields.hcp_name = name.into();
        fields.date = date;
        InteractionRecord {
            id: 1,
            fields,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version: 1,
        }
    }

    #[test]
    fn name_match_is_case_insensitive_substring() {
        let q = HistoryQuery::for_name("rOSS");
        let d = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        assert!(q.matches(&record_on("Dr. Rossi", d)));
        assert!(!q.matches(&record_on("Dr. Carter", d)));
    }

    #[test]
    fn date_range_is_inclusive() {
        let mut q = HistoryQuery::for_name("Rossi");
        q.start_date = NaiveDate::from_ymd_opt(2025, 8, 1);
        q.end_date = NaiveDate::from_ymd_opt(2025, 8, 31);
        assert!(q.matches(&record_on("Dr. Rossi", NaiveDate::from_ymd_opt(2025, 8, 1).unwrap())));
        assert!(q.matches(&record_on("Dr. Rossi", NaiveDate::from_ymd_opt(2025, 8, 31).unwrap())));
        assert!(!q.matches(&record_on("Dr. Rossi", NaiveDate::from_ymd_opt(2025, 9, 1).unwrap())));
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(HistoryQuery::for_name("  ").check().is_err());
        assert!(HistoryQuery::for_name("Rossi").with_page_size(0).check().is_err());
        assert!(HistoryQuery::for_name("Rossi").check().is_ok());
    }

    #[test]
    fn huge_page_offset_saturates() {
        let q = HistoryQuery {
            page: usize::MAX,
            ..HistoryQuery::for_name("Rossi").with_page_size(50)
        };
        assert_eq!(q.offset(), usize::MAX);
        assert_eq!(HistoryQuery::for_name("Rossi").with_page_size(10).offset(), 0);
    }

    #[test]
    fn total_pages_rounds_up() {
        let q = HistoryQuery::for_name("x").with_page_size(10);
        assert_eq!(HistoryPage::new(vec![], 21, &q).total_pages, 3);
        assert_eq!(HistoryPage::new(vec![], 0, &q).total_pages, 0);
        assert_eq!(HistoryPage::new(vec![], 10, &q).total_pages, 1);
    }
}
