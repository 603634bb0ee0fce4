//! In-memory store: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use chrono::Utc;
use fieldscribe_core::error::StoreError;
use fieldscribe_core::store::{HistoryPage, HistoryQuery, RecordStore};
use fieldscribe_core::{InteractionFields, InteractionRecord};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::most_recent_first;

struct Inner {
    records: Vec<InteractionRecord>,
    next_id: i64,
}

/// A store that keeps records in a Vec behind a lock.
/// Nothing survives the process.
#[derive(Clone)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                records: Vec::new(),
                next_id: 1,
            })),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn fetch(&self, query: &HistoryQuery) -> Result<HistoryPage, StoreError> {
        query.check()?;
        let inner = self.inner.read().await;

        let mut matching: Vec<InteractionRecord> = inner
            .records
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        matching.sort_by(most_recent_first);

        let total = matching.len();
        let page: Vec<InteractionRecord> = matching
            .into_iter()
            .skip(query.offset())
            .take(query.page_size)
            .collect();

        Ok(HistoryPage::new(page, total, query))
    }

    async fn get(&self, id: i64) -> Result<Option<InteractionRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.records.iter().find(|r| r.id == id).cloned())
    }

    async fn create(&self, fields: InteractionFields) -> Result<InteractionRecord, StoreError> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let record = InteractionRecord {
            id: inner.next_id,
            fields,
            created_at: now,
            updated_at: now,
            version: 1,
        };
        inner.next_id += 1;
        inner.records.push(record.clone());
        debug!(id = record.id, "Interaction stored");
        Ok(record)
    }

    async fn apply_fields(
        &self,
        id: i64,
        fields: &Map<String, Value>,
        expected_version: Option<u64>,
    ) -> Result<InteractionRecord, StoreError> {
        let mut inner = self.inner.write().await;
        let record = inner
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))?;

        if let Some(expected) = expected_version
            && expected != record.version
        {
            return Err(StoreError::Conflict {
                id,
                expected,
                actual: record.version,
            });
        }

        record.fields = record.overlay(fields)?;
        record.version += 1;
        record.updated_at = Utc::now();
        debug!(id, version = record.version, "Interaction updated");
        Ok(record.clone())
    }

    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<InteractionRecord>, StoreError> {
        let inner = self.inner.read().await;
        let mut all = inner.records.clone();
        all.sort_by(most_recent_first);
        Ok(all.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.inner.read().await.records.len())
    }
}
