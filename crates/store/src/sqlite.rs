//! SQLite store.
//!
//! One table, `interactions`. List fields are stored as JSON text, dates as
//! `YYYY-MM-DD` and times as `HH:MM:SS` so that text ordering is
//! chronological. Every update bumps `version`, and `apply_fields` only
//! writes when the caller's version still matches.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use fieldscribe_core::error::StoreError;
use fieldscribe_core::store::{HistoryPage, HistoryQuery, RecordStore};
use fieldscribe_core::{InteractionFields, InteractionRecord};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

const SELECT_COLUMNS: &str = "id, hcp_name, interaction_type, date, time, attendees, \
    topics_discussed, voice_note_summary, materials_shared, samples_distributed, sentiment, \
    outcomes, follow_up_actions, ai_suggested_followups, created_at, updated_at, version";

/// A durable SQLite record store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) a store at `path`.
    ///
    /// Accepts a plain file path or a `sqlite:` URL. `"sqlite::memory:"`
    /// opens an ephemeral database held by a single pooled connection.
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let in_memory = path.contains(":memory:");

        let options = (if path.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(path)
                .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
        } else {
            if let Some(parent) = Path::new(path).parent()
                && !parent.as_os_str().is_empty()
            {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    StoreError::Storage(format!("Cannot create {}: {e}", parent.display()))
                })?;
            }
            SqliteConnectOptions::new().filename(path)
        })
        .create_if_missing(true)
        .synchronous(SqliteSynchronous::Normal);

        let (options, pool_options) = if in_memory {
            (
                options,
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .min_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None),
            )
        } else {
            (
                options.journal_mode(SqliteJournalMode::Wal),
                SqlitePoolOptions::new().max_connections(4),
            )
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite interaction store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS interactions (
                id                     INTEGER PRIMARY KEY AUTOINCREMENT,
                hcp_name               TEXT NOT NULL,
                interaction_type       TEXT NOT NULL,
                date                   TEXT NOT NULL,
                time                   TEXT NOT NULL,
                attendees              TEXT NOT NULL DEFAULT '[]',
                topics_discussed       TEXT NOT NULL,
                voice_note_summary     TEXT,
                materials_shared       TEXT NOT NULL DEFAULT '[]',
                samples_distributed    TEXT NOT NULL DEFAULT '[]',
                sentiment              TEXT NOT NULL,
                outcomes               TEXT,
                follow_up_actions      TEXT NOT NULL DEFAULT '[]',
                ai_suggested_followups TEXT NOT NULL DEFAULT '[]',
                created_at             TEXT NOT NULL,
                updated_at             TEXT NOT NULL,
                version                INTEGER NOT NULL DEFAULT 1
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("interactions table: {e}")))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_interactions_hcp_name ON interactions(hcp_name)")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::MigrationFailed(format!("hcp_name index: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_interactions_recency ON interactions(date DESC, time DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("recency index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn row_to_record(row: &SqliteRow) -> Result<InteractionRecord, StoreError> {
        let date: String = row.get("date");
        let time: String = row.get("time");

        let fields = InteractionFields {
            hcp_name: row.get("hcp_name"),
            interaction_type: parse_literal(row.get("interaction_type"))?,
            date: fieldscribe_core::interaction::parse_calendar_date(&date)
                .ok_or_else(|| StoreError::InvalidRecord(format!("bad stored date '{date}'")))?,
            time: fieldscribe_core::interaction::parse_clock_time(&time)
                .ok_or_else(|| StoreError::InvalidRecord(format!("bad stored time '{time}'")))?,
            attendees: parse_list(row.get("attendees"))?,
            topics_discussed: row.get("topics_discussed"),
            voice_note_summary: row.get("voice_note_summary"),
            materials_shared: parse_list(row.get("materials_shared"))?,
            samples_distributed: parse_list(row.get("samples_distributed"))?,
            sentiment: parse_literal(row.get("sentiment"))?,
            outcomes: row.get("outcomes"),
            follow_up_actions: parse_list(row.get("follow_up_actions"))?,
            ai_suggested_followups: parse_list(row.get("ai_suggested_followups"))?,
        };

        let version: i64 = row.get("version");

        Ok(InteractionRecord {
            id: row.get("id"),
            fields,
            created_at: parse_timestamp(row.get("created_at"))?,
            updated_at: parse_timestamp(row.get("updated_at"))?,
            version: version.max(0) as u64,
        })
    }
}

fn parse_literal<T: DeserializeOwned>(raw: String) -> Result<T, StoreError> {
    serde_json::from_value(Value::String(raw.clone()))
        .map_err(|_| StoreError::InvalidRecord(format!("unknown stored value '{raw}'")))
}

fn parse_list(raw: String) -> Result<Vec<String>, StoreError> {
    serde_json::from_str(&raw).map_err(|e| StoreError::InvalidRecord(format!("bad list column: {e}")))
}

fn parse_timestamp(raw: String) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidRecord(format!("bad timestamp '{raw}': {e}")))
}

fn list_json(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".into())
}

fn date_text(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// LIMIT/OFFSET value. SQLite reads a negative LIMIT as "no limit", so
/// oversized counts clamp to `i64::MAX` instead of wrapping.
fn sql_count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// `%`, `_` and `\` are literal in a name pattern.
fn like_pattern(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len() + 2);
    escaped.push('%');
    for c in name.trim().to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[async_trait]
impl RecordStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn fetch(&self, query: &HistoryQuery) -> Result<HistoryPage, StoreError> {
        query.check()?;
        let pattern = like_pattern(&query.name_pattern);
        let start = query.start_date.map(date_text);
        let end = query.end_date.map(date_text);

        let filter = r#"lower(hcp_name) LIKE ?1 ESCAPE '\'
            AND (?2 IS NULL OR date >= ?2)
            AND (?3 IS NULL OR date <= ?3)"#;

        let total: i64 = sqlx::query(&format!("SELECT COUNT(*) AS n FROM interactions WHERE {filter}"))
            .bind(&pattern)
            .bind(&start)
            .bind(&end)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?
            .get("n");

        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM interactions WHERE {filter} \
             ORDER BY date DESC, time DESC, id DESC LIMIT ?4 OFFSET ?5"
        );
        let rows = sqlx::query(&sql)
            .bind(&pattern)
            .bind(&start)
            .bind(&end)
            .bind(sql_count(query.page_size))
            .bind(sql_count(query.offset()))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        let records = rows
            .iter()
            .map(Self::row_to_record)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(HistoryPage::new(records, total.max(0) as usize, query))
    }

    async fn get(&self, id: i64) -> Result<Option<InteractionRecord>, StoreError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM interactions WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn create(&self, fields: InteractionFields) -> Result<InteractionRecord, StoreError> {
        let now = Utc::now();
        let stamp = now.to_rfc3339();

        let result = sqlx::query(
            r#"
            INSERT INTO interactions (
                hcp_name, interaction_type, date, time, attendees, topics_discussed,
                voice_note_summary, materials_shared, samples_distributed, sentiment,
                outcomes, follow_up_actions, ai_suggested_followups,
                created_at, updated_at, version
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14, 1)
            "#,
        )
        .bind(&fields.hcp_name)
        .bind(fields.interaction_type.as_str())
        .bind(date_text(fields.date))
        .bind(fields.time.format("%H:%M:%S").to_string())
        .bind(list_json(&fields.attendees))
        .bind(&fields.topics_discussed)
        .bind(&fields.voice_note_summary)
        .bind(list_json(&fields.materials_shared))
        .bind(list_json(&fields.samples_distributed))
        .bind(fields.sentiment.as_str())
        .bind(&fields.outcomes)
        .bind(list_json(&fields.follow_up_actions))
        .bind(list_json(&fields.ai_suggested_followups))
        .bind(&stamp)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("Failed to insert interaction: {e}")))?;

        let id = result.last_insert_rowid();
        debug!(id, hcp = %fields.hcp_name, "Interaction stored");

        // Round-trip through text so the returned record matches what a later read sees.
        let created_at = parse_timestamp(stamp)?;
        Ok(InteractionRecord {
            id,
            fields,
            created_at,
            updated_at: created_at,
            version: 1,
        })
    }

    async fn apply_fields(
        &self,
        id: i64,
        fields: &Map<String, Value>,
        expected_version: Option<u64>,
    ) -> Result<InteractionRecord, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to begin transaction: {e}")))?;

        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM interactions WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?
            .ok_or(StoreError::NotFound(id))?;
        let current = Self::row_to_record(&row)?;

        if let Some(expected) = expected_version
            && expected != current.version
        {
            return Err(StoreError::Conflict {
                id,
                expected,
                actual: current.version,
            });
        }

        let merged = current.overlay(fields)?;
        let updated_at = parse_timestamp(Utc::now().to_rfc3339())?;
        let next_version = current.version + 1;

        let result = sqlx::query(
            r#"
            UPDATE interactions SET
                hcp_name = ?1, interaction_type = ?2, date = ?3, time = ?4, attendees = ?5,
                topics_discussed = ?6, voice_note_summary = ?7, materials_shared = ?8,
                samples_distributed = ?9, sentiment = ?10, outcomes = ?11,
                follow_up_actions = ?12, ai_suggested_followups = ?13,
                updated_at = ?14, version = ?15
            WHERE id = ?16 AND version = ?17
            "#,
        )
        .bind(&merged.hcp_name)
        .bind(merged.interaction_type.as_str())
        .bind(date_text(merged.date))
        .bind(merged.time.format("%H:%M:%S").to_string())
        .bind(list_json(&merged.attendees))
        .bind(&merged.topics_discussed)
        .bind(&merged.voice_note_summary)
        .bind(list_json(&merged.materials_shared))
        .bind(list_json(&merged.samples_distributed))
        .bind(merged.sentiment.as_str())
        .bind(&merged.outcomes)
        .bind(list_json(&merged.follow_up_actions))
        .bind(list_json(&merged.ai_suggested_followups))
        .bind(updated_at.to_rfc3339())
        .bind(next_version as i64)
        .bind(id)
        .bind(current.version as i64)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::Storage(format!("Failed to update interaction {id}: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict {
                id,
                expected: current.version,
                actual: current.version + 1,
            });
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to commit update: {e}")))?;

        debug!(id, version = next_version, "Interaction updated");
        Ok(InteractionRecord {
            id,
            fields: merged,
            created_at: current.created_at,
            updated_at,
            version: next_version,
        })
    }

    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<InteractionRecord>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM interactions \
             ORDER BY date DESC, time DESC, id DESC LIMIT ?1 OFFSET ?2"
        ))
        .bind(sql_count(limit))
        .bind(sql_count(offset))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        rows.iter().map(Self::row_to_record).collect()
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM interactions")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;
        let n: i64 = row.get("n");
        Ok(n.max(0) as usize)
    }
}
