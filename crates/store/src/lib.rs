//! Interaction record stores for Field Scribe.
//!
//! Two [`RecordStore`](fieldscribe_core::RecordStore) implementations:
//! - [`InMemoryStore`] for tests and ephemeral sessions
//! - [`SqliteStore`] for durable local storage (feature `sqlite`, on by default)

use std::cmp::Ordering;

use fieldscribe_core::InteractionRecord;

pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// Most recent first: date desc, time desc, then newest id.
pub(crate) fn most_recent_first(a: &InteractionRecord, b: &InteractionRecord) -> Ordering {
    b.fields
        .date
        .cmp(&a.fields.date)
        .then_with(|| b.fields.time.cmp(&a.fields.time))
        .then_with(|| b.id.cmp(&a.id))
}
