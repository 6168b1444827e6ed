//! History storage abstraction.
//!
//! The [`HistoryStore`] trait is the boundary between the grading engine
//! and whatever keeps past grading runs (SQLite, in-memory, ...). Stores
//! trust records produced by the engine: they perform no validation and no
//! deduplication.
//!
//! # Ordering
//!
//! | Method | Order |
//! |--------|-------|
//! | [`append`](HistoryStore::append) | preserves insertion order |
//! | [`list`](HistoryStore::list) | most recently appended first |
//!
//! Implementations must be `Send + Sync`; concurrent appends are serialized
//! and `list` observes a consistent snapshot.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::GradingRecord;

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Add exactly one record.
    async fn append(&self, record: &GradingRecord) -> Result<()>;

    /// All records, most recently appended first.
    async fn list(&self) -> Result<Vec<GradingRecord>>;

    /// Look up a record by its ID.
    ///
    /// If the same ID was appended more than once, the latest copy wins.
    async fn get(&self, id: &str) -> Result<Option<GradingRecord>>;

    /// Remove every record, returning how many were removed.
    async fn clear(&self) -> Result<usize>;
}
