//! In-memory [`HistoryStore`] for tests and server sessions without a
//! database.
//!
//! Records live in a `Vec` behind `std::sync::RwLock`: appends take the
//! write lock, listings clone under the read lock.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::HistoryStore;
use crate::models::GradingRecord;

#[derive(Default)]
pub struct InMemoryHistoryStore {
    records: RwLock<Vec<GradingRecord>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("history lock poisoned")
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, record: &GradingRecord) -> Result<()> {
        self.records.write().map_err(poisoned)?.push(record.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<GradingRecord>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.iter().rev().cloned().collect())
    }

    async fn get(&self, id: &str) -> Result<Option<GradingRecord>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.iter().rev().find(|r| r.id == id).cloned())
    }

    async fn clear(&self) -> Result<usize> {
        let mut records = self.records.write().map_err(poisoned)?;
        let n = records.len();
        records.clear();
        Ok(n)
    }
}
