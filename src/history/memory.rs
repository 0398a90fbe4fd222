//! In-memory [`HistoryStore`] for tests.

use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{utc_timestamp_now, HistoryRecord, SavedRecord};

use super::HistoryStore;

/// Non-persistent store; ids start at 1.
#[derive(Default)]
pub struct MemoryHistoryStore {
    records: Mutex<Vec<HistoryRecord>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, review: &str, rating: i64) -> Result<SavedRecord> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| anyhow!("history lock poisoned"))?;
        let id = records.last().map(|r| r.id + 1).unwrap_or(1);
        let timestamp = utc_timestamp_now();
        records.push(HistoryRecord {
            id,
            review: review.to_string(),
            rating,
            timestamp: timestamp.clone(),
        });
        Ok(SavedRecord { id, timestamp })
    }

    async fn list_all(&self) -> Result<Vec<HistoryRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|_| anyhow!("history lock poisoned"))?;
        Ok(records.clone())
    }
}
