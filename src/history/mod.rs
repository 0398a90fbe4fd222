//! Append-only prediction history.
//!
//! The [`HistoryStore`] trait is the narrow contract the HTTP layer relies
//! on: append a `(review, rating)` pair and read everything back in insertion
//! order. Nothing is ever updated or deleted.
//!
//! | Implementation | Backing |
//! |----------------|---------|
//! | [`SqliteHistoryStore`] | `reviews` table in the configured SQLite file |
//! | [`MemoryHistoryStore`] | `Vec` behind a mutex, for tests |
//!
//! The store does not check that a rating came from a real prediction; it is
//! a generic log sink. Write failures are returned to the caller and never
//! retried here.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::Config;
use crate::models::{HistoryRecord, SavedRecord};

pub use memory::MemoryHistoryStore;
pub use sqlite::SqliteHistoryStore;

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persist one record, stamping it with the current UTC time.
    async fn append(&self, review: &str, rating: i64) -> Result<SavedRecord>;

    /// Every record, ascending by id.
    async fn list_all(&self) -> Result<Vec<HistoryRecord>>;
}

/// Handler for `rater history`.
pub async fn run_history(config: &Config, as_json: bool) -> Result<()> {
    let store = SqliteHistoryStore::open(config).await?;
    let records = store.list_all().await?;

    if as_json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "history": records }))?
        );
        return Ok(());
    }

    if records.is_empty() {
        println!("No saved predictions.");
        return Ok(());
    }

    for r in &records {
        let preview: String = r.review.chars().take(60).collect();
        let ellipsis = if r.review.chars().count() > 60 { "…" } else { "" };
        println!(
            "{:>5}  {}  {}  {}{}",
            r.id, r.timestamp, r.rating, preview, ellipsis
        );
    }
    println!("{} record(s)", records.len());

    Ok(())
}
