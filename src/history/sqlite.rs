//! SQLite-backed [`HistoryStore`].
//!
//! Records live in the `reviews` table created by
//! [`migrate::create_schema`](crate::migrate::create_schema). Ids come from
//! `INTEGER PRIMARY KEY AUTOINCREMENT`, so they only ever increase.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::models::{utc_timestamp_now, HistoryRecord, SavedRecord};

use super::HistoryStore;

pub struct SqliteHistoryStore {
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the configured database and make sure the table exists.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::create_schema(&pool)
            .await
            .context("Failed to create reviews table")?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn append(&self, review: &str, rating: i64) -> Result<SavedRecord> {
        let timestamp = utc_timestamp_now();

        let result = sqlx::query("INSERT INTO reviews (review, rating, timestamp) VALUES (?, ?, ?)")
            .bind(review)
            .bind(rating)
            .bind(&timestamp)
            .execute(&self.pool)
            .await
            .context("Failed to insert review")?;

        Ok(SavedRecord {
            id: result.last_insert_rowid(),
            timestamp,
        })
    }

    async fn list_all(&self) -> Result<Vec<HistoryRecord>> {
        let rows = sqlx::query("SELECT id, review, rating, timestamp FROM reviews ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .context("Failed to read reviews")?;

        rows.iter()
            .map(|row| {
                Ok(HistoryRecord {
                    id: row.try_get("id")?,
                    review: row.try_get("review")?,
                    rating: row.try_get("rating")?,
                    timestamp: row.try_get("timestamp")?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use chrono::{DateTime, Utc};
    use tempfile::TempDir;

    fn test_config(tmp: &TempDir) -> Config {
        let content = format!(
            r#"
[db]
path = "{}"

[model]
backend = "linear"
encoder_path = "unused.json"
classifier_path = "unused.json"
label_mapping = "direct"
"#,
            tmp.path().join("data").join("reviews.sqlite").display()
        );
        parse_config(&content).unwrap()
    }

    #[tokio::test]
    async fn test_append_and_list() {
        let tmp = TempDir::new().unwrap();
        let store = SqliteHistoryStore::open(&test_config(&tmp)).await.unwrap();

        let before: DateTime<Utc> = Utc::now();
        let saved = store.append("Loved it!! 10/10", 5).await.unwrap();

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, saved.id);
        assert_eq!(all[0].review, "Loved it!! 10/10");
        assert_eq!(all[0].rating, 5);
        assert_eq!(all[0].timestamp, saved.timestamp);

        let stamped: DateTime<Utc> = saved.timestamp.parse().unwrap();
        assert!(stamped >= before - chrono::Duration::microseconds(1));
    }

    #[tokio::test]
    async fn test_ids_strictly_increase() {
        let tmp = TempDir::new().unwrap();
        let store = SqliteHistoryStore::open(&test_config(&tmp)).await.unwrap();

        let mut last = 0;
        for i in 0..5 {
            let saved = store.append(&format!("review {}", i), 3).await.unwrap();
            assert!(saved.id > last);
            last = saved.id;
        }

        let ids: Vec<i64> = store
            .list_all()
            .await
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        assert_eq!(ids.len(), 5);
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        let cfg = test_config(&tmp);

        {
            let store = SqliteHistoryStore::open(&cfg).await.unwrap();
            store.append("persisted", 4).await.unwrap();
            store.pool().close().await;
        }

        let store = SqliteHistoryStore::open(&cfg).await.unwrap();
        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].review, "persisted");
    }

    #[tokio::test]
    async fn test_concurrent_appends() {
        let tmp = TempDir::new().unwrap();
        let store = std::sync::Arc::new(SqliteHistoryStore::open(&test_config(&tmp)).await.unwrap());

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.append(&format!("concurrent {}", i), (i % 5) + 1).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 20);
        for pair in all.windows(2) {
            assert!(pair[0].id < pair[1].id);
        }
    }

    #[tokio::test]
    async fn test_review_stored_verbatim() {
        let tmp = TempDir::new().unwrap();
        let store = SqliteHistoryStore::open(&test_config(&tmp)).await.unwrap();
        let raw = "  THE Best!!! see http://x.com 😀  ";
        store.append(raw, 5).await.unwrap();
        assert_eq!(store.list_all().await.unwrap()[0].review, raw);
    }
}
