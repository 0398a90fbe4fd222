//! Core data types shared by the prediction path, the history store, and
//! the HTTP layer.

use serde::{Deserialize, Serialize};

/// The result of running one review through the prediction pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prediction {
    /// Rating after the label mapping has been applied.
    pub rating: i64,
    /// Raw label emitted by the classifier.
    pub label: i64,
    /// The text the encoder actually saw.
    pub normalized: String,
}

/// A persisted `(review, rating, timestamp)` entry.
///
/// `review` is stored exactly as submitted, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: i64,
    pub review: String,
    pub rating: i64,
    /// ISO-8601 UTC timestamp assigned by the store.
    pub timestamp: String,
}

/// Identity assigned to a record by [`HistoryStore::append`](crate::history::HistoryStore::append).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedRecord {
    pub id: i64,
    pub timestamp: String,
}

/// Format the current UTC time the way history timestamps are stored.
pub fn utc_timestamp_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}
