// src/ingest/types.rs
use serde::{Deserialize, Serialize};

use crate::error::SourceError;

/// One normalized post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    pub url: String,
    pub text: String,
    /// Milliseconds since the Unix epoch, UTC.
    pub date: i64,
    #[serde(default)]
    pub author: String,
}

/// Cached result set of one source plus the time it was produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Epoch milliseconds.
    pub update_time: i64,
    pub data: Vec<Record>,
}

impl Snapshot {
    pub fn new(update_time: i64, data: Vec<Record>) -> Self {
        Self { update_time, data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A remote origin of records. Each implementation knows one API or site.
#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    /// Fetch and assemble raw records in display order. Text is not yet
    /// normalized.
    async fn collect(&self) -> Result<Vec<Record>, SourceError>;
    fn name(&self) -> &str;
}

/// Current time as epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
