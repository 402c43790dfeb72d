//! Storage traits and error types
//!
//! The walker only ever sees [`PersistenceGateway`]; reporting reads go
//! through [`ReportSource`]. Keeping them apart means the traversal code has
//! no way to issue arbitrary queries against the shared store.

use crate::storage::ReportRow;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Page not found: {0}")]
    PageNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Background storage task failed: {0}")]
    Task(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Write capability handed to the tree walker
///
/// Implementations must tolerate concurrent callers, including concurrent
/// `upsert_page` calls for the same URL.
pub trait PersistenceGateway: Send + Sync {
    /// Returns the page id for `url`, creating the page if it is new
    ///
    /// Concurrent callers with the same URL all observe the same id.
    fn upsert_page(&self, url: &str) -> StorageResult<i64>;

    /// Appends one request observation for `page_id`
    ///
    /// `elapsed` is stored in seconds rounded to the millisecond.
    fn insert_request(&self, page_id: i64, status: u16, elapsed: Duration) -> StorageResult<()>;
}

/// Read queries used to build the slow/error report
pub trait ReportSource {
    /// Successful (HTTP 200) requests slower than `threshold_secs`,
    /// created at or after `since`, slowest first
    fn slow_requests(
        &self,
        since: &DateTime<Utc>,
        threshold_secs: f64,
        limit: u32,
    ) -> StorageResult<Vec<ReportRow>>;

    /// Non-200 requests created at or after `since`, slowest first
    fn error_requests(&self, since: &DateTime<Utc>, limit: u32) -> StorageResult<Vec<ReportRow>>;
}
