//! Storage module for persisting fetch observations
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Race-safe page upserts keyed on URL
//! - Appending request timing/status records
//! - Report queries over a time window

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{PersistenceGateway, ReportSource, StorageError, StorageResult};

use chrono::{DateTime, SecondsFormat, Utc};
use std::path::Path;
use std::time::Duration;

/// Opens (creating if necessary) the SQLite store at `path`
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Represents a page (resource identity) in the database
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    pub id: i64,
    pub url: String,
    pub created_at: String,
}

/// Represents one persisted fetch observation
#[derive(Debug, Clone, PartialEq)]
pub struct RequestRecord {
    pub id: i64,
    pub page_id: i64,
    pub status: u16,
    pub elapsed_seconds: f64,
    pub created_at: String,
}

/// A request joined with its page URL, as returned by report queries
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub url: String,
    pub status: u16,
    pub elapsed_seconds: f64,
    pub created_at: String,
}

/// Converts a duration to seconds rounded to millisecond precision
///
/// Halves round away from zero, so 0.5005 s becomes 0.501 s. Rounding is
/// done on whole nanoseconds before converting to float.
pub fn round_elapsed(elapsed: Duration) -> f64 {
    let millis = (elapsed.as_nanos() + 500_000) / 1_000_000;
    millis as f64 / 1000.0
}

/// Formats a timestamp the way it is stored in the database
///
/// Fixed microsecond precision and a `Z` suffix keep lexical order equal to
/// chronological order, which the `created_at >= ?` filters rely on.
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}
