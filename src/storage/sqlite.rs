//! SQLite storage implementation
//!
//! One connection behind a mutex. Every method takes `&self`, so the store can
//! be shared as `Arc<SqliteStorage>` between concurrent visit tasks.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{PersistenceGateway, ReportSource, StorageError, StorageResult};
use crate::storage::{format_timestamp, round_elapsed, PageRecord, ReportRow, RequestRecord};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const SUCCESS_STATUS: u16 = 200;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        // Another process may hold the write lock briefly
        conn.busy_timeout(Duration::from_secs(5))?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock cannot leave a half-applied statement
        // behind, so a poisoned guard is still usable.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Appends a request observation with an explicit creation time
    pub fn insert_request_at(
        &self,
        page_id: i64,
        status: u16,
        elapsed: Duration,
        at: &DateTime<Utc>,
    ) -> StorageResult<()> {
        self.conn().execute(
            "INSERT INTO requests (page_id, status, elapsed_time, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![page_id, status, round_elapsed(elapsed), format_timestamp(at)],
        )?;
        Ok(())
    }

    /// Gets a page by URL
    pub fn get_page_by_url(&self, url: &str) -> StorageResult<Option<PageRecord>> {
        let page = self
            .conn()
            .query_row(
                "SELECT id, url, created_at FROM pages WHERE url = ?1",
                params![url],
                |row| {
                    Ok(PageRecord {
                        id: row.get(0)?,
                        url: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(page)
    }

    /// Gets every request recorded for a page, oldest first
    pub fn requests_for_page(&self, page_id: i64) -> StorageResult<Vec<RequestRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, page_id, status, elapsed_time, created_at
             FROM requests WHERE page_id = ?1 ORDER BY id",
        )?;

        let requests = stmt
            .query_map(params![page_id], |row| {
                Ok(RequestRecord {
                    id: row.get(0)?,
                    page_id: row.get(1)?,
                    status: row.get(2)?,
                    elapsed_seconds: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(requests)
    }

    /// Gets total page count
    pub fn count_pages(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Gets total request count
    pub fn count_requests(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM requests", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Counts requests created at or after `since`
    pub fn count_requests_since(&self, since: &DateTime<Utc>) -> StorageResult<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM requests WHERE created_at >= ?1",
            params![format_timestamp(since)],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Counts requests whose page row does not exist
    pub fn count_dangling_requests(&self) -> StorageResult<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM requests r LEFT JOIN pages p ON p.id = r.page_id
             WHERE p.id IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn query_report(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> StorageResult<Vec<ReportRow>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql)?;

        let rows = stmt
            .query_map(params, |row| {
                Ok(ReportRow {
                    url: row.get(0)?,
                    status: row.get(1)?,
                    elapsed_seconds: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}

fn find_page_id(conn: &Connection, url: &str) -> StorageResult<Option<i64>> {
    let id = conn
        .query_row("SELECT id FROM pages WHERE url = ?1", params![url], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(id)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

impl PersistenceGateway for SqliteStorage {
    fn upsert_page(&self, url: &str) -> StorageResult<i64> {
        let conn = self.conn();

        if let Some(id) = find_page_id(&conn, url)? {
            return Ok(id);
        }

        let now = format_timestamp(&Utc::now());
        match conn.execute(
            "INSERT INTO pages (url, created_at) VALUES (?1, ?2)",
            params![url, now],
        ) {
            Ok(_) => Ok(conn.last_insert_rowid()),
            // Another connection inserted the same URL between our read and write
            Err(e) if is_unique_violation(&e) => {
                tracing::debug!("Lost page insert race for {}, re-reading", url);
                find_page_id(&conn, url)?.ok_or_else(|| StorageError::PageNotFound(url.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn insert_request(&self, page_id: i64, status: u16, elapsed: Duration) -> StorageResult<()> {
        self.insert_request_at(page_id, status, elapsed, &Utc::now())
    }
}

impl ReportSource for SqliteStorage {
    fn slow_requests(
        &self,
        since: &DateTime<Utc>,
        threshold_secs: f64,
        limit: u32,
    ) -> StorageResult<Vec<ReportRow>> {
        self.query_report(
            "SELECT p.url, r.status, r.elapsed_time, r.created_at
             FROM requests r JOIN pages p ON p.id = r.page_id
             WHERE r.created_at >= ?1 AND r.status = ?2 AND r.elapsed_time > ?3
             ORDER BY r.elapsed_time DESC, r.id ASC
             LIMIT ?4",
            params![format_timestamp(since), SUCCESS_STATUS, threshold_secs, limit],
        )
    }

    fn error_requests(&self, since: &DateTime<Utc>, limit: u32) -> StorageResult<Vec<ReportRow>> {
        self.query_report(
            "SELECT p.url, r.status, r.elapsed_time, r.created_at
             FROM requests r JOIN pages p ON p.id = r.page_id
             WHERE r.created_at >= ?1 AND r.status != ?2
             ORDER BY r.elapsed_time DESC, r.id ASC
             LIMIT ?3",
            params![format_timestamp(since), SUCCESS_STATUS, limit],
        )
    }
}
