//! Database schema definitions
//!
//! Two tables: `pages` holds one row per distinct URL, `requests` holds one
//! row per observed fetch and references its page.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per distinct resource URL
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

-- Also enforces uniqueness on databases created without the column constraint
CREATE UNIQUE INDEX IF NOT EXISTS idx_pages_url ON pages(url);

-- One row per fetch that produced a status code
CREATE TABLE IF NOT EXISTS requests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL REFERENCES pages(id),
    status INTEGER NOT NULL,
    elapsed_time REAL NOT NULL CHECK (elapsed_time >= 0),
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_requests_created_at ON requests(created_at);
CREATE INDEX IF NOT EXISTS idx_requests_page ON requests(page_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
