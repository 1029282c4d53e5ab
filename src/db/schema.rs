//! SQL DDL for the frontdesk namespaces.
//!
//! One table per top-level namespace: `lines` (year/month/day → message
//! records), `nicks` (nick → last seen), `online` (sentinel → roster),
//! `mentions` (nick → pending list), `links`, plus `schema_meta`. All DDL uses
//! `IF NOT EXISTS` for idempotent initialization.

use rusqlite::Connection;

/// All schema DDL statements for the core namespaces.
const SCHEMA_SQL: &str = r#"
-- Archived channel lines, partitioned by calendar date
CREATE TABLE IF NOT EXISTS lines (
    year TEXT NOT NULL,
    month TEXT NOT NULL,
    day TEXT NOT NULL,
    key TEXT NOT NULL,
    unix_secs INTEGER NOT NULL,
    unix_nanos INTEGER NOT NULL,
    record TEXT NOT NULL,
    PRIMARY KEY (year, month, day, key)
);

CREATE INDEX IF NOT EXISTS idx_lines_chrono ON lines(year, month, day, unix_secs, unix_nanos);

-- Every nick ever observed in a roster
CREATE TABLE IF NOT EXISTS nicks (
    nick TEXT PRIMARY KEY,
    last_seen TEXT NOT NULL
);

-- Current roster, a single row under a fixed sentinel key
CREATE TABLE IF NOT EXISTS online (
    sentinel TEXT PRIMARY KEY,
    roster TEXT NOT NULL
);

-- Pending mentions, one JSON list per recipient
CREATE TABLE IF NOT EXISTS mentions (
    nick TEXT PRIMARY KEY,
    pending TEXT NOT NULL
);

-- Links shared with the .url directive
CREATE TABLE IF NOT EXISTS links (
    key TEXT PRIMARY KEY,
    record TEXT NOT NULL
);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// The namespaces that must exist before any write.
pub const NAMESPACES: [&str; 5] = ["lines", "nicks", "online", "mentions", "links"];

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
