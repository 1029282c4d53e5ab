//! Forward-only schema migration framework.
//!
//! Tracks the schema version in `schema_meta` and runs sequential migrations
//! to bring the database up to [`CURRENT_SCHEMA_VERSION`].

use chrono::DateTime;
use rusqlite::{params, Connection};

/// The schema version that the current binary expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 3;

/// Get the current schema version from the database.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'schema_version'",
        [],
        |row| {
            let val: String = row.get(0)?;
            Ok(val.parse::<u32>().unwrap_or(0))
        },
    )
}

/// Update the stored schema version.
fn update_schema_version(conn: &Connection, version: u32) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE schema_meta SET value = ?1 WHERE key = 'schema_version'",
        [version.to_string()],
    )?;
    Ok(())
}

/// Run any pending forward-only migrations. Each migration runs in a transaction.
pub fn run_migrations(conn: &mut Connection) -> rusqlite::Result<()> {
    let mut version = get_schema_version(conn)?;
    tracing::debug!(schema_version = version, target = CURRENT_SCHEMA_VERSION, "checking migrations");

    while version < CURRENT_SCHEMA_VERSION {
        let next = version + 1;
        tracing::info!(from = version, to = next, "running migration");

        let tx = conn.transaction()?;
        match next {
            2 => migrate_v1_to_v2(&tx)?,
            3 => migrate_v2_to_v3(&tx)?,
            _ => {
                tracing::error!(version = next, "unknown migration target");
                break;
            }
        }
        update_schema_version(&tx, next)?;
        tx.commit()?;

        version = next;
    }

    Ok(())
}

/// Migration v1 → v2: add the FTS5 search index and backfill it from `lines`.
///
/// The FTS rowid is the message instant in nanoseconds so a line can be
/// replaced without scanning the index.
fn migrate_v1_to_v2(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
CREATE VIRTUAL TABLE IF NOT EXISTS lines_fts USING fts5(
    text,
    nick,
    key UNINDEXED
);

INSERT OR IGNORE INTO lines_fts (rowid, text, nick, key)
SELECT unix_secs * 1000000000 + unix_nanos,
       json_extract(record, '$.text'),
       json_extract(record, '$.nick'),
       key
FROM lines;
"#,
    )?;
    Ok(())
}

/// Migration v2 → v3: give `links` the same chronological columns as `lines`
/// and fill them from each saved record's timestamp.
fn migrate_v2_to_v3(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
ALTER TABLE links ADD COLUMN unix_secs INTEGER NOT NULL DEFAULT 0;
ALTER TABLE links ADD COLUMN unix_nanos INTEGER NOT NULL DEFAULT 0;
CREATE INDEX IF NOT EXISTS idx_links_chrono ON links(unix_secs, unix_nanos);
"#,
    )?;

    let saved: Vec<(String, Option<String>)> = conn
        .prepare("SELECT key, json_extract(record, '$.timestamp') FROM links")?
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<_, _>>()?;

    for (key, timestamp) in saved {
        let Some(at) = timestamp.and_then(|t| DateTime::parse_from_rfc3339(&t).ok()) else {
            tracing::warn!(key = %key, "link without a readable timestamp sorts last");
            continue;
        };
        conn.execute(
            "UPDATE links SET unix_secs = ?1, unix_nanos = ?2 WHERE key = ?3",
            params![at.timestamp(), at.timestamp_subsec_nanos(), key],
        )?;
    }
    Ok(())
}
