//! Full-text search over archived lines (SQLite FTS5).
//!
//! The index only returns message keys; callers resolve them to records via
//! [`crate::archive::messages_by_key`]. The FTS rowid is the message instant
//! in nanoseconds, which makes re-indexing a line a keyed replace.

use anyhow::Result;
use rusqlite::{params, Connection};

use crate::archive::MessageRecord;

/// Add (or replace) one record in the index.
pub fn index_record(conn: &Connection, record: &MessageRecord) -> Result<()> {
    let Some(doc_id) = record.timestamp.timestamp_nanos_opt() else {
        tracing::warn!(key = %record.key(), "timestamp out of range, not indexed");
        return Ok(());
    };
    conn.execute("DELETE FROM lines_fts WHERE rowid = ?1", params![doc_id])?;
    conn.execute(
        "INSERT INTO lines_fts (rowid, text, nick, key) VALUES (?1, ?2, ?3, ?4)",
        params![doc_id, record.text, record.nick, record.key().as_str()],
    )?;
    Ok(())
}

/// Keys of the best matches for `query`, best first.
pub fn search(conn: &Connection, query: &str, limit: usize) -> Result<Vec<String>> {
    let escaped = escape_fts_query(query);
    if escaped.is_empty() {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare(
        "SELECT key FROM lines_fts WHERE lines_fts MATCH ?1 ORDER BY rank LIMIT ?2",
    )?;
    let keys = stmt
        .query_map(params![escaped, limit as i64], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(keys)
}

/// Drop the index and rebuild it from the archive.
///
/// `progress` is called once per line indexed. Undecodable lines are skipped.
pub fn rebuild(conn: &mut Connection, mut progress: impl FnMut()) -> Result<u64> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM lines_fts", [])?;

    let mut indexed = 0;
    {
        let mut stmt = tx.prepare("SELECT key, record FROM lines")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let key: String = row.get(0)?;
            let data: String = row.get(1)?;
            match serde_json::from_str::<MessageRecord>(&data) {
                Ok(record) => {
                    index_record(&tx, &record)?;
                    indexed += 1;
                }
                Err(e) => tracing::warn!(key = %key, error = %e, "skipping undecodable line"),
            }
            progress();
        }
    }

    tx.commit()?;
    tracing::info!(indexed, "search index rebuilt");
    Ok(indexed)
}

/// Escape a user query for FTS5 MATCH syntax.
///
/// Wraps each whitespace-delimited word in double quotes so FTS5 treats them
/// as plain terms (implicit AND) and never as operators.
fn escape_fts_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|word| format!("\"{}\"", word.replace('"', "")))
        .filter(|w| w != "\"\"")
        .collect::<Vec<_>>()
        .join(" ")
}
