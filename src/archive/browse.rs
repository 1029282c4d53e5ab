//! Read paths over the `lines` namespace: calendar enumerations, day
//! listings, and key lookups for search hits.

use rusqlite::{params, Connection, OptionalExtension};

use super::types::{DatePath, MessageKey, MessageRecord};
use crate::error::ArchiveError;

/// Every year with at least one archived line, ascending.
pub fn years(conn: &Connection) -> Result<Vec<String>, ArchiveError> {
    labels(conn, "SELECT DISTINCT year FROM lines ORDER BY year", params![])
}

/// Months of `year` with at least one line, ascending. Empty if the year is absent.
pub fn months_in_year(conn: &Connection, year: &str) -> Result<Vec<String>, ArchiveError> {
    labels(
        conn,
        "SELECT DISTINCT month FROM lines WHERE year = ?1 ORDER BY month",
        params![year],
    )
}

/// Days of `year`/`month` with at least one line, ascending.
pub fn days_in_month(
    conn: &Connection,
    year: &str,
    month: &str,
) -> Result<Vec<String>, ArchiveError> {
    labels(
        conn,
        "SELECT DISTINCT day FROM lines WHERE year = ?1 AND month = ?2 ORDER BY day",
        params![year, month],
    )
}

/// All lines of one day in chronological order.
///
/// A day with no lines is an empty listing, not an error.
pub fn messages_on_day(
    conn: &Connection,
    year: &str,
    month: &str,
    day: &str,
) -> Result<Vec<MessageRecord>, ArchiveError> {
    match read_day(conn, year, month, day) {
        Err(ArchiveError::NotFound(path)) => {
            tracing::debug!(path = %path, "no lines for day");
            Ok(Vec::new())
        }
        other => other,
    }
}

/// Strict form of [`messages_on_day`]: `NotFound` when the day path is absent.
pub fn read_day(
    conn: &Connection,
    year: &str,
    month: &str,
    day: &str,
) -> Result<Vec<MessageRecord>, ArchiveError> {
    let mut stmt = conn.prepare(
        "SELECT key, record FROM lines WHERE year = ?1 AND month = ?2 AND day = ?3 \
         ORDER BY unix_secs, unix_nanos, key",
    )?;
    let rows = stmt
        .query_map(params![year, month, day], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    if rows.is_empty() {
        return Err(ArchiveError::NotFound(format!("/logs/{year}/{month}/{day}/")));
    }

    Ok(rows
        .into_iter()
        .filter_map(|(key, data)| decode(&key, &data))
        .collect())
}

/// Resolve message keys (e.g. search hits) back to records.
///
/// Output follows input order. Keys that do not parse, are missing, or whose
/// record cannot be decoded are skipped, so the result may be shorter.
pub fn messages_by_key<S: AsRef<str>>(
    conn: &Connection,
    keys: &[S],
) -> Result<Vec<MessageRecord>, ArchiveError> {
    let mut stmt = conn.prepare(
        "SELECT record FROM lines WHERE year = ?1 AND month = ?2 AND day = ?3 AND key = ?4",
    )?;

    let mut records = Vec::with_capacity(keys.len());
    for key in keys {
        let key = key.as_ref();
        let (key, timestamp) = match MessageKey::parse(key) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!(error = %e, "skipping unparseable key");
                continue;
            }
        };
        let path = DatePath::from_timestamp(&timestamp);
        let data: Option<String> = stmt
            .query_row(
                params![path.year, path.month, path.day, key.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(record) = data.and_then(|data| decode(key.as_str(), &data)) {
            records.push(record);
        }
    }
    Ok(records)
}

/// Number of archived lines, for health reports and reindexing.
pub fn line_count(conn: &Connection) -> Result<u64, ArchiveError> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM lines", [], |row| row.get(0))?;
    Ok(n as u64)
}

fn labels(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<String>, ArchiveError> {
    let mut stmt = conn.prepare(sql)?;
    let labels = stmt
        .query_map(params, |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(labels)
}

fn decode(key: &str, data: &str) -> Option<MessageRecord> {
    match serde_json::from_str(data) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "skipping undecodable line");
            None
        }
    }
}
