//! Write path for the `lines` namespace.

use chrono::{DateTime, FixedOffset};
use rusqlite::{params, Connection};

use super::types::{DatePath, MessageKey, MessageRecord};
use crate::error::ArchiveError;
use crate::nick::normalize_nick;

/// Archive one channel line under its year/month/day path.
///
/// The nick is normalized before storage. Day paths come into existence with
/// their first row, so there is no separate "create namespace" step.
///
/// Archived lines are never rewritten: a second line with the same key fails
/// with [`ArchiveError::AlreadyArchived`] and the first record stays.
pub fn append(
    conn: &mut Connection,
    nick: &str,
    text: &str,
    timestamp: DateTime<FixedOffset>,
) -> Result<MessageKey, ArchiveError> {
    let record = MessageRecord {
        nick: normalize_nick(nick).to_string(),
        text: text.to_string(),
        timestamp,
    };
    let data = serde_json::to_string(&record)?;
    let key = record.key();
    let path = record.date_path();

    let tx = conn.transaction()?;
    if !insert_line(&tx, &path, &key, &record, &data)? {
        tracing::warn!(key = %key, nick = %record.nick, "line with this key already archived");
        return Err(ArchiveError::AlreadyArchived(key.to_string()));
    }
    tx.commit()?;

    tracing::debug!(key = %key, nick = %record.nick, "line archived");
    Ok(key)
}

fn insert_line(
    conn: &Connection,
    path: &DatePath,
    key: &MessageKey,
    record: &MessageRecord,
    data: &str,
) -> rusqlite::Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO lines (year, month, day, key, unix_secs, unix_nanos, record) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            path.year,
            path.month,
            path.day,
            key.as_str(),
            record.timestamp.timestamp(),
            record.timestamp.timestamp_subsec_nanos(),
            data,
        ],
    )?;
    Ok(inserted == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn ts(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn append_places_line_under_its_day() {
        let mut conn = db::open_memory_database().unwrap();
        let key = append(&mut conn, "carol", "hello", ts("2015-02-17T10:00:00Z")).unwrap();
        assert_eq!(key.as_str(), "2015-02-17T10:00:00Z");

        let (year, month, day): (String, String, String) = conn
            .query_row(
                "SELECT year, month, day FROM lines WHERE key = ?1",
                params![key.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!((year.as_str(), month.as_str(), day.as_str()), ("2015", "02", "17"));
    }

    #[test]
    fn append_normalizes_nick() {
        let mut conn = db::open_memory_database().unwrap();
        append(&mut conn, "carol__", "hi", ts("2015-02-17T10:00:00Z")).unwrap();

        let record: String = conn
            .query_row("SELECT record FROM lines", [], |row| row.get(0))
            .unwrap();
        let record: MessageRecord = serde_json::from_str(&record).unwrap();
        assert_eq!(record.nick, "carol");
    }

    #[test]
    fn archived_line_is_never_overwritten() {
        let mut conn = db::open_memory_database().unwrap();
        let at = ts("2015-02-17T10:00:00Z");
        append(&mut conn, "carol", "first", at).unwrap();

        let second = append(&mut conn, "dave", "second", at);
        assert!(matches!(second, Err(ArchiveError::AlreadyArchived(key)) if key == "2015-02-17T10:00:00Z"));

        let rows: Vec<String> = conn
            .prepare("SELECT record FROM lines")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(rows.len(), 1);
        let record: MessageRecord = serde_json::from_str(&rows[0]).unwrap();
        assert_eq!((record.nick.as_str(), record.text.as_str()), ("carol", "first"));
    }
}
