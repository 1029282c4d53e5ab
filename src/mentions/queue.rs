//! Storage for pending mentions: one JSON list per recipient in the
//! `mentions` namespace. Appends and takes are read-modify-write
//! transactions, so two writers of the same recipient never lose an update
//! and two takers never both see the same list.

use anyhow::Result;
use chrono::{DateTime, Datelike, FixedOffset};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::archive::{DatePath, MessageKey};
use crate::nick::normalize_nick;

/// A message waiting for an offline recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMention {
    /// Normalized sender nick.
    pub nick: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub key: String,
    pub text: String,
    pub timestamp: DateTime<FixedOffset>,
}

impl PendingMention {
    pub fn new(sender: &str, text: &str, timestamp: DateTime<FixedOffset>) -> Self {
        Self {
            nick: normalize_nick(sender).to_string(),
            year: timestamp.year(),
            month: timestamp.month(),
            day: timestamp.day(),
            key: MessageKey::from_timestamp(&timestamp).into(),
            text: text.to_string(),
            timestamp,
        }
    }

    /// Archive path of the day the message was said on, anchored at its key.
    pub fn permalink(&self) -> String {
        format!(
            "/logs/{:04}/{:02}/{:02}/#{}",
            self.year, self.month, self.day, self.key
        )
    }

    pub fn date_path(&self) -> DatePath {
        DatePath::from_timestamp(&self.timestamp)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PendingList {
    mentions: Vec<PendingMention>,
}

/// Append a pending mention to `recipient`'s list.
pub fn enqueue(
    conn: &mut Connection,
    recipient: &str,
    sender: &str,
    text: &str,
    timestamp: DateTime<FixedOffset>,
) -> Result<PendingMention> {
    let recipient = normalize_nick(recipient);
    let mention = PendingMention::new(sender, text, timestamp);

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut list = read_list(&tx, recipient)?;
    list.mentions.push(mention.clone());
    let data = serde_json::to_string(&list)?;
    tx.execute(
        "INSERT OR REPLACE INTO mentions (nick, pending) VALUES (?1, ?2)",
        params![recipient, data],
    )?;
    tx.commit()?;

    tracing::info!(
        recipient = %recipient,
        sender = %mention.nick,
        queued = list.mentions.len(),
        "mention queued"
    );
    Ok(mention)
}

/// Remove and return everything pending for `recipient`, oldest first.
pub fn take_pending(conn: &mut Connection, recipient: &str) -> Result<Vec<PendingMention>> {
    let recipient = normalize_nick(recipient);

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let list = read_list(&tx, recipient)?;
    tx.execute("DELETE FROM mentions WHERE nick = ?1", params![recipient])?;
    tx.commit()?;

    Ok(list.mentions)
}

/// Read `recipient`'s pending list without clearing it.
pub fn pending_for(conn: &Connection, recipient: &str) -> Result<Vec<PendingMention>> {
    Ok(read_list(conn, normalize_nick(recipient))?.mentions)
}

/// Number of pending mentions per recipient, for operators.
pub fn pending_counts(conn: &Connection) -> Result<Vec<(String, usize)>> {
    let mut stmt = conn.prepare("SELECT nick FROM mentions ORDER BY nick")?;
    let nicks = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    nicks
        .into_iter()
        .map(|nick| {
            let count = read_list(conn, &nick)?.mentions.len();
            Ok((nick, count))
        })
        .collect()
}

/// Stored data that no longer decodes is treated as an empty list.
fn read_list(conn: &Connection, recipient: &str) -> Result<PendingList> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT pending FROM mentions WHERE nick = ?1",
            params![recipient],
            |row| row.get(0),
        )
        .optional()?;

    Ok(match raw {
        None => PendingList::default(),
        Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(recipient = %recipient, error = %e, "discarding undecodable mention list");
            PendingList::default()
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn ts(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn mention_permalink_points_at_archived_line() {
        let m = PendingMention::new("carol_", "alice: ping", ts("2015-02-17T10:00:00Z"));
        assert_eq!(m.nick, "carol");
        assert_eq!(m.permalink(), "/logs/2015/02/17/#2015-02-17T10:00:00Z");
        assert_eq!(m.date_path().to_string(), "/logs/2015/02/17/");
    }

    #[test]
    fn enqueue_appends_in_order() {
        let mut conn = db::open_memory_database().unwrap();
        enqueue(&mut conn, "bob", "carol", "bob: one", ts("2015-02-17T10:00:00Z")).unwrap();
        enqueue(&mut conn, "bob_", "dave", "bob: two", ts("2015-02-17T10:05:00Z")).unwrap();

        let pending = pending_for(&conn, "bob").unwrap();
        let texts: Vec<&str> = pending.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["bob: one", "bob: two"]);
    }

    #[test]
    fn take_clears_the_list() {
        let mut conn = db::open_memory_database().unwrap();
        enqueue(&mut conn, "bob", "carol", "bob: one", ts("2015-02-17T10:00:00Z")).unwrap();

        assert_eq!(take_pending(&mut conn, "bob").unwrap().len(), 1);
        assert!(take_pending(&mut conn, "bob").unwrap().is_empty());
        assert!(pending_counts(&conn).unwrap().is_empty());
    }

    #[test]
    fn corrupt_list_is_replaced_on_enqueue() {
        let mut conn = db::open_memory_database().unwrap();
        conn.execute(
            "INSERT INTO mentions (nick, pending) VALUES ('bob', 'not json')",
            [],
        )
        .unwrap();

        enqueue(&mut conn, "bob", "carol", "bob: hi", ts("2015-02-17T10:00:00Z")).unwrap();
        assert_eq!(pending_for(&conn, "bob").unwrap().len(), 1);
        assert_eq!(pending_counts(&conn).unwrap(), vec![("bob".to_string(), 1)]);
    }
}
