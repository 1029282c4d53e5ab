//! Presence tracking.
//!
//! Roster snapshots are reconciled against the previously stored snapshot:
//! nicks absent before and present now are arrivals. The `online` namespace
//! holds only the latest snapshot (overwritten, never merged) and `nicks`
//! remembers every nick ever seen with its last sighting.

pub mod poller;

use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::nick::normalize_nick;

pub use poller::{PollerState, RosterPoller};

/// Key of the single row in the `online` namespace.
pub const ROSTER_SENTINEL: &str = "now";

/// An entry of the known-nicks index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KnownNick {
    pub nick: String,
    pub last_seen: String,
}

/// Reconcile a fresh roster against the stored one.
///
/// Returns the arrivals: roster tokens whose normalized nick was not in the
/// previous snapshot, as they appeared in the roster, one per identity. The
/// nick index and the snapshot are updated in the same transaction; flushing
/// pending mentions for the arrivals is left to the caller so that no channel
/// traffic happens inside the transaction.
pub fn reconcile(
    conn: &mut Connection,
    roster_text: &str,
    observed_at: DateTime<FixedOffset>,
) -> Result<Vec<String>> {
    let tokens: Vec<&str> = roster_text.split(' ').filter(|t| !t.is_empty()).collect();
    let seen = observed_at.to_rfc3339();

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let previous = read_roster(&tx)?;

    let mut arrived_nicks = BTreeSet::new();
    let mut arrivals = Vec::new();
    for token in &tokens {
        let nick = normalize_nick(token);
        if nick.is_empty() {
            continue;
        }
        if !previous.contains(nick) && arrived_nicks.insert(nick.to_string()) {
            arrivals.push(token.to_string());
        }
        tx.execute(
            "INSERT INTO nicks (nick, last_seen) VALUES (?1, ?2) \
             ON CONFLICT(nick) DO UPDATE SET last_seen = excluded.last_seen",
            params![nick, seen],
        )?;
    }

    tx.execute(
        "INSERT OR REPLACE INTO online (sentinel, roster) VALUES (?1, ?2)",
        params![ROSTER_SENTINEL, tokens.join(" ")],
    )?;
    tx.commit()?;

    tracing::debug!(
        roster_size = tokens.len(),
        arrivals = arrivals.len(),
        "roster reconciled"
    );
    Ok(arrivals)
}

/// Normalized nicks of the current roster snapshot.
pub fn online(conn: &Connection) -> Result<BTreeSet<String>> {
    read_roster(conn)
}

/// Every nick ever observed, ascending.
pub fn known_nicks(conn: &Connection) -> Result<Vec<KnownNick>> {
    let mut stmt = conn.prepare("SELECT nick, last_seen FROM nicks ORDER BY nick")?;
    let nicks = stmt
        .query_map([], |row| {
            Ok(KnownNick {
                nick: row.get(0)?,
                last_seen: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(nicks)
}

/// Known nicks that are not in the current roster.
pub fn offline(conn: &Connection) -> Result<BTreeSet<String>> {
    let online = read_roster(conn)?;
    Ok(known_nicks(conn)?
        .into_iter()
        .map(|known| known.nick)
        .filter(|nick| !online.contains(nick))
        .collect())
}

fn read_roster(conn: &Connection) -> Result<BTreeSet<String>> {
    let roster: Option<String> = conn
        .query_row(
            "SELECT roster FROM online WHERE sentinel = ?1",
            params![ROSTER_SENTINEL],
            |row| row.get(0),
        )
        .optional()?;

    Ok(roster
        .unwrap_or_default()
        .split(' ')
        .map(normalize_nick)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect())
}
