#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, FixedOffset};
use frontdesk::channel::{ChannelClient, InboundMessage};
use frontdesk::db::{self, SharedDb};
use frontdesk::error::ChannelError;
use frontdesk::presence;
use rusqlite::Connection;

pub const CHANNEL: &str = "#frontdesk";

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::schema::init_schema(&conn).unwrap();
    db::migrations::run_migrations(&mut conn).unwrap();
    conn
}

pub fn shared_db() -> SharedDb {
    db::shared(test_db())
}

pub fn ts(s: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(s).unwrap()
}

pub fn channel_message(nick: &str, text: &str, at: &str) -> InboundMessage {
    InboundMessage {
        nick: nick.to_string(),
        target: CHANNEL.to_string(),
        text: text.to_string(),
        at: ts(at),
    }
}

/// Apply a roster snapshot and return the arrivals.
pub async fn observe_roster(db: &SharedDb, roster: &str, at: &str) -> Vec<String> {
    let (roster, at) = (roster.to_string(), ts(at));
    db::run_blocking(db, move |conn| presence::reconcile(conn, &roster, at))
        .await
        .unwrap()
}

/// Channel client that records every private reply.
#[derive(Default)]
pub struct RecordingClient {
    pub sent: Mutex<Vec<(String, String)>>,
    pub roster_requests: AtomicUsize,
    pub disconnected: AtomicBool,
}

impl RecordingClient {
    pub fn sent_to(&self, recipient: &str) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| to == recipient)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn total_sent(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl ChannelClient for RecordingClient {
    fn send_private_reply(&self, recipient: &str, text: &str) -> Result<(), ChannelError> {
        if !self.is_connected() {
            return Err(ChannelError::NotConnected);
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), text.to_string()));
        Ok(())
    }

    fn request_roster(&self) -> Result<(), ChannelError> {
        if !self.is_connected() {
            return Err(ChannelError::NotConnected);
        }
        self.roster_requests.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.disconnected.load(Ordering::SeqCst)
    }
}
