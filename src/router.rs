//! Per-message entry point.
//!
//! Channel lines are archived and indexed synchronously; mention scanning and
//! `.url` handling run afterwards as independent tasks so a slow or failing
//! side effect never holds up the next line.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;

use crate::archive::{self, MessageRecord};
use crate::channel::{ChannelClient, InboundMessage};
use crate::db::{self, SharedDb};
use crate::error::ArchiveError;
use crate::links;
use crate::mentions;
use crate::nick::normalize_nick;
use crate::search;
use crate::sharing::Sharing;

/// Lines starting with this are neither archived nor scanned.
pub const OFF_THE_RECORD: &str = "otr:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    OffTheRecord,
    Channel,
    /// Addressed to the bot directly. Reserved for commands.
    Private,
}

pub fn route(message: &InboundMessage, channel: &str) -> Route {
    if message.text.starts_with(OFF_THE_RECORD) {
        Route::OffTheRecord
    } else if message.target.eq_ignore_ascii_case(channel) {
        Route::Channel
    } else {
        Route::Private
    }
}

/// Outcome of [`Router::handle`].
pub struct Handled {
    pub route: Route,
    /// Mention and link scans spawned for the line.
    pub side_effects: Vec<JoinHandle<()>>,
}

impl Handled {
    fn only(route: Route) -> Self {
        Self {
            route,
            side_effects: Vec::new(),
        }
    }

    /// Wait for every spawned side effect to finish.
    pub async fn settled(self) -> Route {
        for task in self.side_effects {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "side effect task failed");
            }
        }
        self.route
    }
}

pub struct Router {
    db: SharedDb,
    client: Arc<dyn ChannelClient>,
    channel: String,
    sharing: Arc<Sharing>,
}

impl Router {
    pub fn new(
        db: SharedDb,
        client: Arc<dyn ChannelClient>,
        channel: impl Into<String>,
        sharing: Arc<Sharing>,
    ) -> Self {
        Self {
            db,
            client,
            channel: channel.into(),
            sharing,
        }
    }

    /// Handle one inbound line.
    ///
    /// An error means the archive could not be written and the caller should
    /// stop.
    pub async fn handle(&self, message: InboundMessage) -> Result<Handled> {
        let route = route(&message, &self.channel);
        match route {
            Route::OffTheRecord => {
                tracing::debug!(nick = %message.nick, "off the record");
                return Ok(Handled::only(route));
            }
            Route::Private => {
                tracing::info!(nick = %message.nick, text = %message.text, "private message");
                return Ok(Handled::only(route));
            }
            Route::Channel => {}
        }

        let record = MessageRecord {
            nick: normalize_nick(&message.nick).to_string(),
            text: message.text.clone(),
            timestamp: message.at,
        };
        db::run_blocking(&self.db, move |conn| {
            match archive::append(conn, &record.nick, &record.text, record.timestamp) {
                Ok(_) => {}
                // the stored line and its index entry stay as they are
                Err(ArchiveError::AlreadyArchived(_)) => return Ok(()),
                Err(e) => return Err(e).context("failed to archive line"),
            }
            if let Err(e) = search::index_record(conn, &record) {
                tracing::warn!(key = %record.key(), error = %e, "failed to index line");
            }
            Ok(())
        })
        .await?;

        let message = Arc::new(message);
        let mention_scan = {
            let (db, client, message) = (self.db.clone(), self.client.clone(), message.clone());
            tokio::spawn(async move {
                if let Err(e) = mentions::scan(&db, client.as_ref(), &message).await {
                    tracing::error!(nick = %message.nick, error = %e, "mention scan failed");
                }
            })
        };
        let link_scan = {
            let (db, client, sharing) = (self.db.clone(), self.client.clone(), self.sharing.clone());
            tokio::spawn(async move {
                if let Err(e) = links::scan(&db, client.as_ref(), &sharing, &message).await {
                    tracing::error!(nick = %message.nick, error = %e, "link scan failed");
                }
            })
        };

        Ok(Handled {
            route,
            side_effects: vec![mention_scan, link_scan],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn message(target: &str, text: &str) -> InboundMessage {
        InboundMessage {
            nick: "carol".into(),
            target: target.into(),
            text: text.into(),
            at: DateTime::parse_from_rfc3339("2015-02-17T10:00:00Z").unwrap(),
        }
    }

    #[test]
    fn routing() {
        assert_eq!(route(&message("#frontdesk", "hello"), "#frontdesk"), Route::Channel);
        assert_eq!(route(&message("#FrontDesk", "hello"), "#frontdesk"), Route::Channel);
        assert_eq!(route(&message("frontdesk", "hello"), "#frontdesk"), Route::Private);
        assert_eq!(
            route(&message("#frontdesk", "otr: secret"), "#frontdesk"),
            Route::OffTheRecord
        );
        // prefix must be at the very start
        assert_eq!(route(&message("#frontdesk", " otr: x"), "#frontdesk"), Route::Channel);
    }
}
