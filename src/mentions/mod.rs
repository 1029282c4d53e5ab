//! Deferred delivery of mentions.
//!
//! Channel lines that mention an offline nick are queued for that nick and
//! the sender is told the message will be passed on. When presence tracking
//! sees the nick arrive, the queue is taken and replayed privately with
//! permalinks into the archive.

pub mod matcher;
pub mod queue;

use anyhow::Result;

use crate::channel::{ChannelClient, InboundMessage};
use crate::db::{self, SharedDb};
use crate::nick::normalize_nick;
use crate::presence;

pub use matcher::mentioned_nicks;
pub use queue::{enqueue, pending_for, take_pending, PendingMention};

/// Reply to a sender whose mention was queued.
pub fn acknowledgement(recipient: &str) -> String {
    format!(
        "{recipient} is not in the channel right now, but I'll deliver your message when they return"
    )
}

/// Queue `message` for every offline nick it mentions.
///
/// Returns how many mentions were queued. A mention that fails to queue is
/// not acknowledged; the remaining recipients are still attempted.
pub async fn scan(
    db: &SharedDb,
    client: &dyn ChannelClient,
    message: &InboundMessage,
) -> Result<usize> {
    let offline = db::run_blocking(db, |conn| presence::offline(conn)).await?;
    let recipients = mentioned_nicks(&message.text, &offline);

    let mut queued = 0;
    let mut failure = None;
    for recipient in recipients {
        let (sender, text, at) = (message.nick.clone(), message.text.clone(), message.at);
        let target = recipient.clone();
        let result = db::run_blocking(db, move |conn| {
            queue::enqueue(conn, &target, &sender, &text, at)
        })
        .await;

        match result {
            Ok(_) => {
                queued += 1;
                if let Err(e) = client.send_private_reply(&message.nick, &acknowledgement(&recipient)) {
                    tracing::warn!(sender = %message.nick, error = %e, "could not acknowledge mention");
                }
            }
            Err(e) => {
                tracing::error!(recipient = %recipient, error = %e, "failed to queue mention");
                failure = Some(e);
            }
        }
    }

    match failure {
        Some(e) if queued == 0 => Err(e),
        _ => Ok(queued),
    }
}

/// Deliver and clear everything pending for a returning nick.
///
/// `recipient` is the nick as seen in the roster; it is normalized for the
/// lookup and used as-is for delivery. The list is taken atomically before
/// anything is sent, so concurrent flushes deliver it at most once.
pub async fn flush(
    db: &SharedDb,
    client: &dyn ChannelClient,
    base_url: &str,
    recipient: &str,
) -> Result<usize> {
    let nick = normalize_nick(recipient).to_string();
    let pending = db::run_blocking(db, move |conn| queue::take_pending(conn, &nick)).await?;
    if pending.is_empty() {
        return Ok(0);
    }

    tracing::info!(recipient = %recipient, count = pending.len(), "delivering queued mentions");
    for line in delivery_lines(base_url, &pending) {
        if let Err(e) = client.send_private_reply(recipient, &line) {
            tracing::warn!(recipient = %recipient, error = %e, "mention delivery interrupted");
            break;
        }
    }
    Ok(pending.len())
}

/// Summary line, then sender/text and permalink for each mention, oldest first.
pub fn delivery_lines(base_url: &str, pending: &[PendingMention]) -> Vec<String> {
    let base_url = base_url.trim_end_matches('/');
    let mut lines = Vec::with_capacity(1 + pending.len() * 2);
    lines.push(format!("messages while you were out: {}", pending.len()));
    for mention in pending {
        lines.push(format!("from {}: {}", mention.nick, mention.text));
        lines.push(format!("<{base_url}{}>", mention.permalink()));
    }
    lines
}
