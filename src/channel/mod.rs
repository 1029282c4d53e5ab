//! The boundary with the chat transport.
//!
//! The engine only needs three capabilities from a transport, captured by
//! [`ChannelClient`]. Inbound traffic arrives as [`ChannelEvent`]s on an
//! mpsc queue consumed by the bot runtime.

pub mod connection;
pub mod irc;

use chrono::{DateTime, FixedOffset};

use crate::error::ChannelError;

/// Outbound capabilities the engine consumes from the transport.
pub trait ChannelClient: Send + Sync {
    /// Send `text` privately to `recipient`.
    fn send_private_reply(&self, recipient: &str, text: &str) -> Result<(), ChannelError>;

    /// Ask the server for the channel roster. Fire-and-forget: the reply
    /// arrives later as [`ChannelEvent::Roster`].
    fn request_roster(&self) -> Result<(), ChannelError>;

    fn is_connected(&self) -> bool;
}

/// A chat line as received from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Sender nick, un-normalized.
    pub nick: String,
    /// The channel name, or the bot's own nick for private messages.
    pub target: String,
    pub text: String,
    pub at: DateTime<FixedOffset>,
}

/// Events delivered from the transport to the bot runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Connected,
    Disconnected,
    Message(InboundMessage),
    /// A complete roster: space-separated nicks with membership prefixes removed.
    Roster {
        text: String,
        at: DateTime<FixedOffset>,
    },
}
