use thiserror::Error;

/// Errors produced by the archive namespace.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// No messages exist under the requested year/month/day path.
    #[error("no messages under {0}")]
    NotFound(String),

    /// A message key that is not an RFC 3339 timestamp.
    #[error("invalid message key: {0}")]
    InvalidKey(String),

    /// A line with this key is already archived; the stored record is kept.
    #[error("line already archived: {0}")]
    AlreadyArchived(String),

    /// A record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The underlying store failed; the durable log may be compromised.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

/// Errors reported by a [`crate::channel::ChannelClient`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The client has not completed registration with the server yet.
    #[error("channel client is not connected")]
    NotConnected,

    /// The outbound queue was dropped (connection torn down).
    #[error("channel client outbound queue is closed")]
    Closed,
}
