//! Channel logger bot: archives every line said in a chat channel, tracks who
//! is present, and delivers mentions to people who were away when they
//! return.
//!
//! frontdesk joins one IRC channel and keeps three kinds of state in a single
//! SQLite database:
//!
//! | Namespace | Contents | Lifecycle |
//! |-----------|----------|-----------|
//! | `lines` | Every channel line, partitioned by year/month/day | Append-only |
//! | `nicks` / `online` | Every nick ever seen, and the current roster | Upsert / overwrite |
//! | `mentions` | Messages waiting for an absent nick | Taken on arrival |
//! | `links` | Links shared with `.url` | Append-only |
//!
//! # Architecture
//!
//! - **Storage**: SQLite (WAL) shared as `Arc<Mutex<Connection>>`, every call on
//!   the blocking pool; FTS5 for full-text search of the archive
//! - **Transport**: a small IRC client behind the [`channel::ChannelClient`] trait,
//!   reconnecting with exponential backoff
//! - **Presence**: periodic roster polling; arrivals trigger mention delivery
//! - **Presentation**: read-only JSON API over the archive (axum)
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite initialization, schema, migrations, and health checks
//! - [`archive`]: Date-partitioned message archive
//! - [`presence`]: Roster reconciliation and the polling state machine
//! - [`mentions`]: Mention detection, queueing, and delivery
//! - [`router`]: Per-message dispatch
//! - [`bot`]: Runtime wiring

pub mod archive;
pub mod bot;
pub mod channel;
pub mod config;
pub mod db;
pub mod error;
pub mod links;
pub mod mentions;
pub mod nick;
pub mod presence;
pub mod router;
pub mod search;
pub mod server;
pub mod sharing;
