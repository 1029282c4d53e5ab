//! The append-only, date-partitioned message archive.
//!
//! Every channel line lands in the `lines` namespace under
//! `year → month → day → key`. Keys are RFC 3339 timestamps, so a record can
//! be relocated from its key alone. Listings walk one level of the hierarchy
//! at a time; a level exists exactly when a line exists beneath it.

pub mod browse;
pub mod store;
pub mod types;

pub use browse::{days_in_month, messages_by_key, messages_on_day, months_in_year, years};
pub use store::append;
pub use types::{DatePath, MessageKey, MessageRecord, MessageView};
