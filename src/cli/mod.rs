pub mod doctor;
pub mod logs;
pub mod nicks;
pub mod reindex;
pub mod search;

use anyhow::{Context, Result};
use rusqlite::Connection;

use frontdesk::config::FrontdeskConfig;
use frontdesk::db;

/// Open the configured database for an offline command.
///
/// Commands that only read should not create a database as a side effect,
/// so a missing file is reported instead of initialized.
fn open_existing(config: &FrontdeskConfig) -> Result<Option<Connection>> {
    let db_path = config.resolved_db_path();
    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `frontdesk run` to start logging.");
        return Ok(None);
    }
    let conn = db::open_database(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    Ok(Some(conn))
}
