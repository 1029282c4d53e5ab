//! CLI `doctor` command: run database diagnostics and print a health report.

use anyhow::{Context, Result};

use frontdesk::config::FrontdeskConfig;
use frontdesk::db;

/// Run database diagnostics and print a health report.
pub fn doctor(config: &FrontdeskConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `frontdesk run` to initialize.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let conn = db::open_database(&db_path).context("failed to open database (may be corrupt)")?;
    let report = db::check_database_health(&conn).context("failed to run health check")?;

    println!("frontdesk Health Report");
    println!("=======================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!();
    println!("Row counts:");
    println!("  Lines:           {}", report.line_count);
    println!("  Known nicks:     {}", report.nick_count);
    println!("  Pending for:     {} nick(s)", report.pending_recipients);
    println!("  Links:           {}", report.link_count);
    println!();
    println!("Channel:           {} on {}:{}", config.irc.channel, config.irc.server, config.irc.port);
    println!("Permalink base:    {}", config.site.base_url);
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery steps:");
        println!("  1. Stop the bot and restore from a backup: cp backup.db {}", db_path.display());
        println!("  2. Then rebuild the search index: frontdesk reindex");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
