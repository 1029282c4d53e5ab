use anyhow::Result;

use frontdesk::config::FrontdeskConfig;
use frontdesk::{archive, search};

const CLI_SEARCH_RESULTS: usize = 20;

/// Run a full-text search over the archive from the terminal.
pub fn search(config: &FrontdeskConfig, query: &str) -> Result<()> {
    let Some(conn) = super::open_existing(config)? else {
        return Ok(());
    };

    let keys = search::search(&conn, query, CLI_SEARCH_RESULTS)?;
    let records = archive::messages_by_key(&conn, &keys)?;

    if records.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} result(s)\n", records.len());
    let base_url = config.site.base_url.trim_end_matches('/');

    for (i, record) in records.iter().enumerate() {
        let preview = if record.text.chars().count() > 120 {
            let head: String = record.text.chars().take(120).collect();
            format!("{head}...")
        } else {
            record.text.clone()
        };

        println!("  {}. <{}> {}", i + 1, record.nick, preview);
        println!("     {base_url}{}", record.permalink());
        println!();
    }

    Ok(())
}
