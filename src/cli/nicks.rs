use anyhow::Result;

use frontdesk::config::FrontdeskConfig;
use frontdesk::mentions::queue;
use frontdesk::presence;

/// Show every known nick, who is online, and pending mention counts.
pub fn nicks(config: &FrontdeskConfig) -> Result<()> {
    let Some(conn) = super::open_existing(config)? else {
        return Ok(());
    };

    let known = presence::known_nicks(&conn)?;
    let online = presence::online(&conn)?;
    let pending: std::collections::HashMap<String, usize> =
        queue::pending_counts(&conn)?.into_iter().collect();

    println!("Known Nicks");
    println!("{}", "=".repeat(40));
    if known.is_empty() {
        println!("  (none yet)");
    }
    for nick in &known {
        let status = if online.contains(&nick.nick) { "online" } else { "away" };
        let queued = pending.get(&nick.nick).copied().unwrap_or(0);
        println!(
            "  {:<16} {:<7} last seen {}  pending: {}",
            nick.nick, status, nick.last_seen, queued
        );
    }

    Ok(())
}
