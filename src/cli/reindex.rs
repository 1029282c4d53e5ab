//! CLI `reindex` command: rebuild the full-text index from the archive.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use frontdesk::config::FrontdeskConfig;
use frontdesk::{archive, search};

pub fn reindex(config: &FrontdeskConfig) -> Result<()> {
    let Some(mut conn) = super::open_existing(config)? else {
        return Ok(());
    };

    let total = archive::browse::line_count(&conn)?;
    if total == 0 {
        println!("No archived lines to index.");
        return Ok(());
    }

    println!("Reindexing {total} lines...");

    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {pos}/{len} ({eta})")
            .context("invalid progress template")?
            .progress_chars("##-"),
    );

    let indexed = search::rebuild(&mut conn, || pb.inc(1)).context("reindex failed")?;
    pb.finish_and_clear();

    println!("Indexed {indexed} of {total} lines.");
    Ok(())
}
