mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use frontdesk::config::FrontdeskConfig;

#[derive(Parser)]
#[command(name = "frontdesk", version, about = "Channel logger bot with deferred mention delivery")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Connect to the channel and start logging
    Run,
    /// Browse the archive: years, months of a year, days of a month, or one day's lines
    Logs {
        year: Option<String>,
        month: Option<String>,
        day: Option<String>,
    },
    /// Full-text search over archived lines
    Search { query: String },
    /// List known nicks with presence and pending mention counts
    Nicks,
    /// Rebuild the search index from the archive
    Reindex,
    /// Run database diagnostics
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = FrontdeskConfig::load()?;

    // Log to stderr so command output on stdout stays clean.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Run => frontdesk::bot::run(config).await?,
        Command::Logs { year, month, day } => {
            cli::logs::logs(&config, year.as_deref(), month.as_deref(), day.as_deref())?
        }
        Command::Search { query } => cli::search::search(&config, &query)?,
        Command::Nicks => cli::nicks::nicks(&config)?,
        Command::Reindex => cli::reindex::reindex(&config)?,
        Command::Doctor => cli::doctor::doctor(&config)?,
    }

    Ok(())
}
