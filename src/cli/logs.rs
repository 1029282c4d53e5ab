//! CLI `logs` command: browse the archive by year, month and day.

use anyhow::Result;

use frontdesk::archive;
use frontdesk::config::FrontdeskConfig;

pub fn logs(
    config: &FrontdeskConfig,
    year: Option<&str>,
    month: Option<&str>,
    day: Option<&str>,
) -> Result<()> {
    let Some(conn) = super::open_existing(config)? else {
        return Ok(());
    };

    match (year, month, day) {
        (Some(year), Some(month), Some(day)) => {
            let records = archive::messages_on_day(&conn, year, month, day)?;
            if records.is_empty() {
                println!("No lines on {year}-{month}-{day}.");
            }
            for record in &records {
                println!("[{}] <{}> {}", record.nice_time(), record.nick, record.text);
            }
        }
        (Some(year), Some(month), None) => {
            print_labels(&format!("Days in {year}-{month}"), &archive::days_in_month(&conn, year, month)?);
        }
        (Some(year), None, _) => {
            print_labels(&format!("Months in {year}"), &archive::months_in_year(&conn, year)?);
        }
        (None, _, _) => {
            print_labels("Years", &archive::years(&conn)?);
        }
    }

    Ok(())
}

fn print_labels(heading: &str, labels: &[String]) {
    if labels.is_empty() {
        println!("{heading}: none");
        return;
    }
    println!("{heading}:");
    for label in labels {
        println!("  {label}");
    }
}
