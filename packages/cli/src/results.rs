//! `results` subcommands for browsing the results database.

use clap::Subcommand;
use site_profit_database_models::{DEFAULT_PAGE_LIMIT, PageRequest};

use crate::report;

#[derive(Subcommand)]
pub enum ResultsCommand {
    /// List saved analyses, newest first
    List {
        /// Number of analyses to skip
        #[arg(long, default_value = "0")]
        offset: u32,
        /// Maximum number of analyses to show
        #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT)]
        limit: u32,
    },
    /// Show a saved analysis
    Show {
        /// Analysis ID
        id: String,
    },
    /// Export a saved analysis as JSON
    Export {
        /// Analysis ID
        id: String,
    },
    /// Delete a saved analysis
    Delete {
        /// Analysis ID
        id: String,
    },
}

/// Runs a `results` subcommand against the database at `RESULTS_DB_PATH`.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or queried, or the
/// analysis does not exist.
pub async fn run(command: ResultsCommand) -> Result<(), Box<dyn std::error::Error>> {
    let db = site_profit_database::open_db(&site_profit_database::db_path_from_env()).await?;

    match command {
        ResultsCommand::List { offset, limit } => {
            let page = site_profit_database::list_results(
                db.as_ref(),
                PageRequest::new(Some(offset), Some(limit))?,
            )
            .await?;

            if page.results.is_empty() {
                println!("No saved analyses found.");
                return Ok(());
            }

            println!(
                "{:<38} {:<17} {:>22} TITLE",
                "ID", "SAVED", "DAILY REVENUE"
            );
            println!("{}", "-".repeat(100));

            for result in &page.results {
                let title = result
                    .title
                    .as_deref()
                    .or(result.location_data.address.as_deref())
                    .unwrap_or("(no title)");
                let display_title = if title.chars().count() > 30 {
                    format!("{}...", title.chars().take(27).collect::<String>())
                } else {
                    title.to_string()
                };
                let revenue = format!(
                    "{} {}",
                    result.business_parameters.currency,
                    report::group_thousands(result.business_metrics.daily_revenue.get())
                );

                println!(
                    "{:<38} {:<17} {:>22} {}",
                    result.id,
                    report::format_timestamp(result.timestamp),
                    revenue,
                    display_title
                );
            }

            println!(
                "\n{} of {} analyses{}",
                page.results.len(),
                page.total,
                if page.has_more {
                    format!(" (next: --offset {})", offset + limit)
                } else {
                    String::new()
                }
            );
        }
        ResultsCommand::Show { id } => {
            let result = site_profit_database::get_result(db.as_ref(), &id)
                .await?
                .ok_or_else(|| format!("Analysis not found: {id}"))?;
            print!("{}", report::format_result(&result));
        }
        ResultsCommand::Export { id } => {
            let result = site_profit_database::get_result(db.as_ref(), &id)
                .await?
                .ok_or_else(|| format!("Analysis not found: {id}"))?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        ResultsCommand::Delete { id } => {
            if site_profit_database::delete_result(db.as_ref(), &id).await? {
                println!("Deleted analysis: {id}");
            } else {
                return Err(format!("Analysis not found: {id}").into());
            }
        }
    }

    Ok(())
}
