#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the site profitability toolchain.
//!
//! ```text
//! site_profit calculate --residential 45 --road 25 --open-space 30 \
//!     --width 800 --height 600 --scale 0.0536 \
//!     --building-width 3.8 --hours 12 --price 50000 --currency IDR
//! site_profit parse [FILE]
//! site_profit classify map.png --width 800 --height 600 --scale 0.0536
//! site_profit results list [--offset 0] [--limit 20]
//! site_profit results show|export|delete <id>
//! site_profit serve
//! ```
//!
//! Running with no subcommand lets the user pick a task interactively.

mod calculate;
mod classify;
mod report;
mod results;

use std::io::Read as _;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dialoguer::Select;
use site_profit_analysis::Calibration;

use crate::calculate::{BusinessArgs, SaveArgs, ScreenshotArgs};

#[derive(Parser)]
#[command(
    name = "site_profit",
    about = "Estimate site profitability from map screenshots"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline on a known land-use breakdown
    Calculate {
        /// Residential share of the area (percent)
        #[arg(long)]
        residential: f64,
        /// Road share of the area (percent)
        #[arg(long)]
        road: f64,
        /// Open-space share of the area (percent)
        #[arg(long)]
        open_space: f64,
        #[command(flatten)]
        screenshot: ScreenshotArgs,
        #[command(flatten)]
        business: BusinessArgs,
        #[command(flatten)]
        save: SaveArgs,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Parse classifier text into a land-use breakdown
    Parse {
        /// File containing the classifier answer (reads stdin if omitted)
        file: Option<PathBuf>,
    },
    /// Classify a screenshot with the configured vision provider
    Classify {
        /// Screenshot image (PNG, JPEG, WebP, or GIF)
        image: PathBuf,
        #[command(flatten)]
        screenshot: ScreenshotArgs,
        #[command(flatten)]
        business: calculate::OptionalBusinessArgs,
        #[command(flatten)]
        save: SaveArgs,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Browse saved analyses
    Results {
        #[command(subcommand)]
        command: results::ResultsCommand,
    },
    /// Start the HTTP server
    Serve,
}

/// Top-level task selection for interactive mode.
enum Task {
    Calculate,
    Classify,
    Results,
    Serve,
}

impl Task {
    const ALL: &[Self] = &[Self::Calculate, Self::Classify, Self::Results, Self::Serve];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Calculate => "Calculate from known percentages",
            Self::Classify => "Classify a screenshot",
            Self::Results => "List saved analyses",
            Self::Serve => "Start server",
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        return interactive().await;
    };

    let calibration = Calibration::from_env()?;

    match command {
        Commands::Calculate {
            residential,
            road,
            open_space,
            screenshot,
            business,
            save,
            json,
        } => {
            let breakdown =
                site_profit_analysis_models::LandUseBreakdown::new(residential, road, open_space);
            calculate::run(
                &calibration,
                breakdown,
                &screenshot.metadata(),
                business.parameters(),
                &save,
                json,
            )
            .await?;
        }
        Commands::Parse { file } => {
            let text = match file {
                Some(path) => std::fs::read_to_string(path)?,
                None => {
                    let mut text = String::new();
                    std::io::stdin().read_to_string(&mut text)?;
                    text
                }
            };
            let breakdown = site_profit_analysis::parser::parse_land_use(
                &text,
                calibration.normalization_tolerance,
            )?;
            println!("{}", serde_json::to_string_pretty(&breakdown)?);
        }
        Commands::Classify {
            image,
            screenshot,
            business,
            save,
            json,
        } => {
            classify::run(
                &calibration,
                &image,
                &screenshot.metadata(),
                business.parameters()?,
                &save,
                json,
            )
            .await?;
        }
        Commands::Results { command } => results::run(command).await?,
        Commands::Serve => serve().await?,
    }

    Ok(())
}

async fn interactive() -> Result<(), Box<dyn std::error::Error>> {
    println!("Site Profitability");
    println!();

    let labels: Vec<&str> = Task::ALL.iter().map(Task::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Task::ALL[idx] {
        Task::Calculate => calculate::interactive(&Calibration::from_env()?).await?,
        Task::Classify => classify::interactive(&Calibration::from_env()?).await?,
        Task::Results => {
            results::run(results::ResultsCommand::List {
                offset: 0,
                limit: site_profit_database_models::DEFAULT_PAGE_LIMIT,
            })
            .await?;
        }
        Task::Serve => serve().await?,
    }

    Ok(())
}

async fn serve() -> Result<(), Box<dyn std::error::Error>> {
    // The server uses actix-web's runtime, so we need to run it in a
    // blocking task to avoid nesting tokio runtimes.
    tokio::task::spawn_blocking(|| {
        actix_web::rt::System::new().block_on(site_profit_server::run_server())
    })
    .await??;
    Ok(())
}
