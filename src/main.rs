use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};

use city_dashboard::report::{ReportPeriod, ReportRequest};
use city_dashboard::{logging, CityDataStore, StoreConfig};

const SUGGESTION_GRACE: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(name = "city-dashboard")]
#[command(about = "City problem feed statistics, warnings and reports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a JSON feed and list the warnings it raises
    Import {
        #[arg(long)]
        json: PathBuf,
    },
    /// Print statistics and heatmap points for a feed
    Stats {
        #[arg(long)]
        json: PathBuf,
    },
    /// Generate a markdown operations report
    Report {
        #[arg(long)]
        json: PathBuf,
        /// Anchor date, defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, default_value = "daily")]
        period: ReportPeriod,
        /// An area name, or "all"
        #[arg(long, default_value = "all")]
        scope: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Ask the assistant a question
    Chat {
        #[arg(long)]
        json: Option<PathBuf>,
        message: String,
    },
    /// Run the live feed simulation for a number of ticks
    Simulate {
        #[arg(long)]
        json: PathBuf,
        #[arg(long, default_value_t = 3)]
        ticks: u32,
    },
}

async fn load_store(config: StoreConfig, json: &Path) -> anyhow::Result<CityDataStore> {
    let raw = std::fs::read_to_string(json)
        .with_context(|| format!("failed to read {}", json.display()))?;
    let store = CityDataStore::new(config);
    store
        .import_reports(&raw)
        .await
        .with_context(|| format!("failed to import {}", json.display()))?;
    Ok(store)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(err) = logging::init("info") {
        eprintln!("logging unavailable: {err}");
    }

    let cli = Cli::parse();
    let config = StoreConfig::from_env().context("invalid CITY_DASHBOARD_* configuration")?;

    match cli.command {
        Commands::Import { json } => {
            let store = load_store(config, &json).await?;
            store.stop_simulation().await;
            let warnings = store.warnings().await;
            println!(
                "Imported {} reports, {} warnings.",
                store.pagination().await.total,
                warnings.len()
            );
            for warning in warnings.iter() {
                println!("- {} (problem {})", warning.message, warning.problem_id);
            }
        }
        Commands::Stats { json } => {
            let store = load_store(config, &json).await?;
            store.stop_simulation().await;
            let statistics = store.statistics().await;
            let heatmap = store.heatmap().await;
            println!("{}", serde_json::to_string_pretty(&statistics)?);
            println!("{}", serde_json::to_string_pretty(&heatmap)?);
        }
        Commands::Report {
            json,
            date,
            period,
            scope,
            out,
        } => {
            let store = load_store(config, &json).await?;
            store.stop_simulation().await;
            let request = ReportRequest {
                date: date.unwrap_or_else(|| Local::now().date_naive()),
                period,
                scope: scope.parse()?,
            };
            let report = store.build_report(&request).await;
            match out {
                Some(path) => {
                    std::fs::write(&path, report)?;
                    println!("Report written to {}.", path.display());
                }
                None => println!("{report}"),
            }
        }
        Commands::Chat { json, message } => {
            let store = match json {
                Some(json) => load_store(config, &json).await?,
                None => CityDataStore::new(config),
            };
            store.stop_simulation().await;
            match store.send_message(&message).await {
                Some(reply) => println!("{reply}"),
                None => println!("Nothing to send."),
            }
        }
        Commands::Simulate { json, ticks } => {
            let store = load_store(config, &json).await?;
            let interval = store.config().tick_interval;
            for _ in 0..ticks {
                tokio::time::sleep(interval).await;
            }
            store.shutdown().await;
            // suggestions for the last tick are still in flight after the stop
            tokio::time::sleep(store.config().assistant_latency + SUGGESTION_GRACE).await;

            println!("Latest reports:");
            for report in store.live_list().await.iter().take(ticks as usize) {
                println!(
                    "- [{}] {} {} ({:?})",
                    report.created_at.as_deref().unwrap_or("-"),
                    report.area_label(),
                    report.sub_type_label(),
                    report.priority
                );
            }
            for warning in store.warnings().await.iter() {
                println!(
                    "! {} -> {}",
                    warning.message,
                    warning.ai_suggestion.as_deref().unwrap_or("(no suggestion)")
                );
            }
        }
    }

    Ok(())
}
