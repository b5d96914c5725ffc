use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

mod calendar;
mod config;
mod db;
mod error;
mod models;
mod report;
mod risk;
mod tracker;

use calendar::Month;
use config::Config;
use db::ItemFilter;
use report::Panel;

#[derive(Parser)]
#[command(name = "followup-risk")]
#[command(about = "Follow-up risk tracker for leads and recruitment projects", long_about = None)]
struct Cli {
    /// Optional TOML file with panel thresholds and holidays
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed leads and projects
    Seed,
    /// Import leads and projects from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// List items that need attention, red first
    ActionRequired {
        #[arg(long, value_enum, default_value_t = Panel::All)]
        panel: Panel,
        #[arg(long)]
        owner: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Band every open item by days of silence
    Tracker {
        #[arg(long)]
        owner: Option<String>,
        /// Only items created in this month (YYYY-MM)
        #[arg(long)]
        month: Option<Month>,
        #[arg(long, default_value_t = 50)]
        limit: usize,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        owner: Option<String>,
        #[arg(long, default_value = "followup-report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    let now = Utc::now();

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let inserted = db::seed(&pool, now).await?;
            println!("Seed data inserted ({inserted} new rows).");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} items from {}.", csv.display());
        }
        Commands::ActionRequired {
            panel,
            owner,
            limit,
            format,
        } => {
            let filter = ItemFilter {
                owner: owner.as_deref(),
                created_in: None,
            };
            let items = db::fetch_items(&pool, filter).await?;
            let actions = report::action_required(&items, now, panel, &config);
            tracing::info!(fetched = items.len(), surfaced = actions.len(), ?panel, "classified");

            if format == OutputFormat::Json {
                let limited: Vec<_> = actions.iter().take(limit).collect();
                println!("{}", serde_json::to_string_pretty(&limited)?);
                return Ok(());
            }

            if actions.is_empty() {
                println!("Nothing needs attention.");
                return Ok(());
            }

            println!("Action required:");
            for entry in actions.iter().take(limit) {
                println!("- {}", report::format_action_line(entry, now));
            }
        }
        Commands::Tracker {
            owner,
            month,
            limit,
            format,
        } => {
            let filter = ItemFilter {
                owner: owner.as_deref(),
                created_in: month,
            };
            let items = db::fetch_items(&pool, filter).await?;
            let banded = tracker::build_tracker(&items, now, &config.tracker);
            tracing::info!(
                fetched = items.len(),
                banded = banded.len(),
                month = ?month.map(|m| m.to_string()),
                "built tracker"
            );

            if format == OutputFormat::Json {
                let limited: Vec<_> = banded.iter().take(limit).collect();
                println!("{}", serde_json::to_string_pretty(&limited)?);
                return Ok(());
            }

            if banded.is_empty() {
                println!("No open leads or projects.");
                return Ok(());
            }

            println!("Follow-up tracker (oldest activity first):");
            for entry in banded.iter().take(limit) {
                println!("- {}", report::format_tracker_line(entry));
            }
        }
        Commands::Report { owner, out } => {
            let filter = ItemFilter {
                owner: owner.as_deref(),
                created_in: None,
            };
            let items = db::fetch_items(&pool, filter).await?;
            let report = report::build_report(now, &items, &config);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
