mod config;
mod dates;
mod extract;
mod fetch;
mod filter;
mod models;
mod notify;
mod runner;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use config::ConfigStore;
use extract::Registry;
use fetch::HttpClient;
use filter::TitleFilter;
use models::CompanyOutcome;
use notify::Notifier;
use runner::Runner;

#[derive(Parser)]
#[command(name = "jobwatch")]
#[command(about = "Career-page watcher - poll employer job boards and notify about new matches")]
struct Cli {
    /// Directory holding the CSV configuration tables
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every enabled company and notify about new jobs
    Run {
        /// Print notifications instead of posting them, leave state untouched
        #[arg(long)]
        dry_run: bool,
    },

    /// Probe one company without touching known-job state or webhooks
    Check {
        /// Company name as configured
        company: String,

        /// Search only this keyword instead of the configured list
        #[arg(short, long)]
        keyword: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let data_dir = cli.data_dir.unwrap_or_else(ConfigStore::default_dir);

    match cli.command {
        Commands::Run { dry_run } => {
            let runner = Runner::new(
                ConfigStore::new(data_dir),
                Registry::builtin(),
                HttpClient::new()?,
                TitleFilter::default(),
                Notifier::from_env(dry_run)?,
                dry_run,
            );
            let stats = runner.run()?;
            println!(
                "Checked {} companies ({} skipped, {} failed), {} new jobs notified.",
                stats.checked, stats.skipped, stats.failed, stats.notified
            );
            if dry_run {
                println!("(Dry run - no notifications were delivered, no state was written)");
            }
        }

        Commands::Check { company, keyword } => {
            let store = ConfigStore::new(data_dir);
            let mut company_config = store
                .load_companies()?
                .into_iter()
                .find(|c| c.name == company)
                .ok_or_else(|| anyhow!("Company '{}' is not configured", company))?;
            if let Some(keyword) = keyword {
                company_config.keywords = vec![keyword];
            }
            let registry = Registry::builtin();
            let client = HttpClient::new()?;
            let filter = TitleFilter::default();
            let today = chrono::Local::now().date_naive();
            let outcome =
                extract::check_company(&registry, &company_config, &client, &filter, today);
            if let CompanyOutcome::Failed { reason, .. } = &outcome {
                eprintln!("Check failed: {reason}");
            }
            let jobs = outcome.records();
            if jobs.is_empty() {
                println!("No matching jobs found.");
            } else {
                println!(
                    "{:<14} {:<40} {:<12} {}",
                    "JOB ID", "TITLE", "POSTED", "APPLY"
                );
                println!("{}", "-".repeat(100));
                let mut ids: Vec<_> = jobs.keys().collect();
                ids.sort();
                for id in ids {
                    let job = &jobs[id];
                    println!(
                        "{:<14} {:<40} {:<12} {}",
                        truncate(id, 12),
                        truncate(&job.title, 38),
                        job.posted,
                        job.apply_url
                    );
                }
            }
        }
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max.saturating_sub(3)])
    }
}
