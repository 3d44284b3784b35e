//! snapshot-runner: headless driver for monthly membership snapshots.
//!
//! Usage:
//!   snapshot-runner --db snapshots.db seed --seed 42 --count 200
//!   snapshot-runner --db snapshots.db generate --month 2025-03
//!   snapshot-runner --db snapshots.db backfill
//!   snapshot-runner --config engine.json show --month 2025-03
//!
//! Every command prints JSON on stdout.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use membership_snapshot_core::{
    config::EngineConfig,
    engine::{MonthResult, SnapshotEngine},
    error::SnapshotError,
    sample_data::seed_sample_entries,
    types::YearMonth,
};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "snapshot-runner", version, about = "Monthly membership snapshot runner")]
struct Cli {
    /// JSON engine config. Takes precedence over --db.
    #[arg(long)]
    config: Option<String>,

    /// SQLite database file when no config is given.
    #[arg(long, default_value = "snapshots.db")]
    db: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rebuild one month.
    Generate {
        #[arg(long)]
        month: YearMonth,
    },
    /// Rebuild every month from the first entry through the current month.
    Backfill,
    /// Rebuild an inclusive range of months.
    Range {
        #[arg(long)]
        from: YearMonth,
        #[arg(long)]
        to: YearMonth,
    },
    /// List generated months, newest first.
    List,
    /// Print one month's summary and members.
    Show {
        #[arg(long)]
        month: YearMonth,
    },
    /// Insert deterministic sample control entries.
    Seed {
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value_t = 100)]
        count: usize,
    },
}

/// Shape of a multi-month run on stdout, complete or not.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunReport {
    completed: Vec<MonthResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stopped_at: Option<YearMonth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl RunReport {
    fn from_outcome(outcome: Result<Vec<MonthResult>, SnapshotError>) -> Result<Self> {
        match outcome {
            Ok(completed) => Ok(Self { completed, stopped_at: None, error: None }),
            Err(SnapshotError::PartialBackfillFailure { completed, failed_month, source }) => {
                Ok(Self {
                    completed,
                    stopped_at: Some(failed_month),
                    error: Some(source.to_string()),
                })
            }
            Err(other) => Err(other.into()),
        }
    }

    fn failed(&self) -> bool {
        self.stopped_at.is_some()
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::for_database(cli.db.clone()),
    };
    log::debug!("opening {}", config.database_path);

    let engine = SnapshotEngine::from_config(&config)
        .with_context(|| format!("opening {}", config.database_path))?;

    match cli.command {
        Command::Generate { month } => print_json(&engine.generate(month)?)?,
        Command::Backfill => {
            let report = RunReport::from_outcome(engine.generate_retroactive())?;
            print_json(&report)?;
            if report.failed() {
                std::process::exit(2);
            }
        }
        Command::Range { from, to } => {
            let report = RunReport::from_outcome(engine.generate_range(from, to))?;
            print_json(&report)?;
            if report.failed() {
                std::process::exit(2);
            }
        }
        Command::List => print_json(&engine.list_months()?)?,
        Command::Show { month } => print_json(&engine.month_detail(month)?)?,
        Command::Seed { seed, count } => {
            let ids = seed_sample_entries(engine.store(), seed, count, Utc::now())?;
            print_json(&serde_json::json!({ "seeded": ids.len(), "seed": seed }))?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
