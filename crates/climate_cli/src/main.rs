mod scheduler;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use climate_core::{ClimateConfig, Clock, SystemClock};
use climate_engine::{AnalysisOutcome, Backends, ClimateService, JobSchedule};
use climate_store::SqliteStore;
use scheduler::Scheduler;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "climate", author, version, about = "Campus emotional climate engine", long_about = None)]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "climate.toml", env = "CLIMATE_CONFIG")]
    config: PathBuf,

    /// SQLite database path (overrides the config file)
    #[arg(long)]
    db: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the job scheduler until interrupted
    Run,
    /// Analyze the current partial hour, or a whole day
    Analyze {
        #[arg(long, value_name = "YYYY-MM-DD")]
        full_day: Option<NaiveDate>,
    },
    /// Apply the hourly activity adjustment now
    Adjust,
    /// Run one natural recovery tick
    Recover,
    /// Predict the morning temperature and pre-correct if needed
    Predict,
    /// Enforce the morning minimum temperature
    Guarantee,
    /// Write yesterday's daily summary
    Rollup,
    /// Clear today's emotion statistics
    Reset,
    /// Print the current climate as JSON
    Status,
    /// Insert a post into the local content table
    SeedPost {
        #[arg(long)]
        title: String,
        #[arg(long)]
        body: String,
        /// Creation time, defaults to now
        #[arg(long, value_name = "YYYY-MM-DDTHH:MM:SS")]
        at: Option<NaiveDateTime>,
    },
}

fn init_logging(json: bool, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("climate=info,sqlx=warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "climate.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    guard
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.log_json, cli.log_dir.as_deref());

    let mut config = ClimateConfig::load_or_default(&cli.config);
    if let Some(db) = cli.db {
        config.storage.db_path = db;
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    info!("Opening store at {}", config.storage.db_path);
    let store = Arc::new(
        SqliteStore::with_clock(&config.storage.db_path, clock.clone())
            .await
            .context("Failed to open climate store")?,
    );

    if let Command::SeedPost { title, body, at } = &cli.command {
        let created_at = at.unwrap_or_else(|| clock.now());
        let id = store.insert_post(title, body, created_at).await?;
        return print_json(&json!({ "id": id, "created_at": created_at }));
    }

    let client = climate_scoring::create_client(&config.llm)?;
    let service = Arc::new(ClimateService::new(
        &config,
        Backends::shared(store.clone(), clock.clone()),
        client,
    )?);
    let temps = service.temperature_manager();

    match cli.command {
        Command::Run => {
            let pruned = store.prune_expired_cache().await?;
            if pruned > 0 {
                info!("Pruned {} expired cache entries", pruned);
            }
            let schedule = JobSchedule::from_config(&config.scheduler)?;
            let tick = Duration::from_secs(config.scheduler.tick_secs);
            Scheduler::new(service.clone(), clock, schedule, tick).run().await?;
        }
        Command::Analyze { full_day } => {
            let outcome = match full_day {
                Some(date) => service.run_full_day_analysis(date).await?,
                None => service.run_manual_analysis().await?,
            };
            if let AnalysisOutcome::NoPosts { window } = &outcome {
                info!("Nothing to analyze between {} and {}", window.start, window.end);
            }
            print_json(&outcome)?;
        }
        Command::Adjust => print_json(&temps.adjust_hourly().await?)?,
        Command::Recover => {
            let changed = temps.natural_temperature_recovery().await?;
            let current = temps.current_temperature().await?;
            print_json(&json!({ "changed": changed, "temperature": current }))?;
        }
        Command::Predict => print_json(&temps.predict_and_adjust_for_morning().await?)?,
        Command::Guarantee => {
            let forced = temps.ensure_minimum_morning_temperature().await?;
            print_json(&json!({ "forced_to": forced }))?;
        }
        Command::Rollup => print_json(&temps.save_daily_campus_data().await?)?,
        Command::Reset => {
            service.reset_daily().await?;
            print_json(&json!({ "reset": true }))?;
        }
        Command::Status => print_json(&service.snapshot().await?)?,
        Command::SeedPost { .. } => {}
    }

    Ok(())
}
