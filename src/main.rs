use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

use student_etl::app::incremental_run_use_case::IncrementalRunUseCase;
use student_etl::app::ports::ChangelogPort;
use student_etl::config::Config;
use student_etl::constants::{AGGREGATED_TABLE, INCOMPLETE_TABLE};
use student_etl::error::Result;
use student_etl::infra::changelog_file::MarkdownChangelog;
use student_etl::infra::csv_export::CsvSnapshotExporter;
use student_etl::infra::sqlite_cleansed_store::SqliteCleansedStore;
use student_etl::infra::sqlite_raw_store::SqliteRawStore;
use student_etl::logging;
use student_etl::observability::TracingSink;
use student_etl::pipeline::processing::normalize::DefaultNormalizer;

#[derive(Parser)]
#[command(name = "student_etl")]
#[command(about = "Incrementally clean and aggregate student, career path and job data")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to a TOML config file (defaults to ./student_etl.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process newly arrived raw students into the cleansed store
    Run {
        /// Date ages are computed against (YYYY-MM-DD), defaults to today
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Show the cleansed store row counts and the current changelog version
    Status,
}

fn build_use_case(config: &Config, as_of: NaiveDate) -> Result<IncrementalRunUseCase> {
    let raw_store = SqliteRawStore::open(&config.raw.database)?;
    let cleansed_store = SqliteCleansedStore::open(&config.cleansed.database)?;

    Ok(IncrementalRunUseCase::new(
        Box::new(raw_store),
        Box::new(cleansed_store),
        Box::new(MarkdownChangelog::new(&config.cleansed.changelog)),
        Box::new(CsvSnapshotExporter::new(&config.cleansed.csv_export)),
        Box::new(DefaultNormalizer::new(as_of)),
        Box::new(TracingSink),
    ))
}

fn run(config: &Config, as_of: Option<NaiveDate>) {
    let as_of = as_of.unwrap_or_else(|| Local::now().date_naive());

    let use_case = match build_use_case(config, as_of) {
        Ok(use_case) => use_case,
        Err(e) => {
            error!("Error opening stores: {}", e);
            println!("❌ Could not open stores: {}", e);
            return;
        }
    };

    match use_case.run_and_log() {
        Some(report) if report.is_noop() => {
            println!("✅ No new data ({} new students checked)", report.new_students);
            if report.rows_quarantined > 0 {
                println!("   Quarantined: {}", report.rows_quarantined);
            }
        }
        Some(report) => {
            println!("\n📊 Run results ({}):", report.run_id);
            println!("   New students: {}", report.new_students);
            println!("   Aggregated: {}", report.rows_added);
            println!("   Quarantined: {}", report.rows_quarantined);
            if let Some(version) = report.version {
                println!("   Changelog version: {}", version);
            }
        }
        None => println!("❌ Run failed, see log for details"),
    }
}

fn status(config: &Config) -> Result<()> {
    let store = SqliteCleansedStore::open(&config.cleansed.database)?;
    let changelog = MarkdownChangelog::new(&config.cleansed.changelog);

    let version = changelog
        .latest_version()?
        .map(|v| v.to_string())
        .unwrap_or_else(|| "none".to_string());

    println!("📦 Cleansed store: {}", config.cleansed.database.display());
    println!("   {}: {} rows", AGGREGATED_TABLE, store.count(AGGREGATED_TABLE)?);
    println!("   {}: {} rows", INCOMPLETE_TABLE, store.count(INCOMPLETE_TABLE)?);
    println!("   Changelog version: {}", version);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    logging::init_logging(&config.logging.directory, &config.logging.file_name)?;
    info!(raw = %config.raw.database.display(), cleansed = %config.cleansed.database.display(), "Configuration loaded");

    match cli.command {
        Commands::Run { as_of } => run(&config, as_of),
        Commands::Status => {
            if let Err(e) = status(&config) {
                error!("Status failed: {}", e);
                println!("❌ Status failed: {}", e);
            }
        }
    }
    Ok(())
}
