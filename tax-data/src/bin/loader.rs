use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tax_core::db::DEFAULT_CONNECTION_STRING;
use tax_data::TransactionLoader;
use tax_db_sqlite::SqliteRepository;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Load a transaction export (CSV) into the accrual database.
///
/// Required columns: company, date, kind, amount. Optional columns:
/// source_category, parent_id, vat_amount, withholding_amount,
/// outside_company, cancelled.
///
/// Every (company, year) present in the file replaces what the database
/// holds for it, so re-running a load is safe.
#[derive(Parser, Debug)]
#[command(name = "tax-data-loader")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the CSV export
    #[arg(short, long)]
    file: PathBuf,

    /// SQLite database path or URL; created if missing. Defaults to the
    /// file `tax-accrual` reads.
    #[arg(short, long, default_value = DEFAULT_CONNECTION_STRING)]
    database: String,

    /// Run database migrations before loading data
    #[arg(short, long, default_value_t = false)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();

    let repo = SqliteRepository::new(&args.database)
        .await
        .with_context(|| format!("Failed to connect to database: {}", args.database))?;

    if args.migrate {
        info!("running migrations");
        repo.run_migrations()
            .await
            .context("Failed to run migrations")?;
    }

    let file = File::open(&args.file)
        .with_context(|| format!("Failed to open: {}", args.file.display()))?;

    let records = TransactionLoader::parse(file)
        .with_context(|| format!("Failed to parse CSV: {}", args.file.display()))?;

    info!(records = records.len(), file = %args.file.display(), "parsed export");

    let summary = TransactionLoader::load(&repo, &records)
        .await
        .context("Failed to load transactions into database")?;

    println!(
        "Loaded {} transactions ({} replaced, {} new companies).",
        summary.inserted, summary.replaced, summary.companies_created
    );

    Ok(())
}
