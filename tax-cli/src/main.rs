use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::debug;

use tax_cli::app::{self, AccrualView};
use tax_cli::config::{AppConfig, Overrides};
use tax_cli::{logging, report};
use tax_core::TaxRates;
use tax_core::calculations::{PlanningAdjustment, PlanningScope};

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Monthly VAT, withholding and corporate-tax accrual for a company.
///
/// Reads one company/year snapshot from the configured database and prints
/// monthly buckets, the annual summary, or a what-if projection.
#[derive(Debug, Parser)]
#[command(name = "tax-accrual", version)]
struct Cli {
    /// TOML config file. Defaults to ./tax-accrual.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database backend to use.
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Database connection string. Defaults to `accrual.db`, the file
    /// `tax-data-loader` writes. For SQLite this is a file path or `:memory:`.
    #[arg(long, global = true)]
    db: Option<String>,

    /// Log level or EnvFilter directive. RUST_LOG takes precedence.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Also append logs to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct Selection {
    /// Company id or exact name.
    #[arg(long)]
    company: String,

    /// Calendar year.
    #[arg(long)]
    year: i32,

    /// Print JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List companies and the years they have data for.
    Companies {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Twelve monthly buckets, including VAT payable.
    Monthly(Selection),
    /// Yearly totals, corporate tax and tax due.
    Annual(Selection),
    /// What-if for one month.
    PlanMonth {
        #[command(flatten)]
        selection: Selection,

        /// Month, 1 = January.
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=12))]
        month: u8,

        /// Additional VAT. Blank means none.
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        vat: String,

        /// Additional withholding. Blank means none.
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        withholding: String,
    },
    /// What-if for the year: extra withholding against corporate tax.
    PlanYear {
        #[command(flatten)]
        selection: Selection,

        /// Additional withholding. Blank means none.
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        withholding: String,
    },
}

// ─── output ──────────────────────────────────────────────────────────────────

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{text}");
    Ok(())
}

fn print_text(render: impl FnOnce(&mut String) -> std::fmt::Result) -> Result<()> {
    let mut out = String::new();
    render(&mut out).context("Failed to render output")?;
    print!("{out}");
    Ok(())
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::discover(cli.config.as_deref())
        .context("Failed to load configuration")?
        .apply(Overrides {
            backend: cli.backend,
            connection_string: cli.db,
            log_level: cli.log_level,
            log_file: cli.log_file,
        })
        .context("Invalid configuration")?;

    logging::init_logging(&config.logging);

    debug!("connecting to {} backend", config.database.backend);
    let registry = app::build_registry();
    let repo = registry
        .create(&config.database)
        .await
        .context("Failed to open repository")?;
    let rates = TaxRates::default();

    match cli.command {
        Command::Companies { json } => {
            let companies = app::list_companies(&*repo).await?;
            if json {
                print_json(&companies)
            } else {
                print_text(|out| report::render_companies(&companies, out))
            }
        }
        Command::Monthly(sel) => {
            let view = AccrualView::load(&*repo, &sel.company, sel.year, &rates).await?;
            if sel.json {
                print_json(&view.report)
            } else {
                print_text(|out| report::render_monthly(&view.company.name, &view.report, out))
            }
        }
        Command::Annual(sel) => {
            let view = AccrualView::load(&*repo, &sel.company, sel.year, &rates).await?;
            if sel.json {
                print_json(&view.summary)
            } else {
                print_text(|out| {
                    report::render_annual(&view.company.name, sel.year, &view.summary, out)
                })
            }
        }
        Command::PlanMonth {
            selection: sel,
            month,
            vat,
            withholding,
        } => {
            let adjustment =
                PlanningAdjustment::parse(PlanningScope::Month(month - 1), &vat, &withholding)?;
            let view = AccrualView::load(&*repo, &sel.company, sel.year, &rates).await?;
            let projection = view.plan(&adjustment)?;
            if sel.json {
                print_json(&projection)
            } else {
                print_text(|out| report::render_projection(&projection, out))
            }
        }
        Command::PlanYear {
            selection: sel,
            withholding,
        } => {
            let adjustment = PlanningAdjustment::parse(PlanningScope::Year, "", &withholding)?;
            let view = AccrualView::load(&*repo, &sel.company, sel.year, &rates).await?;
            let projection = view.plan(&adjustment)?;
            if sel.json {
                print_json(&projection)
            } else {
                print_text(|out| report::render_projection(&projection, out))
            }
        }
    }
}
