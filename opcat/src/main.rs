//! opcat: operator catalog sync.
//!
//! Fetches the configured operator repositories, stages their importable
//! sources, and rebuilds the relational algorithm catalog from their
//! `catalog_def*.json` files.

#![forbid(unsafe_code)]

mod fetch;
mod manifest;
mod pipeline;
mod stage;

use anyhow::Context;
use clap::{Parser, Subcommand};
use opcat_common::config::{OpcatConfig, OperatorList};
use opcat_common::logging::{LogConfig, init_logging};
use opcat_common::OperatorName;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "opcat", version, about = "Operator catalog sync")]
struct Cli {
    /// Config file (defaults to the platform config dir, then built-ins).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Operator list file.
    #[arg(short, long, global = true, default_value = "operators.toml")]
    operators: PathBuf,

    /// Debug-level logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch, stage, and rebuild the catalog (the full pipeline).
    Sync,
    /// Fetch operator repositories into the cache, nothing else.
    Fetch,
    /// Rebuild the catalog from already-fetched repositories.
    Load,
    /// Delete all catalog rows.
    Wipe {
        /// Keep family rows.
        #[arg(long)]
        keep_families: bool,
    },
    /// Print the rendered statement batches without executing them.
    DumpSql {
        /// Restrict to one operator.
        #[arg(long)]
        operator: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(OpcatConfig::default_path);
    let cfg = OpcatConfig::load(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    let mut log = LogConfig::from_env(&cfg.general.log_level).with_stderr();
    if cli.verbose {
        log = log.with_level("debug");
    }
    init_logging(&log)?;

    for warning in cfg.validate() {
        warn!("{warning}");
    }

    match cli.command {
        Command::Sync => {
            let list = OperatorList::load(&cli.operators)
                .with_context(|| format!("loading operator list {}", cli.operators.display()))?;
            let report = pipeline::run_sync(&cfg, list).await?;
            report.log_summary();
        }
        Command::Fetch => {
            let list = OperatorList::load(&cli.operators)
                .with_context(|| format!("loading operator list {}", cli.operators.display()))?;
            pipeline::run_fetch(&cfg, list).await;
        }
        Command::Load => {
            let operators = pipeline::discover_fetched(&cfg.general.fetch_dir)?;
            if operators.is_empty() {
                warn!(dir = %cfg.general.fetch_dir.display(), "no fetched operators found");
            }
            let report = pipeline::run_load(&cfg, &operators)?;
            report.log_summary();
        }
        Command::Wipe { keep_families } => {
            let mut store = opcat_catalog::CatalogStore::open(
                &cfg.catalog.db_path,
                cfg.catalog.busy_timeout(),
            )
            .with_context(|| {
                format!("opening catalog store {}", cfg.catalog.db_path.display())
            })?;
            store.wipe(!keep_families)?;
            info!(keep_families, "catalog wiped");
        }
        Command::DumpSql { operator } => {
            let operators = match operator {
                Some(name) => vec![OperatorName::new(name)],
                None => pipeline::discover_fetched(&cfg.general.fetch_dir)?,
            };
            for statement in pipeline::dump_sql(&cfg, &operators)? {
                println!("{statement};");
            }
        }
    }

    Ok(())
}
