//! `pgarchive`: command-line front-end for the relational-dependency
//! archival engine.
//!
//! Resolves a config file into connection parameters and archiver knobs,
//! builds the dependency graph from the live catalog, and dispatches one of
//! the three Query API operations.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pgarchive_core::defaults;
use pgarchive_core::logging;
use pgarchive_core::{Config, Error, Result};
use pgarchive_db::{build_graph, create_pool, PgCatalogReader, QueryApi};

#[derive(Parser)]
#[command(name = "pgarchive")]
#[command(author, version, about = "Relational-dependency archival engine for PostgreSQL")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    action: Action,

    /// Path to the INI configuration file (`[db]` / `[archive]` sections).
    #[arg(long, global = true, default_value = defaults::CONFIG_PATH)]
    config_path: PathBuf,

    /// Directory to write rotating log files into, in addition to stderr.
    #[arg(long, global = true)]
    log_path: Option<PathBuf>,

    /// Minimum log level (`debug`, `info`, `error`).
    #[arg(long, global = true, default_value = defaults::LOG_LEVEL)]
    log_level: String,
}

#[derive(Subcommand)]
enum Action {
    /// Archive a table's rows, and every row in every referencing
    /// descendant table.
    ArchiveTable {
        /// Table to archive from.
        #[arg(long)]
        table: String,
        /// Comma-separated primary key values to archive.
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<i64>,
    },
    /// Show which tables reference, and are referenced by, a table.
    GetTableReferences {
        /// Table to inspect.
        #[arg(long)]
        table: String,
    },
    /// Show how a batch of a table's rows are referenced by their
    /// descendants.
    GetRowsReferences {
        /// Table the ids belong to.
        #[arg(long)]
        table: String,
        /// Comma-separated primary key values to inspect.
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<i64>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _log_guard = init_logging(&cli);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Install a `tracing-subscriber` with an `EnvFilter` derived from
/// `--log-level` (overridable via `RUST_LOG`), optionally tee'd to a daily
/// rolling file when `--log-path` is given. Returns the file appender's
/// guard, which must stay alive for the process lifetime to flush buffered
/// writes on exit.
fn init_logging(cli: &Cli) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.clone()));

    match &cli.log_path {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "pgarchive.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(non_blocking)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            None
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::from_ini(&cli.config_path)?;

    info!(
        { logging::SUBSYSTEM } = "cli",
        { logging::OPERATION } = "startup",
        { logging::SCHEMA } = %config.db.schema,
        "loaded configuration"
    );

    let pool = create_pool(&config.database_url()).await?;
    let catalog = PgCatalogReader::new(pool.clone());
    let graph = Arc::new(build_graph(&catalog, &config.db.schema).await?);

    let api = QueryApi::from_config(pool, graph, &config);

    match cli.action {
        Action::ArchiveTable { table, ids } => {
            let summaries = api.archive_table(&table, &ids).await?;
            print_json(&summaries)?;
        }
        Action::GetTableReferences { table } => {
            let refs = api.get_table_references(&table)?;
            print_json(&refs)?;
        }
        Action::GetRowsReferences { table, ids } => {
            let refs = api.get_rows_references(&table, &ids).await?;
            print_json(&refs)?;
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| Error::ConfigInvalid(format!("serializing result: {e}")))?;
    println!("{rendered}");
    Ok(())
}
