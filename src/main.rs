//! Precedente CLI
//!
//! Thin operational surface over the pattern store: initialize a database,
//! inspect per-engine statistics, count a caso's patterns.

use anyhow::Context;
use clap::{Parser, Subcommand};
use precedente::{PatternStore, SqlitePatternStore, StoreConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Resolve the database path from flag, env var, or default
fn resolve_db_path(cli_path: Option<PathBuf>) -> PathBuf {
    cli_path
        .or_else(|| std::env::var("PRECEDENTE_DB_PATH").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("precedente.db"))
}

#[derive(Parser)]
#[command(name = "precedente", version, about = "Learned pattern store for document extraction")]
struct Cli {
    /// Path to the SQLite database
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Optional TOML file overriding store thresholds
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database and schema
    Init,
    /// Print per-engine pattern statistics as JSON
    Stats,
    /// Count patterns for one caso
    Count {
        /// CNJ case number
        #[arg(long)]
        caso: String,
        /// Judicial-system code used if the caso does not exist yet
        #[arg(long, default_value = "pje")]
        sistema: String,
        /// Count deprecated patterns instead of active ones
        #[arg(long)]
        deprecated: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => StoreConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => StoreConfig::default(),
    };

    let db_path = resolve_db_path(cli.db.clone());
    let store = SqlitePatternStore::new(&db_path, config)
        .await
        .with_context(|| format!("failed to open store at {}", db_path.display()))?;

    match cli.command {
        Command::Init => {
            println!("Initialized pattern store at {}", db_path.display());
        }
        Command::Stats => {
            let report = store.get_engine_stats().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Count {
            caso,
            sistema,
            deprecated,
        } => {
            let caso = store.get_or_create_caso(&caso, &sistema).await?;
            let count = store.get_pattern_count(caso.id, deprecated).await?;
            println!("{}", count);
        }
    }

    Ok(())
}
