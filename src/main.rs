// ABOUTME: CLI entry point for postgres-snapshot-migrator
// ABOUTME: Parses commands and routes to the export and import handlers

use clap::{Parser, Subcommand};
use postgres_snapshot_migrator::commands;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "postgres-snapshot-migrator")]
#[command(about = "Consistent multi-table snapshot export and replay for PostgreSQL", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a snapshot of the configured tables to a JSON artifact
    Export {
        /// Connection string for the source database
        #[arg(long)]
        source: String,
        /// Directory the timestamped artifact and snapshot-latest.json are written to
        #[arg(long, default_value = "snapshots")]
        output_dir: PathBuf,
        /// Override the configured table order (comma-separated, parents before children)
        #[arg(long, value_delimiter = ',')]
        tables: Option<Vec<String>>,
        /// Path to a TOML file with `tables = [...]` describing the table order
        #[arg(long = "config")]
        config_path: Option<String>,
    },
    /// Import a snapshot artifact into the target database
    Import {
        /// Connection string for the target database
        #[arg(long)]
        target: String,
        /// Path to the snapshot artifact produced by `export`
        artifact: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging - default to INFO level if RUST_LOG not set
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            source,
            output_dir,
            tables,
            config_path,
        } => {
            let table_order =
                postgres_snapshot_migrator::config::resolve_table_order(tables, config_path.as_deref())?;
            commands::export(&source, &output_dir, &table_order).await
        }
        Commands::Import { target, artifact } => commands::import(&target, &artifact).await,
    }
}
