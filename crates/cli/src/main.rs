use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tally_core::TallyConfig;
use tracing_subscriber::EnvFilter;

mod commands;

/// Tally - turn OCR output into structured receipts
#[derive(Parser)]
#[command(name = "tally")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file (overrides the config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a JSON array of OCR fragments
    Scan {
        /// Fragment file produced by an OCR engine
        fragments: PathBuf,
    },
    /// Enter a receipt from plain text lines ("-" reads stdin)
    Add {
        lines: String,
    },
    /// List receipts, newest first
    List,
    /// Show resolved fields for one receipt
    Show {
        id: String,
        /// Also print every line with its classification
        #[arg(long)]
        lines: bool,
        /// Print the resolved view as JSON
        #[arg(long)]
        json: bool,
    },
    /// Override extracted fields
    Edit(commands::EditArgs),
    /// Drop all overrides of a receipt
    Reset {
        id: String,
    },
    /// Delete one receipt
    Delete {
        id: String,
    },
    /// Delete every receipt
    Clear,
}

fn init_tracing(config: &TallyConfig, verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match cli.config.clone().or_else(TallyConfig::default_config_path) {
        Some(path) => TallyConfig::load_or_default(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TallyConfig::default(),
    };
    init_tracing(&config, cli.verbose);

    let db_path = match cli.db {
        Some(path) => path,
        None => config.database_path()?,
    };
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let db = tally_storage::create_db(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    tracing::debug!("Using database {}", db_path.display());

    let ctx = commands::Context { db, config };

    match cli.command {
        Commands::Scan { fragments } => commands::scan(&ctx, &fragments).await,
        Commands::Add { lines } => commands::add(&ctx, &lines).await,
        Commands::List => commands::list(&ctx).await,
        Commands::Show { id, lines, json } => commands::show(&ctx, &id, lines, json).await,
        Commands::Edit(args) => commands::edit(&ctx, args).await,
        Commands::Reset { id } => commands::reset(&ctx, &id).await,
        Commands::Delete { id } => commands::delete(&ctx, &id).await,
        Commands::Clear => commands::clear(&ctx).await,
    }
}
