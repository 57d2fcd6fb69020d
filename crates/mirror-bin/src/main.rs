//! rowmirror - Inspect and follow an append-only SQLite log.

mod app;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mirror_config_and_utils::{init_logging, Config, Paths};

/// rowmirror command-line interface.
#[derive(Parser)]
#[command(name = "rowmirror")]
#[command(about = "Mirror an append-only SQLite log into memory and keep it converged")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Defaults to the config value
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for config, database, and logs. Defaults to ~/.rowmirror
    #[arg(long, global = true, env = "ROWMIRROR_BASE_DIR")]
    base_dir: Option<PathBuf>,

    /// Log table to operate on. Defaults to the config value
    #[arg(short, long, global = true)]
    table: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the base directory, config file, and log table
    Init,
    /// Validate and append JSON objects as one atomic batch
    Append {
        /// JSON objects, one per argument
        #[arg(required = true)]
        records: Vec<String>,
    },
    /// Load the log and print every row
    Dump,
    /// Follow the log, printing new rows as the mirror converges
    Watch,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let mut config = Config::load(&paths)?;
    if let Some(table) = cli.table {
        config.table = table;
    }

    let log_file = paths.logs_dir().is_dir().then(|| paths.log_file());
    init_logging(cli.log_level.as_deref().unwrap_or(&config.log_level), log_file);

    match cli.command {
        Commands::Init => app::init_store(&config, &paths).await?,
        Commands::Append { records } => app::append_records(&config, &paths, &records).await?,
        Commands::Dump => app::dump(&config, &paths).await?,
        Commands::Watch => app::watch(&config, &paths).await?,
    }

    Ok(())
}
