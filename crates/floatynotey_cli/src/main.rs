//! `floatynotey` command-line host.
//!
//! # Responsibility
//! - Parse arguments and wire configuration, logging and storage.
//! - Keep terminal output here; note rules stay in `floatynotey_core`.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use floatynotey_core::{init_logging, CoreConfig};
use log::{error, info};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "floatynotey", version, about = "Local notes from the command line")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file, overriding the configuration
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Absolute log directory, overriding the configuration
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// List notes, pinned first, then most recently modified
    List,
    /// List notes whose title contains the query
    Search { query: String },
    /// Create a note, one paragraph per line of text
    New { text: Option<String> },
    /// Print a note
    Show { id: i64 },
    /// Toggle the pinned flag
    Pin { id: i64 },
    /// Delete a note
    Delete { id: i64 },
    /// Print the shareable link of a note
    Link { id: i64 },
    /// Print the note a link points at
    Resolve { url: String },
    /// Import a legacy markup file as a new note
    ImportLegacy { file: PathBuf },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Search { .. } => "search",
            Self::New { .. } => "new",
            Self::Show { .. } => "show",
            Self::Pin { .. } => "pin",
            Self::Delete { .. } => "delete",
            Self::Link { .. } => "link",
            Self::Resolve { .. } => "resolve",
            Self::ImportLegacy { .. } => "import_legacy",
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    start_logging(&config);

    let db_path = config
        .resolve_database_path()
        .context("cannot resolve database path")?;
    let conn = floatynotey_core::db::open_db(&db_path)
        .with_context(|| format!("cannot open database `{}`", db_path.display()))?;

    let command = cli.command.name();
    let mut out = std::io::stdout().lock();
    match commands::dispatch(&conn, &config, &cli.command, &mut out) {
        Ok(()) => {
            info!("event=cli_command module=cli status=ok command={command}");
            Ok(())
        }
        Err(err) => {
            error!("event=cli_command module=cli status=error command={command}");
            Err(err)
        }
    }
}

fn load_config(cli: &Cli) -> Result<CoreConfig> {
    let mut config = match &cli.config {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    };
    if let Some(db) = &cli.db {
        config.database_path = Some(db.clone());
    }
    if let Some(log_dir) = &cli.log_dir {
        config.log_dir = Some(log_dir.clone());
    }
    Ok(config)
}

/// Logging is best effort; a CLI run never fails because of it.
fn start_logging(config: &CoreConfig) {
    let result = config
        .resolve_log_dir()
        .map_err(|err| err.to_string())
        .and_then(|dir| init_logging(config.log_level(), dir));
    if let Err(err) = result {
        eprintln!("warning: logging disabled: {err}");
    }
}
