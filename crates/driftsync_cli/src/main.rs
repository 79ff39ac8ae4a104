//! DriftSync CLI
//!
//! Command-line tools for a DriftSync note store and its simulated remote.
//!
//! # Commands
//!
//! - `validate` - Check a settings file against the minimum-safety floors
//! - `task-ids` - Print the background task ids that would be registered
//! - `note` - Add, list or delete local notes
//! - `status` - Show what a push and a pull would transfer
//! - `sync` - Run one push or pull
//! - `prune` - Run one retention sweep
//! - `watch` - Run foreground timers for a while

mod commands;
mod note;
mod settings;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// DriftSync command-line tools.
#[derive(Parser)]
#[command(name = "driftsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Local store directory
    #[arg(global = true, short, long, default_value = "driftsync-local")]
    local: PathBuf,

    /// Remote store directory, served through a simulated remote
    #[arg(global = true, short, long, default_value = "driftsync-remote")]
    remote: PathBuf,

    /// Settings file (JSON)
    #[arg(global = true, short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a settings file against the minimum-safety floors
    Validate {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print the background task ids that would be registered
    TaskIds,

    /// Manage local notes
    #[command(subcommand)]
    Note(NoteCommand),

    /// Show what a push and a pull would transfer
    Status {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Run one sync pass
    Sync {
        /// Direction of the pass
        #[arg(value_enum)]
        direction: Direction,
    },

    /// Run one retention sweep with the configured bounds
    Prune,

    /// Run the foreground timers until the duration elapses or Ctrl-C
    Watch {
        /// Seconds to stay in the foreground
        #[arg(short, long, default_value = "60")]
        seconds: u64,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum NoteCommand {
    /// Create a note
    Add {
        /// Note text
        body: String,

        /// Explicit id (a random one by default)
        #[arg(long)]
        id: Option<String>,
    },

    /// List notes
    List {
        /// Include tombstones
        #[arg(short, long)]
        all: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Delete a note, leaving a tombstone
    Delete {
        /// Note id
        id: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Direction {
    Push,
    Pull,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = settings::Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Validate { format } => {
            commands::config::validate(&settings, &format)?;
        }
        Commands::TaskIds => {
            commands::config::task_ids(&settings)?;
        }
        Commands::Note(NoteCommand::Add { body, id }) => {
            commands::notes::add(&cli.local, body, id)?;
        }
        Commands::Note(NoteCommand::List { all, format }) => {
            commands::notes::list(&cli.local, all, &format)?;
        }
        Commands::Note(NoteCommand::Delete { id }) => {
            commands::notes::delete(&cli.local, &id)?;
        }
        Commands::Status { format } => {
            commands::status::run(&cli.local, &cli.remote, &format)?;
        }
        Commands::Sync { direction } => {
            let workspace = commands::Workspace::open(&cli.local, &cli.remote, &settings)?;
            runtime()?.block_on(async {
                match direction {
                    Direction::Push => commands::sync::push(&workspace).await,
                    Direction::Pull => commands::sync::pull(&workspace).await,
                }
            })?;
        }
        Commands::Prune => {
            let workspace = commands::Workspace::open(&cli.local, &cli.remote, &settings)?;
            runtime()?.block_on(commands::sync::prune(&workspace))?;
        }
        Commands::Watch { seconds } => {
            let workspace = commands::Workspace::open(&cli.local, &cli.remote, &settings)?;
            runtime()?.block_on(commands::sync::watch(&workspace, seconds))?;
        }
        Commands::Version => {
            println!("DriftSync CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}
