use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command-line arguments for `ecosnap`
#[derive(Debug, Parser)]
#[command(name = "ecosnap", version)]
#[command(about = "Snapshot GitHub and Hugging Face ecosystem metrics into a CSV history", long_about = None)]
pub struct Cli {
    /// TOML configuration file (defaults apply when omitted)
    #[arg(short, long, global = true, env = "ECOSNAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Collect one snapshot and append it to the history
    Snapshot {
        /// CSV history path (overrides `store.path`)
        #[arg(short, long)]
        store: Option<PathBuf>,

        /// Collect and log the values without appending them
        #[arg(long)]
        dry_run: bool,
    },

    /// Show stored snapshots and the latest values
    History {
        /// CSV history path (overrides `store.path`)
        #[arg(short, long)]
        store: Option<PathBuf>,

        /// Number of most recent rows to show
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },

    /// Show the effective configuration
    Config,
}
