//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Google Analytics tap CLI
#[derive(Parser, Debug)]
#[command(name = "ga-tap")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Inline config JSON
    #[arg(long, global = true)]
    pub config_json: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Discover available fields and write the catalog to stdout
    Discover,

    /// Extract records for the streams selected in the catalog
    Sync {
        /// Catalog file (JSON), as produced by `discover`
        #[arg(long)]
        catalog: PathBuf,

        /// State file (JSON) from a previous run
        #[arg(short, long)]
        state: Option<PathBuf>,
    },
}
