//! CLI module
//!
//! Command-line interface for the tap.
//!
//! # Commands
//!
//! - `discover` - Probe the Analytics APIs and print the catalog
//! - `sync` - Extract records for the selected catalog streams

mod commands;
mod runner;

pub use commands::{Cli, Commands};
pub use runner::Runner;
