//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Salesforce Streaming API adapter
#[derive(Parser, Debug)]
#[command(name = "streamforce", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authenticate once against the token endpoint and report
    Check {
        /// Path to the adapter YAML configuration
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Run the stream and print relayed events as JSON lines
    Run {
        /// Path to the adapter YAML configuration
        #[arg(short, long)]
        config: PathBuf,
    },
}
