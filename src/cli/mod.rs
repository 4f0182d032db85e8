//! CLI module
//!
//! Command-line interface for running the stream adapter.
//!
//! # Commands
//!
//! - `check` - Authenticate once and report the result
//! - `run` - Stream events and print them as JSON lines

mod commands;
mod runner;

pub use commands::{Cli, Commands};
pub use runner::Runner;
