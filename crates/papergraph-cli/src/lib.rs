//! Papergraph CLI library.
//!
//! Configuration loading, command execution and output formatting for the
//! `papergraph` binary: extract relations from a paper tracker, ingest them
//! into a graph, and ask questions about the result.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod repl;

pub use cli::{Cli, Command};
pub use config::{AppConfig, OutputFormat};
pub use error::{CliError, Result};
pub use output::Formatter;
