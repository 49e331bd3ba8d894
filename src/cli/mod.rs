//! CLI module for the bpchanges tool.
//!
//! This module provides the command-line interface for staging changesets
//! and planning rollbacks and teardowns.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::OutputFormatter;
