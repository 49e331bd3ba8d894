//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// bpchanges - Changeset staging, rollback and teardown planning for
/// blueprint deployments.
#[derive(Parser, Debug)]
#[command(name = "bpchanges")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, env = "BPCHANGES_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute the changeset that deploys a resolved blueprint.
    Stage {
        /// Resolved blueprint file (YAML or JSON).
        #[arg(short, long)]
        blueprint: PathBuf,

        /// Instance to stage against. Omit for a first deployment.
        #[arg(short, long)]
        instance: Option<String>,

        /// Store the changeset and print its ID.
        #[arg(long)]
        save: bool,

        /// Print every field change, not just the resource summary.
        #[arg(short, long)]
        detailed: bool,
    },

    /// Reverse a changeset against the state it was applied to.
    Reverse {
        /// Changeset file (JSON).
        #[arg(long)]
        changes: PathBuf,

        /// Instance state before the changeset was applied (JSON).
        #[arg(long)]
        previous: PathBuf,

        /// Instance state after the failed deployment (JSON). When given,
        /// operations unsafe against it are filtered out.
        #[arg(long)]
        current: Option<PathBuf>,
    },

    /// Plan the rollback of a stored changeset for a stored instance.
    Rollback {
        /// Instance whose deployment failed.
        #[arg(short, long)]
        instance: String,

        /// ID of the stored changeset that was being applied.
        #[arg(long)]
        changeset: String,

        /// ID of the stored instance state from before the deployment.
        #[arg(long)]
        previous: String,

        /// Only print the plan if its digest matches.
        #[arg(long)]
        expect_digest: Option<String>,
    },

    /// Plan the removal of everything in a stored instance.
    Teardown {
        /// Instance to tear down.
        #[arg(short, long)]
        instance: String,
    },

    /// Print the digest of a changeset file.
    Digest {
        /// Changeset file (JSON).
        changes: PathBuf,

        /// Print the full digest instead of the short form.
        #[arg(long)]
        full: bool,
    },

    /// Validate the configuration.
    ValidateConfig {
        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_rollback() {
        let cli = Cli::try_parse_from([
            "bpchanges",
            "--output",
            "json",
            "rollback",
            "--instance",
            "inst-1",
            "--changeset",
            "cs-1",
            "--previous",
            "inst-1-prev",
        ])
        .unwrap();

        assert_eq!(cli.output, OutputFormat::Json);
        assert!(matches!(
            cli.command,
            Commands::Rollback { ref instance, ref changeset, .. }
                if instance == "inst-1" && changeset == "cs-1"
        ));
    }

    #[test]
    fn test_parse_stage_requires_blueprint() {
        assert!(Cli::try_parse_from(["bpchanges", "stage"]).is_err());
    }
}
