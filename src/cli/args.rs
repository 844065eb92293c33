//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use crate::oracle::Phase;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// arteval - Artifact evaluation harness.
#[derive(Debug, Parser)]
#[command(name = "arteval")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Dump captured output of failing requirements
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Evaluate a bundle phase by phase and print the score
    Run(RunArgs),

    /// Check a bundle file without running anything
    Validate(ValidateArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the `run` command.
#[derive(Debug, Clone, clap::Args)]
pub struct RunArgs {
    /// Bundle file
    pub bundle: PathBuf,

    /// Only run these phases (repeatable): env_setup, artifact_build,
    /// benchmark_prep, experiment_runs
    #[arg(long = "phase", value_name = "PHASE")]
    pub phases: Vec<Phase>,

    /// Print the scorecard as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command.
#[derive(Debug, Clone, clap::Args)]
pub struct ValidateArgs {
    /// Bundle file
    pub bundle: PathBuf,
}

/// Arguments for the `completions` command.
#[derive(Debug, Clone, clap::Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_with_phases() {
        let cli = Cli::parse_from([
            "arteval",
            "run",
            "bundle.yml",
            "--phase",
            "env_setup",
            "--phase",
            "ExperimentRuns",
            "--json",
            "-v",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.bundle, PathBuf::from("bundle.yml"));
                assert_eq!(args.phases, vec![Phase::EnvSetup, Phase::ExperimentRuns]);
                assert!(args.json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_phase() {
        assert!(Cli::try_parse_from(["arteval", "run", "b.yml", "--phase", "deploy"]).is_err());
    }
}
