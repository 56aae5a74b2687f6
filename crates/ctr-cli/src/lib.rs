//! CTR CLI Library
//!
//! This crate provides the command-line interface for CTR models:
//!
//! - **Describe**: Build a model from its spec and report its dimensions
//! - **Init**: Write a freshly initialised checkpoint
//! - **Predict**: Score rows of a JSON input file
//! - **Evaluate**: Compute metrics against labels
//!
//! # Example
//!
//! ```bash
//! ctr describe --spec spec.json
//! ctr init --spec spec.json --output model.json
//! ctr predict --spec spec.json --checkpoint model.json --input rows.json
//! ctr evaluate --spec spec.json --checkpoint model.json --input rows.json --labels labels.json
//! ```

pub mod commands;

use clap::{Parser, Subcommand};

pub use commands::{DescribeCommand, EvaluateCommand, InitCommand, ModelSummary, PredictCommand};

/// Product-based neural network for click-through-rate prediction
#[derive(Parser, Debug)]
#[command(name = "ctr")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a model from its spec and report its dimensions
    Describe(DescribeCommand),

    /// Write a freshly initialised checkpoint
    Init(InitCommand),

    /// Score rows of a JSON input file
    Predict(PredictCommand),

    /// Compute metrics for rows of a JSON input file against labels
    Evaluate(EvaluateCommand),
}

impl Commands {
    /// Execute the selected command
    pub fn run(&self) -> anyhow::Result<()> {
        match self {
            Commands::Describe(cmd) => cmd.run(),
            Commands::Init(cmd) => cmd.run(),
            Commands::Predict(cmd) => cmd.run(),
            Commands::Evaluate(cmd) => cmd.run(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }
}
