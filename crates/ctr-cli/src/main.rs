//! CTR CLI - Command-line interface for describing, initialising and
//! scoring product-based neural networks.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ctr_cli::Cli;

fn main() -> Result<()> {
    // stdout is reserved for JSON results
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("ctr=info".parse()?))
        .init();

    let cli = Cli::parse();

    info!("CTR CLI starting...");
    cli.command.run()?;
    info!("CTR CLI completed successfully");
    Ok(())
}
