//! Emissions CLI - Generate epoch reward emission proposals.

mod cli;
mod commands;
mod logging;
mod output;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};
use commands::{run_epoch_info, run_propose, run_report};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level.as_deref())?;

    match cli.command {
        Commands::Propose(args) => {
            run_propose(&args, cli.format)?;
        }
        Commands::Report(args) => {
            run_report(&args, cli.format)?;
        }
        Commands::Epoch(args) => {
            run_epoch_info(&args, cli.format)?;
        }
    }

    Ok(())
}
