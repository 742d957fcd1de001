//! Proposal command implementation.

use anyhow::Result;

use crate::cli::{OutputFormat, RunArgs};
use crate::commands::load_and_run;
use crate::output::format_actions_table;

pub fn run_propose(args: &RunArgs, format: OutputFormat) -> Result<()> {
    let run = load_and_run(args)?;

    let payload = match args.network {
        Some(network) => run.payload.only(network.0),
        None => run.payload,
    };

    match format {
        OutputFormat::Json => {
            println!("{}", payload.to_json_pretty()?);
        }
        OutputFormat::Table | OutputFormat::Markdown => {
            println!("{}", format_actions_table(&payload, format));
        }
    }

    Ok(())
}
