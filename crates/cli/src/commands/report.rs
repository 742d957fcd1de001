//! Allocation report command implementation.

use anyhow::Result;

use crate::cli::{OutputFormat, RunArgs};
use crate::commands::load_and_run;
use crate::output::format_allocation_report;

pub fn run_report(args: &RunArgs, format: OutputFormat) -> Result<()> {
    let mut allocation = load_and_run(args)?.allocation;

    if let Some(network) = args.network {
        allocation.chains.retain(|c| c.chain == network.0);
    }

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&allocation)?;
            println!("{}", json);
        }
        OutputFormat::Table | OutputFormat::Markdown => {
            println!("{}", format_allocation_report(&allocation, format)?);
        }
    }

    Ok(())
}
