//! Epoch window command implementation.

use anyhow::Result;
use emissions_rs_engine::{EmissionsConfig, EpochWindow};

use crate::cli::{EpochArgs, OutputFormat};
use crate::commands::resolve_now;
use crate::output::format_epoch_window;

pub fn run_epoch_info(args: &EpochArgs, format: OutputFormat) -> Result<()> {
    let config = EmissionsConfig::load(&args.config)?;
    let window = EpochWindow::from_config(&config.epoch, resolve_now(args.now)?)?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&window)?;
            println!("{}", json);
        }
        OutputFormat::Table | OutputFormat::Markdown => {
            println!("{}", format_epoch_window(&window, format));
        }
    }

    Ok(())
}
