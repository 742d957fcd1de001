//! Command implementations.

pub mod epoch;
pub mod propose;
pub mod report;

pub use epoch::run_epoch_info;
pub use propose::run_propose;
pub use report::run_report;

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use emissions_rs_engine::{run_epoch, EmissionsConfig, EpochRun, ProtocolSnapshot};
use tracing::info;

use crate::cli::RunArgs;

/// The planning timestamp: `--now` when given, otherwise the wall clock.
pub fn resolve_now(now: Option<u64>) -> Result<u64> {
    match now {
        Some(now) => Ok(now),
        None => Ok(SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("System clock is before the unix epoch")?
            .as_secs()),
    }
}

fn load_snapshot(path: &Path) -> Result<ProtocolSnapshot> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    ProtocolSnapshot::from_json_str(&content)
        .with_context(|| format!("Failed to parse snapshot {}", path.display()))
}

/// Loads both inputs and runs the engine.
pub fn load_and_run(args: &RunArgs) -> Result<EpochRun> {
    let config = EmissionsConfig::load(&args.config)?;
    let snapshot = load_snapshot(&args.snapshot)?;
    let now = resolve_now(args.now)?;
    info!(config = %args.config.display(), snapshot = %args.snapshot.display(), now, "running epoch");

    Ok(run_epoch(&config, &snapshot, now)?)
}
