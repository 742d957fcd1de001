//! Tracing subscriber setup.
//!
//! Logs go to stderr so JSON written to stdout stays machine-readable.
//!
//! ```bash
//! # Per-market valuation and speeds
//! emissions --log-level emissions_rs_engine=debug report --config emissions.toml --snapshot snapshot.json
//! ```

use anyhow::{anyhow, Result};
use tracing_subscriber::filter::EnvFilter;

/// Default filter when neither `--log-level` nor `RUST_LOG` is set.
const DEFAULT_FILTER: &str = "warn";

pub fn init_logging(filter_override: Option<&str>) -> Result<()> {
    let filter = match filter_override {
        Some(filter) => EnvFilter::try_new(filter)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialise logging: {e}"))
}
