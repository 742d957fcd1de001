//! CLI argument definitions using clap.

use std::path::PathBuf;
use std::str::FromStr;

use alloy_chains::NamedChain;
use clap::{Parser, Subcommand, ValueEnum};

/// Emissions CLI - Epoch reward emission proposals
#[derive(Parser, Debug)]
#[command(name = "emissions")]
#[command(about = "CLI tool for generating epoch reward emission proposals", long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "table")]
    pub format: OutputFormat,

    /// Log filter (e.g. "info", "emissions_rs_engine=debug"); overrides RUST_LOG
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate the governance proposal payload for the upcoming epoch
    Propose(RunArgs),
    /// Show chain budgets, market speeds and APRs before and after
    Report(RunArgs),
    /// Show the upcoming epoch window
    Epoch(EpochArgs),
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Emission config file (TOML)
    #[arg(long, env = "EMISSIONS_CONFIG")]
    pub config: PathBuf,

    /// Market snapshot file (JSON)
    #[arg(long, env = "EMISSIONS_SNAPSHOT")]
    pub snapshot: PathBuf,

    /// Unix timestamp to plan from (default: current time)
    #[arg(long)]
    pub now: Option<u64>,

    /// Only output one network (e.g., moonbeam, base, optimism)
    #[arg(long)]
    pub network: Option<ChainArg>,
}

#[derive(Parser, Debug)]
pub struct EpochArgs {
    /// Emission config file (TOML)
    #[arg(long, env = "EMISSIONS_CONFIG")]
    pub config: PathBuf,

    /// Unix timestamp to plan from (default: current time)
    #[arg(long)]
    pub now: Option<u64>,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Markdown,
}

/// Wrapper for NamedChain that implements FromStr with aliases
#[derive(Clone, Copy, Debug)]
pub struct ChainArg(pub NamedChain);

impl FromStr for ChainArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let chain = match s.to_lowercase().as_str() {
            "moonbeam" | "glmr" | "1284" => NamedChain::Moonbeam,
            "base" | "8453" => NamedChain::Base,
            "optimism" | "op" | "10" => NamedChain::Optimism,
            _ => return Err(format!("Unknown network: {}", s)),
        };
        Ok(ChainArg(chain))
    }
}

impl std::fmt::Display for ChainArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
