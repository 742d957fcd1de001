//! Reward Emission Allocation Engine
//!
//! Once per fixed-length epoch, this crate splits a global protocol-token
//! emission budget across lending markets on several chains and turns the
//! split into a deterministic, rounding-safe list of governance actions.
//!
//! # Overview
//!
//! The pipeline is pure and synchronous:
//! - [`config`]: static per-chain and per-market tables, loaded from TOML
//! - [`snapshot`]: live market data, joined with config into market records
//! - [`epoch`]: the upcoming epoch window
//! - [`tvl`]: USD valuation, market shares and chain shares
//! - [`allocation`]: chain budgets and per-market reward speeds
//! - [`safety_module`]: APY cap on the secondary staking pool
//! - [`math`]: decimal/base-unit conversion and rounding slack
//! - [`actions`]: governance actions per network
//! - [`proposal`]: the end-to-end run and its JSON payload
//!
//! # Example
//!
//! ```rust,ignore
//! use emissions_rs_engine::{run_epoch, EmissionsConfig, ProtocolSnapshot};
//!
//! let config = EmissionsConfig::load("emissions.toml")?;
//! let snapshot = ProtocolSnapshot::from_json_str(&std::fs::read_to_string("snapshot.json")?)?;
//!
//! let run = run_epoch(&config, &snapshot, 1_717_000_000)?;
//! println!("{}", run.payload.to_json_pretty()?);
//! ```

pub mod actions;
pub mod allocation;
pub mod chain;
pub mod config;
pub mod epoch;
pub mod error;
pub mod math;
pub mod proposal;
pub mod safety_module;
pub mod serde_utils;
pub mod snapshot;
pub mod tvl;

pub use actions::{GovernanceAction, SpeedValue};
pub use allocation::{
    allocate_epoch, AprSummary, ChainAllocation, ChainBudget, EpochAllocation, MarketAllocation,
    ReserveSale, RewardSpeeds, RewardToken, SideSpeed,
};
pub use chain::{chain_from_id, chain_id, SUPPORTED_CHAINS};
pub use config::{ChainConfig, EmissionsConfig, MarketConfig};
pub use epoch::EpochWindow;
pub use error::{ConfigError, EngineError, Result};
pub use math::{Rounding, RoundingSlack};
pub use proposal::{run_epoch, EpochRun, NetworkActions, ProposalPayload};
pub use safety_module::{SafetyModuleCap, TARGET_APY};
pub use snapshot::{ChainSnapshot, MarketSnapshot, ProtocolSnapshot};
pub use tvl::{ChainValue, MarketValue};

// Re-export for callers that pick chains without depending on alloy-chains
pub use alloy_chains::NamedChain;
