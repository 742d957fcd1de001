//! Live market data consumed by the engine.
//!
//! A snapshot is produced by an external collaborator that reads comptrollers,
//! oracles and token contracts on every chain. The engine only sees the
//! assembled result, keyed by chain id, and joins it with the static
//! [`ChainConfig`](crate::config::ChainConfig) into one ordered list of
//! [`MarketRecord`]s per chain.

use std::collections::BTreeMap;

use alloy_chains::NamedChain;
use alloy_primitives::{Address, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::chain::chain_id;
use crate::config::{ChainConfig, MarketConfig, ReserveAutomationConfig};
use crate::error::{EngineError, Result};
use crate::serde_utils::u256_dec;

/// A pair of on-chain speeds in base units per second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedPair {
    #[serde(with = "u256_dec")]
    pub supply: U256,
    #[serde(with = "u256_dec")]
    pub borrow: U256,
}

/// Raw on-chain state of one market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    /// Market (receipt token) address
    pub address: Address,
    /// Decimals of the underlying asset
    pub digits: u8,
    /// Oracle price, scaled by 10^(36 - digits)
    #[serde(with = "u256_dec")]
    pub price: U256,
    /// Receipt-token supply (8 decimals)
    #[serde(with = "u256_dec")]
    pub total_supply: U256,
    /// Borrowed underlying, in underlying base units
    #[serde(with = "u256_dec")]
    pub total_borrows: U256,
    /// Underlying per receipt token, scaled by 10^(18 + digits - 8)
    #[serde(with = "u256_dec")]
    pub exchange_rate: U256,
    /// Reserves held by the market, in underlying base units
    #[serde(default, with = "u256_dec")]
    pub total_reserves: U256,
    /// Current protocol-token speeds
    #[serde(default)]
    pub protocol_speeds: SpeedPair,
    /// Current native-token speeds
    #[serde(default)]
    pub native_speeds: SpeedPair,
}

/// Chain-level state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainSnapshot {
    /// USD price of the protocol token
    pub protocol_token_price: Decimal,
    /// USD price of the native reward token, when known directly
    #[serde(default)]
    pub native_token_price: Option<Decimal>,
    /// Protocol tokens staked in the safety module, in base units
    #[serde(default, with = "u256_dec")]
    pub staked_total_supply: U256,
    /// Discretionary pool balance, in protocol-token base units
    #[serde(default, with = "u256_dec")]
    pub secondary_pool_balance: U256,
    /// Native fee to bridge protocol tokens to this chain, in the home chain's base units
    #[serde(default, with = "u256_dec")]
    pub bridge_cost_estimate: U256,
    /// Markets in discovery order
    pub markets: Vec<MarketSnapshot>,
}

/// Snapshot of every chain, keyed by chain id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolSnapshot {
    pub chains: BTreeMap<u64, ChainSnapshot>,
}

impl ProtocolSnapshot {
    /// Parses a JSON snapshot.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Snapshot of one chain.
    pub fn chain(&self, chain: NamedChain) -> Result<&ChainSnapshot> {
        self.chains
            .get(&chain_id(chain))
            .ok_or(EngineError::MissingChainSnapshot { chain })
    }
}

/// One market with its live data and static configuration joined.
///
/// Configuration misses are not errors: the config-derived fields are `None`
/// (or neutral) and the market still counts toward chain totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketRecord {
    pub address: Address,
    /// `None` when discovery returned a market with no configuration entry
    pub alias: Option<String>,
    pub digits: u8,
    pub boost: Decimal,
    pub deboost: Decimal,
    pub supply_ratio: Option<Decimal>,
    pub borrow_ratio: Option<Decimal>,
    pub enabled: bool,
    pub reserve_automation: Option<ReserveAutomationConfig>,
    pub price: U256,
    pub total_supply: U256,
    pub total_borrows: U256,
    pub exchange_rate: U256,
    pub total_reserves: U256,
    pub protocol_speeds: SpeedPair,
    pub native_speeds: SpeedPair,
}

impl MarketRecord {
    /// Joins a market snapshot with its (possibly missing) configuration.
    pub fn join(snapshot: &MarketSnapshot, config: Option<&MarketConfig>) -> Self {
        Self {
            address: snapshot.address,
            alias: config.map(|c| c.alias.clone()),
            digits: snapshot.digits,
            boost: config.map(|c| c.boost).unwrap_or_default(),
            deboost: config.map(|c| c.deboost).unwrap_or_default(),
            supply_ratio: config.map(|c| c.supply_ratio),
            borrow_ratio: config.map(|c| c.borrow_ratio),
            enabled: config.is_some_and(|c| c.enabled),
            reserve_automation: config.and_then(|c| c.reserve_automation.clone()),
            price: snapshot.price,
            total_supply: snapshot.total_supply,
            total_borrows: snapshot.total_borrows,
            exchange_rate: snapshot.exchange_rate,
            total_reserves: snapshot.total_reserves,
            protocol_speeds: snapshot.protocol_speeds,
            native_speeds: snapshot.native_speeds,
        }
    }

    /// Whether the market carries weight when issuing new speeds.
    pub fn is_weighted(&self) -> bool {
        self.enabled && self.alias.is_some()
    }
}

/// Builds the ordered market records for one chain.
///
/// Excluded markets are dropped before anything else sees them. An empty
/// result is a precondition failure.
pub fn market_records(config: &ChainConfig, snapshot: &ChainSnapshot) -> Result<Vec<MarketRecord>> {
    let records: Vec<MarketRecord> = snapshot
        .markets
        .iter()
        .filter(|m| !config.is_excluded(m.address))
        .map(|m| {
            let market_config = config.market(m.address);
            if market_config.is_none() {
                warn!(
                    chain = %config.chain,
                    market = %m.address,
                    "market has no configuration entry; it will not receive speeds"
                );
            }
            MarketRecord::join(m, market_config)
        })
        .collect();

    if records.is_empty() {
        return Err(EngineError::EmptyMarketList {
            chain: config.chain,
        });
    }

    Ok(records)
}
