//! Static emission configuration.
//!
//! The per-chain and per-market tables are loaded once (usually from a TOML
//! file), validated, and then passed by reference into every engine function.
//! Nothing in the engine reads configuration from anywhere else.
//!
//! # Example
//!
//! ```toml
//! global_epoch_budget = "1000000"
//!
//! [epoch]
//! anchor = 1_700_000_000
//! length_seconds = 2_419_200
//!
//! [[chains]]
//! chain_id = 8453
//! home = false
//! protocol_token_decimals = 18
//! split = { markets = "0.6", safety_module = "0.3", dex = "0.1" }
//!
//! [[chains.markets]]
//! address = "0x628ff693426583D9a7FB391E54366292F509D457"
//! alias = "MOONWELL_USDC"
//! supply_ratio = "0.5"
//! borrow_ratio = "0.5"
//! ```

use std::collections::HashSet;
use std::path::Path;

use alloy_chains::NamedChain;
use alloy_primitives::Address;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::chain::chain_serde;
use crate::error::ConfigError;
use crate::math::MAX_DECIMAL_SCALE;

/// Default epoch length: 28 days.
pub const DEFAULT_EPOCH_LENGTH: u64 = 28 * 24 * 60 * 60;

/// Default decimals of the protocol reward token.
pub const DEFAULT_PROTOCOL_TOKEN_DECIMALS: u32 = 18;

/// Epoch anchor and period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochConfig {
    /// Unix timestamp of epoch zero
    pub anchor: u64,
    /// Length of one epoch in seconds
    #[serde(default = "default_epoch_length")]
    pub length_seconds: u64,
}

fn default_epoch_length() -> u64 {
    DEFAULT_EPOCH_LENGTH
}

fn default_protocol_decimals() -> u32 {
    DEFAULT_PROTOCOL_TOKEN_DECIMALS
}

fn default_true() -> bool {
    true
}

/// Fractions of a chain's share of the global budget per destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetSplit {
    /// Fraction streamed to lending markets
    pub markets: Decimal,
    /// Fraction streamed to the staking safety module
    pub safety_module: Decimal,
    /// Fraction sent to DEX liquidity incentives
    pub dex: Decimal,
}

impl BudgetSplit {
    pub fn total(&self) -> Decimal {
        self.markets + self.safety_module + self.dex
    }
}

/// Chain-native reward token streamed alongside the protocol token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeRewardConfig {
    /// Token symbol (e.g. "GLMR", "USDC", "OP")
    pub symbol: String,
    /// Token decimals
    pub decimals: u32,
    /// Fixed amount distributed per epoch, in human units
    pub per_epoch: Decimal,
    /// Alias of the market whose oracle price values this token, used when
    /// the snapshot carries no explicit native price
    #[serde(default)]
    pub price_market: Option<String>,
}

/// Reserve automation settings for one market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveAutomationConfig {
    /// Symbolic identifier of the automation contract
    pub contract: String,
    /// Reserves kept in the market, in underlying human units
    pub minimum_reserves: Decimal,
}

/// Auction parameters used when reserve sales are initialised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveSaleConfig {
    /// Delay before the auction opens, in seconds
    pub delay_seconds: u64,
    /// Auction length in seconds; defaults to the epoch length when absent
    #[serde(default)]
    pub auction_period_seconds: Option<u64>,
}

/// Discretionary pool that may top up safety-module rewards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryPoolConfig {
    /// Whether a merkle staking campaign is funded from the capped pool
    #[serde(default = "default_true")]
    pub merkle_campaign: bool,
}

/// Static configuration for one market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Market (receipt token) address
    pub address: Address,
    /// Human alias, also the symbolic target of speed actions
    pub alias: String,
    /// USD added to the computed supply value
    #[serde(default)]
    pub boost: Decimal,
    /// USD subtracted from the computed supply value
    #[serde(default)]
    pub deboost: Decimal,
    /// Fraction of the market's proportional budget streamed to suppliers
    pub supply_ratio: Decimal,
    /// Fraction of the market's proportional budget streamed to borrowers
    pub borrow_ratio: Decimal,
    /// Disabled markets keep counting toward chain totals but get no weight
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Optional reserve automation
    #[serde(default)]
    pub reserve_automation: Option<ReserveAutomationConfig>,
}

/// Static configuration for one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// The chain
    #[serde(rename = "chain_id", with = "chain_serde")]
    pub chain: NamedChain,
    /// Whether the protocol token lives on this chain (and is bridged from it)
    #[serde(default)]
    pub home: bool,
    /// Decimals of the protocol reward token
    #[serde(default = "default_protocol_decimals")]
    pub protocol_token_decimals: u32,
    /// Split of this chain's budget share
    pub split: BudgetSplit,
    /// Native reward token, if any
    #[serde(default)]
    pub native_reward: Option<NativeRewardConfig>,
    /// Markets removed before any computation
    #[serde(default)]
    pub excluded_markets: Vec<Address>,
    /// Discretionary pool settings
    #[serde(default)]
    pub secondary_pool: Option<SecondaryPoolConfig>,
    /// Reserve sale auction settings
    #[serde(default)]
    pub reserve_sale: Option<ReserveSaleConfig>,
    /// Markets, in the order speed actions are emitted
    #[serde(default)]
    pub markets: Vec<MarketConfig>,
}

impl ChainConfig {
    /// Configuration entry for a market address.
    pub fn market(&self, address: Address) -> Option<&MarketConfig> {
        self.markets.iter().find(|m| m.address == address)
    }

    /// Whether a market is on the exclusion list.
    pub fn is_excluded(&self, address: Address) -> bool {
        self.excluded_markets.contains(&address)
    }
}

/// The whole static configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionsConfig {
    /// Protocol tokens emitted per epoch across all chains
    pub global_epoch_budget: Decimal,
    /// Epoch anchor and length
    pub epoch: EpochConfig,
    /// Chains in allocation order
    pub chains: Vec<ChainConfig>,
}

impl EmissionsConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Checks every invariant the engine relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.epoch.length_seconds == 0 {
            return Err(ConfigError::InvalidEpochLength);
        }
        if self.global_epoch_budget.is_sign_negative() {
            return Err(ConfigError::NegativeAmount("global epoch budget"));
        }

        let homes = self.chains.iter().filter(|c| c.home).count();
        if homes != 1 {
            return Err(ConfigError::HomeChainCount(homes));
        }

        let mut seen_chains = HashSet::new();
        for chain in &self.chains {
            if !seen_chains.insert(chain.chain) {
                return Err(ConfigError::DuplicateChain(chain.chain));
            }
            validate_chain(chain)?;
        }

        Ok(())
    }

    /// Configuration of one chain.
    pub fn chain(&self, chain: NamedChain) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.chain == chain)
    }

    /// The chain the protocol token is bridged from.
    pub fn home_chain(&self) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.home)
    }
}

fn validate_chain(chain: &ChainConfig) -> Result<(), ConfigError> {
    let unit = |field: &'static str, value: Decimal| {
        if value < Decimal::ZERO || value > Decimal::ONE {
            Err(ConfigError::InvalidFraction {
                chain: chain.chain,
                field,
                value,
            })
        } else {
            Ok(())
        }
    };
    unit("markets", chain.split.markets)?;
    unit("safety_module", chain.split.safety_module)?;
    unit("dex", chain.split.dex)?;

    let total = chain.split.total();
    if total > Decimal::ONE {
        return Err(ConfigError::SplitExceedsBudget {
            chain: chain.chain,
            total,
        });
    }

    let decimals = |token: &str, decimals: u32| {
        if decimals > MAX_DECIMAL_SCALE {
            Err(ConfigError::InvalidDecimals {
                chain: chain.chain,
                token: token.to_string(),
                decimals,
                max: MAX_DECIMAL_SCALE,
            })
        } else {
            Ok(())
        }
    };
    decimals("protocol token", chain.protocol_token_decimals)?;

    if let Some(native) = &chain.native_reward {
        if native.per_epoch.is_sign_negative() {
            return Err(ConfigError::NegativeAmount("native reward per epoch"));
        }
        decimals(&native.symbol, native.decimals)?;
    }

    let mut seen = HashSet::new();
    for market in &chain.markets {
        if !seen.insert(market.address) {
            return Err(ConfigError::DuplicateMarket {
                chain: chain.chain,
                market: market.address,
            });
        }
        for (side, value) in [("supply", market.supply_ratio), ("borrow", market.borrow_ratio)] {
            if value < Decimal::ZERO || value > Decimal::ONE {
                return Err(ConfigError::InvalidRatio {
                    market: market.address,
                    side,
                    value,
                });
            }
        }
    }

    Ok(())
}
