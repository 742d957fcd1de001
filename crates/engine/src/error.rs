//! Error types for the emission engine.

use alloy_chains::NamedChain;
use alloy_primitives::Address;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised while loading or validating the static emission configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The configuration document is not valid TOML for this schema
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A chain id that the engine does not know about
    #[error("Unknown chain ID: {0}")]
    UnknownChain(u64),

    /// The same chain appears twice
    #[error("Chain {0} is configured more than once")]
    DuplicateChain(NamedChain),

    /// A budget split fraction outside [0, 1]
    #[error("Invalid {field} fraction {value} on chain {chain}: must be within [0, 1]")]
    InvalidFraction {
        chain: NamedChain,
        field: &'static str,
        value: Decimal,
    },

    /// The markets/safety-module/dex split hands out more than the whole chain budget
    #[error("Budget split on chain {chain} sums to {total}, which exceeds 1")]
    SplitExceedsBudget { chain: NamedChain, total: Decimal },

    /// A supply or borrow weighting ratio outside [0, 1]
    #[error("Invalid {side} ratio {value} for market {market}: must be within [0, 1]")]
    InvalidRatio {
        market: Address,
        side: &'static str,
        value: Decimal,
    },

    /// A market address listed twice on the same chain
    #[error("Market {market} is configured more than once on chain {chain}")]
    DuplicateMarket { chain: NamedChain, market: Address },

    /// Token decimals beyond what a `Decimal` can represent
    #[error("Invalid {token} decimals {decimals} on chain {chain}: at most {max} supported")]
    InvalidDecimals {
        chain: NamedChain,
        token: String,
        decimals: u32,
        max: u32,
    },

    /// No chain, or more than one chain, is flagged as the protocol token's home
    #[error("Exactly one home chain is required, found {0}")]
    HomeChainCount(usize),

    /// Epoch length of zero seconds
    #[error("Epoch length must be positive")]
    InvalidEpochLength,

    /// Negative global budget or per-epoch native amount
    #[error("Negative emission amount for {0}")]
    NegativeAmount(&'static str),
}

/// Errors that abort an epoch computation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A chain has no markets left after exclusions
    #[error("Chain {chain} has an empty market list")]
    EmptyMarketList { chain: NamedChain },

    /// The snapshot carries no data for a configured chain
    #[error("Snapshot is missing chain {chain}")]
    MissingChainSnapshot { chain: NamedChain },

    /// A reference price needed to value rewards is absent or zero
    #[error("Missing reference price for {asset} on chain {chain}")]
    MissingReferencePrice { chain: NamedChain, asset: String },

    /// Every chain reports zero value, so there is nothing to split the budget by
    #[error("Total protocol value is zero")]
    ZeroProtocolValue,

    /// Underlying decimals outside what the price and exchange-rate scales allow
    #[error("Invalid digits {digits} for market {market}")]
    InvalidDigits { market: Address, digits: u8 },

    /// A quantity exceeds the representable decimal range
    #[error("Decimal overflow while computing {0}")]
    Overflow(&'static str),

    /// Epoch boundary arithmetic overflowed a u64 timestamp
    #[error("Epoch boundary overflow: anchor {anchor}, length {length}, now {now}")]
    EpochOverflow { anchor: u64, length: u64, now: u64 },

    /// Configuration error surfaced at run time
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
