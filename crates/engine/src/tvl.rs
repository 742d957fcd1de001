//! USD valuation of markets and the weight shares derived from it.
//!
//! # Formulas
//!
//! ```text
//! supplyUSD = (totalSupply / 10^8)
//!           * (exchangeRate / 10^(18 + digits - 8))
//!           * (price / 10^(36 - digits))
//!           + boost - deboost
//! borrowUSD = (totalBorrows / 10^digits) * (price / 10^(36 - digits))
//! chainTotalUSD = Σ supplyUSD + Σ borrowUSD
//! ```
//!
//! The chain total deliberately adds supply and borrow value together as one
//! activity measure. A market's share of its chain is its supply value over
//! the chain's weighted supply value, and that single share is used for both
//! the supply and the borrow side.

use alloy_chains::NamedChain;
use alloy_primitives::Address;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::math::{div_or_zero, units_to_decimal};
use crate::snapshot::MarketRecord;

/// Decimals of every market's receipt token.
pub const RECEIPT_TOKEN_DECIMALS: u32 = 8;

/// Decimals of the oracle price before adjusting for the underlying's digits.
pub const ORACLE_PRICE_DECIMALS: u32 = 36;

/// Decimals of the exchange rate before adjusting for the underlying's digits.
pub const EXCHANGE_RATE_DECIMALS: u32 = 18;

/// USD valuation of one market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketValue {
    pub address: Address,
    /// USD price of one underlying token
    pub price_usd: Decimal,
    /// Supply value including boost and deboost
    pub supply_usd: Decimal,
    pub borrow_usd: Decimal,
    /// Fraction of the chain's weighted supply value (zero for unweighted markets)
    pub share: Decimal,
}

/// USD valuation of one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainValue {
    pub chain: NamedChain,
    pub supply_usd: Decimal,
    pub borrow_usd: Decimal,
    /// Supply plus borrow value, the chain's activity measure
    pub total_usd: Decimal,
    /// In the same order as the chain's market records
    pub markets: Vec<MarketValue>,
}

fn checked_mul(a: Decimal, b: Decimal, what: &'static str) -> Result<Decimal> {
    a.checked_mul(b).ok_or(EngineError::Overflow(what))
}

fn price_decimals(record: &MarketRecord) -> Result<u32> {
    ORACLE_PRICE_DECIMALS
        .checked_sub(u32::from(record.digits))
        .ok_or(EngineError::InvalidDigits {
            market: record.address,
            digits: record.digits,
        })
}

/// USD price of one unit of the market's underlying.
pub fn underlying_price_usd(record: &MarketRecord) -> Result<Decimal> {
    units_to_decimal(record.price, price_decimals(record)?)
}

/// Supply value of a market, with boost and deboost applied.
pub fn supply_usd(record: &MarketRecord) -> Result<Decimal> {
    let digits = u32::from(record.digits);
    let receipt_tokens = units_to_decimal(record.total_supply, RECEIPT_TOKEN_DECIMALS)?;
    let exchange_rate = units_to_decimal(
        record.exchange_rate,
        EXCHANGE_RATE_DECIMALS + digits - RECEIPT_TOKEN_DECIMALS,
    )?;
    let price = underlying_price_usd(record)?;

    let underlying = checked_mul(receipt_tokens, exchange_rate, "supply underlying")?;
    let value = checked_mul(underlying, price, "supply USD")?;
    value
        .checked_add(record.boost)
        .and_then(|v| v.checked_sub(record.deboost))
        .ok_or(EngineError::Overflow("boosted supply USD"))
}

/// Borrow value of a market.
pub fn borrow_usd(record: &MarketRecord) -> Result<Decimal> {
    let borrows = units_to_decimal(record.total_borrows, u32::from(record.digits))?;
    checked_mul(borrows, underlying_price_usd(record)?, "borrow USD")
}

/// Values every market of a chain and derives each market's weight share.
///
/// Disabled and unconfigured markets count toward the chain totals but carry
/// no weight. When no market carries weight all shares are zero.
pub fn chain_value(chain: NamedChain, records: &[MarketRecord]) -> Result<ChainValue> {
    if records.is_empty() {
        return Err(EngineError::EmptyMarketList { chain });
    }

    let mut markets = Vec::with_capacity(records.len());
    let mut weights = Vec::with_capacity(records.len());
    for record in records {
        let supply = supply_usd(record)?;
        let borrow = borrow_usd(record)?;
        let weight = if record.is_weighted() {
            supply.max(Decimal::ZERO)
        } else {
            Decimal::ZERO
        };
        weights.push(weight);
        markets.push(MarketValue {
            address: record.address,
            price_usd: underlying_price_usd(record)?,
            supply_usd: supply,
            borrow_usd: borrow,
            share: Decimal::ZERO,
        });
    }

    let total_weight: Decimal = weights.iter().copied().sum();
    for (market, weight) in markets.iter_mut().zip(&weights) {
        market.share = div_or_zero(*weight, total_weight);
        debug!(
            %chain,
            market = %market.address,
            supply_usd = %market.supply_usd,
            borrow_usd = %market.borrow_usd,
            share = %market.share,
            "valued market"
        );
    }

    let supply_usd: Decimal = markets.iter().map(|m| m.supply_usd).sum();
    let borrow_usd: Decimal = markets.iter().map(|m| m.borrow_usd).sum();

    Ok(ChainValue {
        chain,
        supply_usd,
        borrow_usd,
        total_usd: supply_usd + borrow_usd,
        markets,
    })
}

/// Each chain's fraction of total protocol value, in input order.
pub fn chain_shares(values: &[ChainValue]) -> Result<Vec<Decimal>> {
    let total: Decimal = values.iter().map(|v| v.total_usd.max(Decimal::ZERO)).sum();
    if total.is_zero() {
        return Err(EngineError::ZeroProtocolValue);
    }
    Ok(values
        .iter()
        .map(|v| div_or_zero(v.total_usd.max(Decimal::ZERO), total))
        .collect())
}
