//! Emission allocation: chain budgets and per-market reward speeds.
//!
//! For each chain the epoch's protocol-token budget is
//! `globalEpochBudget * chainShare * split`, with one split fraction each for
//! markets, the safety module and DEX incentives. Each market then streams
//!
//! ```text
//! supplySpeed = marketsBudget * marketShare * supplyRatio / epochLength
//! borrowSpeed = marketsBudget * marketShare * borrowRatio / epochLength
//! ```
//!
//! tokens per second. Native-token speeds use the chain's fixed native amount
//! per epoch in place of `marketsBudget`, without the chain share.
//!
//! # Zero-speed floor
//!
//! A borrow speed that would quantize to zero base units is replaced by one
//! base unit per second ([`epsilon`]); a literal zero speed has different
//! on-chain semantics than a tiny one. Supply speeds are only clamped at zero.

use alloy_chains::NamedChain;
use alloy_primitives::{Address, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{ChainConfig, EmissionsConfig, NativeRewardConfig};
use crate::epoch::EpochWindow;
use crate::error::{EngineError, Result};
use crate::math::{div_or_zero, epsilon, quantize, units_to_decimal, Rounding, SECONDS_PER_YEAR};
use crate::safety_module::SafetyModuleCap;
use crate::snapshot::{market_records, ChainSnapshot, MarketRecord, ProtocolSnapshot, SpeedPair};
use crate::tvl::{chain_shares, chain_value, underlying_price_usd, ChainValue, MarketValue};

/// Which token a speed is denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RewardToken {
    /// The protocol's own reward token
    Protocol,
    /// The chain's native reward token
    Native,
}

/// Continuous speed for one side of a market, in tokens per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SideSpeed {
    /// Speed straight out of the allocation formula
    pub raw: Decimal,
    /// Speed after the zero floor policy
    pub speed: Decimal,
    /// Speed currently configured on chain, in base units
    #[serde(with = "crate::serde_utils::u256_dec")]
    pub current: U256,
}

/// Supply and borrow speeds of one reward token on one market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardSpeeds {
    pub token: RewardToken,
    pub decimals: u32,
    pub supply: SideSpeed,
    pub borrow: SideSpeed,
}

/// Reward APRs before and after the new speeds, summed across reward tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AprSummary {
    pub supply_before: Decimal,
    pub supply_after: Decimal,
    pub borrow_before: Decimal,
    pub borrow_after: Decimal,
}

/// Reserves above the minimum that will be swept into an automation contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveSale {
    pub market: String,
    pub address: Address,
    /// Symbolic automation contract
    pub contract: String,
    /// Floor-quantized amount, in underlying base units
    #[serde(with = "crate::serde_utils::u256_dec")]
    pub amount: U256,
}

/// Allocation result for one market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketAllocation {
    pub address: Address,
    pub alias: Option<String>,
    pub enabled: bool,
    pub supply_usd: Decimal,
    pub borrow_usd: Decimal,
    pub share: Decimal,
    /// `None` for unconfigured markets
    pub protocol: Option<RewardSpeeds>,
    /// `None` for unconfigured markets or chains without a native reward
    pub native: Option<RewardSpeeds>,
    pub apr: AprSummary,
}

impl MarketAllocation {
    /// Speeds for one reward token.
    pub fn speeds(&self, token: RewardToken) -> Option<&RewardSpeeds> {
        match token {
            RewardToken::Protocol => self.protocol.as_ref(),
            RewardToken::Native => self.native.as_ref(),
        }
    }
}

/// Per-epoch budgets of one chain, in human token units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainBudget {
    pub markets: Decimal,
    pub safety_module: Decimal,
    pub dex: Decimal,
    /// Native tokens distributed to markets
    pub native: Option<Decimal>,
}

impl ChainBudget {
    /// Protocol tokens the chain needs for the epoch.
    pub fn protocol_total(&self) -> Decimal {
        self.markets + self.safety_module + self.dex
    }
}

/// Allocation result for one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainAllocation {
    pub chain: NamedChain,
    pub home: bool,
    pub protocol_token_decimals: u32,
    pub native_reward: Option<NativeRewardConfig>,
    pub total_usd: Decimal,
    pub share: Decimal,
    pub budget: ChainBudget,
    pub protocol_token_price: Decimal,
    pub native_token_price: Option<Decimal>,
    #[serde(with = "crate::serde_utils::u256_dec")]
    pub bridge_cost_estimate: U256,
    pub markets: Vec<MarketAllocation>,
    pub safety_module: SafetyModuleCap,
    /// Reserve sweeps, decided once and shared by every action that needs them
    pub reserve_sales: Vec<ReserveSale>,
}

/// Allocation result for the whole protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochAllocation {
    pub window: EpochWindow,
    pub global_epoch_budget: Decimal,
    pub chains: Vec<ChainAllocation>,
}

impl EpochAllocation {
    pub fn chain(&self, chain: NamedChain) -> Option<&ChainAllocation> {
        self.chains.iter().find(|c| c.chain == chain)
    }
}

/// `budget * share * ratio / epochLength`.
pub fn raw_speed(budget: Decimal, share: Decimal, ratio: Decimal, epoch_length: Decimal) -> Result<Decimal> {
    let per_epoch = budget
        .checked_mul(share)
        .and_then(|v| v.checked_mul(ratio))
        .ok_or(EngineError::Overflow("raw speed"))?;
    Ok(div_or_zero(per_epoch, epoch_length))
}

/// Supply floor: clamp at zero, no epsilon substitution.
pub fn floor_supply_speed(raw: Decimal) -> Decimal {
    raw.max(Decimal::ZERO)
}

/// Borrow floor: a speed that quantizes to zero becomes one base unit per second.
pub fn floor_borrow_speed(raw: Decimal, decimals: u32) -> Result<Decimal> {
    if quantize(raw, decimals, Rounding::Floor)?.is_zero() {
        Ok(epsilon(decimals))
    } else {
        Ok(raw)
    }
}

fn reward_speeds(
    token: RewardToken,
    decimals: u32,
    budget: Decimal,
    record: &MarketRecord,
    share: Decimal,
    current: SpeedPair,
    window: &EpochWindow,
) -> Result<Option<RewardSpeeds>> {
    let (Some(supply_ratio), Some(borrow_ratio)) = (record.supply_ratio, record.borrow_ratio) else {
        return Ok(None);
    };
    let length = window.length_decimal();
    let raw_supply = raw_speed(budget, share, supply_ratio, length)?;
    let raw_borrow = raw_speed(budget, share, borrow_ratio, length)?;

    Ok(Some(RewardSpeeds {
        token,
        decimals,
        supply: SideSpeed {
            raw: raw_supply,
            speed: floor_supply_speed(raw_supply),
            current: current.supply,
        },
        borrow: SideSpeed {
            raw: raw_borrow,
            speed: floor_borrow_speed(raw_borrow, decimals)?,
            current: current.borrow,
        },
    }))
}

/// Annualised reward value over the side's USD value.
fn side_apr(speed: Decimal, price: Decimal, side_usd: Decimal) -> Result<Decimal> {
    if side_usd <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    let yearly = speed
        .checked_mul(Decimal::from(SECONDS_PER_YEAR))
        .and_then(|v| v.checked_mul(price))
        .ok_or(EngineError::Overflow("reward APR"))?;
    Ok(div_or_zero(yearly, side_usd))
}

fn add_apr(total: Decimal, apr: Decimal) -> Result<Decimal> {
    total.checked_add(apr).ok_or(EngineError::Overflow("reward APR"))
}

fn apr_summary(
    value: &MarketValue,
    speeds: &[(Option<RewardSpeeds>, SpeedPair, u32, Decimal)],
) -> Result<AprSummary> {
    let mut apr = AprSummary::default();
    for (new, current, decimals, price) in speeds {
        let supply_before = units_to_decimal(current.supply, *decimals)?;
        let borrow_before = units_to_decimal(current.borrow, *decimals)?;
        apr.supply_before = add_apr(apr.supply_before, side_apr(supply_before, *price, value.supply_usd)?)?;
        apr.borrow_before = add_apr(apr.borrow_before, side_apr(borrow_before, *price, value.borrow_usd)?)?;
        if let Some(new) = new {
            apr.supply_after = add_apr(apr.supply_after, side_apr(new.supply.speed, *price, value.supply_usd)?)?;
            apr.borrow_after = add_apr(apr.borrow_after, side_apr(new.borrow.speed, *price, value.borrow_usd)?)?;
        }
    }
    Ok(apr)
}

/// USD price of the chain's native reward token.
///
/// Taken from the snapshot when present, otherwise from the oracle price of
/// the configured reference market. A missing or zero price aborts the chain.
pub fn native_token_price(
    config: &ChainConfig,
    native: &NativeRewardConfig,
    snapshot: &ChainSnapshot,
    records: &[MarketRecord],
) -> Result<Decimal> {
    let missing = || EngineError::MissingReferencePrice {
        chain: config.chain,
        asset: native.symbol.clone(),
    };

    let price = match snapshot.native_token_price {
        Some(price) => price,
        None => {
            let alias = native.price_market.as_deref().ok_or_else(missing)?;
            let record = records
                .iter()
                .find(|r| r.alias.as_deref() == Some(alias))
                .ok_or_else(missing)?;
            underlying_price_usd(record)?
        }
    };

    if price <= Decimal::ZERO {
        return Err(missing());
    }
    Ok(price)
}

/// Reserves above the configured minimum, floor-quantized at the market's digits.
///
/// Only markets with a strictly positive amount are returned.
pub fn reserve_sales(records: &[MarketRecord]) -> Result<Vec<ReserveSale>> {
    let mut sales = Vec::new();
    for record in records {
        let (Some(alias), Some(automation)) = (&record.alias, &record.reserve_automation) else {
            continue;
        };
        let digits = u32::from(record.digits);
        let reserves = units_to_decimal(record.total_reserves, digits)?;
        let excess = reserves - automation.minimum_reserves;
        let amount = quantize(excess, digits, Rounding::Floor)?;
        if amount > U256::ZERO {
            sales.push(ReserveSale {
                market: alias.clone(),
                address: record.address,
                contract: automation.contract.clone(),
                amount,
            });
        }
    }
    Ok(sales)
}

/// Allocates one chain's budget across its markets.
pub fn allocate_chain(
    config: &ChainConfig,
    snapshot: &ChainSnapshot,
    records: &[MarketRecord],
    value: &ChainValue,
    chain_share: Decimal,
    global_epoch_budget: Decimal,
    window: &EpochWindow,
) -> Result<ChainAllocation> {
    let chain = config.chain;
    if snapshot.protocol_token_price <= Decimal::ZERO {
        return Err(EngineError::MissingReferencePrice {
            chain,
            asset: "protocol token".to_string(),
        });
    }

    let chain_budget = global_epoch_budget
        .checked_mul(chain_share)
        .ok_or(EngineError::Overflow("chain budget"))?;
    let native_price = config
        .native_reward
        .as_ref()
        .map(|native| native_token_price(config, native, snapshot, records))
        .transpose()?;
    let budget = ChainBudget {
        markets: chain_budget * config.split.markets,
        safety_module: chain_budget * config.split.safety_module,
        dex: chain_budget * config.split.dex,
        native: config.native_reward.as_ref().map(|n| n.per_epoch),
    };
    info!(
        %chain,
        share = %chain_share,
        markets = %budget.markets,
        safety_module = %budget.safety_module,
        dex = %budget.dex,
        "chain budget"
    );

    let protocol_decimals = config.protocol_token_decimals;
    let mut markets = Vec::with_capacity(records.len());
    for (record, market_value) in records.iter().zip(&value.markets) {
        let share = market_value.share;
        let protocol = reward_speeds(
            RewardToken::Protocol,
            protocol_decimals,
            budget.markets,
            record,
            share,
            record.protocol_speeds,
            window,
        )?;

        let mut apr_inputs = vec![(
            protocol,
            record.protocol_speeds,
            protocol_decimals,
            snapshot.protocol_token_price,
        )];

        let native = match (&config.native_reward, native_price) {
            (Some(native), Some(price)) => {
                let speeds = reward_speeds(
                    RewardToken::Native,
                    native.decimals,
                    native.per_epoch,
                    record,
                    share,
                    record.native_speeds,
                    window,
                )?;
                apr_inputs.push((speeds, record.native_speeds, native.decimals, price));
                speeds
            }
            _ => None,
        };

        let apr = apr_summary(market_value, &apr_inputs)?;
        debug!(
            %chain,
            market = ?record.alias,
            share = %share,
            supply_speed = ?protocol.map(|s| s.supply.speed),
            borrow_speed = ?protocol.map(|s| s.borrow.speed),
            "allocated market"
        );

        markets.push(MarketAllocation {
            address: record.address,
            alias: record.alias.clone(),
            enabled: record.enabled,
            supply_usd: market_value.supply_usd,
            borrow_usd: market_value.borrow_usd,
            share,
            protocol,
            native,
            apr,
        });
    }

    let staked_total = units_to_decimal(snapshot.staked_total_supply, protocol_decimals)?;
    let secondary_available = if config.secondary_pool.is_some() {
        units_to_decimal(snapshot.secondary_pool_balance, protocol_decimals)?
    } else {
        Decimal::ZERO
    };
    let safety_module =
        SafetyModuleCap::compute(staked_total, budget.safety_module, secondary_available, window)?;

    Ok(ChainAllocation {
        chain,
        home: config.home,
        protocol_token_decimals: protocol_decimals,
        native_reward: config.native_reward.clone(),
        total_usd: value.total_usd,
        share: chain_share,
        budget,
        protocol_token_price: snapshot.protocol_token_price,
        native_token_price: native_price,
        bridge_cost_estimate: snapshot.bridge_cost_estimate,
        markets,
        safety_module,
        reserve_sales: reserve_sales(records)?,
    })
}

/// Allocates the global budget for the epoch following `now`.
pub fn allocate_epoch(
    config: &EmissionsConfig,
    snapshot: &ProtocolSnapshot,
    now: u64,
) -> Result<EpochAllocation> {
    let window = EpochWindow::from_config(&config.epoch, now)?;

    let mut prepared = Vec::with_capacity(config.chains.len());
    for chain_config in &config.chains {
        let chain_snapshot = snapshot.chain(chain_config.chain)?;
        let records = market_records(chain_config, chain_snapshot)?;
        let value = chain_value(chain_config.chain, &records)?;
        prepared.push((chain_config, chain_snapshot, records, value));
    }

    let values: Vec<ChainValue> = prepared.iter().map(|(_, _, _, v)| v.clone()).collect();
    let shares = chain_shares(&values)?;

    let chains = prepared
        .iter()
        .zip(shares)
        .map(|((chain_config, chain_snapshot, records, value), share)| {
            allocate_chain(
                chain_config,
                chain_snapshot,
                records,
                value,
                share,
                config.global_epoch_budget,
                &window,
            )
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(EpochAllocation {
        window,
        global_epoch_budget: config.global_epoch_budget,
        chains,
    })
}
