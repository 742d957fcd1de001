//! Governance actions realizing an epoch allocation.
//!
//! Actions are assembled per network in one pass, in a fixed order:
//!
//! 1. bridges from the home chain to every remote chain (home chain only)
//! 2. market funding transfers, one per reward token
//! 3. speed updates per market and reward token
//! 4. safety-module funding and emission
//! 5. DEX incentive funding
//! 6. secondary pool withdraw and merkle campaign
//! 7. reserve automation sale and reserve transfers
//!
//! Transfer-like actions whose amount quantizes to zero are dropped at the end.
//! Targets are symbolic names resolved by the proposal executor, never addresses.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use alloy_primitives::U256;
use rust_decimal::Decimal;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use tracing::debug;

use crate::allocation::{ChainAllocation, EpochAllocation, RewardSpeeds, RewardToken};
use crate::chain::chain_id;
use crate::config::{ChainConfig, EmissionsConfig, ReserveSaleConfig};
use crate::epoch::EpochWindow;
use crate::error::{ConfigError, EngineError, Result};
use crate::math::{epsilon, fund_amount, quantize, withdraw_amount, Rounding, RoundingSlack};
use crate::serde_utils::u256_dec;

/// Symbol of the protocol reward token.
pub const PROTOCOL_TOKEN: &str = "WELL";

/// Governor on the home chain; source of bridges and home-chain funding.
pub const MULTICHAIN_GOVERNOR: &str = "MULTICHAIN_GOVERNOR";
/// Governor on every remote chain; receives bridged tokens.
pub const TEMPORAL_GOVERNOR: &str = "TEMPORAL_GOVERNOR";
/// Reward distributor on the home chain.
pub const COMPTROLLER: &str = "COMPTROLLER";
/// Multi-reward distributor on remote chains.
pub const MRD_PROXY: &str = "MRD_PROXY";
/// Funding source of the safety module.
pub const ECOSYSTEM_RESERVE: &str = "ECOSYSTEM_RESERVE";
/// Relayer that forwards DEX liquidity incentives.
pub const DEX_RELAYER: &str = "DEX_RELAYER";
/// Custody of the secondary pool.
pub const WELL_HOLDER: &str = "WELL_HOLDER";
/// Staking contract targeted by merkle campaigns.
pub const STK_WELL_PROXY: &str = "STK_WELL_PROXY";

/// A speed as written by a distributor speed update, on every chain.
///
/// Serializes as a decimal string: `"-1"` pauses the distributor for the
/// market, `"1"` keeps the minimal non-zero speed, anything else is a rate in
/// base units per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedValue {
    /// Non-positive speed: pause emissions on this market
    Paused,
    /// Exactly one base unit per second
    MinimalEpsilon,
    /// Floor-quantized base units per second
    Rate(U256),
}

impl SpeedValue {
    const PAUSED: &'static str = "-1";
    const MINIMAL_EPSILON: &'static str = "1";

    /// Encodes a continuous speed: `<= 0` pauses, exactly epsilon keeps the
    /// minimal speed, everything else is floor-quantized.
    pub fn encode(speed: Decimal, decimals: u32) -> Result<Self> {
        if speed <= Decimal::ZERO {
            Ok(Self::Paused)
        } else if speed == epsilon(decimals) {
            Ok(Self::MinimalEpsilon)
        } else {
            Ok(Self::Rate(quantize(speed, decimals, Rounding::Floor)?))
        }
    }

    /// Base units actually streamed per second; a paused market streams nothing.
    pub fn base_units(self) -> U256 {
        match self {
            Self::Paused => U256::ZERO,
            Self::MinimalEpsilon => U256::from(1u64),
            Self::Rate(rate) => rate,
        }
    }
}

impl fmt::Display for SpeedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Paused => f.write_str(Self::PAUSED),
            Self::MinimalEpsilon => f.write_str(Self::MINIMAL_EPSILON),
            Self::Rate(rate) => write!(f, "{rate}"),
        }
    }
}

impl Serialize for SpeedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct SpeedValueVisitor;

impl Visitor<'_> for SpeedValueVisitor {
    type Value = SpeedValue;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("\"-1\", \"1\" or a decimal rate string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<SpeedValue, E> {
        match v {
            SpeedValue::PAUSED => Ok(SpeedValue::Paused),
            SpeedValue::MINIMAL_EPSILON => Ok(SpeedValue::MinimalEpsilon),
            _ => U256::from_str(v)
                .map(SpeedValue::Rate)
                .map_err(|e| E::custom(format!("invalid speed {v:?}: {e}"))),
        }
    }
}

impl<'de> Deserialize<'de> for SpeedValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_str(SpeedValueVisitor)
    }
}

/// One step of the governance proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GovernanceAction {
    /// Token transfer between two symbolic holders
    Transfer {
        token: String,
        from: String,
        to: String,
        #[serde(with = "u256_dec")]
        amount: U256,
    },
    /// Cross-chain transfer of the protocol token
    Bridge {
        token: String,
        from: String,
        to: String,
        network: u64,
        #[serde(with = "u256_dec")]
        amount: U256,
        #[serde(with = "u256_dec")]
        native_fee: U256,
    },
    /// Home-chain comptroller speed update
    SetSpeed {
        market: String,
        reward_token: String,
        supply_speed: SpeedValue,
        borrow_speed: SpeedValue,
    },
    /// Remote-chain distributor speed update
    SetMrdSpeed {
        market: String,
        reward_token: String,
        supply_speed: SpeedValue,
        borrow_speed: SpeedValue,
    },
    /// Safety-module emission per second
    SetSafetyModuleEmission {
        #[serde(with = "u256_dec")]
        emission_per_second: U256,
    },
    /// Opens reserve auctions for the listed automation contracts
    InitSale {
        reserve_automation_contracts: Vec<String>,
        delay: u64,
        auction_period: u64,
    },
    /// Sweeps excess reserves into an automation contract
    TransferReserves {
        market: String,
        to: String,
        #[serde(with = "u256_dec")]
        amount: U256,
    },
    /// Moves the capped secondary pool out of custody
    Withdraw {
        token: String,
        from: String,
        to: String,
        #[serde(with = "u256_dec")]
        amount: U256,
    },
    /// Funds a staking reward campaign over the epoch
    MerkleCampaign {
        token: String,
        target: String,
        #[serde(with = "u256_dec")]
        amount: U256,
        start_time_stamp: u64,
        end_time_stamp: u64,
    },
}

impl GovernanceAction {
    /// Moved amount for transfer-like actions, `None` for parameter updates.
    pub fn amount(&self) -> Option<U256> {
        match self {
            Self::Transfer { amount, .. }
            | Self::Bridge { amount, .. }
            | Self::TransferReserves { amount, .. }
            | Self::Withdraw { amount, .. }
            | Self::MerkleCampaign { amount, .. } => Some(*amount),
            Self::SetSpeed { .. }
            | Self::SetMrdSpeed { .. }
            | Self::SetSafetyModuleEmission { .. }
            | Self::InitSale { .. } => None,
        }
    }

    /// Short action name as it appears in the payload.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transfer { .. } => "transfer",
            Self::Bridge { .. } => "bridge",
            Self::SetSpeed { .. } => "setSpeed",
            Self::SetMrdSpeed { .. } => "setMrdSpeed",
            Self::SetSafetyModuleEmission { .. } => "setSafetyModuleEmission",
            Self::InitSale { .. } => "initSale",
            Self::TransferReserves { .. } => "transferReserves",
            Self::Withdraw { .. } => "withdraw",
            Self::MerkleCampaign { .. } => "merkleCampaign",
        }
    }
}

fn governor(chain: &ChainAllocation) -> &'static str {
    if chain.home {
        MULTICHAIN_GOVERNOR
    } else {
        TEMPORAL_GOVERNOR
    }
}

fn distributor(chain: &ChainAllocation) -> &'static str {
    if chain.home {
        COMPTROLLER
    } else {
        MRD_PROXY
    }
}

fn token_symbol(chain: &ChainAllocation, token: RewardToken) -> String {
    match (token, &chain.native_reward) {
        (RewardToken::Native, Some(native)) => native.symbol.clone(),
        _ => PROTOCOL_TOKEN.to_string(),
    }
}

/// Tokens streamed to named markets over the epoch: `Σ (supply + borrow) · length`.
fn streamed_over_epoch(chain: &ChainAllocation, token: RewardToken, window: &EpochWindow) -> Decimal {
    let per_second: Decimal = chain
        .markets
        .iter()
        .filter(|m| m.alias.is_some())
        .filter_map(|m| m.speeds(token))
        .map(|s| s.supply.speed + s.borrow.speed)
        .sum();
    per_second * window.length_decimal()
}

fn bridge_actions(allocation: &EpochAllocation, home: &ChainAllocation) -> Result<Vec<GovernanceAction>> {
    let mut remotes: Vec<&ChainAllocation> = allocation.chains.iter().filter(|c| !c.home).collect();
    remotes.sort_by_key(|c| chain_id(c.chain));

    remotes
        .into_iter()
        .map(|remote| {
            Ok(GovernanceAction::Bridge {
                token: PROTOCOL_TOKEN.to_string(),
                from: MULTICHAIN_GOVERNOR.to_string(),
                to: TEMPORAL_GOVERNOR.to_string(),
                network: chain_id(remote.chain),
                amount: fund_amount(
                    remote.budget.protocol_total(),
                    home.protocol_token_decimals,
                    RoundingSlack::BridgePadding,
                )?,
                native_fee: remote.bridge_cost_estimate,
            })
        })
        .collect()
}

fn funding_actions(chain: &ChainAllocation, window: &EpochWindow) -> Result<Vec<GovernanceAction>> {
    let decimals = chain.protocol_token_decimals;
    // Home funding covers exactly what is streamed; remote funding moves what landed
    let protocol_amount = if chain.home {
        fund_amount(
            streamed_over_epoch(chain, RewardToken::Protocol, window),
            decimals,
            RoundingSlack::TransferPadding,
        )?
    } else {
        withdraw_amount(chain.budget.markets, decimals, RoundingSlack::WithdrawPadding)?
    };

    let mut actions = vec![GovernanceAction::Transfer {
        token: PROTOCOL_TOKEN.to_string(),
        from: governor(chain).to_string(),
        to: distributor(chain).to_string(),
        amount: protocol_amount,
    }];

    if let Some(native) = &chain.native_reward {
        actions.push(GovernanceAction::Transfer {
            token: native.symbol.clone(),
            from: governor(chain).to_string(),
            to: distributor(chain).to_string(),
            amount: fund_amount(native.per_epoch, native.decimals, RoundingSlack::TransferPadding)?,
        });
    }

    Ok(actions)
}

fn speed_action(chain: &ChainAllocation, market: &str, speeds: &RewardSpeeds) -> Result<GovernanceAction> {
    let supply = SpeedValue::encode(speeds.supply.speed, speeds.decimals)?;
    let borrow = SpeedValue::encode(speeds.borrow.speed, speeds.decimals)?;
    let reward_token = token_symbol(chain, speeds.token);

    Ok(if chain.home {
        GovernanceAction::SetSpeed {
            market: market.to_string(),
            reward_token,
            supply_speed: supply,
            borrow_speed: borrow,
        }
    } else {
        GovernanceAction::SetMrdSpeed {
            market: market.to_string(),
            reward_token,
            supply_speed: supply,
            borrow_speed: borrow,
        }
    })
}

fn speed_actions(chain: &ChainAllocation) -> Result<Vec<GovernanceAction>> {
    let mut actions = Vec::new();
    for market in &chain.markets {
        let Some(alias) = &market.alias else {
            continue;
        };
        for speeds in [&market.protocol, &market.native].into_iter().flatten() {
            actions.push(speed_action(chain, alias, speeds)?);
        }
    }
    Ok(actions)
}

fn safety_module_actions(chain: &ChainAllocation, window: &EpochWindow) -> Result<Vec<GovernanceAction>> {
    let decimals = chain.protocol_token_decimals;
    let budget = chain.budget.safety_module;
    let per_second = budget
        .checked_div(window.length_decimal())
        .ok_or(EngineError::Overflow("safety module emission"))?;

    Ok(vec![
        GovernanceAction::Transfer {
            token: PROTOCOL_TOKEN.to_string(),
            from: governor(chain).to_string(),
            to: ECOSYSTEM_RESERVE.to_string(),
            amount: fund_amount(budget, decimals, RoundingSlack::TransferPadding)?,
        },
        GovernanceAction::SetSafetyModuleEmission {
            emission_per_second: quantize(per_second, decimals, Rounding::Floor)?,
        },
    ])
}

fn dex_actions(chain: &ChainAllocation) -> Result<Vec<GovernanceAction>> {
    Ok(vec![GovernanceAction::Transfer {
        token: PROTOCOL_TOKEN.to_string(),
        from: governor(chain).to_string(),
        to: DEX_RELAYER.to_string(),
        amount: fund_amount(
            chain.budget.dex,
            chain.protocol_token_decimals,
            RoundingSlack::TransferPadding,
        )?,
    }])
}

fn secondary_pool_actions(
    chain: &ChainAllocation,
    config: &ChainConfig,
    window: &EpochWindow,
) -> Result<Vec<GovernanceAction>> {
    let Some(pool) = &config.secondary_pool else {
        return Ok(Vec::new());
    };
    let decimals = chain.protocol_token_decimals;
    let capped = chain.safety_module.capped_secondary;

    let mut actions = vec![GovernanceAction::Withdraw {
        token: PROTOCOL_TOKEN.to_string(),
        from: WELL_HOLDER.to_string(),
        to: governor(chain).to_string(),
        amount: withdraw_amount(capped, decimals, RoundingSlack::WithdrawPadding)?,
    }];
    if pool.merkle_campaign {
        actions.push(GovernanceAction::MerkleCampaign {
            token: PROTOCOL_TOKEN.to_string(),
            target: STK_WELL_PROXY.to_string(),
            amount: fund_amount(capped, decimals, RoundingSlack::CampaignPadding)?,
            start_time_stamp: window.start,
            end_time_stamp: window.end,
        });
    }
    Ok(actions)
}

fn reserve_actions(
    chain: &ChainAllocation,
    config: &ChainConfig,
    window: &EpochWindow,
) -> Vec<GovernanceAction> {
    if chain.reserve_sales.is_empty() {
        return Vec::new();
    }
    let sale = config.reserve_sale.unwrap_or(ReserveSaleConfig {
        delay_seconds: 0,
        auction_period_seconds: None,
    });

    let mut actions = vec![GovernanceAction::InitSale {
        reserve_automation_contracts: chain.reserve_sales.iter().map(|s| s.contract.clone()).collect(),
        delay: sale.delay_seconds,
        auction_period: sale.auction_period_seconds.unwrap_or(window.length),
    }];
    actions.extend(chain.reserve_sales.iter().map(|s| GovernanceAction::TransferReserves {
        market: s.market.clone(),
        to: s.contract.clone(),
        amount: s.amount,
    }));
    actions
}

/// Ordered actions for one network.
pub fn chain_actions(
    allocation: &EpochAllocation,
    chain: &ChainAllocation,
    config: &ChainConfig,
) -> Result<Vec<GovernanceAction>> {
    let window = &allocation.window;
    let mut actions = Vec::new();

    if chain.home {
        actions.extend(bridge_actions(allocation, chain)?);
    }
    actions.extend(funding_actions(chain, window)?);
    actions.extend(speed_actions(chain)?);
    actions.extend(safety_module_actions(chain, window)?);
    actions.extend(dex_actions(chain)?);
    actions.extend(secondary_pool_actions(chain, config, window)?);
    actions.extend(reserve_actions(chain, config, window));

    let before = actions.len();
    actions.retain(|a| a.amount().is_none_or(|amount| !amount.is_zero()));
    debug!(
        chain = %chain.chain,
        actions = actions.len(),
        dropped = before - actions.len(),
        "assembled actions"
    );

    Ok(actions)
}

/// Actions for every network, keyed by chain id.
pub fn assemble(
    config: &EmissionsConfig,
    allocation: &EpochAllocation,
) -> Result<BTreeMap<u64, Vec<GovernanceAction>>> {
    let mut networks = BTreeMap::new();
    for chain in &allocation.chains {
        let chain_config = config
            .chain(chain.chain)
            .ok_or(ConfigError::UnknownChain(chain_id(chain.chain)))?;
        networks.insert(chain_id(chain.chain), chain_actions(allocation, chain, chain_config)?);
    }
    Ok(networks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_speed_value_encoding() {
        assert_eq!(SpeedValue::encode(Decimal::ZERO, 18).unwrap(), SpeedValue::Paused);
        assert_eq!(SpeedValue::encode(dec!(-0.5), 18).unwrap(), SpeedValue::Paused);
        assert_eq!(
            SpeedValue::encode(epsilon(18), 18).unwrap(),
            SpeedValue::MinimalEpsilon
        );
        assert_eq!(
            SpeedValue::encode(dec!(0.000001), 6).unwrap(),
            SpeedValue::MinimalEpsilon
        );
        assert_eq!(
            SpeedValue::encode(dec!(0.0000025), 6).unwrap(),
            SpeedValue::Rate(U256::from(2u64))
        );
    }

    #[test]
    fn test_speed_value_serde() {
        let json = serde_json::to_string(&[
            SpeedValue::Paused,
            SpeedValue::MinimalEpsilon,
            SpeedValue::Rate(U256::from(61_983_471_074_380u64)),
        ])
        .unwrap();
        assert_eq!(json, r#"["-1","1","61983471074380"]"#);

        let back: Vec<SpeedValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(back[0], SpeedValue::Paused);
        assert_eq!(back[2], SpeedValue::Rate(U256::from(61_983_471_074_380u64)));
    }

    #[test]
    fn test_streamed_base_units() {
        assert_eq!(SpeedValue::Paused.base_units(), U256::ZERO);
        assert_eq!(SpeedValue::MinimalEpsilon.base_units(), U256::from(1u64));
        assert_eq!(SpeedValue::Rate(U256::from(7u64)).base_units(), U256::from(7u64));
    }

    #[test]
    fn test_comptroller_speed_keeps_the_pause_sentinel() {
        let action = GovernanceAction::SetSpeed {
            market: "MOONWELL_USDC".to_string(),
            reward_token: PROTOCOL_TOKEN.to_string(),
            supply_speed: SpeedValue::encode(Decimal::ZERO, 18).unwrap(),
            borrow_speed: SpeedValue::encode(epsilon(18), 18).unwrap(),
        };
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["type"], "setSpeed");
        assert_eq!(value["supplySpeed"], "-1");
        assert_eq!(value["borrowSpeed"], "1");

        let back: GovernanceAction = serde_json::from_value(value).unwrap();
        assert_eq!(back, action);
    }

    #[test]
    fn test_action_json_shape() {
        let action = GovernanceAction::Bridge {
            token: PROTOCOL_TOKEN.to_string(),
            from: MULTICHAIN_GOVERNOR.to_string(),
            to: TEMPORAL_GOVERNOR.to_string(),
            network: 8453,
            amount: U256::from(10u64),
            native_fee: U256::from(3u64),
        };
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["type"], "bridge");
        assert_eq!(value["nativeFee"], "3");
        assert_eq!(value["network"], 8453);
        assert_eq!(action.kind(), "bridge");

        let sale = GovernanceAction::InitSale {
            reserve_automation_contracts: vec!["RESERVE_AUTOMATION_USDC".to_string()],
            delay: 60,
            auction_period: 600,
        };
        let value = serde_json::to_value(&sale).unwrap();
        assert_eq!(value["type"], "initSale");
        assert_eq!(value["reserveAutomationContracts"][0], "RESERVE_AUTOMATION_USDC");
        assert_eq!(value["auctionPeriod"], 600);
        assert_eq!(sale.amount(), None);
    }
}
