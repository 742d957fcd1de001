//! End-to-end tests of an epoch run over a three-chain deployment.
//!
//! The fixture values are chosen so chain totals come out round:
//! Moonbeam $2.75M, Base $8.62M and Optimism $0.63M, $12M in total.

use alloy_primitives::{address, U256};
use emissions_rs_engine::math::{fund_amount, quantize, withdraw_amount, Rounding, RoundingSlack};
use emissions_rs_engine::{
    chain_id, run_epoch, EmissionsConfig, EngineError, EpochRun, GovernanceAction, NamedChain,
    ProtocolSnapshot, SpeedValue,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const ANCHOR: u64 = 1_700_000_000;
const EPOCH: u64 = 2_419_200;
const NOW: u64 = ANCHOR + 100;

fn fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("Failed to load fixture: {}", path))
}

fn config() -> EmissionsConfig {
    EmissionsConfig::from_toml_str(&fixture("config.toml")).unwrap()
}

fn snapshot() -> ProtocolSnapshot {
    ProtocolSnapshot::from_json_str(&fixture("snapshot.json")).unwrap()
}

fn run() -> EpochRun {
    run_epoch(&config(), &snapshot(), NOW).unwrap()
}

fn actions(run: &EpochRun, chain: NamedChain) -> &[GovernanceAction] {
    &run.payload.network(chain).unwrap().actions
}

fn units(whole: u64, decimals: u32) -> U256 {
    U256::from(whole) * U256::from(10u64).pow(U256::from(decimals))
}

// ============================================================================
// Determinism and payload shape
// ============================================================================

#[test]
fn test_run_is_idempotent() {
    let first = run();
    let second = run();
    assert_eq!(first, second);
    assert_eq!(
        first.payload.to_json_pretty().unwrap(),
        second.payload.to_json_pretty().unwrap()
    );
}

#[test]
fn test_payload_covers_every_chain_and_the_upcoming_epoch() {
    let run = run();
    let json = serde_json::to_value(&run.payload).unwrap();

    for key in ["1284", "8453", "10"] {
        assert!(json[key]["actions"].is_array(), "missing network {key}");
    }
    assert_eq!(json["startTimeStamp"], ANCHOR + EPOCH);
    assert_eq!(json["endTimeSTamp"], ANCHOR + 2 * EPOCH);
}

#[test]
fn test_network_filter() {
    let only = run().payload.only(NamedChain::Base);
    assert_eq!(only.networks.len(), 1);
    assert!(only.network(NamedChain::Base).is_some());
}

// ============================================================================
// Valuation and shares
// ============================================================================

#[test]
fn test_chain_shares_follow_total_value() {
    let run = run();
    let base = run.allocation.chain(NamedChain::Base).unwrap();
    let optimism = run.allocation.chain(NamedChain::Optimism).unwrap();

    assert_eq!(base.total_usd, dec!(8_620_000));
    assert_eq!(optimism.share, dec!(0.0525));

    let sum: Decimal = run.allocation.chains.iter().map(|c| c.share).sum();
    assert!((sum - Decimal::ONE).abs() < dec!(0.000000000001));
}

#[test]
fn test_market_shares_sum_to_one() {
    for chain in run().allocation.chains {
        let sum: Decimal = chain.markets.iter().map(|m| m.share).sum();
        assert!((sum - Decimal::ONE).abs() < dec!(0.000000000001), "{}", chain.chain);
    }
}

#[test]
fn test_excluded_market_never_enters() {
    let run = run();
    let base = run.allocation.chain(NamedChain::Base).unwrap();
    let excluded = address!("0000000000000000000000000000000000000bad");
    assert_eq!(base.markets.len(), 4);
    assert!(base.markets.iter().all(|m| m.address != excluded));
}

#[test]
fn test_unconfigured_market_gets_no_speed_action() {
    let run = run();
    let markets: Vec<&str> = actions(&run, NamedChain::Base)
        .iter()
        .filter_map(|a| match a {
            GovernanceAction::SetMrdSpeed { market, .. } => Some(market.as_str()),
            _ => None,
        })
        .collect();

    // Protocol and native token per configured market
    assert_eq!(
        markets,
        vec![
            "MOONWELL_WETH",
            "MOONWELL_WETH",
            "MOONWELL_USDC",
            "MOONWELL_USDC",
            "MOONWELL_cbBTC",
            "MOONWELL_cbBTC",
        ]
    );
}

// ============================================================================
// Action ordering
// ============================================================================

#[test]
fn test_home_chain_action_order() {
    let run = run();
    let kinds: Vec<&str> = actions(&run, NamedChain::Moonbeam).iter().map(|a| a.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            "bridge",
            "bridge",
            "transfer",
            "transfer",
            "setSpeed",
            "setSpeed",
            "setSpeed",
            "setSpeed",
            "transfer",
            "setSafetyModuleEmission",
            "transfer",
        ]
    );
}

#[test]
fn test_bridges_go_out_in_ascending_chain_id() {
    let run = run();
    let bridges: Vec<(u64, U256, U256)> = actions(&run, NamedChain::Moonbeam)
        .iter()
        .filter_map(|a| match a {
            GovernanceAction::Bridge {
                network,
                amount,
                native_fee,
                ..
            } => Some((*network, *amount, *native_fee)),
            _ => None,
        })
        .collect();

    assert_eq!(bridges.len(), 2);
    assert_eq!(bridges[0].0, 10);
    assert_eq!(bridges[1].0, 8453);
    // Optimism budget: 1_000_000 * 0.0525, all to markets, plus bridge padding
    assert_eq!(bridges[0].1, units(52_500, 18) + RoundingSlack::BridgePadding.base_units());
    assert_eq!(bridges[0].2, U256::from(200_000_000_000_000_000u64));
    assert_eq!(bridges[1].2, U256::from(150_000_000_000_000_000u64));
}

#[test]
fn test_zero_amount_transfers_are_dropped() {
    let run = run();
    let kinds: Vec<&str> = actions(&run, NamedChain::Optimism).iter().map(|a| a.kind()).collect();
    // No safety-module or DEX split on Optimism
    assert_eq!(kinds, vec!["transfer", "setMrdSpeed", "setSafetyModuleEmission"]);
    assert!(run
        .payload
        .networks
        .values()
        .flat_map(|n| &n.actions)
        .all(|a| a.amount().is_none_or(|amount| !amount.is_zero())));
}

// ============================================================================
// Rounding direction and conservation
// ============================================================================

#[test]
fn test_remote_market_funding_is_floored_and_padded() {
    let run = run();
    let GovernanceAction::Transfer { from, to, amount, .. } = &actions(&run, NamedChain::Optimism)[0]
    else {
        panic!("first Optimism action must be the market funding transfer");
    };
    assert_eq!(from, "TEMPORAL_GOVERNOR");
    assert_eq!(to, "MRD_PROXY");
    assert_eq!(*amount, units(52_500, 18) - RoundingSlack::WithdrawPadding.base_units());
}

#[test]
fn test_funding_rounds_up_and_withdrawals_round_down() {
    let run = run();
    let home = actions(&run, NamedChain::Moonbeam);

    for chain in run.allocation.chains.iter().filter(|c| !c.home) {
        let decimals = chain.protocol_token_decimals;
        let floor = quantize(chain.budget.markets, decimals, Rounding::Floor).unwrap();
        let ceil = quantize(chain.budget.protocol_total(), decimals, Rounding::Ceil).unwrap();

        let GovernanceAction::Transfer { amount: funded, .. } = &actions(&run, chain.chain)[0] else {
            panic!("first remote action must be the market funding transfer");
        };
        assert!(*funded <= floor, "{}", chain.chain);

        let bridged = home
            .iter()
            .find_map(|a| match a {
                GovernanceAction::Bridge { network, amount, .. } if *network == chain_id(chain.chain) => {
                    Some(*amount)
                }
                _ => None,
            })
            .unwrap();
        assert!(bridged >= ceil, "{}", chain.chain);
    }
}

#[test]
fn test_bridged_amount_covers_remote_spending() {
    let run = run();
    let bridged = actions(&run, NamedChain::Moonbeam)
        .iter()
        .find_map(|a| match a {
            GovernanceAction::Bridge { network: 8453, amount, .. } => Some(*amount),
            _ => None,
        })
        .unwrap();

    let mut inflow = bridged;
    let mut outflow = U256::ZERO;
    for action in actions(&run, NamedChain::Base) {
        match action {
            GovernanceAction::Transfer { token, amount, .. } if token == "WELL" => outflow += *amount,
            GovernanceAction::Withdraw { amount, .. } => inflow += *amount,
            GovernanceAction::MerkleCampaign { amount, .. } => outflow += *amount,
            _ => {}
        }
    }
    assert!(inflow >= outflow, "inflow {inflow} < outflow {outflow}");
}

#[test]
fn test_home_funding_covers_streamed_speeds() {
    let run = run();
    let home = actions(&run, NamedChain::Moonbeam);

    let funded = home
        .iter()
        .find_map(|a| match a {
            GovernanceAction::Transfer { token, to, amount, .. }
                if token == "WELL" && to == "COMPTROLLER" =>
            {
                Some(*amount)
            }
            _ => None,
        })
        .unwrap();

    let mut per_second = U256::ZERO;
    let mut speeds = 0u64;
    for action in home {
        if let GovernanceAction::SetSpeed {
            reward_token,
            supply_speed,
            borrow_speed,
            ..
        } = action
        {
            if reward_token == "WELL" {
                per_second += supply_speed.base_units() + borrow_speed.base_units();
                speeds += 2;
            }
        }
    }
    let streamed = per_second * U256::from(EPOCH);

    assert!(funded >= streamed);
    // Slack is the transfer padding plus at most one base unit per second lost to each floor
    let slack = RoundingSlack::TransferPadding.base_units() + U256::from((speeds + 1) * EPOCH);
    assert!(funded - streamed <= slack);
}

#[test]
fn test_speeds_reproduce_the_markets_budget() {
    let config = config();
    let run = run();
    for chain in &run.allocation.chains {
        let chain_config = config.chain(chain.chain).unwrap();
        let mut streamed = Decimal::ZERO;
        let mut weighted = Decimal::ZERO;
        for market in &chain.markets {
            let Some(speeds) = market.protocol else {
                continue;
            };
            let ratio = chain_config.market(market.address).unwrap().supply_ratio;
            streamed += speeds.supply.raw * Decimal::from(EPOCH);
            weighted += ratio * market.share;
        }
        let expected = chain.budget.markets * weighted;
        assert!(
            (streamed - expected).abs() < dec!(0.000001),
            "{}: {streamed} vs {expected}",
            chain.chain
        );
    }
}

#[test]
fn test_remote_funding_matches_streamed_speeds() {
    let run = run();
    for chain in run.allocation.chains.iter().filter(|c| !c.home) {
        let actions = actions(&run, chain.chain);
        let funded = actions
            .iter()
            .find_map(|a| match a {
                GovernanceAction::Transfer { token, to, amount, .. }
                    if token == "WELL" && to == "MRD_PROXY" =>
                {
                    Some(*amount)
                }
                _ => None,
            })
            .unwrap();

        let mut per_second = U256::ZERO;
        let mut markets = 0u64;
        for action in actions {
            if let GovernanceAction::SetMrdSpeed {
                reward_token,
                supply_speed,
                borrow_speed,
                ..
            } = action
            {
                if reward_token == "WELL" {
                    per_second += supply_speed.base_units() + borrow_speed.base_units();
                    markets += 1;
                }
            }
        }
        let streamed = per_second * U256::from(EPOCH);

        // Withdraw padding plus one base unit per second per side lost to floors or epsilons
        let tolerance =
            RoundingSlack::WithdrawPadding.base_units() + U256::from(2 * markets * EPOCH);
        let gap = if funded > streamed { funded - streamed } else { streamed - funded };
        assert!(
            gap <= tolerance,
            "{}: funded {funded}, streamed {streamed}",
            chain.chain
        );
    }
}

// ============================================================================
// Speed encoding
// ============================================================================

#[test]
fn test_zero_borrow_speed_is_substituted() {
    let run = run();

    let base_usdc: Vec<(SpeedValue, SpeedValue)> = actions(&run, NamedChain::Base)
        .iter()
        .filter_map(|a| match a {
            GovernanceAction::SetMrdSpeed {
                market,
                supply_speed,
                borrow_speed,
                ..
            } if market == "MOONWELL_USDC" => Some((*supply_speed, *borrow_speed)),
            _ => None,
        })
        .collect();
    assert_eq!(base_usdc.len(), 2);
    for (supply, borrow) in base_usdc {
        assert!(matches!(supply, SpeedValue::Rate(rate) if rate > U256::ZERO));
        assert_eq!(borrow, SpeedValue::MinimalEpsilon);
    }

    let home_usdc_borrow = actions(&run, NamedChain::Moonbeam)
        .iter()
        .find_map(|a| match a {
            GovernanceAction::SetSpeed {
                market,
                reward_token,
                borrow_speed,
                ..
            } if market == "MOONWELL_USDC" && reward_token == "WELL" => Some(*borrow_speed),
            _ => None,
        })
        .unwrap();
    assert_eq!(home_usdc_borrow, SpeedValue::MinimalEpsilon);
}

#[test]
fn test_disabled_market_is_paused_on_supply() {
    let run = run();
    let cbbtc = actions(&run, NamedChain::Base)
        .iter()
        .find_map(|a| match a {
            GovernanceAction::SetMrdSpeed {
                market,
                supply_speed,
                borrow_speed,
                ..
            } if market == "MOONWELL_cbBTC" => Some((*supply_speed, *borrow_speed)),
            _ => None,
        })
        .unwrap();
    assert_eq!(cbbtc, (SpeedValue::Paused, SpeedValue::MinimalEpsilon));

    let json = serde_json::to_value(&run.payload).unwrap();
    let encoded = json["8453"]["actions"]
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["type"] == "setMrdSpeed" && a["market"] == "MOONWELL_cbBTC")
        .unwrap();
    assert_eq!(encoded["supplySpeed"], "-1");
    assert_eq!(encoded["borrowSpeed"], "1");
}

#[test]
fn test_disabled_home_market_is_paused_with_sentinel() {
    let mut config = config();
    let home = config.chains.iter_mut().find(|c| c.home).unwrap();
    home.markets
        .iter_mut()
        .find(|m| m.alias == "MOONWELL_USDC")
        .unwrap()
        .enabled = false;
    let run = run_epoch(&config, &snapshot(), NOW).unwrap();

    let usdc = actions(&run, NamedChain::Moonbeam)
        .iter()
        .find_map(|a| match a {
            GovernanceAction::SetSpeed {
                market,
                reward_token,
                supply_speed,
                borrow_speed,
            } if market == "MOONWELL_USDC" && reward_token == "WELL" => Some((*supply_speed, *borrow_speed)),
            _ => None,
        })
        .unwrap();
    assert_eq!(usdc, (SpeedValue::Paused, SpeedValue::MinimalEpsilon));

    let json = serde_json::to_value(&run.payload).unwrap();
    let encoded = json["1284"]["actions"]
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["type"] == "setSpeed" && a["market"] == "MOONWELL_USDC" && a["rewardToken"] == "WELL")
        .unwrap();
    assert_eq!(encoded["supplySpeed"], "-1");
    assert_eq!(encoded["borrowSpeed"], "1");
}

// ============================================================================
// Safety module and reserves
// ============================================================================

#[test]
fn test_secondary_pool_uses_one_cap() {
    let run = run();
    let base = run.allocation.chain(NamedChain::Base).unwrap();
    let cap = base.safety_module;

    assert!(cap.capped_secondary > Decimal::ZERO);
    assert!(cap.remaining_secondary > Decimal::ZERO);
    assert!(cap.capped_secondary + cap.direct_budget <= cap.max_reward_per_epoch + dec!(0.000000001));

    let withdrawn = actions(&run, NamedChain::Base)
        .iter()
        .find_map(|a| match a {
            GovernanceAction::Withdraw { from, amount, .. } if from == "WELL_HOLDER" => Some(*amount),
            _ => None,
        })
        .unwrap();
    assert_eq!(
        withdrawn,
        withdraw_amount(cap.capped_secondary, 18, RoundingSlack::WithdrawPadding).unwrap()
    );

    let (campaign, start, end) = actions(&run, NamedChain::Base)
        .iter()
        .find_map(|a| match a {
            GovernanceAction::MerkleCampaign {
                target,
                amount,
                start_time_stamp,
                end_time_stamp,
                ..
            } if target == "STK_WELL_PROXY" => Some((*amount, *start_time_stamp, *end_time_stamp)),
            _ => None,
        })
        .unwrap();
    assert_eq!(
        campaign,
        fund_amount(cap.capped_secondary, 18, RoundingSlack::CampaignPadding).unwrap()
    );
    assert_eq!((start, end), (ANCHOR + EPOCH, ANCHOR + 2 * EPOCH));
}

#[test]
fn test_reserve_sales_share_one_eligibility_list() {
    let run = run();
    let base = actions(&run, NamedChain::Base);

    let sale = base.iter().position(|a| a.kind() == "initSale").unwrap();
    let GovernanceAction::InitSale {
        reserve_automation_contracts,
        delay,
        auction_period,
    } = &base[sale]
    else {
        panic!("expected initSale");
    };
    assert_eq!(
        reserve_automation_contracts,
        &vec![
            "RESERVE_AUTOMATION_USDC".to_string(),
            "RESERVE_AUTOMATION_cbBTC".to_string()
        ]
    );
    assert_eq!((*delay, *auction_period), (3600, 604_800));

    let transfers: Vec<(&str, &str, U256)> = base[sale + 1..]
        .iter()
        .filter_map(|a| match a {
            GovernanceAction::TransferReserves { market, to, amount } => {
                Some((market.as_str(), to.as_str(), *amount))
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        transfers,
        vec![
            ("MOONWELL_USDC", "RESERVE_AUTOMATION_USDC", U256::from(80_000_000u64)),
            // 100 reserves - 20 minimum at 8 digits
            ("MOONWELL_cbBTC", "RESERVE_AUTOMATION_cbBTC", U256::from(8_000_000_000u64)),
        ]
    );

    assert!(actions(&run, NamedChain::Moonbeam)
        .iter()
        .all(|a| a.kind() != "initSale" && a.kind() != "transferReserves"));
}

// ============================================================================
// Precondition failures
// ============================================================================

#[test]
fn test_missing_chain_snapshot_aborts() {
    let mut snapshot = snapshot();
    snapshot.chains.remove(&10);
    assert!(matches!(
        run_epoch(&config(), &snapshot, NOW),
        Err(EngineError::MissingChainSnapshot {
            chain: NamedChain::Optimism
        })
    ));
}

#[test]
fn test_zero_protocol_value_aborts() {
    let mut snapshot = snapshot();
    for chain in snapshot.chains.values_mut() {
        for market in &mut chain.markets {
            market.total_supply = U256::ZERO;
            market.total_borrows = U256::ZERO;
        }
    }
    assert!(matches!(
        run_epoch(&config(), &snapshot, NOW),
        Err(EngineError::ZeroProtocolValue)
    ));
}

#[test]
fn test_missing_native_price_aborts() {
    let mut snapshot = snapshot();
    if let Some(base) = snapshot.chains.get_mut(&8453) {
        base.native_token_price = None;
    }
    assert!(matches!(
        run_epoch(&config(), &snapshot, NOW),
        Err(EngineError::MissingReferencePrice {
            chain: NamedChain::Base,
            ..
        })
    ));
}

#[test]
fn test_home_native_price_comes_from_reference_market() {
    let run = run();
    let home = run.allocation.chain(NamedChain::Moonbeam).unwrap();
    assert_eq!(home.native_token_price, Some(dec!(0.25)));
}
