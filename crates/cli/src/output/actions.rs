//! Table formatting for proposal actions.

use emissions_rs_engine::{chain_from_id, GovernanceAction, ProposalPayload};
use tabled::Tabled;

use super::render_table;
use crate::cli::OutputFormat;

#[derive(Tabled)]
struct ActionRow {
    #[tabled(rename = "Network")]
    network: String,
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Action")]
    kind: String,
    #[tabled(rename = "Details")]
    details: String,
    #[tabled(rename = "Amount")]
    amount: String,
}

fn network_name(id: &str) -> String {
    id.parse()
        .ok()
        .and_then(chain_from_id)
        .map(|chain| chain.to_string())
        .unwrap_or_else(|| id.to_string())
}

fn describe(action: &GovernanceAction) -> String {
    match action {
        GovernanceAction::Transfer { token, from, to, .. }
        | GovernanceAction::Withdraw { token, from, to, .. } => {
            format!("{} {} -> {}", token, from, to)
        }
        GovernanceAction::Bridge {
            token,
            to,
            network,
            native_fee,
            ..
        } => format!("{} -> {} on {} (fee {})", token, to, network_name(&network.to_string()), native_fee),
        GovernanceAction::SetSpeed {
            market,
            reward_token,
            supply_speed,
            borrow_speed,
        }
        | GovernanceAction::SetMrdSpeed {
            market,
            reward_token,
            supply_speed,
            borrow_speed,
        } => format!(
            "{} {} supply={} borrow={}",
            market, reward_token, supply_speed, borrow_speed
        ),
        GovernanceAction::SetSafetyModuleEmission { emission_per_second } => {
            format!("{}/s", emission_per_second)
        }
        GovernanceAction::InitSale {
            reserve_automation_contracts,
            delay,
            auction_period,
        } => format!(
            "{} (delay {}s, period {}s)",
            reserve_automation_contracts.join(", "),
            delay,
            auction_period
        ),
        GovernanceAction::TransferReserves { market, to, .. } => format!("{} -> {}", market, to),
        GovernanceAction::MerkleCampaign {
            token,
            target,
            start_time_stamp,
            end_time_stamp,
            ..
        } => format!(
            "{} -> {} [{}, {}]",
            token, target, start_time_stamp, end_time_stamp
        ),
    }
}

pub fn format_actions_table(payload: &ProposalPayload, format: OutputFormat) -> String {
    if payload.action_count() == 0 {
        return "No actions.".to_string();
    }

    let rows: Vec<ActionRow> = payload
        .networks
        .iter()
        .flat_map(|(id, network)| {
            network.actions.iter().enumerate().map(move |(i, action)| ActionRow {
                network: network_name(id),
                index: i + 1,
                kind: action.kind().to_string(),
                details: describe(action),
                amount: action
                    .amount()
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            })
        })
        .collect();

    let mut output = render_table(rows, format);
    output.push_str(&format!(
        "\nEpoch: {} - {}",
        payload.start_time_stamp, payload.end_time_stamp
    ));
    output
}
