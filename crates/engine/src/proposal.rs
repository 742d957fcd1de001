//! End-to-end epoch run and the proposal payload it produces.

use std::collections::BTreeMap;

use alloy_chains::NamedChain;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::actions::{assemble, GovernanceAction};
use crate::allocation::{allocate_epoch, EpochAllocation};
use crate::chain::chain_id;
use crate::config::EmissionsConfig;
use crate::error::Result;
use crate::snapshot::ProtocolSnapshot;

/// Ordered actions for one network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkActions {
    pub actions: Vec<GovernanceAction>,
}

/// The proposal document handed to the executor.
///
/// Networks are keyed by decimal chain id next to the epoch timestamps:
///
/// ```json
/// { "8453": { "actions": [] }, "startTimeStamp": 1, "endTimeSTamp": 2 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalPayload {
    #[serde(flatten)]
    pub networks: BTreeMap<String, NetworkActions>,
    #[serde(rename = "startTimeStamp")]
    pub start_time_stamp: u64,
    // Field name is consumed verbatim by the executor
    #[serde(rename = "endTimeSTamp")]
    pub end_time_stamp: u64,
}

impl ProposalPayload {
    /// Builds the payload from per-network actions keyed by chain id.
    pub fn new(networks: BTreeMap<u64, Vec<GovernanceAction>>, start: u64, end: u64) -> Self {
        Self {
            networks: networks
                .into_iter()
                .map(|(id, actions)| (id.to_string(), NetworkActions { actions }))
                .collect(),
            start_time_stamp: start,
            end_time_stamp: end,
        }
    }

    /// Actions for one network.
    pub fn network(&self, chain: NamedChain) -> Option<&NetworkActions> {
        self.networks.get(&chain_id(chain).to_string())
    }

    /// The same payload restricted to a single network.
    pub fn only(&self, chain: NamedChain) -> Self {
        let key = chain_id(chain).to_string();
        Self {
            networks: self
                .networks
                .iter()
                .filter(|(id, _)| **id == key)
                .map(|(id, actions)| (id.clone(), actions.clone()))
                .collect(),
            start_time_stamp: self.start_time_stamp,
            end_time_stamp: self.end_time_stamp,
        }
    }

    /// Total number of actions across networks.
    pub fn action_count(&self) -> usize {
        self.networks.values().map(|n| n.actions.len()).sum()
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Allocation and payload of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochRun {
    pub allocation: EpochAllocation,
    pub payload: ProposalPayload,
}

/// Runs the whole pipeline for the epoch following `now`.
///
/// Pure: the same config, snapshot and `now` always yield the same run.
pub fn run_epoch(config: &EmissionsConfig, snapshot: &ProtocolSnapshot, now: u64) -> Result<EpochRun> {
    let allocation = allocate_epoch(config, snapshot, now)?;
    let networks = assemble(config, &allocation)?;
    let payload = ProposalPayload::new(networks, allocation.window.start, allocation.window.end);

    info!(
        start = allocation.window.start,
        end = allocation.window.end,
        chains = allocation.chains.len(),
        actions = payload.action_count(),
        "epoch proposal ready"
    );

    Ok(EpochRun { allocation, payload })
}
