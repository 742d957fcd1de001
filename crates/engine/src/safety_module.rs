//! APY cap for the staking safety module.
//!
//! The safety module is funded directly from each chain's budget split. A
//! discretionary secondary pool may top it up, but only as far as keeping the
//! total staking APY at or below [`TARGET_APY`]:
//!
//! ```text
//! maxRewardPerEpoch = TARGET_APY * stakedTotal / epochsPerYear
//! maxSecondary      = max(0, maxRewardPerEpoch - directBudget)
//! capped            = min(available, maxSecondary)
//! remaining         = available - capped
//! ```
//!
//! The cap is computed once per chain per run and the same
//! [`SafetyModuleCap`] is handed to every action derived from the pool.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::epoch::EpochWindow;
use crate::error::{EngineError, Result};
use crate::math::div_or_zero;

/// Ceiling on the safety module's staking APY (10%).
pub const TARGET_APY: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Outcome of capping the secondary pool contribution, in human token units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyModuleCap {
    /// Tokens staked in the safety module
    pub staked_total: Decimal,
    /// Direct safety-module emission for the epoch
    pub direct_budget: Decimal,
    /// Reward per epoch that would put staking exactly at the target APY
    pub max_reward_per_epoch: Decimal,
    /// Secondary pool balance before capping
    pub secondary_available: Decimal,
    /// Secondary contribution routed to stakers this epoch
    pub capped_secondary: Decimal,
    /// Secondary balance left in custody
    pub remaining_secondary: Decimal,
}

impl SafetyModuleCap {
    /// Applies the APY cap.
    pub fn compute(
        staked_total: Decimal,
        direct_budget: Decimal,
        secondary_available: Decimal,
        epoch: &EpochWindow,
    ) -> Result<Self> {
        let max_reward_per_epoch = TARGET_APY
            .checked_mul(staked_total)
            .ok_or(EngineError::Overflow("safety module max reward"))
            .map(|v| div_or_zero(v, epoch.epochs_per_year()))?;

        let max_secondary = (max_reward_per_epoch - direct_budget).max(Decimal::ZERO);
        let available = secondary_available.max(Decimal::ZERO);
        let capped_secondary = available.min(max_secondary);

        Ok(Self {
            staked_total,
            direct_budget,
            max_reward_per_epoch,
            secondary_available: available,
            capped_secondary,
            remaining_secondary: available - capped_secondary,
        })
    }

    /// Staking APY implied by direct plus capped secondary rewards.
    pub fn projected_apy(&self, epoch: &EpochWindow) -> Decimal {
        div_or_zero(
            (self.direct_budget + self.capped_secondary) * epoch.epochs_per_year(),
            self.staked_total,
        )
    }
}
