//! Epoch boundaries.
//!
//! Epochs are fixed-length windows laid end to end from a known anchor. The
//! proposal for an epoch is generated before it starts, so the window the
//! engine works on is the first one whose start lies strictly after `now`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::EpochConfig;
use crate::error::{EngineError, Result};
use crate::math::SECONDS_PER_YEAR;

/// A single epoch window, in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochWindow {
    pub start: u64,
    pub end: u64,
    pub length: u64,
}

impl EpochWindow {
    /// The first epoch starting strictly after `now`.
    ///
    /// Equivalent to advancing from `anchor` one period at a time until the
    /// boundary exceeds `now`. When `now` is before the anchor, the anchor
    /// itself starts the window.
    pub fn upcoming(anchor: u64, length: u64, now: u64) -> Result<Self> {
        let overflow = || EngineError::EpochOverflow {
            anchor,
            length,
            now,
        };
        if length == 0 {
            return Err(overflow());
        }

        let start = if now < anchor {
            anchor
        } else {
            let periods = (now - anchor) / length + 1;
            periods
                .checked_mul(length)
                .and_then(|offset| anchor.checked_add(offset))
                .ok_or_else(overflow)?
        };
        let end = start.checked_add(length).ok_or_else(overflow)?;

        Ok(Self { start, end, length })
    }

    /// Window for the configured epoch schedule.
    pub fn from_config(config: &EpochConfig, now: u64) -> Result<Self> {
        Self::upcoming(config.anchor, config.length_seconds, now)
    }

    /// Epoch length as a `Decimal`, for per-second rate computations.
    pub fn length_decimal(&self) -> Decimal {
        Decimal::from(self.length)
    }

    /// Number of epochs in a 365-day year (365/28 for 28-day epochs).
    pub fn epochs_per_year(&self) -> Decimal {
        Decimal::from(SECONDS_PER_YEAR) / self.length_decimal()
    }
}
