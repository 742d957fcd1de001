//! Decimal/base-unit conversion and the rounding rules used for on-chain amounts.
//!
//! Human quantities (token amounts, USD values, speeds in tokens per second)
//! are `Decimal`. Anything that goes on chain is an integer number of base
//! units held in a `U256`. Crossing from one to the other always goes through
//! [`quantize`] with an explicit [`Rounding`] direction:
//!
//! - **Ceil** for amounts that are sent, funded or locked. The payer must never
//!   under-fund what the receiver expects.
//! - **Floor** for amounts moved out of a balance of record. The mover must never
//!   claim more than is there.
//!
//! On top of the directional rounding, funded amounts get a fixed
//! [`RoundingSlack`] added and withdrawn amounts get one subtracted, so that
//! independent sub-computations that have to reconcile on chain (bridged vs.
//! distributed, funded vs. streamed) always do.

use alloy_primitives::U256;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::{EngineError, Result};

/// Seconds in a 365-day year.
pub const SECONDS_PER_YEAR: u64 = 365 * 24 * 60 * 60;

/// Largest scale a `Decimal` can carry.
pub const MAX_DECIMAL_SCALE: u32 = 28;

/// Largest mantissa a `Decimal` can carry (2^96 - 1).
const MAX_DECIMAL_MANTISSA: u128 = 79_228_162_514_264_337_593_543_950_335;

/// Decimals of the tokens the padding constants are expressed in.
const SLACK_REFERENCE_DECIMALS: u32 = 18;

/// Rounding direction for a quantized amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Round towards positive infinity (funding)
    Ceil,
    /// Round towards zero (withdrawal)
    Floor,
}

/// Fixed padding applied on top of directional rounding.
///
/// Values are base units of an 18-decimal token and must not be re-derived;
/// [`RoundingSlack::at_decimals`] rescales them for other tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundingSlack {
    /// No padding
    None,
    /// 0.1 token added to cross-chain bridge amounts
    BridgePadding,
    /// 0.01 token added to transfers that fund a speed or emission
    TransferPadding,
    /// 0.01 token subtracted from transfers out of a landed balance
    WithdrawPadding,
    /// 0.001 token added to campaign funding
    CampaignPadding,
}

impl RoundingSlack {
    /// Padding in 18-decimal base units.
    pub fn base_units(self) -> U256 {
        let units: u64 = match self {
            Self::None => 0,
            Self::BridgePadding => 100_000_000_000_000_000,
            Self::TransferPadding => 10_000_000_000_000_000,
            Self::WithdrawPadding => 10_000_000_000_000_000,
            Self::CampaignPadding => 1_000_000_000_000_000,
        };
        U256::from(units)
    }

    /// Padding in base units of a token with `decimals` decimals.
    pub fn at_decimals(self, decimals: u32) -> U256 {
        let units = self.base_units();
        if decimals >= SLACK_REFERENCE_DECIMALS {
            units * pow10(decimals - SLACK_REFERENCE_DECIMALS)
        } else {
            units / pow10(SLACK_REFERENCE_DECIMALS - decimals)
        }
    }
}

/// `10^exp` as a `U256`.
pub fn pow10(exp: u32) -> U256 {
    U256::from(10u64).pow(U256::from(exp))
}

/// `10^exp` as a `Decimal`, for `exp <= 28`.
pub fn pow10_decimal(exp: u32) -> Result<Decimal> {
    if exp > MAX_DECIMAL_SCALE {
        return Err(EngineError::Overflow("power of ten"));
    }
    Decimal::try_from_i128_with_scale(10i128.pow(exp), 0)
        .map_err(|_| EngineError::Overflow("power of ten"))
}

/// One base unit of a token with `decimals` decimals, in human units.
///
/// This is the minimal non-zero speed the engine ever emits.
pub fn epsilon(decimals: u32) -> Decimal {
    Decimal::new(1, decimals.min(MAX_DECIMAL_SCALE))
}

/// Converts a raw base-unit amount into human units (`raw / 10^decimals`).
///
/// Values wider than a `Decimal` mantissa lose their least significant digits;
/// values that stay too wide even as integers are an error.
pub fn units_to_decimal(raw: U256, decimals: u32) -> Result<Decimal> {
    let mut value = raw;
    let mut scale = decimals;
    let max = U256::from(MAX_DECIMAL_MANTISSA);
    let ten = U256::from(10u64);

    while scale > MAX_DECIMAL_SCALE || value > max {
        if scale == 0 {
            return Err(EngineError::Overflow("base units to decimal"));
        }
        value /= ten;
        scale -= 1;
    }

    let mantissa = i128::try_from(value.to::<u128>())
        .map_err(|_| EngineError::Overflow("base units to decimal"))?;
    Decimal::try_from_i128_with_scale(mantissa, scale)
        .map_err(|_| EngineError::Overflow("base units to decimal"))
}

/// Converts a human quantity into base units: `round(q * 10^decimals)`.
///
/// The integral part is scaled in `U256`, so results past 2^53 (and past the
/// `Decimal` range) are exact. Non-positive quantities quantize to zero.
pub fn quantize(quantity: Decimal, decimals: u32, rounding: Rounding) -> Result<U256> {
    if quantity <= Decimal::ZERO {
        return Ok(U256::ZERO);
    }

    let whole = quantity
        .trunc()
        .to_u128()
        .ok_or(EngineError::Overflow("quantize"))?;
    let whole_units = U256::from(whole)
        .checked_mul(pow10(decimals))
        .ok_or(EngineError::Overflow("quantize"))?;

    let fraction = quantity.fract();
    let fraction_units = if fraction.is_zero() {
        U256::ZERO
    } else if decimals > MAX_DECIMAL_SCALE {
        // Scale what fits in a Decimal, then pad the rest with zeros
        let scaled = fraction
            .checked_mul(pow10_decimal(MAX_DECIMAL_SCALE)?)
            .ok_or(EngineError::Overflow("quantize"))?;
        let rounded = round(scaled, rounding)
            .to_u128()
            .ok_or(EngineError::Overflow("quantize"))?;
        U256::from(rounded) * pow10(decimals - MAX_DECIMAL_SCALE)
    } else {
        let scaled = fraction
            .checked_mul(pow10_decimal(decimals)?)
            .ok_or(EngineError::Overflow("quantize"))?;
        let rounded = round(scaled, rounding)
            .to_u128()
            .ok_or(EngineError::Overflow("quantize"))?;
        U256::from(rounded)
    };

    whole_units
        .checked_add(fraction_units)
        .ok_or(EngineError::Overflow("quantize"))
}

fn round(value: Decimal, rounding: Rounding) -> Decimal {
    match rounding {
        Rounding::Ceil => value.ceil(),
        Rounding::Floor => value.floor(),
    }
}

/// Amount to send/fund/lock: `ceil(q * 10^d) + slack`.
pub fn fund_amount(quantity: Decimal, decimals: u32, slack: RoundingSlack) -> Result<U256> {
    let base = quantize(quantity, decimals, Rounding::Ceil)?;
    if base.is_zero() {
        // Nothing to fund; padding alone would create a transfer out of thin air
        return Ok(U256::ZERO);
    }
    base.checked_add(slack.at_decimals(decimals))
        .ok_or(EngineError::Overflow("fund amount"))
}

/// Amount to move out of a balance of record: `floor(q * 10^d) - slack`, floored at zero.
pub fn withdraw_amount(quantity: Decimal, decimals: u32, slack: RoundingSlack) -> Result<U256> {
    let base = quantize(quantity, decimals, Rounding::Floor)?;
    Ok(base.saturating_sub(slack.at_decimals(decimals)))
}

/// Divides, yielding zero when the denominator is zero.
pub fn div_or_zero(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        Decimal::ZERO
    } else {
        numerator.checked_div(denominator).unwrap_or(Decimal::ZERO)
    }
}
