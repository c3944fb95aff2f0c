//! # Fee Math
//!
//! Fee growth accounting in Q64.64. Growth accumulators are allowed to wrap
//! modulo 2^128; only differences between two readings are meaningful.

use crate::constants::{FEE_RATE_DENOMINATOR, Q64};
use crate::errors::{ClmmCoreError, CoreResult};
use crate::math::full_math::{mul_div_floor, wrapping_sub_u128};

/// Per-tick fee growth recorded on the side of the tick away from the current price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct TickFeeState {
    pub fee_growth_outside_0_x64: u128,
    pub fee_growth_outside_1_x64: u128,
}

/// Fee growth inside a position's range, per token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct FeeGrowthInside {
    pub fee_growth_inside_0_x64: u128,
    pub fee_growth_inside_1_x64: u128,
}

/// Fee growth per unit of liquidity for a fee amount: fee * 2^64 / L
pub fn calculate_fee_growth_x64(fee_amount: u64, liquidity: u128) -> CoreResult<u128> {
    if liquidity == 0 {
        return Err(ClmmCoreError::DivisionByZero);
    }
    mul_div_floor(fee_amount as u128, Q64, liquidity)
}

/// Fee growth inside [tick_lower, tick_upper) given the tick outside values
pub fn get_fee_growth_inside(
    tick_current: i32,
    tick_lower: i32,
    tick_upper: i32,
    lower: &TickFeeState,
    upper: &TickFeeState,
    fee_growth_global_0_x64: u128,
    fee_growth_global_1_x64: u128,
) -> FeeGrowthInside {
    let (below_0, below_1) = if tick_current >= tick_lower {
        (lower.fee_growth_outside_0_x64, lower.fee_growth_outside_1_x64)
    } else {
        (
            wrapping_sub_u128(fee_growth_global_0_x64, lower.fee_growth_outside_0_x64),
            wrapping_sub_u128(fee_growth_global_1_x64, lower.fee_growth_outside_1_x64),
        )
    };

    let (above_0, above_1) = if tick_current < tick_upper {
        (upper.fee_growth_outside_0_x64, upper.fee_growth_outside_1_x64)
    } else {
        (
            wrapping_sub_u128(fee_growth_global_0_x64, upper.fee_growth_outside_0_x64),
            wrapping_sub_u128(fee_growth_global_1_x64, upper.fee_growth_outside_1_x64),
        )
    };

    FeeGrowthInside {
        fee_growth_inside_0_x64: wrapping_sub_u128(
            wrapping_sub_u128(fee_growth_global_0_x64, below_0),
            above_0,
        ),
        fee_growth_inside_1_x64: wrapping_sub_u128(
            wrapping_sub_u128(fee_growth_global_1_x64, below_1),
            above_1,
        ),
    }
}

/// Tokens owed to a position after fee growth moved from `inside_last` to `inside`
pub fn get_position_fees(
    liquidity: u128,
    inside: &FeeGrowthInside,
    inside_last: &FeeGrowthInside,
    tokens_owed_0: u64,
    tokens_owed_1: u64,
) -> CoreResult<(u64, u64)> {
    let owed_0 = accrue(
        liquidity,
        inside.fee_growth_inside_0_x64,
        inside_last.fee_growth_inside_0_x64,
        tokens_owed_0,
    )?;
    let owed_1 = accrue(
        liquidity,
        inside.fee_growth_inside_1_x64,
        inside_last.fee_growth_inside_1_x64,
        tokens_owed_1,
    )?;
    Ok((owed_0, owed_1))
}

fn accrue(liquidity: u128, inside: u128, inside_last: u128, owed: u64) -> CoreResult<u64> {
    let delta = wrapping_sub_u128(inside, inside_last);
    let earned = mul_div_floor(delta, liquidity, Q64)?;
    let earned = u64::try_from(earned).map_err(|_| ClmmCoreError::MaxTokenOverflow)?;
    owed.checked_add(earned).ok_or(ClmmCoreError::MaxTokenOverflow)
}

/// Split a trade fee into (protocol, fund, remaining) shares.
/// Both rates are fractions of the fee over `FEE_RATE_DENOMINATOR`.
pub fn split_fee(fee_amount: u64, protocol_fee_rate: u32, fund_fee_rate: u32) -> CoreResult<(u64, u64, u64)> {
    let denominator = FEE_RATE_DENOMINATOR as u128;
    let protocol = mul_div_floor(fee_amount as u128, protocol_fee_rate as u128, denominator)? as u64;
    let fund = mul_div_floor(fee_amount as u128, fund_fee_rate as u128, denominator)? as u64;

    let remaining = fee_amount
        .checked_sub(protocol)
        .and_then(|rest| rest.checked_sub(fund))
        .ok_or(ClmmCoreError::MathUnderflow)?;

    Ok((protocol, fund, remaining))
}
