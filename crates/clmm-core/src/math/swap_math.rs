//! # Swap Math
//!
//! A single swap step inside one liquidity segment: move the price toward the
//! target, then recompute amounts from the price actually reached so the fee
//! and the swapped amounts always agree.

use crate::constants::{FEE_RATE_DENOMINATOR, MAX_SQRT_PRICE_X64, MIN_SQRT_PRICE_X64};
use crate::errors::{ClmmCoreError, CoreResult};
use crate::math::full_math::{mul_div_ceil, mul_div_floor};
use crate::math::liquidity_math::{
    get_token_amount_a_from_liquidity, get_token_amount_b_from_liquidity,
};
use crate::math::sqrt_price_math::{
    get_next_sqrt_price_x64_from_input, get_next_sqrt_price_x64_from_output,
};

/// Result of a single swap step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct SwapStep {
    /// Price after the step, never past the target
    pub sqrt_price_next_x64: u128,
    /// Input token consumed, excluding the fee
    pub amount_in: u64,
    /// Output token produced
    pub amount_out: u64,
    /// Fee charged on the input
    pub fee_amount: u64,
}

/// Compute one step of a swap from `sqrt_price_current_x64` toward `sqrt_price_target_x64`
pub fn compute_swap_step(
    sqrt_price_current_x64: u128,
    sqrt_price_target_x64: u128,
    liquidity: u128,
    amount_remaining: u64,
    fee_rate: u32,
    is_base_input: bool,
    zero_for_one: bool,
) -> CoreResult<SwapStep> {
    if fee_rate >= FEE_RATE_DENOMINATOR {
        return Err(ClmmCoreError::InvalidFeeRate);
    }

    let mut step = SwapStep::default();

    if is_base_input {
        // Fee comes off the top of the input
        let amount_remaining_less_fee = mul_div_floor(
            amount_remaining as u128,
            (FEE_RATE_DENOMINATOR - fee_rate) as u128,
            FEE_RATE_DENOMINATOR as u128,
        )? as u64;

        let amount_in = calculate_amount_in_range(
            sqrt_price_current_x64,
            sqrt_price_target_x64,
            liquidity,
            zero_for_one,
            is_base_input,
        )?;
        if let Some(amount_in) = amount_in {
            step.amount_in = amount_in;
        }

        step.sqrt_price_next_x64 = match amount_in {
            Some(amount_in) if amount_remaining_less_fee >= amount_in => sqrt_price_target_x64,
            _ => get_next_sqrt_price_x64_from_input(
                sqrt_price_current_x64,
                liquidity,
                amount_remaining_less_fee,
                zero_for_one,
            )?,
        };
    } else {
        let amount_out = calculate_amount_in_range(
            sqrt_price_current_x64,
            sqrt_price_target_x64,
            liquidity,
            zero_for_one,
            is_base_input,
        )?;
        if let Some(amount_out) = amount_out {
            step.amount_out = amount_out;
        }

        step.sqrt_price_next_x64 = match amount_out {
            Some(amount_out) if amount_remaining >= amount_out => sqrt_price_target_x64,
            _ => get_next_sqrt_price_x64_from_output(
                sqrt_price_current_x64,
                liquidity,
                amount_remaining,
                zero_for_one,
            )?,
        };
    }

    let max = sqrt_price_target_x64 == step.sqrt_price_next_x64;

    // Amounts at the target were already computed above
    if zero_for_one {
        if !(max && is_base_input) {
            step.amount_in = get_token_amount_a_from_liquidity(
                step.sqrt_price_next_x64,
                sqrt_price_current_x64,
                liquidity,
                true,
            )?;
        }
        if !(max && !is_base_input) {
            step.amount_out = get_token_amount_b_from_liquidity(
                step.sqrt_price_next_x64,
                sqrt_price_current_x64,
                liquidity,
                false,
            )?;
        }
    } else {
        if !(max && is_base_input) {
            step.amount_in = get_token_amount_b_from_liquidity(
                sqrt_price_current_x64,
                step.sqrt_price_next_x64,
                liquidity,
                true,
            )?;
        }
        if !(max && !is_base_input) {
            step.amount_out = get_token_amount_a_from_liquidity(
                sqrt_price_current_x64,
                step.sqrt_price_next_x64,
                liquidity,
                false,
            )?;
        }
    }

    if !is_base_input && step.amount_out > amount_remaining {
        step.amount_out = amount_remaining;
    }

    step.fee_amount = if is_base_input && step.sqrt_price_next_x64 != sqrt_price_target_x64 {
        // Target not reached: whatever input is left over, dust included, is fee
        amount_remaining
            .checked_sub(step.amount_in)
            .ok_or(ClmmCoreError::MathUnderflow)?
    } else {
        let fee = mul_div_ceil(
            step.amount_in as u128,
            fee_rate as u128,
            (FEE_RATE_DENOMINATOR - fee_rate) as u128,
        )?;
        u64::try_from(fee).map_err(|_| ClmmCoreError::MaxTokenOverflow)?
    };

    Ok(step)
}

/// Amount needed to move the price all the way to the target.
/// `None` means the amount does not fit in u64, so the target cannot be reached.
fn calculate_amount_in_range(
    sqrt_price_current_x64: u128,
    sqrt_price_target_x64: u128,
    liquidity: u128,
    zero_for_one: bool,
    is_base_input: bool,
) -> CoreResult<Option<u64>> {
    let result = match (is_base_input, zero_for_one) {
        (true, true) => get_token_amount_a_from_liquidity(
            sqrt_price_target_x64,
            sqrt_price_current_x64,
            liquidity,
            true,
        ),
        (true, false) => get_token_amount_b_from_liquidity(
            sqrt_price_current_x64,
            sqrt_price_target_x64,
            liquidity,
            true,
        ),
        (false, true) => get_token_amount_b_from_liquidity(
            sqrt_price_target_x64,
            sqrt_price_current_x64,
            liquidity,
            false,
        ),
        (false, false) => get_token_amount_a_from_liquidity(
            sqrt_price_current_x64,
            sqrt_price_target_x64,
            liquidity,
            false,
        ),
    };

    match result {
        Ok(amount) => Ok(Some(amount)),
        Err(ClmmCoreError::MaxTokenOverflow) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Check amount and price limit against the swap direction
pub fn validate_swap_params(
    sqrt_price_current_x64: u128,
    sqrt_price_limit_x64: u128,
    amount_specified: u64,
    zero_for_one: bool,
) -> CoreResult<()> {
    if amount_specified == 0 {
        return Err(ClmmCoreError::ZeroAmount);
    }

    let valid = if zero_for_one {
        sqrt_price_limit_x64 >= MIN_SQRT_PRICE_X64 && sqrt_price_limit_x64 < sqrt_price_current_x64
    } else {
        sqrt_price_limit_x64 <= MAX_SQRT_PRICE_X64 && sqrt_price_limit_x64 > sqrt_price_current_x64
    };

    if valid {
        Ok(())
    } else {
        Err(ClmmCoreError::PriceLimitInvalid)
    }
}

/// Loosest price limit allowed in each direction
pub fn default_sqrt_price_limit(zero_for_one: bool) -> u128 {
    if zero_for_one {
        MIN_SQRT_PRICE_X64 + 1
    } else {
        MAX_SQRT_PRICE_X64 - 1
    }
}
