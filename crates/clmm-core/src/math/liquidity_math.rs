//! # Liquidity Math
//!
//! Conversions between a liquidity magnitude and the token amounts it
//! represents over a sqrt price range. Deposits round up, withdrawals round down.

use primitive_types::U256;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::constants::{Q64, RESOLUTION};
use crate::errors::{ClmmCoreError, CoreResult};
use crate::math::full_math::{mul_div, mul_div_u256, u256_to_u128, u256_to_u64_amount, Rounding};

/// Token amounts on both sides of a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct TokenAmounts {
    pub amount_a: u64,
    pub amount_b: u64,
}

/// Apply a signed liquidity delta
pub fn add_delta(liquidity: u128, delta: i128) -> CoreResult<u128> {
    if delta < 0 {
        liquidity
            .checked_sub(delta.unsigned_abs())
            .ok_or(ClmmCoreError::MathUnderflow)
    } else {
        liquidity
            .checked_add(delta as u128)
            .ok_or(ClmmCoreError::MathOverflow)
    }
}

fn sorted(sqrt_price_a_x64: u128, sqrt_price_b_x64: u128) -> (u128, u128) {
    if sqrt_price_a_x64 > sqrt_price_b_x64 {
        (sqrt_price_b_x64, sqrt_price_a_x64)
    } else {
        (sqrt_price_a_x64, sqrt_price_b_x64)
    }
}

/// Token0 for `liquidity` over the range: L * (b - a) / (a * b)
pub fn get_token_amount_a_from_liquidity(
    sqrt_price_a_x64: u128,
    sqrt_price_b_x64: u128,
    liquidity: u128,
    round_up: bool,
) -> CoreResult<u64> {
    let (lower, upper) = sorted(sqrt_price_a_x64, sqrt_price_b_x64);
    if lower == 0 {
        return Err(ClmmCoreError::InvalidSqrtPrice);
    }

    let numerator_1 = U256::from(liquidity) << RESOLUTION;
    let numerator_2 = U256::from(upper - lower);
    let rounding = Rounding::from_round_up(round_up);

    // (L << 64) * (b - a) exceeds 256 bits, so divide by b through the wide path first
    let intermediate = mul_div_u256(numerator_1, numerator_2, U256::from(upper), rounding)?;
    let result = mul_div_u256(intermediate, U256::one(), U256::from(lower), rounding)?;

    u256_to_u64_amount(result)
}

/// Token1 for `liquidity` over the range: L * (b - a) / 2^64
pub fn get_token_amount_b_from_liquidity(
    sqrt_price_a_x64: u128,
    sqrt_price_b_x64: u128,
    liquidity: u128,
    round_up: bool,
) -> CoreResult<u64> {
    let (lower, upper) = sorted(sqrt_price_a_x64, sqrt_price_b_x64);
    if lower == 0 {
        return Err(ClmmCoreError::InvalidSqrtPrice);
    }

    let result = mul_div_u256(
        U256::from(liquidity),
        U256::from(upper - lower),
        U256::from(Q64),
        Rounding::from_round_up(round_up),
    )?;

    u256_to_u64_amount(result)
}

/// Liquidity supplied by `amount_a` of token0: amount * (a * b / 2^64) / (b - a)
pub fn get_liquidity_from_token_amount_a(
    sqrt_price_a_x64: u128,
    sqrt_price_b_x64: u128,
    amount_a: u64,
    round_up: bool,
) -> CoreResult<u128> {
    let (lower, upper) = sorted(sqrt_price_a_x64, sqrt_price_b_x64);
    if lower == upper {
        return Err(ClmmCoreError::InvalidPriceRange);
    }
    let rounding = Rounding::from_round_up(round_up);

    let intermediate = mul_div_u256(
        U256::from(lower),
        U256::from(upper),
        U256::from(Q64),
        rounding,
    )?;
    let liquidity = mul_div_u256(
        U256::from(amount_a),
        intermediate,
        U256::from(upper - lower),
        rounding,
    )?;

    u256_to_u128(liquidity)
}

/// Liquidity supplied by `amount_b` of token1: amount * 2^64 / (b - a)
pub fn get_liquidity_from_token_amount_b(
    sqrt_price_a_x64: u128,
    sqrt_price_b_x64: u128,
    amount_b: u64,
) -> CoreResult<u128> {
    let (lower, upper) = sorted(sqrt_price_a_x64, sqrt_price_b_x64);
    if lower == upper {
        return Err(ClmmCoreError::InvalidPriceRange);
    }
    mul_div(amount_b as u128, Q64, upper - lower, Rounding::Down)
}

/// Largest liquidity both token amounts can support at the current price
pub fn get_liquidity_from_token_amounts(
    sqrt_price_current_x64: u128,
    sqrt_price_a_x64: u128,
    sqrt_price_b_x64: u128,
    amount_a: u64,
    amount_b: u64,
) -> CoreResult<u128> {
    let (lower, upper) = sorted(sqrt_price_a_x64, sqrt_price_b_x64);

    if sqrt_price_current_x64 <= lower {
        get_liquidity_from_token_amount_a(lower, upper, amount_a, false)
    } else if sqrt_price_current_x64 < upper {
        let liquidity_0 =
            get_liquidity_from_token_amount_a(sqrt_price_current_x64, upper, amount_a, false)?;
        let liquidity_1 = get_liquidity_from_token_amount_b(lower, sqrt_price_current_x64, amount_b)?;
        Ok(liquidity_0.min(liquidity_1))
    } else {
        get_liquidity_from_token_amount_b(lower, upper, amount_b)
    }
}

/// Token amounts represented by `liquidity` at the current price.
/// The side the price has fully crossed is zero.
pub fn get_amounts_from_liquidity(
    sqrt_price_current_x64: u128,
    sqrt_price_a_x64: u128,
    sqrt_price_b_x64: u128,
    liquidity: u128,
    round_up: bool,
) -> CoreResult<TokenAmounts> {
    let (lower, upper) = sorted(sqrt_price_a_x64, sqrt_price_b_x64);

    if sqrt_price_current_x64 <= lower {
        Ok(TokenAmounts {
            amount_a: get_token_amount_a_from_liquidity(lower, upper, liquidity, round_up)?,
            amount_b: 0,
        })
    } else if sqrt_price_current_x64 < upper {
        Ok(TokenAmounts {
            amount_a: get_token_amount_a_from_liquidity(
                sqrt_price_current_x64,
                upper,
                liquidity,
                round_up,
            )?,
            amount_b: get_token_amount_b_from_liquidity(
                lower,
                sqrt_price_current_x64,
                liquidity,
                round_up,
            )?,
        })
    } else {
        Ok(TokenAmounts {
            amount_a: 0,
            amount_b: get_token_amount_b_from_liquidity(lower, upper, liquidity, round_up)?,
        })
    }
}

/// Token amounts widened (maximum) or narrowed (minimum) by a slippage fraction.
///
/// Maximum bounds round up and minimum bounds round down, so rounding never
/// tightens a bound past what the caller asked for.
pub fn get_amounts_from_liquidity_with_slippage(
    sqrt_price_current_x64: u128,
    sqrt_price_a_x64: u128,
    sqrt_price_b_x64: u128,
    liquidity: u128,
    amount_max: bool,
    round_up: bool,
    slippage: Decimal,
) -> CoreResult<TokenAmounts> {
    if slippage.is_sign_negative() || slippage >= Decimal::ONE {
        return Err(ClmmCoreError::InvalidSlippage);
    }

    let amounts = get_amounts_from_liquidity(
        sqrt_price_current_x64,
        sqrt_price_a_x64,
        sqrt_price_b_x64,
        liquidity,
        round_up,
    )?;

    let coefficient = if amount_max {
        Decimal::ONE + slippage
    } else {
        Decimal::ONE - slippage
    };

    Ok(TokenAmounts {
        amount_a: apply_coefficient(amounts.amount_a, coefficient, amount_max)?,
        amount_b: apply_coefficient(amounts.amount_b, coefficient, amount_max)?,
    })
}

fn apply_coefficient(amount: u64, coefficient: Decimal, round_up: bool) -> CoreResult<u64> {
    let scaled = Decimal::from_u64(amount)
        .ok_or(ClmmCoreError::ConversionError)?
        .checked_mul(coefficient)
        .ok_or(ClmmCoreError::MathOverflow)?;
    let rounded = if round_up { scaled.ceil() } else { scaled.floor() };
    rounded.to_u64().ok_or(ClmmCoreError::MaxTokenOverflow)
}
