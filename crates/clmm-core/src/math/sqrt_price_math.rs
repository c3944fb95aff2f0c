//! # Sqrt Price Math
//!
//! Decimal price conversions and the next-sqrt-price formulas used by the swap
//! step. Rounding always favors the pool: the price that sets what the pool
//! receives rounds up, the price that bounds what it pays out rounds down.

use primitive_types::U256;
use rust_decimal::{Decimal, MathematicalOps};

use crate::constants::RESOLUTION;
use crate::errors::{ClmmCoreError, CoreResult};
use crate::math::full_math::{
    decimal_to_x64, div_rounding_up, mul_div_u256, u256_to_u128, x64_to_decimal, Rounding,
};

/// 10^exp as a decimal, for mint decimal adjustments
fn pow10(exp: i32) -> CoreResult<Decimal> {
    if exp >= 0 {
        let value = 10i128
            .checked_pow(exp as u32)
            .ok_or(ClmmCoreError::MathOverflow)?;
        Decimal::try_from_i128_with_scale(value, 0).map_err(|_| ClmmCoreError::MathOverflow)
    } else {
        Decimal::try_new(1, exp.unsigned_abs()).map_err(|_| ClmmCoreError::ConversionError)
    }
}

/// price = (sqrt_price_x64 / 2^64)^2 * 10^(decimals_a - decimals_b)
pub fn sqrt_price_x64_to_price(
    sqrt_price_x64: u128,
    decimals_a: u8,
    decimals_b: u8,
) -> CoreResult<Decimal> {
    let sqrt_price = x64_to_decimal(sqrt_price_x64)?;
    let price = sqrt_price
        .checked_mul(sqrt_price)
        .ok_or(ClmmCoreError::MathOverflow)?;
    price
        .checked_mul(pow10(decimals_a as i32 - decimals_b as i32)?)
        .ok_or(ClmmCoreError::MathOverflow)
}

/// sqrt_price_x64 = floor(sqrt(price * 10^(decimals_b - decimals_a)) * 2^64)
pub fn price_to_sqrt_price_x64(price: Decimal, decimals_a: u8, decimals_b: u8) -> CoreResult<u128> {
    if price <= Decimal::ZERO {
        return Err(ClmmCoreError::InvalidPrice);
    }
    let adjusted = price
        .checked_mul(pow10(decimals_b as i32 - decimals_a as i32)?)
        .ok_or(ClmmCoreError::MathOverflow)?;
    let sqrt_price = adjusted.sqrt().ok_or(ClmmCoreError::InvalidPrice)?;
    decimal_to_x64(sqrt_price)
}

/// Next sqrt price after `amount_in` of the input token enters the pool
pub fn get_next_sqrt_price_x64_from_input(
    sqrt_price_x64: u128,
    liquidity: u128,
    amount_in: u64,
    zero_for_one: bool,
) -> CoreResult<u128> {
    if sqrt_price_x64 == 0 {
        return Err(ClmmCoreError::InvalidSqrtPrice);
    }
    if liquidity == 0 {
        return Err(ClmmCoreError::InvalidLiquidity);
    }

    if zero_for_one {
        get_next_sqrt_price_from_token_amount_a_rounding_up(sqrt_price_x64, liquidity, amount_in, true)
    } else {
        get_next_sqrt_price_from_token_amount_b_rounding_down(sqrt_price_x64, liquidity, amount_in, true)
    }
}

/// Next sqrt price after `amount_out` of the output token leaves the pool
pub fn get_next_sqrt_price_x64_from_output(
    sqrt_price_x64: u128,
    liquidity: u128,
    amount_out: u64,
    zero_for_one: bool,
) -> CoreResult<u128> {
    if sqrt_price_x64 == 0 {
        return Err(ClmmCoreError::InvalidSqrtPrice);
    }
    if liquidity == 0 {
        return Err(ClmmCoreError::InvalidLiquidity);
    }

    if zero_for_one {
        get_next_sqrt_price_from_token_amount_b_rounding_down(sqrt_price_x64, liquidity, amount_out, false)
    } else {
        get_next_sqrt_price_from_token_amount_a_rounding_up(sqrt_price_x64, liquidity, amount_out, false)
    }
}

/// Token0 delta moves the price by L * p / (L ± amount * p), rounded up
pub fn get_next_sqrt_price_from_token_amount_a_rounding_up(
    sqrt_price_x64: u128,
    liquidity: u128,
    amount: u64,
    add: bool,
) -> CoreResult<u128> {
    if amount == 0 {
        return Ok(sqrt_price_x64);
    }

    let numerator_1 = U256::from(liquidity) << RESOLUTION;
    let sqrt_price = U256::from(sqrt_price_x64);
    // amount < 2^64 and price < 2^128, so the product fits
    let product = U256::from(amount) * sqrt_price;

    let denominator = if add {
        numerator_1
            .checked_add(product)
            .ok_or(ClmmCoreError::MathOverflow)?
    } else {
        if numerator_1 <= product {
            return Err(ClmmCoreError::PriceOverflow);
        }
        numerator_1 - product
    };

    u256_to_u128(mul_div_u256(numerator_1, sqrt_price, denominator, Rounding::Up)?)
}

/// Token1 delta moves the price by amount / L, rounded down
pub fn get_next_sqrt_price_from_token_amount_b_rounding_down(
    sqrt_price_x64: u128,
    liquidity: u128,
    amount: u64,
    add: bool,
) -> CoreResult<u128> {
    if liquidity == 0 {
        return Err(ClmmCoreError::InvalidLiquidity);
    }

    let delta_y = U256::from(amount) << RESOLUTION;
    let liquidity = U256::from(liquidity);

    if add {
        let quotient = u256_to_u128(delta_y / liquidity)?;
        sqrt_price_x64
            .checked_add(quotient)
            .ok_or(ClmmCoreError::MathOverflow)
    } else {
        let quotient = u256_to_u128(div_rounding_up(delta_y, liquidity)?)?;
        if sqrt_price_x64 <= quotient {
            return Err(ClmmCoreError::PriceOverflow);
        }
        Ok(sqrt_price_x64 - quotient)
    }
}
