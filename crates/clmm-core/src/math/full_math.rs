//! # Full-Width Multiply-Divide
//!
//! `a * b / denominator` with a double-width intermediate so the product never
//! overflows before the division. u128 operands widen to U256; U256 operands
//! widen to U512. Every call site picks a rounding direction that favors the pool.

use primitive_types::{U256, U512};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::constants::Q64;
use crate::errors::{ClmmCoreError, CoreResult};

/// Rounding mode for division operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub enum Rounding {
    /// Round toward zero
    Down,
    /// Round away from zero
    Up,
}

impl Rounding {
    pub fn from_round_up(round_up: bool) -> Self {
        if round_up {
            Rounding::Up
        } else {
            Rounding::Down
        }
    }
}

/// Multiply two u128 values and divide by a third with the given rounding
pub fn mul_div(a: u128, b: u128, denominator: u128, rounding: Rounding) -> CoreResult<u128> {
    let result = mul_div_u256(
        U256::from(a),
        U256::from(b),
        U256::from(denominator),
        rounding,
    )?;
    u256_to_u128(result)
}

/// floor(a * b / denominator)
pub fn mul_div_floor(a: u128, b: u128, denominator: u128) -> CoreResult<u128> {
    mul_div(a, b, denominator, Rounding::Down)
}

/// ceil(a * b / denominator), computed as (a * b + denominator - 1) / denominator
pub fn mul_div_ceil(a: u128, b: u128, denominator: u128) -> CoreResult<u128> {
    if denominator == 0 {
        return Err(ClmmCoreError::DivisionByZero);
    }
    // (2^128 - 1)^2 + 2^128 - 2 < 2^256
    let numerator = U256::from(a).full_mul(U256::from(b)) + U512::from(denominator - 1);
    let result = numerator / U512::from(denominator);
    u128::try_from(U256::try_from(result).map_err(|_| ClmmCoreError::MathOverflow)?)
        .map_err(|_| ClmmCoreError::MathOverflow)
}

/// ceil(a * b / denominator), computed as quotient plus one when a remainder exists
pub fn mul_div_rounding_up(a: u128, b: u128, denominator: u128) -> CoreResult<u128> {
    mul_div(a, b, denominator, Rounding::Up)
}

/// Multiply two U256 values and divide by a third through a U512 intermediate
pub fn mul_div_u256(a: U256, b: U256, denominator: U256, rounding: Rounding) -> CoreResult<U256> {
    if denominator.is_zero() {
        return Err(ClmmCoreError::DivisionByZero);
    }

    let product = a.full_mul(b);
    let denominator = U512::from(denominator);
    let mut quotient = product / denominator;

    if rounding == Rounding::Up && !(product % denominator).is_zero() {
        quotient = quotient
            .checked_add(U512::one())
            .ok_or(ClmmCoreError::MathOverflow)?;
    }

    U256::try_from(quotient).map_err(|_| ClmmCoreError::MathOverflow)
}

/// ceil(numerator / denominator)
pub fn div_rounding_up(numerator: U256, denominator: U256) -> CoreResult<U256> {
    if denominator.is_zero() {
        return Err(ClmmCoreError::DivisionByZero);
    }
    let quotient = numerator / denominator;
    if (numerator % denominator).is_zero() {
        Ok(quotient)
    } else {
        quotient.checked_add(U256::one()).ok_or(ClmmCoreError::MathOverflow)
    }
}

/// Narrow a U256 into u128
pub fn u256_to_u128(value: U256) -> CoreResult<u128> {
    u128::try_from(value).map_err(|_| ClmmCoreError::MathOverflow)
}

/// Narrow a U256 token amount into u64
pub fn u256_to_u64_amount(value: U256) -> CoreResult<u64> {
    u64::try_from(value).map_err(|_| ClmmCoreError::MaxTokenOverflow)
}

/// (n0 - n1) mod 2^128, used for fee growth accumulators that are allowed to wrap
pub fn wrapping_sub_u128(n0: u128, n1: u128) -> u128 {
    n0.wrapping_sub(n1)
}

/// Convert a Q64.64 value into a decimal
pub fn x64_to_decimal(value: u128) -> CoreResult<Decimal> {
    let value = Decimal::from_u128(value).ok_or(ClmmCoreError::ConversionError)?;
    let scale = Decimal::from_u128(Q64).ok_or(ClmmCoreError::ConversionError)?;
    value.checked_div(scale).ok_or(ClmmCoreError::MathOverflow)
}

/// Convert a decimal into Q64.64, flooring the fractional remainder
pub fn decimal_to_x64(value: Decimal) -> CoreResult<u128> {
    if value.is_sign_negative() {
        return Err(ClmmCoreError::ConversionError);
    }
    let scale = Decimal::from_u128(Q64).ok_or(ClmmCoreError::ConversionError)?;
    value
        .checked_mul(scale)
        .ok_or(ClmmCoreError::MathOverflow)?
        .floor()
        .to_u128()
        .ok_or(ClmmCoreError::ConversionError)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_div_rounding() {
        assert_eq!(mul_div_floor(7, 3, 2).unwrap(), 10);
        assert_eq!(mul_div_ceil(7, 3, 2).unwrap(), 11);
        assert_eq!(mul_div_rounding_up(7, 3, 2).unwrap(), 11);

        // Exact division never rounds up
        assert_eq!(mul_div_ceil(6, 4, 8).unwrap(), 3);
        assert_eq!(mul_div_rounding_up(6, 4, 8).unwrap(), 3);
    }

    #[test]
    fn test_mul_div_wide_intermediate() {
        // u128::MAX * u128::MAX / u128::MAX does not overflow the intermediate
        assert_eq!(mul_div_floor(u128::MAX, u128::MAX, u128::MAX).unwrap(), u128::MAX);
        assert_eq!(mul_div_ceil(u128::MAX, u128::MAX, u128::MAX).unwrap(), u128::MAX);
        assert_eq!(mul_div_floor(Q64, Q64, Q64).unwrap(), Q64);
    }

    #[test]
    fn test_mul_div_errors() {
        assert_eq!(mul_div_floor(1, 1, 0), Err(ClmmCoreError::DivisionByZero));
        assert_eq!(mul_div_ceil(1, 1, 0), Err(ClmmCoreError::DivisionByZero));
        assert_eq!(mul_div_rounding_up(1, 1, 0), Err(ClmmCoreError::DivisionByZero));
        assert_eq!(mul_div_floor(u128::MAX, 2, 1), Err(ClmmCoreError::MathOverflow));
    }

    #[test]
    fn test_mul_div_u256() {
        let a = U256::from(u128::MAX) << 64;
        let b = U256::from(3u8);
        let d = U256::from(2u8);
        let r = mul_div_u256(a, b, d, Rounding::Down).unwrap();
        assert_eq!(r, (U256::from(u128::MAX) << 64) * 3 / 2);

        let r_up = mul_div_u256(U256::from(5u8), U256::from(1u8), U256::from(2u8), Rounding::Up).unwrap();
        assert_eq!(r_up, U256::from(3u8));

        let overflow = mul_div_u256(U256::MAX, U256::MAX, U256::one(), Rounding::Down);
        assert_eq!(overflow, Err(ClmmCoreError::MathOverflow));
    }

    #[test]
    fn test_div_rounding_up() {
        assert_eq!(div_rounding_up(U256::from(10u8), U256::from(5u8)).unwrap(), U256::from(2u8));
        assert_eq!(div_rounding_up(U256::from(11u8), U256::from(5u8)).unwrap(), U256::from(3u8));
        assert!(div_rounding_up(U256::one(), U256::zero()).is_err());
    }

    #[test]
    fn test_wrapping_sub() {
        assert_eq!(wrapping_sub_u128(5, 3), 2);
        assert_eq!(wrapping_sub_u128(0, 1), u128::MAX);
    }

    #[test]
    fn test_decimal_conversions() {
        assert_eq!(x64_to_decimal(Q64).unwrap(), Decimal::ONE);
        assert_eq!(x64_to_decimal(Q64 / 2).unwrap(), Decimal::new(5, 1));
        assert_eq!(decimal_to_x64(Decimal::ONE).unwrap(), Q64);
        assert_eq!(decimal_to_x64(Decimal::new(25, 2)).unwrap(), Q64 / 4);
        assert!(decimal_to_x64(Decimal::NEGATIVE_ONE).is_err());
    }
}
