//! # Tick Math
//!
//! Bit-exact conversions between ticks and Q64.64 sqrt prices. Both directions
//! use integer arithmetic only, so results agree with the on-chain program
//! without any floating-point transcendental calls.

use rust_decimal::Decimal;

use crate::constants::{MAX_SQRT_PRICE_X64, MAX_TICK, MIN_SQRT_PRICE_X64, MIN_TICK};
use crate::errors::{ClmmCoreError, CoreResult};
use crate::math::sqrt_price_math::{price_to_sqrt_price_x64, sqrt_price_x64_to_price};

/// sqrt(1.0001)^-(2^i) in Q64.64 for i in 1..=18.
/// Bit 0 is folded into the starting ratio.
const MAGIC_SQRT_RATIOS: [(u32, u128); 18] = [
    (0x2, 18_444_899_583_751_176_192),
    (0x4, 18_443_055_278_223_355_904),
    (0x8, 18_439_367_220_385_607_680),
    (0x10, 18_431_993_317_065_453_568),
    (0x20, 18_417_254_355_718_170_624),
    (0x40, 18_387_811_781_193_609_216),
    (0x80, 18_329_067_761_203_558_400),
    (0x100, 18_212_142_134_806_163_456),
    (0x200, 17_980_523_815_641_700_352),
    (0x400, 17_526_086_738_831_433_728),
    (0x800, 16_651_378_430_235_570_176),
    (0x1000, 15_030_750_278_694_412_288),
    (0x2000, 12_247_334_978_884_435_968),
    (0x4000, 8_131_365_268_886_854_656),
    (0x8000, 3_584_323_654_725_218_816),
    (0x10000, 696_457_651_848_324_352),
    (0x20000, 26_294_789_957_507_116),
    (0x40000, 37_481_735_321_082),
];

/// sqrt(1.0001)^-1 in Q64.64
const SQRT_RATIO_ODD: u128 = 18_445_821_805_675_395_072;

/// Q64.64 one
const SQRT_RATIO_EVEN: u128 = 1u128 << 64;

/// Fractional bits refined when approximating log2
const BIT_PRECISION: u32 = 16;

/// log_sqrt(1.0001)(2) in Q32.32
const LOG_B_2_X32: i128 = 59_543_866_431_248;

/// Lower error margin of the log estimate, 0.01 in Q64.64
const LOG_B_P_ERR_MARGIN_LOWER_X64: i128 = 184_467_440_737_095_516;

/// Upper error margin, 2^-BIT_PRECISION / log2(b) + 0.01 in Q64.64
const LOG_B_P_ERR_MARGIN_UPPER_X64: i128 = 15_793_534_762_490_258_745;

/// Get the Q64.64 sqrt price at a tick: sqrt(1.0001^tick) * 2^64
pub fn get_sqrt_price_x64_from_tick(tick: i32) -> CoreResult<u128> {
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        return Err(ClmmCoreError::TickOutOfRange);
    }

    let abs_tick = tick.unsigned_abs();

    let mut ratio = if abs_tick & 0x1 != 0 {
        SQRT_RATIO_ODD
    } else {
        SQRT_RATIO_EVEN
    };

    // ratio <= 2^64 and every multiplier < 2^64, so the product fits in u128
    for (mask, magic) in MAGIC_SQRT_RATIOS.iter() {
        if abs_tick & mask != 0 {
            ratio = (ratio * magic) >> 64;
        }
    }

    // The table yields the price at -|tick|; invert for positive ticks
    if tick > 0 {
        ratio = u128::MAX / ratio;
    }

    Ok(ratio)
}

/// Get the greatest tick whose sqrt price does not exceed `sqrt_price_x64`
pub fn get_tick_from_sqrt_price_x64(sqrt_price_x64: u128) -> CoreResult<i32> {
    if !(MIN_SQRT_PRICE_X64..=MAX_SQRT_PRICE_X64).contains(&sqrt_price_x64) {
        return Err(ClmmCoreError::SqrtPriceOutOfRange);
    }

    // Integer part of log2 from the most significant bit
    let msb = 127 - sqrt_price_x64.leading_zeros();
    let log2p_integer_x32 = (msb as i128 - 64) << 32;

    // Normalize into [2^63, 2^64) and square repeatedly for the fractional bits
    let mut r = if msb >= 64 {
        sqrt_price_x64 >> (msb - 63)
    } else {
        sqrt_price_x64 << (63 - msb)
    };
    let mut bit: i128 = 0x8000_0000_0000_0000;
    let mut log2p_fraction_x64: i128 = 0;
    let mut precision = 0;

    while bit > 0 && precision < BIT_PRECISION {
        r *= r;
        let is_r_more_than_two = (r >> 127) as u32;
        r >>= 63 + is_r_more_than_two;
        log2p_fraction_x64 += bit * is_r_more_than_two as i128;
        bit >>= 1;
        precision += 1;
    }

    let log2p_x32 = log2p_integer_x32 + (log2p_fraction_x64 >> 32);
    let logbp_x64 = log2p_x32 * LOG_B_2_X32;

    let tick_low = ((logbp_x64 - LOG_B_P_ERR_MARGIN_LOWER_X64) >> 64) as i32;
    let tick_high = ((logbp_x64 + LOG_B_P_ERR_MARGIN_UPPER_X64) >> 64) as i32;

    if tick_low == tick_high {
        return Ok(tick_low);
    }

    // The estimate brackets the answer; the exact forward conversion breaks the tie
    if tick_high <= MAX_TICK && get_sqrt_price_x64_from_tick(tick_high)? <= sqrt_price_x64 {
        Ok(tick_high)
    } else {
        Ok(tick_low)
    }
}

/// Tick for a human-readable price, via the exact sqrt price path
pub fn get_tick_from_price(price: Decimal, decimals_a: u8, decimals_b: u8) -> CoreResult<i32> {
    get_tick_from_sqrt_price_x64(price_to_sqrt_price_x64(price, decimals_a, decimals_b)?)
}

/// Tick for a price snapped to the tick spacing.
/// Negative quotients round toward negative infinity, positive ones toward positive infinity.
pub fn get_tick_with_price_and_tickspacing(
    price: Decimal,
    tick_spacing: u16,
    decimals_a: u8,
    decimals_b: u8,
) -> CoreResult<i32> {
    if tick_spacing == 0 {
        return Err(ClmmCoreError::InvalidTickSpacing);
    }
    let tick = get_tick_from_price(price, decimals_a, decimals_b)?;
    let spacing = tick_spacing as i32;

    let quotient = if tick < 0 {
        tick.div_euclid(spacing)
    } else {
        // ceil for non-negative ticks
        (tick + spacing - 1) / spacing
    };

    Ok(quotient * spacing)
}

/// Round a price to the nearest representable price on the tick spacing grid
pub fn round_price_with_tickspacing(
    price: Decimal,
    tick_spacing: u16,
    decimals_a: u8,
    decimals_b: u8,
) -> CoreResult<Decimal> {
    let tick = get_tick_with_price_and_tickspacing(price, tick_spacing, decimals_a, decimals_b)?;
    let sqrt_price_x64 = get_sqrt_price_x64_from_tick(tick)?;
    sqrt_price_x64_to_price(sqrt_price_x64, decimals_a, decimals_b)
}

/// Check if a tick is within the supported range
pub fn is_tick_valid(tick: i32) -> bool {
    (MIN_TICK..=MAX_TICK).contains(&tick)
}

/// Check if a Q64.64 sqrt price is within the supported range
pub fn is_sqrt_price_valid(sqrt_price_x64: u128) -> bool {
    (MIN_SQRT_PRICE_X64..=MAX_SQRT_PRICE_X64).contains(&sqrt_price_x64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::Q64;
    use std::str::FromStr;

    #[test]
    fn test_tick_zero_is_q64() {
        assert_eq!(get_sqrt_price_x64_from_tick(0).unwrap(), Q64);
        assert_eq!(get_tick_from_sqrt_price_x64(Q64).unwrap(), 0);
    }

    #[test]
    fn test_bounds_match_tick_images() {
        assert_eq!(get_sqrt_price_x64_from_tick(MIN_TICK).unwrap(), MIN_SQRT_PRICE_X64);
        assert_eq!(get_sqrt_price_x64_from_tick(MAX_TICK).unwrap(), MAX_SQRT_PRICE_X64);
        assert_eq!(get_tick_from_sqrt_price_x64(MIN_SQRT_PRICE_X64).unwrap(), MIN_TICK);
        assert_eq!(get_tick_from_sqrt_price_x64(MAX_SQRT_PRICE_X64).unwrap(), MAX_TICK);
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(get_sqrt_price_x64_from_tick(500_000), Err(ClmmCoreError::TickOutOfRange));
        assert_eq!(get_sqrt_price_x64_from_tick(MIN_TICK - 1), Err(ClmmCoreError::TickOutOfRange));
        assert_eq!(get_sqrt_price_x64_from_tick(MAX_TICK + 1), Err(ClmmCoreError::TickOutOfRange));
        assert_eq!(
            get_tick_from_sqrt_price_x64(MIN_SQRT_PRICE_X64 - 1),
            Err(ClmmCoreError::SqrtPriceOutOfRange)
        );
        assert_eq!(
            get_tick_from_sqrt_price_x64(MAX_SQRT_PRICE_X64 + 1),
            Err(ClmmCoreError::SqrtPriceOutOfRange)
        );
    }

    #[test]
    fn test_symmetry() {
        // sqrt(p(t)) * sqrt(p(-t)) ~= 1
        for tick in [1, 10, 100, 1_000, 50_000] {
            let up = get_sqrt_price_x64_from_tick(tick).unwrap();
            let down = get_sqrt_price_x64_from_tick(-tick).unwrap();
            let product = crate::math::full_math::mul_div_floor(up, down, Q64).unwrap();
            let diff = product.abs_diff(Q64);
            assert!(diff < 1 << 20, "tick {} product off by {}", tick, diff);
        }
    }

    #[test]
    fn test_between_ticks_floors() {
        for tick in [-200_000, -1, 0, 1, 77, 200_000] {
            let at = get_sqrt_price_x64_from_tick(tick).unwrap();
            let next = get_sqrt_price_x64_from_tick(tick + 1).unwrap();
            assert_eq!(get_tick_from_sqrt_price_x64(at + 1).unwrap(), tick);
            assert_eq!(get_tick_from_sqrt_price_x64(next - 1).unwrap(), tick);
        }
    }

    #[test]
    fn test_tick_with_price_and_spacing() {
        // price 1.0 sits exactly on tick 0
        let tick = get_tick_with_price_and_tickspacing(Decimal::ONE, 10, 6, 6).unwrap();
        assert_eq!(tick, 0);

        // price just above 1 rounds up to the next spacing multiple
        let tick = get_tick_with_price_and_tickspacing(Decimal::from_str("1.0005").unwrap(), 10, 6, 6).unwrap();
        assert_eq!(tick, 10);

        // price just below 1 rounds down to the previous multiple
        let tick = get_tick_with_price_and_tickspacing(Decimal::from_str("0.9995").unwrap(), 10, 6, 6).unwrap();
        assert_eq!(tick, -10);

        assert_eq!(
            get_tick_with_price_and_tickspacing(Decimal::ONE, 0, 6, 6),
            Err(ClmmCoreError::InvalidTickSpacing)
        );
    }

    #[test]
    fn test_round_price_with_tickspacing() {
        let rounded = round_price_with_tickspacing(Decimal::ONE, 60, 9, 9).unwrap();
        assert_eq!(rounded, Decimal::ONE);
    }
}
