//! # Pool Constants
//!
//! Numeric constants shared with the on-chain program:
//! - Fixed-point scales (Q64, Q128)
//! - Tick and sqrt price bounds
//! - Tick array and bitmap geometry
//! - Fee denominators and standard fee tiers

// ============================================================================
// Mathematical Constants
// ============================================================================

/// Q64 fixed-point scale factor: 2^64
pub const Q64: u128 = 1u128 << 64;

/// Bits of fractional precision in a Q64.64 value
pub const RESOLUTION: u32 = 64;

/// Largest u64 token amount, as u128
pub const MAX_U64: u128 = u64::MAX as u128;

/// 2^128 - 1. Q128 itself does not fit in u128; see `q128()`.
pub const MAX_U128: u128 = u128::MAX;

/// Q128 fixed-point scale factor: 2^128
pub fn q128() -> primitive_types::U256 {
    primitive_types::U256::one() << 128
}

// ============================================================================
// Tick Bounds
// ============================================================================

/// Minimum tick, price = 1.0001^MIN_TICK
pub const MIN_TICK: i32 = -443_636;

/// Maximum tick, price = 1.0001^MAX_TICK
pub const MAX_TICK: i32 = 443_636;

/// sqrt price at MIN_TICK in Q64.64
pub const MIN_SQRT_PRICE_X64: u128 = 4_295_048_016;

/// sqrt price at MAX_TICK in Q64.64
pub const MAX_SQRT_PRICE_X64: u128 = 79_226_673_521_066_979_257_578_248_091;

// ============================================================================
// Tick Array Geometry
// ============================================================================

/// Number of tick slots in one tick array
pub const TICKS_PER_ARRAY: i32 = 60;

/// Bits in one bitmap block
pub const TICK_ARRAY_BITMAP_SIZE: i32 = 512;

/// Words in the inner pool bitmap (1024 bits)
pub const INNER_BITMAP_WORDS: usize = 16;

/// Blocks in each extension bitmap
pub const EXTENSION_BITMAP_BLOCKS: usize = 14;

/// Words per 512-bit block
pub const WORDS_PER_BLOCK: usize = 8;

/// Lowest representable tick array offset; offsets live in [-7680, 7680)
pub const MIN_TICK_ARRAY_OFFSET: i32 =
    -(TICK_ARRAY_BITMAP_SIZE * (EXTENSION_BITMAP_BLOCKS as i32 + 1));

/// One past the highest representable tick array offset
pub const MAX_TICK_ARRAY_OFFSET: i32 = -MIN_TICK_ARRAY_OFFSET;

/// Tick arrays to preload on each side of the current price
pub const FETCH_TICK_ARRAY_COUNT: usize = 15;

// ============================================================================
// Fee Constants
// ============================================================================

/// Fee rates are expressed in hundredths of a basis point
pub const FEE_RATE_DENOMINATOR: u32 = 1_000_000;

/// 0.01% fee tier
pub const FEE_TIER_VERY_LOW: u32 = 100;

/// 0.05% fee tier
pub const FEE_TIER_LOW: u32 = 500;

/// 0.3% fee tier
pub const FEE_TIER_MEDIUM: u32 = 3_000;

/// 1% fee tier
pub const FEE_TIER_HIGH: u32 = 10_000;

/// Standard fee tiers paired with their tick spacing
pub const FEE_TIERS: [(u32, u16); 4] = [
    (FEE_TIER_VERY_LOW, 1),
    (FEE_TIER_LOW, 10),
    (FEE_TIER_MEDIUM, 60),
    (FEE_TIER_HIGH, 200),
];

/// Tick spacing used by a standard fee tier
pub fn tick_spacing_for_fee_tier(fee_rate: u32) -> Option<u16> {
    FEE_TIERS
        .iter()
        .find(|(rate, _)| *rate == fee_rate)
        .map(|(_, spacing)| *spacing)
}

// ============================================================================
// Swap Limits
// ============================================================================

/// Ticks a single simulated swap may cross before giving up
pub const MAX_CROSSED_TICKS: usize = 100;

/// Default slippage tolerance for quotes, as a fraction (1%)
pub const DEFAULT_SLIPPAGE: &str = "0.01";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_bounds() {
        assert_eq!(MIN_TICK_ARRAY_OFFSET, -7680);
        assert_eq!(MAX_TICK_ARRAY_OFFSET, 7680);
    }

    #[test]
    fn test_fee_tier_lookup() {
        assert_eq!(tick_spacing_for_fee_tier(3_000), Some(60));
        assert_eq!(tick_spacing_for_fee_tier(100), Some(1));
        assert_eq!(tick_spacing_for_fee_tier(2_500), None);
    }

    #[test]
    fn test_q128() {
        assert_eq!(q128(), primitive_types::U256::from(MAX_U128) + 1);
    }
}
