//! # Pool Types
//!
//! A point-in-time copy of the pool state the swap simulator needs, and the
//! fee configuration applied to it.

use rust_decimal::Decimal;

use crate::constants::{FEE_RATE_DENOMINATOR, FEE_TIER_MEDIUM, INNER_BITMAP_WORDS};
use crate::errors::{ClmmCoreError, CoreResult};
use crate::math::sqrt_price_math::sqrt_price_x64_to_price;
use crate::math::tick_math::is_sqrt_price_valid;
use crate::tick_array_bitmap::{TickArrayBitmap, TickArrayBitmapExtension};
use crate::tick_utils::{get_tick_array_start_index, validate_tick};

/// Pool state snapshot
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolSnapshot {
    /// Current sqrt price in Q64.64
    pub sqrt_price_x64: u128,
    /// Current tick, floor of the tick at the current price
    pub tick_current: i32,
    /// In-range liquidity
    pub liquidity: u128,
    pub tick_spacing: u16,
    pub mint_decimals_0: u8,
    pub mint_decimals_1: u8,
    /// Global fee growth per unit of liquidity, Q64.64, wrapping
    #[cfg_attr(feature = "client", serde(default))]
    pub fee_growth_global_0_x64: u128,
    #[cfg_attr(feature = "client", serde(default))]
    pub fee_growth_global_1_x64: u128,
    /// Inner tick array bitmap, offsets [-512, 512)
    pub tick_array_bitmap: [u64; INNER_BITMAP_WORDS],
    #[cfg_attr(feature = "client", serde(default))]
    pub bitmap_extension: TickArrayBitmapExtension,
}

impl PoolSnapshot {
    pub fn validate(&self) -> CoreResult<()> {
        if self.tick_spacing == 0 {
            return Err(ClmmCoreError::InvalidTickSpacing);
        }
        if !is_sqrt_price_valid(self.sqrt_price_x64) {
            return Err(ClmmCoreError::SqrtPriceOutOfRange);
        }
        validate_tick(self.tick_current)
    }

    /// Inner bitmap and extension as one searchable index
    pub fn bitmap(&self) -> TickArrayBitmap {
        TickArrayBitmap::new(self.tick_array_bitmap, self.bitmap_extension)
    }

    /// Start index of the tick array holding the current tick
    pub fn current_tick_array_start_index(&self) -> CoreResult<i32> {
        get_tick_array_start_index(self.tick_current, self.tick_spacing)
    }

    /// Human-readable price of token0 in token1
    pub fn price(&self) -> CoreResult<Decimal> {
        sqrt_price_x64_to_price(self.sqrt_price_x64, self.mint_decimals_0, self.mint_decimals_1)
    }
}

/// Trade fee and the protocol and fund shares taken out of it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct AmmFees {
    /// Fee on swap input, in hundredths of a basis point
    pub trade_fee_rate: u32,
    /// Share of the trade fee, over the same denominator
    pub protocol_fee_rate: u32,
    /// Share of the trade fee, over the same denominator
    pub fund_fee_rate: u32,
}

impl Default for AmmFees {
    fn default() -> Self {
        Self {
            trade_fee_rate: FEE_TIER_MEDIUM,
            protocol_fee_rate: 120_000,
            fund_fee_rate: 40_000,
        }
    }
}

impl AmmFees {
    pub fn validate(&self) -> CoreResult<()> {
        if self.trade_fee_rate >= FEE_RATE_DENOMINATOR {
            return Err(ClmmCoreError::InvalidFeeRate);
        }
        let shares = self.protocol_fee_rate as u64 + self.fund_fee_rate as u64;
        if shares > FEE_RATE_DENOMINATOR as u64 {
            return Err(ClmmCoreError::InvalidFeeRate);
        }
        Ok(())
    }
}
