//! # Tick Range Utilities
//!
//! Validation and alignment helpers for ticks, tick ranges and tick array
//! start indices. Tick array boundaries floor toward negative infinity, so
//! tick -1 lives in the array that starts at `-60 * tick_spacing`.

use num_traits::ToPrimitive;

use crate::constants::{
    MAX_TICK, MAX_TICK_ARRAY_OFFSET, MIN_TICK, MIN_TICK_ARRAY_OFFSET, TICKS_PER_ARRAY,
};
use crate::errors::{ClmmCoreError, CoreResult};
use crate::types::TickState;

/// ln(1.0001)
const LN_TICK_BASE: f64 = 0.000_099_995_000_333_308_34;

fn spacing_i32(tick_spacing: u16) -> CoreResult<i32> {
    if tick_spacing == 0 {
        return Err(ClmmCoreError::InvalidTickSpacing);
    }
    Ok(tick_spacing as i32)
}

/// Ticks covered by one tick array
pub fn tick_array_size(tick_spacing: u16) -> CoreResult<i32> {
    Ok(TICKS_PER_ARRAY * spacing_i32(tick_spacing)?)
}

/// Validate that a tick is within valid range
pub fn validate_tick(tick: i32) -> CoreResult<()> {
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        return Err(ClmmCoreError::TickOutOfRange);
    }
    Ok(())
}

/// Validate that ticks are in range, properly ordered and aligned
pub fn validate_tick_range(tick_lower: i32, tick_upper: i32, tick_spacing: u16) -> CoreResult<()> {
    let spacing = spacing_i32(tick_spacing)?;
    validate_tick(tick_lower)?;
    validate_tick(tick_upper)?;

    if tick_lower >= tick_upper {
        return Err(ClmmCoreError::TickRangeInvalid);
    }
    if tick_lower % spacing != 0 || tick_upper % spacing != 0 {
        return Err(ClmmCoreError::TickSpacingMismatch);
    }
    Ok(())
}

/// Start index of the tick array containing `tick`
pub fn get_tick_array_start_index(tick: i32, tick_spacing: u16) -> CoreResult<i32> {
    let size = tick_array_size(tick_spacing)?;
    Ok(tick.div_euclid(size) * size)
}

/// Offset of the tick array containing `tick` in units of whole arrays
pub fn get_tick_array_bit_index(tick: i32, tick_spacing: u16) -> CoreResult<i32> {
    Ok(tick.div_euclid(tick_array_size(tick_spacing)?))
}

/// Check that `start_index` sits on a tick array boundary
pub fn is_valid_tick_array_boundary(start_index: i32, tick_spacing: u16) -> bool {
    match tick_array_size(tick_spacing) {
        Ok(size) => start_index.rem_euclid(size) == 0,
        Err(_) => false,
    }
}

/// True if the tick array holding `start_index` cannot be tracked by the bitmap
pub fn check_is_out_of_bounds(start_index: i32, tick_spacing: u16) -> bool {
    match get_tick_array_bit_index(start_index, tick_spacing) {
        Ok(offset) => !(MIN_TICK_ARRAY_OFFSET..MAX_TICK_ARRAY_OFFSET).contains(&offset),
        Err(_) => true,
    }
}

/// True if positions may use `tick` as a bound
pub fn check_is_usable_tick(tick: i32, tick_spacing: u16) -> bool {
    tick_spacing != 0 && validate_tick(tick).is_ok() && tick % tick_spacing as i32 == 0
}

/// Widest usable (lower, upper) tick pair for a tick spacing
pub fn full_range_indexes(tick_spacing: u16) -> CoreResult<(i32, i32)> {
    let spacing = spacing_i32(tick_spacing)?;
    let lower = -(MIN_TICK.abs() / spacing) * spacing;
    let upper = (MAX_TICK / spacing) * spacing;
    Ok((lower, upper))
}

/// Sorted, deduplicated start indices of the arrays a position touches
pub fn get_tick_array_start_indices(
    tick_lower: i32,
    tick_upper: i32,
    tick_spacing: u16,
    tick_current: i32,
) -> CoreResult<Vec<i32>> {
    let mut indices = vec![
        get_tick_array_start_index(tick_lower, tick_spacing)?,
        get_tick_array_start_index(tick_upper, tick_spacing)?,
        get_tick_array_start_index(tick_current, tick_spacing)?,
    ];
    indices.sort_unstable();
    indices.dedup();
    Ok(indices)
}

/// Nearest initialized tick strictly below (zero_for_one) or above `start_tick`
pub fn find_next_initialized_tick(ticks: &[TickState], start_tick: i32, zero_for_one: bool) -> Option<i32> {
    let initialized = ticks.iter().filter(|t| t.is_initialized());
    if zero_for_one {
        initialized.filter(|t| t.tick < start_tick).map(|t| t.tick).max()
    } else {
        initialized.filter(|t| t.tick > start_tick).map(|t| t.tick).min()
    }
}

/// Approximate tick for a price using floating point: floor(ln(price * 10^(a-b)) / ln(1.0001))
pub fn price_to_tick(price: f64, decimals_a: u8, decimals_b: u8) -> CoreResult<i32> {
    if !price.is_finite() || price <= 0.0 {
        return Err(ClmmCoreError::InvalidPrice);
    }
    let adjusted = price * 10f64.powi(decimals_a as i32 - decimals_b as i32);
    (adjusted.ln() / LN_TICK_BASE)
        .floor()
        .to_i32()
        .ok_or(ClmmCoreError::TickOutOfRange)
}

/// Approximate price at a tick using floating point: 1.0001^tick * 10^(b-a)
pub fn tick_to_price(tick: i32, decimals_a: u8, decimals_b: u8) -> f64 {
    1.0001f64.powi(tick) * 10f64.powi(decimals_b as i32 - decimals_a as i32)
}

/// Snap a tick to a multiple of the spacing, clamped to the tick bounds
pub fn align_tick_to_spacing(tick: i32, tick_spacing: u16, round_up: bool) -> CoreResult<i32> {
    let spacing = spacing_i32(tick_spacing)?;
    let floor = tick.div_euclid(spacing) * spacing;
    let aligned = if round_up && floor != tick {
        floor + spacing
    } else {
        floor
    };
    Ok(aligned.clamp(MIN_TICK, MAX_TICK))
}

/// `price_to_tick` followed by `align_tick_to_spacing`
pub fn price_to_aligned_tick(
    price: f64,
    decimals_a: u8,
    decimals_b: u8,
    tick_spacing: u16,
    round_up: bool,
) -> CoreResult<i32> {
    let tick = price_to_tick(price, decimals_a, decimals_b)?;
    align_tick_to_spacing(tick, tick_spacing, round_up)
}
