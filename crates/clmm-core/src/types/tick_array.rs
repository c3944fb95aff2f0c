//! # Tick Array Types
//!
//! A tick array is a bucket of up to 60 tick slots starting at a multiple of
//! `60 * tick_spacing`. Only initialized slots matter to the swap simulator.

use crate::constants::{MAX_TICK_ARRAY_OFFSET, MIN_TICK_ARRAY_OFFSET, TICKS_PER_ARRAY};
use crate::errors::{ClmmCoreError, CoreResult};
use crate::math::fee_math::TickFeeState;
use crate::tick_utils::{get_tick_array_bit_index, is_valid_tick_array_boundary, tick_array_size};

/// One tick slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct TickState {
    /// The tick index
    pub tick: i32,
    /// Liquidity added when the price crosses this tick upward
    pub liquidity_net: i128,
    /// Total liquidity referencing this tick
    pub liquidity_gross: u128,
    /// Fee growth on the other side of this tick from the current tick
    #[cfg_attr(feature = "client", serde(default))]
    pub fee_growth_outside_0_x64: u128,
    #[cfg_attr(feature = "client", serde(default))]
    pub fee_growth_outside_1_x64: u128,
}

impl TickState {
    pub fn is_initialized(&self) -> bool {
        self.liquidity_gross > 0
    }

    /// Fee growth outside this tick, for position fee math
    pub fn fee_state(&self) -> TickFeeState {
        TickFeeState {
            fee_growth_outside_0_x64: self.fee_growth_outside_0_x64,
            fee_growth_outside_1_x64: self.fee_growth_outside_1_x64,
        }
    }
}

/// A bucket of tick slots
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct TickArray {
    /// First tick covered by this array
    pub start_tick_index: i32,
    /// Slots; uninitialized slots may be omitted
    pub ticks: Vec<TickState>,
}

impl TickArray {
    pub fn new(start_tick_index: i32) -> Self {
        Self {
            start_tick_index,
            ticks: Vec::new(),
        }
    }

    /// Check the boundary, slot count and that every slot lies inside the array on spacing
    pub fn validate(&self, tick_spacing: u16) -> CoreResult<()> {
        let invalid = ClmmCoreError::InvalidTickArray(self.start_tick_index);
        let size = tick_array_size(tick_spacing)?;

        if !is_valid_tick_array_boundary(self.start_tick_index, tick_spacing) {
            return Err(invalid);
        }
        let offset = get_tick_array_bit_index(self.start_tick_index, tick_spacing)?;
        if !(MIN_TICK_ARRAY_OFFSET..MAX_TICK_ARRAY_OFFSET).contains(&offset) {
            return Err(ClmmCoreError::TickOutOfRange);
        }
        if self.ticks.len() > TICKS_PER_ARRAY as usize {
            return Err(invalid);
        }

        let end = self.start_tick_index + size;
        let misplaced = self.ticks.iter().any(|slot| {
            slot.tick < self.start_tick_index
                || slot.tick >= end
                || slot.tick % tick_spacing as i32 != 0
        });
        if misplaced {
            return Err(invalid);
        }
        Ok(())
    }

    /// True if `tick` falls inside this array
    pub fn contains(&self, tick: i32, tick_spacing: u16) -> bool {
        match tick_array_size(tick_spacing) {
            Ok(size) => tick >= self.start_tick_index && tick < self.start_tick_index + size,
            Err(_) => false,
        }
    }

    /// Slot for an exact tick index, if present
    pub fn get_tick(&self, tick: i32) -> Option<&TickState> {
        self.ticks.iter().find(|slot| slot.tick == tick)
    }

    /// Nearest initialized slot in the swap direction.
    /// zero_for_one: highest slot with `tick_index <= tick`; otherwise the lowest with `tick_index > tick`.
    pub fn next_initialized_tick(&self, tick: i32, zero_for_one: bool) -> Option<&TickState> {
        let initialized = self.ticks.iter().filter(|slot| slot.is_initialized());
        if zero_for_one {
            initialized
                .filter(|slot| slot.tick <= tick)
                .max_by_key(|slot| slot.tick)
        } else {
            initialized
                .filter(|slot| slot.tick > tick)
                .min_by_key(|slot| slot.tick)
        }
    }

    /// Highest initialized slot when zero_for_one, otherwise the lowest
    pub fn first_initialized_tick(&self, zero_for_one: bool) -> Option<&TickState> {
        let initialized = self.ticks.iter().filter(|slot| slot.is_initialized());
        if zero_for_one {
            initialized.max_by_key(|slot| slot.tick)
        } else {
            initialized.min_by_key(|slot| slot.tick)
        }
    }

    pub fn initialized_tick_count(&self) -> usize {
        self.ticks.iter().filter(|slot| slot.is_initialized()).count()
    }
}
