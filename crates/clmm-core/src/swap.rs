//! # Swap Simulator
//!
//! Multi-step swap quoting over a pool snapshot. Each step runs from the
//! current price to the next initialized tick (or the price limit), then
//! crosses that tick and applies its net liquidity.
//!
//! Tick discovery looks in the array holding the current tick first and then
//! walks the bitmap. The walk only reads arrays the caller supplied; an
//! initialized array that is missing fails the quote rather than silently
//! skipping its liquidity.

use crate::constants::{MAX_CROSSED_TICKS, MAX_TICK, MIN_TICK};
use crate::errors::{ClmmCoreError, CoreResult};
use crate::math::fee_math::{calculate_fee_growth_x64, split_fee};
use crate::math::liquidity_math::add_delta;
use crate::math::swap_math::{compute_swap_step, default_sqrt_price_limit, validate_swap_params};
use crate::math::tick_math::{get_sqrt_price_x64_from_tick, get_tick_from_sqrt_price_x64};
use crate::tick_array_bitmap::TickArrayBitmap;
use crate::tick_utils::get_tick_array_start_index;
use crate::types::{AmmFees, PoolSnapshot, TickArray, TickState};

/// Swap request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct SwapParams {
    /// Exact input amount, or exact output amount when `is_base_input` is false
    pub amount_specified: u64,
    /// Price bound; `None` uses the loosest limit in the swap direction
    pub sqrt_price_limit_x64: Option<u128>,
    /// token0 in, token1 out
    pub zero_for_one: bool,
    pub is_base_input: bool,
    /// Crossing more initialized ticks than this fails the quote
    pub max_crossed_ticks: usize,
}

impl SwapParams {
    pub fn new(amount_specified: u64, zero_for_one: bool, is_base_input: bool) -> Self {
        Self {
            amount_specified,
            sqrt_price_limit_x64: None,
            zero_for_one,
            is_base_input,
            max_crossed_ticks: MAX_CROSSED_TICKS,
        }
    }

    pub fn with_sqrt_price_limit(mut self, sqrt_price_limit_x64: u128) -> Self {
        self.sqrt_price_limit_x64 = Some(sqrt_price_limit_x64);
        self
    }

    pub fn with_max_crossed_ticks(mut self, max_crossed_ticks: usize) -> Self {
        self.max_crossed_ticks = max_crossed_ticks;
        self
    }
}

/// An initialized tick crossed during the swap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct CrossedTick {
    pub tick: i32,
    /// Liquidity delta applied, already signed for the swap direction
    pub liquidity_delta: i128,
    pub liquidity_after: u128,
}

/// Result of a simulated swap
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct SwapQuote {
    /// Total input paid, fees included
    pub amount_in: u64,
    pub amount_out: u64,
    /// Total trade fee, protocol and fund shares included
    pub fee_amount: u64,
    pub protocol_fee: u64,
    pub fund_fee: u64,
    pub end_sqrt_price_x64: u128,
    pub end_tick: i32,
    pub end_liquidity: u128,
    /// Global fee growth of the input token after the swap
    pub fee_growth_global_x64: u128,
    pub crossed_ticks: Vec<CrossedTick>,
    /// True when the whole specified amount was filled
    pub all_trade: bool,
    /// Start indices of every tick array read, in visiting order
    pub tick_arrays_touched: Vec<i32>,
}

struct SwapState {
    amount_specified_remaining: u64,
    amount_calculated: u64,
    sqrt_price_x64: u128,
    tick: i32,
    liquidity: u128,
    fee_growth_global_x64: u128,
    fee_amount: u64,
    protocol_fee: u64,
    fund_fee: u64,
}

/// Supplied tick arrays keyed by start index, recording every read
struct TickArrayCursor<'a> {
    tick_arrays: &'a [TickArray],
    bitmap: TickArrayBitmap,
    tick_spacing: u16,
    touched: Vec<i32>,
}

impl<'a> TickArrayCursor<'a> {
    fn get(&mut self, start_index: i32) -> Option<&'a TickArray> {
        let array = self
            .tick_arrays
            .iter()
            .find(|array| array.start_tick_index == start_index)?;
        if !self.touched.contains(&start_index) {
            self.touched.push(start_index);
        }
        Some(array)
    }

    /// Next initialized tick from `tick` in the swap direction, or `None` when
    /// no initialized tick remains on that side
    fn next_initialized_tick(&mut self, tick: i32, zero_for_one: bool) -> CoreResult<Option<TickState>> {
        let current_start = get_tick_array_start_index(tick, self.tick_spacing)?;

        match self.get(current_start) {
            Some(array) => {
                if let Some(slot) = array.next_initialized_tick(tick, zero_for_one) {
                    return Ok(Some(*slot));
                }
            }
            None => {
                if self.bitmap.is_initialized(current_start, self.tick_spacing).unwrap_or(false) {
                    return Err(ClmmCoreError::TickArrayNotLoaded(current_start));
                }
            }
        }

        let mut last_start = current_start;
        while let Some(next_start) =
            self.bitmap
                .next_initialized_tick_array_start_index(last_start, self.tick_spacing, zero_for_one)?
        {
            let array = self
                .get(next_start)
                .ok_or(ClmmCoreError::TickArrayNotLoaded(next_start))?;
            if let Some(slot) = array.first_initialized_tick(zero_for_one) {
                return Ok(Some(*slot));
            }
            log::debug!("tick array {} flagged in bitmap but holds no initialized tick", next_start);
            last_start = next_start;
        }

        Ok(None)
    }
}

/// Simulate a swap against a pool snapshot
pub fn compute_swap(
    pool: &PoolSnapshot,
    tick_arrays: &[TickArray],
    fees: &AmmFees,
    params: &SwapParams,
) -> CoreResult<SwapQuote> {
    pool.validate()?;
    fees.validate()?;
    for array in tick_arrays {
        array.validate(pool.tick_spacing)?;
    }

    let zero_for_one = params.zero_for_one;
    let is_base_input = params.is_base_input;
    let sqrt_price_limit_x64 = params
        .sqrt_price_limit_x64
        .unwrap_or_else(|| default_sqrt_price_limit(zero_for_one));
    validate_swap_params(
        pool.sqrt_price_x64,
        sqrt_price_limit_x64,
        params.amount_specified,
        zero_for_one,
    )?;

    log::debug!(
        "swap start: amount={} zero_for_one={} base_input={} price={} tick={} liquidity={}",
        params.amount_specified,
        zero_for_one,
        is_base_input,
        pool.sqrt_price_x64,
        pool.tick_current,
        pool.liquidity
    );

    let mut cursor = TickArrayCursor {
        tick_arrays,
        bitmap: pool.bitmap(),
        tick_spacing: pool.tick_spacing,
        touched: Vec::new(),
    };
    let mut state = SwapState {
        amount_specified_remaining: params.amount_specified,
        amount_calculated: 0,
        sqrt_price_x64: pool.sqrt_price_x64,
        tick: pool.tick_current,
        liquidity: pool.liquidity,
        fee_growth_global_x64: if zero_for_one {
            pool.fee_growth_global_0_x64
        } else {
            pool.fee_growth_global_1_x64
        },
        fee_amount: 0,
        protocol_fee: 0,
        fund_fee: 0,
    };
    let mut crossed_ticks = Vec::new();

    while state.amount_specified_remaining != 0 && state.sqrt_price_x64 != sqrt_price_limit_x64 {
        let sqrt_price_start_x64 = state.sqrt_price_x64;

        let next_slot = cursor.next_initialized_tick(state.tick, zero_for_one)?;
        let tick_next = match next_slot {
            Some(slot) => slot.tick.clamp(MIN_TICK, MAX_TICK),
            None if zero_for_one => MIN_TICK,
            None => MAX_TICK,
        };
        let sqrt_price_next_x64 = get_sqrt_price_x64_from_tick(tick_next)?;

        let target_x64 = if zero_for_one {
            sqrt_price_next_x64.max(sqrt_price_limit_x64)
        } else {
            sqrt_price_next_x64.min(sqrt_price_limit_x64)
        };

        let step = compute_swap_step(
            state.sqrt_price_x64,
            target_x64,
            state.liquidity,
            state.amount_specified_remaining,
            fees.trade_fee_rate,
            is_base_input,
            zero_for_one,
        )?;
        log::trace!(
            "swap step: tick_next={} price {} -> {} in={} out={} fee={}",
            tick_next,
            sqrt_price_start_x64,
            step.sqrt_price_next_x64,
            step.amount_in,
            step.amount_out,
            step.fee_amount
        );

        state.sqrt_price_x64 = step.sqrt_price_next_x64;

        if is_base_input {
            let consumed = step
                .amount_in
                .checked_add(step.fee_amount)
                .ok_or(ClmmCoreError::MaxTokenOverflow)?;
            state.amount_specified_remaining = state
                .amount_specified_remaining
                .checked_sub(consumed)
                .ok_or(ClmmCoreError::MathUnderflow)?;
            state.amount_calculated = state
                .amount_calculated
                .checked_add(step.amount_out)
                .ok_or(ClmmCoreError::MaxTokenOverflow)?;
        } else {
            state.amount_specified_remaining = state
                .amount_specified_remaining
                .checked_sub(step.amount_out)
                .ok_or(ClmmCoreError::MathUnderflow)?;
            state.amount_calculated = state
                .amount_calculated
                .checked_add(step.amount_in)
                .and_then(|total| total.checked_add(step.fee_amount))
                .ok_or(ClmmCoreError::MaxTokenOverflow)?;
        }

        let (protocol, fund, lp_fee) = split_fee(step.fee_amount, fees.protocol_fee_rate, fees.fund_fee_rate)?;
        state.protocol_fee = state
            .protocol_fee
            .checked_add(protocol)
            .ok_or(ClmmCoreError::MaxTokenOverflow)?;
        state.fund_fee = state
            .fund_fee
            .checked_add(fund)
            .ok_or(ClmmCoreError::MaxTokenOverflow)?;
        state.fee_amount = state
            .fee_amount
            .checked_add(step.fee_amount)
            .ok_or(ClmmCoreError::MaxTokenOverflow)?;
        if state.liquidity > 0 {
            let growth = calculate_fee_growth_x64(lp_fee, state.liquidity)?;
            state.fee_growth_global_x64 = state.fee_growth_global_x64.wrapping_add(growth);
        }

        let mut crossed = false;
        if state.sqrt_price_x64 == sqrt_price_next_x64 {
            if let Some(slot) = next_slot.filter(|slot| slot.tick == tick_next) {
                let liquidity_delta = if zero_for_one {
                    slot.liquidity_net
                        .checked_neg()
                        .ok_or(ClmmCoreError::MathOverflow)?
                } else {
                    slot.liquidity_net
                };
                state.liquidity = add_delta(state.liquidity, liquidity_delta)?;
                crossed = true;
                crossed_ticks.push(CrossedTick {
                    tick: tick_next,
                    liquidity_delta,
                    liquidity_after: state.liquidity,
                });
                log::debug!(
                    "crossed tick {} delta={} liquidity={}",
                    tick_next,
                    liquidity_delta,
                    state.liquidity
                );

                if crossed_ticks.len() > params.max_crossed_ticks {
                    log::warn!(
                        "swap crossed {} ticks, limit is {}",
                        crossed_ticks.len(),
                        params.max_crossed_ticks
                    );
                    return Err(ClmmCoreError::TooManyTicksCrossed(crossed_ticks.len()));
                }
            }
            state.tick = if zero_for_one {
                (tick_next - 1).max(MIN_TICK)
            } else {
                tick_next
            };
        } else if state.sqrt_price_x64 != sqrt_price_start_x64 {
            state.tick = get_tick_from_sqrt_price_x64(state.sqrt_price_x64)?;
        }

        let progressed = crossed
            || state.sqrt_price_x64 != sqrt_price_start_x64
            || step.amount_in != 0
            || step.amount_out != 0
            || step.fee_amount != 0;
        if !progressed {
            log::debug!("swap stalled at price {} tick {}", state.sqrt_price_x64, state.tick);
            break;
        }
    }

    let filled = params.amount_specified - state.amount_specified_remaining;
    let (amount_in, amount_out) = if is_base_input {
        (filled, state.amount_calculated)
    } else {
        (state.amount_calculated, filled)
    };

    log::debug!(
        "swap done: in={} out={} fee={} end_tick={} crossed={}",
        amount_in,
        amount_out,
        state.fee_amount,
        state.tick,
        crossed_ticks.len()
    );

    Ok(SwapQuote {
        amount_in,
        amount_out,
        fee_amount: state.fee_amount,
        protocol_fee: state.protocol_fee,
        fund_fee: state.fund_fee,
        end_sqrt_price_x64: state.sqrt_price_x64,
        end_tick: state.tick,
        end_liquidity: state.liquidity,
        fee_growth_global_x64: state.fee_growth_global_x64,
        crossed_ticks,
        all_trade: state.amount_specified_remaining == 0,
        tick_arrays_touched: cursor.touched,
    })
}
