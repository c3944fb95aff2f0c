//! # Quoting
//!
//! Runs the math core against a pool snapshot loaded from disk and shapes the
//! results into serializable reports, with slippage thresholds applied from
//! the quoter configuration.

use std::fs;

use clmm_core::math::{
    get_amounts_from_liquidity, get_amounts_from_liquidity_with_slippage,
    get_liquidity_from_token_amounts, get_sqrt_price_x64_from_tick, get_tick_from_sqrt_price_x64,
    get_tick_with_price_and_tickspacing, price_to_sqrt_price_x64, sqrt_price_x64_to_price,
    TokenAmounts,
};
use clmm_core::tick_array_bitmap::get_initialized_tick_array_in_range;
use clmm_core::tick_utils::{
    check_is_usable_tick, get_tick_array_start_index, get_tick_array_start_indices,
    validate_tick_range,
};
use clmm_core::{compute_swap, ClmmCoreError, PoolSnapshot, SwapParams, SwapQuote, TickArray};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::QuoterConfig;
use crate::error::{QuoterError, QuoterResult};

/// Pool snapshot and the tick arrays fetched alongside it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PoolFile {
    pub pool: PoolSnapshot,
    #[serde(default)]
    pub tick_arrays: Vec<TickArray>,
}

impl PoolFile {
    /// Load a pool file from JSON on disk
    pub fn load(path: &str) -> QuoterResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> QuoterResult<Self> {
        let pool_file: PoolFile = serde_json::from_str(content)?;
        pool_file.pool.validate()?;
        Ok(pool_file)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapRequest {
    pub amount: u64,
    pub zero_for_one: bool,
    /// `amount` is the desired output rather than the input
    pub exact_output: bool,
    /// Stop the swap at this human-readable price
    pub limit_price: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapReport {
    pub quote: SwapQuote,
    pub slippage: Decimal,
    /// Minimum output for exact input, maximum input for exact output
    pub other_amount_threshold: u64,
    pub start_price: Decimal,
    pub end_price: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionRequest {
    pub lower_price: Decimal,
    pub upper_price: Decimal,
    pub liquidity: Option<u128>,
    pub amount_a: Option<u64>,
    pub amount_b: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionReport {
    pub tick_lower: i32,
    pub tick_upper: i32,
    /// Prices of the aligned ticks
    pub price_lower: Decimal,
    pub price_upper: Decimal,
    pub liquidity: u128,
    /// Deposit amounts, rounded up
    pub amounts: TokenAmounts,
    pub amounts_max: TokenAmounts,
    pub amounts_min: TokenAmounts,
    /// Tick arrays the position and the current tick live in
    pub tick_array_start_indices: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickArrayReport {
    pub current_start_index: i32,
    /// Initialized arrays below the current one, then at or above it, nearest first
    pub initialized: Vec<i32>,
    pub loaded: Vec<i32>,
    pub missing: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceReport {
    pub tick: i32,
    pub sqrt_price_x64: u128,
    pub price: Decimal,
    pub tick_array_start_index: Option<i32>,
    pub usable: Option<bool>,
}

/// Quotes against one pool snapshot
pub struct Quoter {
    config: QuoterConfig,
    pool_file: PoolFile,
}

impl Quoter {
    pub fn new(config: QuoterConfig, pool_file: PoolFile) -> Self {
        Self { config, pool_file }
    }

    pub fn config(&self) -> &QuoterConfig {
        &self.config
    }

    pub fn pool(&self) -> &PoolSnapshot {
        &self.pool_file.pool
    }

    /// Simulate a swap and attach the slippage threshold
    pub fn quote_swap(&self, request: &SwapRequest) -> QuoterResult<SwapReport> {
        let pool = self.pool();
        let mut params = SwapParams::new(request.amount, request.zero_for_one, !request.exact_output)
            .with_max_crossed_ticks(self.config.max_crossed_ticks);

        if let Some(limit_price) = request.limit_price {
            let limit = price_to_sqrt_price_x64(limit_price, pool.mint_decimals_0, pool.mint_decimals_1)?;
            log::debug!("Price limit {} -> sqrt_price_x64 {}", limit_price, limit);
            params = params.with_sqrt_price_limit(limit);
        }

        let quote = compute_swap(pool, &self.pool_file.tick_arrays, &self.config.fees, &params)?;

        if !quote.all_trade {
            log::warn!(
                "Partial fill: {} of {} filled before the price limit",
                if request.exact_output { quote.amount_out } else { quote.amount_in },
                request.amount
            );
        }

        let other_amount_threshold = if request.exact_output {
            apply_slippage(quote.amount_in, self.config.slippage, true)?
        } else {
            apply_slippage(quote.amount_out, self.config.slippage, false)?
        };

        log::info!(
            "Quoted swap: in {} out {} fee {} crossing {} ticks",
            quote.amount_in,
            quote.amount_out,
            quote.fee_amount,
            quote.crossed_ticks.len()
        );

        Ok(SwapReport {
            start_price: pool.price()?,
            end_price: sqrt_price_x64_to_price(
                quote.end_sqrt_price_x64,
                pool.mint_decimals_0,
                pool.mint_decimals_1,
            )?,
            slippage: self.config.slippage,
            other_amount_threshold,
            quote,
        })
    }

    /// Align a price range to the tick spacing and size a position in it
    pub fn quote_position(&self, request: &PositionRequest) -> QuoterResult<PositionReport> {
        let pool = self.pool();
        if request.lower_price >= request.upper_price {
            return Err(ClmmCoreError::InvalidPriceRange.into());
        }

        let tick_lower = get_tick_with_price_and_tickspacing(
            request.lower_price,
            pool.tick_spacing,
            pool.mint_decimals_0,
            pool.mint_decimals_1,
        )?;
        let tick_upper = get_tick_with_price_and_tickspacing(
            request.upper_price,
            pool.tick_spacing,
            pool.mint_decimals_0,
            pool.mint_decimals_1,
        )?;
        validate_tick_range(tick_lower, tick_upper, pool.tick_spacing)?;

        let sqrt_price_lower = get_sqrt_price_x64_from_tick(tick_lower)?;
        let sqrt_price_upper = get_sqrt_price_x64_from_tick(tick_upper)?;

        let liquidity = match (request.liquidity, request.amount_a, request.amount_b) {
            (Some(liquidity), _, _) => liquidity,
            (None, Some(amount_a), Some(amount_b)) => get_liquidity_from_token_amounts(
                pool.sqrt_price_x64,
                sqrt_price_lower,
                sqrt_price_upper,
                amount_a,
                amount_b,
            )?,
            _ => {
                return Err(QuoterError::InvalidArgument(
                    "either liquidity or both token amounts are required".to_string(),
                ))
            }
        };
        if liquidity == 0 {
            return Err(ClmmCoreError::InvalidLiquidity.into());
        }

        let slippage = self.config.slippage;
        let amounts = get_amounts_from_liquidity(
            pool.sqrt_price_x64,
            sqrt_price_lower,
            sqrt_price_upper,
            liquidity,
            true,
        )?;
        let amounts_max = get_amounts_from_liquidity_with_slippage(
            pool.sqrt_price_x64,
            sqrt_price_lower,
            sqrt_price_upper,
            liquidity,
            true,
            true,
            slippage,
        )?;
        let amounts_min = get_amounts_from_liquidity_with_slippage(
            pool.sqrt_price_x64,
            sqrt_price_lower,
            sqrt_price_upper,
            liquidity,
            false,
            false,
            slippage,
        )?;

        log::info!(
            "Quoted position [{}, {}) with liquidity {}",
            tick_lower,
            tick_upper,
            liquidity
        );

        Ok(PositionReport {
            tick_lower,
            tick_upper,
            price_lower: sqrt_price_x64_to_price(sqrt_price_lower, pool.mint_decimals_0, pool.mint_decimals_1)?,
            price_upper: sqrt_price_x64_to_price(sqrt_price_upper, pool.mint_decimals_0, pool.mint_decimals_1)?,
            liquidity,
            amounts,
            amounts_max,
            amounts_min,
            tick_array_start_indices: get_tick_array_start_indices(
                tick_lower,
                tick_upper,
                pool.tick_spacing,
                pool.tick_current,
            )?,
        })
    }

    /// Initialized tick arrays around the current price, split by whether the
    /// pool file carries them
    pub fn tick_arrays(&self) -> QuoterResult<TickArrayReport> {
        let pool = self.pool();
        let current_start_index = pool.current_tick_array_start_index()?;
        let initialized = get_initialized_tick_array_in_range(
            &pool.tick_array_bitmap,
            &pool.bitmap_extension,
            pool.tick_spacing,
            current_start_index,
            self.config.tick_array_count,
        )?;

        let (loaded, missing): (Vec<i32>, Vec<i32>) = initialized.iter().copied().partition(|start| {
            self.pool_file
                .tick_arrays
                .iter()
                .any(|array| array.start_tick_index == *start)
        });

        if !missing.is_empty() {
            log::warn!("{} initialized tick arrays are not in the pool file: {:?}", missing.len(), missing);
        }

        Ok(TickArrayReport {
            current_start_index,
            initialized,
            loaded,
            missing,
        })
    }
}

/// Conversions for a tick or a sqrt price. `tick_spacing`, when known, adds
/// the array start and usability of the tick.
pub fn price_report(
    tick: Option<i32>,
    sqrt_price_x64: Option<u128>,
    decimals_a: u8,
    decimals_b: u8,
    tick_spacing: Option<u16>,
) -> QuoterResult<PriceReport> {
    let (tick, sqrt_price_x64) = match (tick, sqrt_price_x64) {
        (Some(tick), None) => (tick, get_sqrt_price_x64_from_tick(tick)?),
        (None, Some(sqrt_price_x64)) => (get_tick_from_sqrt_price_x64(sqrt_price_x64)?, sqrt_price_x64),
        _ => {
            return Err(QuoterError::InvalidArgument(
                "exactly one of tick or sqrt price is required".to_string(),
            ))
        }
    };

    let tick_array_start_index = match tick_spacing {
        Some(spacing) => Some(get_tick_array_start_index(tick, spacing)?),
        None => None,
    };

    Ok(PriceReport {
        tick,
        sqrt_price_x64,
        price: sqrt_price_x64_to_price(sqrt_price_x64, decimals_a, decimals_b)?,
        tick_array_start_index,
        usable: tick_spacing.map(|spacing| check_is_usable_tick(tick, spacing)),
    })
}

/// Scale an amount by (1 + slippage) rounding up, or (1 - slippage) rounding down
pub fn apply_slippage(amount: u64, slippage: Decimal, round_up: bool) -> QuoterResult<u64> {
    if slippage.is_sign_negative() || slippage >= Decimal::ONE {
        return Err(ClmmCoreError::InvalidSlippage.into());
    }
    let coefficient = if round_up {
        Decimal::ONE + slippage
    } else {
        Decimal::ONE - slippage
    };
    let scaled = Decimal::from(amount)
        .checked_mul(coefficient)
        .ok_or(ClmmCoreError::MathOverflow)?;
    let rounded = if round_up { scaled.ceil() } else { scaled.floor() };
    Ok(rounded.to_u64().ok_or(ClmmCoreError::MaxTokenOverflow)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clmm_core::{TickArrayBitmap, TickState, Q64};

    const SPACING: u16 = 10;
    const LIQUIDITY: u128 = 1_000_000_000_000;

    fn slot(tick: i32, liquidity_net: i128) -> TickState {
        TickState {
            tick,
            liquidity_net,
            liquidity_gross: liquidity_net.unsigned_abs(),
            ..Default::default()
        }
    }

    fn pool_file() -> PoolFile {
        let mut bitmap = TickArrayBitmap::default();
        bitmap.flip_bit(-600, SPACING).unwrap();
        bitmap.flip_bit(0, SPACING).unwrap();

        PoolFile {
            pool: PoolSnapshot {
                sqrt_price_x64: Q64,
                tick_current: 0,
                liquidity: LIQUIDITY,
                tick_spacing: SPACING,
                mint_decimals_0: 6,
                mint_decimals_1: 6,
                tick_array_bitmap: bitmap.inner,
                bitmap_extension: bitmap.extension,
                ..Default::default()
            },
            tick_arrays: vec![
                TickArray {
                    start_tick_index: -600,
                    ticks: vec![slot(-200, LIQUIDITY as i128)],
                },
                TickArray {
                    start_tick_index: 0,
                    ticks: vec![slot(200, -(LIQUIDITY as i128))],
                },
            ],
        }
    }

    fn quoter() -> Quoter {
        Quoter::new(QuoterConfig::default(), pool_file())
    }

    #[test]
    fn test_pool_file_from_json() {
        let json = serde_json::to_string(&pool_file()).unwrap();
        assert_eq!(PoolFile::from_json(&json).unwrap(), pool_file());

        let minimal = format!(
            r#"{{"pool": {{"sqrt_price_x64": {}, "tick_current": 0, "liquidity": 0,
                "tick_spacing": 60, "mint_decimals_0": 9, "mint_decimals_1": 6,
                "tick_array_bitmap": [0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0]}}}}"#,
            Q64
        );
        let parsed = PoolFile::from_json(&minimal).unwrap();
        assert!(parsed.tick_arrays.is_empty());
        assert_eq!(parsed.pool.tick_spacing, 60);
    }

    #[test]
    fn test_pool_file_rejects_invalid_pool() {
        let mut file = pool_file();
        file.pool.tick_spacing = 0;
        let json = serde_json::to_string(&file).unwrap();
        assert!(matches!(
            PoolFile::from_json(&json),
            Err(QuoterError::Core(ClmmCoreError::InvalidTickSpacing))
        ));
        assert!(matches!(PoolFile::from_json("{"), Err(QuoterError::Serialization(_))));
    }

    #[test]
    fn test_demo_pool_file() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../demos/pool.json");
        let file = PoolFile::load(path).unwrap();
        assert_eq!(file.pool.bitmap().initialized_start_indices(SPACING), vec![-600, 0]);

        let report = Quoter::new(QuoterConfig::default(), file).tick_arrays().unwrap();
        assert_eq!(report.loaded, vec![-600, 0]);
        assert!(report.missing.is_empty());
    }

    #[test]
    fn test_quote_swap_exact_input() {
        let report = quoter()
            .quote_swap(&SwapRequest {
                amount: 1_000_000,
                zero_for_one: false,
                exact_output: false,
                limit_price: None,
            })
            .unwrap();

        assert!(report.quote.all_trade);
        assert_eq!(report.quote.amount_in, 1_000_000);
        assert_eq!(report.start_price, Decimal::ONE);
        assert!(report.end_price > report.start_price);
        assert_eq!(
            report.other_amount_threshold,
            apply_slippage(report.quote.amount_out, Decimal::new(1, 2), false).unwrap()
        );
        assert!(report.other_amount_threshold < report.quote.amount_out);
    }

    #[test]
    fn test_quote_swap_exact_output() {
        let report = quoter()
            .quote_swap(&SwapRequest {
                amount: 500_000,
                zero_for_one: true,
                exact_output: true,
                limit_price: None,
            })
            .unwrap();

        assert_eq!(report.quote.amount_out, 500_000);
        assert!(report.other_amount_threshold > report.quote.amount_in);
        assert!(report.end_price < report.start_price);
    }

    #[test]
    fn test_quote_swap_limit_price() {
        let quoter = quoter();
        let report = quoter
            .quote_swap(&SwapRequest {
                amount: u64::MAX / 2,
                zero_for_one: true,
                exact_output: false,
                limit_price: Some(Decimal::new(99, 2)),
            })
            .unwrap();
        assert!(!report.quote.all_trade);
        assert!(report.end_price <= Decimal::new(99, 2));
        assert!(report.end_price > Decimal::new(98, 2));

        // Selling token0 cannot push the price up
        let err = quoter
            .quote_swap(&SwapRequest {
                amount: 1_000,
                zero_for_one: true,
                exact_output: false,
                limit_price: Some(Decimal::TWO),
            })
            .unwrap_err();
        assert!(matches!(err, QuoterError::Core(ClmmCoreError::PriceLimitInvalid)));
    }

    #[test]
    fn test_quote_position_with_liquidity() {
        let report = quoter()
            .quote_position(&PositionRequest {
                lower_price: Decimal::new(95, 2),
                upper_price: Decimal::new(105, 2),
                liquidity: Some(1_000_000_000),
                amount_a: None,
                amount_b: None,
            })
            .unwrap();

        assert_eq!(report.tick_lower % SPACING as i32, 0);
        assert_eq!(report.tick_upper % SPACING as i32, 0);
        assert!(report.tick_lower < 0 && report.tick_upper > 0);
        assert!(report.price_lower <= Decimal::new(95, 2));
        assert!(report.price_upper >= Decimal::new(105, 2));
        assert!(report.amounts.amount_a > 0 && report.amounts.amount_b > 0);
        assert!(report.amounts_max.amount_a >= report.amounts.amount_a);
        assert!(report.amounts_min.amount_b <= report.amounts.amount_b);
        assert_eq!(report.tick_array_start_indices, vec![-600, 0]);
    }

    #[test]
    fn test_quote_position_from_amounts() {
        let report = quoter()
            .quote_position(&PositionRequest {
                lower_price: Decimal::new(9, 1),
                upper_price: Decimal::new(11, 1),
                liquidity: None,
                amount_a: Some(1_000_000),
                amount_b: Some(1_000_000),
            })
            .unwrap();

        assert!(report.liquidity > 0);
        // Liquidity rounds down, deposits round up
        assert!(report.amounts.amount_a <= 1_000_001);
        assert!(report.amounts.amount_b <= 1_000_001);
    }

    #[test]
    fn test_quote_position_rejects_bad_requests() {
        let quoter = quoter();
        let request = PositionRequest {
            lower_price: Decimal::new(11, 1),
            upper_price: Decimal::new(9, 1),
            liquidity: Some(1_000),
            amount_a: None,
            amount_b: None,
        };
        assert!(matches!(
            quoter.quote_position(&request),
            Err(QuoterError::Core(ClmmCoreError::InvalidPriceRange))
        ));

        let request = PositionRequest {
            lower_price: Decimal::new(9, 1),
            upper_price: Decimal::new(11, 1),
            liquidity: None,
            amount_a: Some(1_000),
            amount_b: None,
        };
        assert!(matches!(
            quoter.quote_position(&request),
            Err(QuoterError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_tick_array_report() {
        let report = quoter().tick_arrays().unwrap();
        assert_eq!(report.current_start_index, 0);
        assert_eq!(report.initialized, vec![-600, 0]);
        assert_eq!(report.loaded, vec![-600, 0]);
        assert!(report.missing.is_empty());

        let mut file = pool_file();
        file.tick_arrays.retain(|array| array.start_tick_index == 0);
        let report = Quoter::new(QuoterConfig::default(), file).tick_arrays().unwrap();
        assert_eq!(report.loaded, vec![0]);
        assert_eq!(report.missing, vec![-600]);
    }

    #[test]
    fn test_price_report() {
        let report = price_report(Some(0), None, 6, 6, Some(SPACING)).unwrap();
        assert_eq!(report.sqrt_price_x64, Q64);
        assert_eq!(report.price, Decimal::ONE);
        assert_eq!(report.tick_array_start_index, Some(0));
        assert_eq!(report.usable, Some(true));

        let sqrt_price = get_sqrt_price_x64_from_tick(-5).unwrap();
        let report = price_report(None, Some(sqrt_price), 6, 6, Some(SPACING)).unwrap();
        assert_eq!(report.tick, -5);
        assert_eq!(report.tick_array_start_index, Some(-600));
        assert_eq!(report.usable, Some(false));

        let report = price_report(Some(10), None, 6, 6, None).unwrap();
        assert_eq!(report.usable, None);

        assert!(matches!(
            price_report(None, None, 6, 6, None),
            Err(QuoterError::InvalidArgument(_))
        ));
        assert!(matches!(
            price_report(Some(500_000), None, 6, 6, None),
            Err(QuoterError::Core(ClmmCoreError::TickOutOfRange))
        ));
    }

    #[test]
    fn test_apply_slippage_rounding() {
        let slippage = Decimal::new(1, 2);
        assert_eq!(apply_slippage(1_001, slippage, false).unwrap(), 990);
        assert_eq!(apply_slippage(1_001, slippage, true).unwrap(), 1_012);
        assert_eq!(apply_slippage(1_000, Decimal::ZERO, true).unwrap(), 1_000);
        assert!(apply_slippage(1_000, Decimal::ONE, true).is_err());
        assert!(apply_slippage(u64::MAX, slippage, true).is_err());
    }
}
