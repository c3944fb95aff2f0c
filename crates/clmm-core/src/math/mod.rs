//! # Mathematical Functions
//!
//! Pure integer math for ticks, prices, liquidity, fees and single swap steps.

pub mod fee_math;
pub mod full_math;
pub mod liquidity_math;
pub mod sqrt_price_math;
pub mod swap_math;
pub mod tick_math;

// Re-export commonly used functions
pub use fee_math::*;
pub use full_math::*;
pub use liquidity_math::*;
pub use sqrt_price_math::*;
pub use swap_math::*;
pub use tick_math::*;
