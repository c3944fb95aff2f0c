//! # CLMM Core - Off-Chain Concentrated Liquidity Math
//!
//! Pure, deterministic math for quoting against a concentrated liquidity pool
//! without touching the chain. It provides:
//!
//! - Bit-exact tick and Q64.64 sqrt price conversions
//! - Token amount and liquidity conversions with pool-favoring rounding
//! - Tick range validation and tick array addressing
//! - Tick array bitmap search across the pool bitmap and its extension
//! - Single-step and multi-step swap simulation
//! - Position fee growth accounting
//!
//! ## Feature Flags
//!
//! - `client`: Enables serde serialization for snapshots, quotes and errors

pub mod constants;
pub mod errors;
pub mod math;
pub mod swap;
pub mod tick_array_bitmap;
pub mod tick_utils;
pub mod types;

// Re-export commonly used items
pub use constants::*;
pub use errors::{ClmmCoreError, CoreResult};
pub use swap::{compute_swap, CrossedTick, SwapParams, SwapQuote};
pub use tick_array_bitmap::{TickArrayBitmap, TickArrayBitmapExtension};
pub use types::*;
