//! # CLMM Quoter
//!
//! Off-chain quoting for concentrated liquidity pools. Loads a pool snapshot
//! and its tick arrays from JSON, runs the math core, and reports swap and
//! position quotes with slippage thresholds.

pub mod config;
pub mod error;
pub mod quoter;

pub use config::QuoterConfig;
pub use error::{QuoterError, QuoterResult};
pub use quoter::{
    apply_slippage, price_report, PoolFile, PositionReport, PositionRequest, PriceReport, Quoter,
    SwapReport, SwapRequest, TickArrayReport,
};
