//! # Core Type Definitions
//!
//! Read-only pool and tick array snapshots consumed by the math core.

pub mod pool;
pub mod tick_array;

// Re-export all types
pub use pool::*;
pub use tick_array::*;
