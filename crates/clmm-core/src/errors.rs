//! # Core Error Types
//!
//! Every failure in this crate is a local validation or arithmetic failure.
//! Nothing is retried and nothing is partially applied.

use thiserror::Error;

/// Errors raised by the CLMM math core
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub enum ClmmCoreError {
    // ========================================================================
    // Tick and Price Range Errors
    // ========================================================================

    #[error("Tick out of range [-443636, 443636]")]
    TickOutOfRange,

    #[error("Lower tick must be below upper tick")]
    TickRangeInvalid,

    #[error("Tick must be divisible by tick spacing")]
    TickSpacingMismatch,

    #[error("Tick spacing must be greater than zero")]
    InvalidTickSpacing,

    #[error("sqrt_price_x64 out of range")]
    SqrtPriceOutOfRange,

    #[error("sqrt_price_x64 must be greater than zero")]
    InvalidSqrtPrice,

    #[error("Price must be greater than zero")]
    InvalidPrice,

    #[error("Price range bounds must differ")]
    InvalidPriceRange,

    #[error("Next sqrt price would leave the representable range")]
    PriceOverflow,

    // ========================================================================
    // Liquidity and Amount Errors
    // ========================================================================

    #[error("Liquidity must be greater than zero")]
    InvalidLiquidity,

    #[error("Amount must not be zero")]
    ZeroAmount,

    #[error("Max token overflow")]
    MaxTokenOverflow,

    #[error("Slippage must be within [0, 1)")]
    InvalidSlippage,

    // ========================================================================
    // Swap Errors
    // ========================================================================

    #[error("Fee rate must be below 1000000 and fee shares must not exceed it")]
    InvalidFeeRate,

    #[error("sqrt_price_limit_x64 is on the wrong side of the current price or out of bounds")]
    PriceLimitInvalid,

    #[error("Tick array starting at {0} is initialized but was not supplied")]
    TickArrayNotLoaded(i32),

    #[error("Tick array starting at {0} is malformed")]
    InvalidTickArray(i32),

    #[error("Crossed too many ticks ({0})")]
    TooManyTicksCrossed(usize),

    // ========================================================================
    // Math Errors
    // ========================================================================

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Math overflow")]
    MathOverflow,

    #[error("Math underflow")]
    MathUnderflow,

    #[error("Type conversion error")]
    ConversionError,
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, ClmmCoreError>;

impl ClmmCoreError {
    /// True for errors caused by caller-supplied arguments rather than arithmetic limits
    pub fn is_validation_error(&self) -> bool {
        !matches!(
            self,
            ClmmCoreError::DivisionByZero
                | ClmmCoreError::MathOverflow
                | ClmmCoreError::MathUnderflow
                | ClmmCoreError::ConversionError
                | ClmmCoreError::MaxTokenOverflow
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(ClmmCoreError::DivisionByZero.to_string(), "Division by zero");
        assert_eq!(
            ClmmCoreError::TickArrayNotLoaded(-600).to_string(),
            "Tick array starting at -600 is initialized but was not supplied"
        );
        assert_eq!(
            ClmmCoreError::TooManyTicksCrossed(101).to_string(),
            "Crossed too many ticks (101)"
        );
    }

    #[test]
    fn test_validation_classification() {
        assert!(ClmmCoreError::TickOutOfRange.is_validation_error());
        assert!(ClmmCoreError::PriceLimitInvalid.is_validation_error());
        assert!(!ClmmCoreError::MathOverflow.is_validation_error());
    }
}
