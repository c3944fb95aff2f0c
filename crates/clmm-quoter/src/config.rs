use std::fs;
use std::str::FromStr;

use clmm_core::{AmmFees, DEFAULT_SLIPPAGE, FETCH_TICK_ARRAY_COUNT, MAX_CROSSED_TICKS};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{QuoterError, QuoterResult};

/// Quoter configuration loaded from TOML file
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct QuoterConfig {
    /// Slippage tolerance as a fraction, e.g. "0.01" for 1%
    #[serde(with = "rust_decimal::serde::str", default = "default_slippage")]
    pub slippage: Decimal,

    /// Initialized tick arrays to look for on each side of the current one
    #[serde(default = "default_tick_array_count")]
    pub tick_array_count: usize,

    /// Upper bound on ticks a single quote may cross
    #[serde(default = "default_max_crossed_ticks")]
    pub max_crossed_ticks: usize,

    /// Pool fee rates
    #[serde(default)]
    pub fees: AmmFees,
}

fn default_slippage() -> Decimal {
    Decimal::from_str(DEFAULT_SLIPPAGE).unwrap_or_default()
}

fn default_tick_array_count() -> usize {
    FETCH_TICK_ARRAY_COUNT
}

fn default_max_crossed_ticks() -> usize {
    MAX_CROSSED_TICKS
}

impl Default for QuoterConfig {
    fn default() -> Self {
        Self {
            slippage: default_slippage(),
            tick_array_count: default_tick_array_count(),
            max_crossed_ticks: default_max_crossed_ticks(),
            fees: AmmFees::default(),
        }
    }
}

impl QuoterConfig {
    /// Load configuration from TOML file
    pub fn load(path: &str) -> QuoterResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration text
    pub fn from_toml(content: &str) -> QuoterResult<Self> {
        let config: QuoterConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: &str) -> QuoterResult<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> QuoterResult<()> {
        if self.slippage.is_sign_negative() || self.slippage >= Decimal::ONE {
            return Err(QuoterError::InvalidConfig(format!(
                "slippage {} must be in [0, 1)",
                self.slippage
            )));
        }

        if self.tick_array_count == 0 {
            return Err(QuoterError::InvalidConfig(
                "tick_array_count must be greater than 0".to_string(),
            ));
        }

        if self.max_crossed_ticks == 0 {
            return Err(QuoterError::InvalidConfig(
                "max_crossed_ticks must be greater than 0".to_string(),
            ));
        }

        self.fees
            .validate()
            .map_err(|e| QuoterError::InvalidConfig(format!("fees: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clmm_core::FEE_RATE_DENOMINATOR;

    #[test]
    fn test_default_config_is_valid() {
        let config = QuoterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.slippage, Decimal::new(1, 2));
        assert_eq!(config.tick_array_count, 15);
        assert_eq!(config.max_crossed_ticks, 100);
        assert_eq!(config.fees.trade_fee_rate, 3_000);
    }

    #[test]
    fn test_parse_config() {
        let config = QuoterConfig::from_toml(
            r#"
            slippage = "0.005"
            tick_array_count = 5
            max_crossed_ticks = 20

            [fees]
            trade_fee_rate = 500
            protocol_fee_rate = 100000
            fund_fee_rate = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.slippage, Decimal::new(5, 3));
        assert_eq!(config.tick_array_count, 5);
        assert_eq!(config.max_crossed_ticks, 20);
        assert_eq!(config.fees.trade_fee_rate, 500);
        assert_eq!(config.fees.fund_fee_rate, 0);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = QuoterConfig::from_toml("tick_array_count = 3").unwrap();
        assert_eq!(config.tick_array_count, 3);
        assert_eq!(config.slippage, Decimal::new(1, 2));
        assert_eq!(config.fees, AmmFees::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = QuoterConfig::default();
        config.slippage = Decimal::ONE;
        assert!(matches!(config.validate(), Err(QuoterError::InvalidConfig(_))));

        let mut config = QuoterConfig::default();
        config.slippage = Decimal::new(-1, 2);
        assert!(config.validate().is_err());

        let mut config = QuoterConfig::default();
        config.tick_array_count = 0;
        assert!(config.validate().is_err());

        let mut config = QuoterConfig::default();
        config.fees.trade_fee_rate = FEE_RATE_DENOMINATOR;
        assert!(config.validate().is_err());

        let mut config = QuoterConfig::default();
        config.fees.protocol_fee_rate = 700_000;
        config.fees.fund_fee_rate = 400_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_serialization_error() {
        assert!(matches!(
            QuoterConfig::from_toml("slippage = "),
            Err(QuoterError::Serialization(_))
        ));
        assert!(matches!(
            QuoterConfig::from_toml(r#"slippage = "1.5""#),
            Err(QuoterError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("clmm-quoter-config-{}.toml", std::process::id()));
        let path = path.to_str().unwrap().to_string();

        let mut config = QuoterConfig::default();
        config.slippage = Decimal::new(25, 4);
        config.fees.trade_fee_rate = 10_000;
        config.save(&path).unwrap();

        let loaded = QuoterConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, config);

        assert!(matches!(
            QuoterConfig::load("/nonexistent/quoter.toml"),
            Err(QuoterError::Io(_))
        ));
    }
}
