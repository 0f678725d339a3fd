use std::path::Path;

use chrono::Duration;
use ::config::builder::DefaultState;
use ::config::{Config, ConfigBuilder, Environment, File, FileFormat};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::OrderParams;

/// Environment variable prefix, e.g. `TRENDBOT__LOT_SIZE=10`
pub const ENV_PREFIX: &str = "TRENDBOT";

/// Largest interval `chrono::Duration` can hold in whole seconds
pub const MAX_HEARTBEAT_INTERVAL_SECS: u64 = i64::MAX as u64 / 1000;

/// Per-instance settings for the moving-average strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Share of the cash balance allocated to each new position (0.05 = 5%)
    pub allocation_fraction: Decimal,
    /// Order quantities are rounded down to a multiple of this
    pub lot_size: u64,
    pub heartbeat_interval_secs: u64,
    /// Also open short positions when price drops below the average
    pub allow_short: bool,
    /// Close short positions when price rises above the average. When off,
    /// every position closes on price below the average.
    pub mirror_short_exit: bool,
    pub open_order_params: OrderParams,
    pub close_order_params: OrderParams,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            allocation_fraction: Decimal::new(5, 2),
            lot_size: 100,
            heartbeat_interval_secs: 60,
            allow_short: false,
            mirror_short_exit: false,
            open_order_params: OrderParams::default(),
            close_order_params: OrderParams::default(),
        }
    }
}

impl StrategyConfig {
    /// Load from a config file (format from extension), then `TRENDBOT__*` env vars
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = Config::builder().add_source(File::from(path.as_ref()));
        Self::build(builder)
    }

    /// Load from an in-memory TOML document, then `TRENDBOT__*` env vars
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder().add_source(File::from_str(toml, FileFormat::Toml));
        Self::build(builder)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.allocation_fraction <= Decimal::ZERO || self.allocation_fraction > Decimal::ONE {
            return Err(ConfigError::Invalid(format!(
                "allocation_fraction must be in (0, 1], got {}",
                self.allocation_fraction
            )));
        }
        if self.lot_size == 0 {
            return Err(ConfigError::Invalid("lot_size must be at least 1".to_string()));
        }
        if self.heartbeat_interval_secs == 0
            || self.heartbeat_interval_secs > MAX_HEARTBEAT_INTERVAL_SECS
        {
            return Err(ConfigError::Invalid(format!(
                "heartbeat_interval_secs must be in [1, {}], got {}",
                MAX_HEARTBEAT_INTERVAL_SECS, self.heartbeat_interval_secs
            )));
        }
        Ok(())
    }

    /// Heartbeat interval, clamped to the largest representable duration
    pub fn heartbeat_interval(&self) -> Duration {
        let secs = self.heartbeat_interval_secs.min(MAX_HEARTBEAT_INTERVAL_SECS);
        i64::try_from(secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StrategyConfig::default();
        assert_eq!(config.allocation_fraction.to_string(), "0.05");
        assert_eq!(config.lot_size, 100);
        assert_eq!(config.heartbeat_interval(), Duration::seconds(60));
        assert!(!config.allow_short);
        assert!(!config.mirror_short_exit);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_overrides() {
        let config = StrategyConfig::from_toml_str(
            r#"
            allocation_fraction = "0.10"
            lot_size = 10
            allow_short = true

            [open_order_params]
            time_in_force = "day"
            "#,
        )
        .unwrap();

        assert_eq!(config.allocation_fraction, Decimal::new(10, 2));
        assert_eq!(config.lot_size, 10);
        assert!(config.allow_short);
        assert_eq!(config.heartbeat_interval_secs, 60);
        assert_eq!(config.open_order_params.get("time_in_force"), Some("day"));
        assert!(config.close_order_params.is_empty());
    }

    #[test]
    fn test_rejects_zero_lot() {
        let result = StrategyConfig::from_toml_str("lot_size = 0");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("lot_size"));
    }

    #[test]
    fn test_rejects_allocation_above_one() {
        let config = StrategyConfig {
            allocation_fraction: Decimal::new(15, 1),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_oversized_heartbeat_interval() {
        let result = StrategyConfig::from_toml_str("heartbeat_interval_secs = 10000000000000000");
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("heartbeat_interval_secs"));

        let at_limit = StrategyConfig {
            heartbeat_interval_secs: MAX_HEARTBEAT_INTERVAL_SECS,
            ..Default::default()
        };
        assert!(at_limit.validate().is_ok());
        assert_eq!(
            at_limit.heartbeat_interval(),
            Duration::seconds(MAX_HEARTBEAT_INTERVAL_SECS as i64)
        );
    }

    #[test]
    fn test_unvalidated_heartbeat_interval_is_clamped() {
        let config = StrategyConfig {
            heartbeat_interval_secs: u64::MAX,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(
            config.heartbeat_interval(),
            Duration::seconds(MAX_HEARTBEAT_INTERVAL_SECS as i64)
        );
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("trendbot-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "lot_size = 50\nheartbeat_interval_secs = 30\n").unwrap();

        let config = StrategyConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.lot_size, 50);
        assert_eq!(config.heartbeat_interval(), Duration::seconds(30));
    }
}
