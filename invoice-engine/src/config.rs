use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fs;
use time::UtcOffset;

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub uri: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Reactive energy allowed without penalty, as a fraction of active energy.
    pub reactive_tolerance_ratio: Decimal,
    /// Fixed offset of the facility-local clock the billing months are cut on.
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i8,
    /// Minor-unit digits of the billing currency.
    #[serde(default = "default_currency_scale")]
    pub currency_scale: u32,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            reactive_tolerance_ratio: dec!(0.20),
            utc_offset_hours: default_utc_offset_hours(),
            currency_scale: default_currency_scale(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Facilities computed in parallel by a period run.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub billing: BillingConfig,
    #[serde(default)]
    pub run: RunConfig,
    pub metrics: Option<MetricsConfig>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("fetch.page_size must be greater than zero")]
    ZeroPageSize,
    #[error("billing.reactive_tolerance_ratio must be non-negative, got {0}")]
    NegativeToleranceRatio(Decimal),
    #[error("billing.utc_offset_hours {0} is outside -12..=14")]
    UtcOffset(i8),
    #[error("billing.currency_scale {0} is larger than 6")]
    CurrencyScale(u32),
    #[error("run.concurrency must be greater than zero")]
    ZeroConcurrency,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("INVOICE_ENGINE_CONFIG").unwrap_or_else(|_| "invoice-engine.toml".to_string());
        let contents = fs::read_to_string(&path)?;
        let cfg = Self::from_toml_str(&contents)?;
        Ok(cfg)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        if self.run.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        self.billing.validate()
    }
}

impl BillingConfig {
    pub fn utc_offset(&self) -> Result<UtcOffset, ConfigError> {
        UtcOffset::from_hms(self.utc_offset_hours, 0, 0).map_err(|_| ConfigError::UtcOffset(self.utc_offset_hours))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reactive_tolerance_ratio.is_sign_negative() {
            return Err(ConfigError::NegativeToleranceRatio(self.reactive_tolerance_ratio));
        }
        if !(-12..=14).contains(&self.utc_offset_hours) {
            return Err(ConfigError::UtcOffset(self.utc_offset_hours));
        }
        if self.currency_scale > 6 {
            return Err(ConfigError::CurrencyScale(self.currency_scale));
        }
        Ok(())
    }
}

fn default_page_size() -> usize {
    1000
}

fn default_utc_offset_hours() -> i8 {
    3
}

fn default_currency_scale() -> u32 {
    2
}

fn default_concurrency() -> usize {
    8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_takes_defaults() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [database]
            uri = "postgres://localhost/billing"
            max_connections = 4
            "#,
        )
        .unwrap();

        assert_eq!(cfg.fetch.page_size, 1000);
        assert_eq!(cfg.billing.reactive_tolerance_ratio, dec!(0.20));
        assert_eq!(cfg.billing.utc_offset_hours, 3);
        assert_eq!(cfg.billing.currency_scale, 2);
        assert_eq!(cfg.run.concurrency, 8);
        assert!(cfg.metrics.is_none());
    }

    #[test]
    fn full_config_parses() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [database]
            uri = "postgres://localhost/billing"
            max_connections = 16

            [fetch]
            page_size = 500

            [billing]
            reactive_tolerance_ratio = "0.33"
            utc_offset_hours = 2

            [run]
            concurrency = 4

            [metrics]
            bind_addr = "127.0.0.1:9100"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.fetch.page_size, 500);
        assert_eq!(cfg.billing.reactive_tolerance_ratio, dec!(0.33));
        assert_eq!(cfg.billing.utc_offset_hours, 2);
        assert_eq!(cfg.metrics.unwrap().bind_addr, "127.0.0.1:9100");
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let err = AppConfig::from_toml_str(
            r#"
            [database]
            uri = "postgres://localhost/billing"
            max_connections = 1

            [fetch]
            page_size = 0
            "#,
        )
        .unwrap_err();

        assert_eq!(err.downcast_ref::<ConfigError>(), Some(&ConfigError::ZeroPageSize));
    }

    #[test]
    fn negative_tolerance_is_rejected() {
        let billing = BillingConfig {
            reactive_tolerance_ratio: dec!(-0.1),
            ..BillingConfig::default()
        };
        assert_eq!(
            billing.validate(),
            Err(ConfigError::NegativeToleranceRatio(dec!(-0.1)))
        );
    }
}
