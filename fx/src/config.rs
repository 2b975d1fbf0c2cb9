//! Rate book configuration.

use std::time::Duration;

use cambio_common::CurrencyCode;

/// Configuration for the rate book.
#[derive(Debug, Clone)]
pub struct FxConfig {
    /// Currency used as the hop when no direct or inverse rate exists.
    /// `None` disables triangulation.
    pub base_currency: Option<CurrencyCode>,
    /// Age after which the loaded table is reported stale.
    pub max_rate_age: Duration,
    /// Interval between background refreshes.
    pub refresh_interval: Duration,
}

impl Default for FxConfig {
    fn default() -> Self {
        Self {
            base_currency: Some(CurrencyCode::usd()),
            max_rate_age: Duration::from_secs(15 * 60),
            refresh_interval: Duration::from_secs(60),
        }
    }
}

impl FxConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(base) = std::env::var("CAMBIO_BASE_CURRENCY") {
            config.base_currency = CurrencyCode::parse_optional(&base);
        }

        if let Ok(secs) = std::env::var("CAMBIO_RATE_MAX_AGE_SECS") {
            if let Ok(secs) = secs.parse() {
                config.max_rate_age = Duration::from_secs(secs);
            }
        }

        if let Ok(secs) = std::env::var("CAMBIO_RATE_REFRESH_SECS") {
            if let Ok(secs) = secs.parse() {
                config.refresh_interval = Duration::from_secs(secs);
            }
        }

        config
    }

    /// Disable or change the triangulation base.
    pub fn with_base_currency(mut self, base: Option<CurrencyCode>) -> Self {
        self.base_currency = base;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_rate_age.is_zero() {
            return Err("Max rate age cannot be zero".to_string());
        }

        if self.refresh_interval.is_zero() {
            return Err("Refresh interval cannot be zero".to_string());
        }

        if self.refresh_interval > self.max_rate_age {
            return Err("Refresh interval cannot exceed max rate age".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FxConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.base_currency, Some(CurrencyCode::usd()));
    }

    #[test]
    fn test_invalid_config() {
        let mut config = FxConfig::default();
        config.refresh_interval = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = FxConfig::default();
        config.refresh_interval = config.max_rate_age + Duration::from_secs(1);
        assert!(config.validate().is_err());
    }
}
