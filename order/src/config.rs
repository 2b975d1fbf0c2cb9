//! Wizard configuration.

use rust_decimal::Decimal;

use crate::snapshot::DEFAULT_SNAPSHOT_KEY;

/// Configuration for the order wizard.
#[derive(Debug, Clone)]
pub struct WizardConfig {
    /// Storage slot read on open.
    pub snapshot_key: String,
    /// Estimated service fee as a fraction of the source amount.
    pub service_fee_rate: Decimal,
    /// Extra fee applied when delivery is requested.
    pub delivery_fee_rate: Decimal,
    /// Reject malformed WhatsApp and Telegram handles on submit.
    pub enforce_contact_format: bool,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            snapshot_key: DEFAULT_SNAPSHOT_KEY.to_string(),
            service_fee_rate: Decimal::new(15, 3), // 1.5%
            delivery_fee_rate: Decimal::new(3, 2), // 3%
            enforce_contact_format: false,
        }
    }
}

impl WizardConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(key) = std::env::var("CAMBIO_SNAPSHOT_KEY") {
            config.snapshot_key = key;
        }

        if let Ok(fee) = std::env::var("CAMBIO_SERVICE_FEE") {
            if let Ok(fee) = fee.parse() {
                config.service_fee_rate = fee;
            }
        }

        if let Ok(fee) = std::env::var("CAMBIO_DELIVERY_FEE") {
            if let Ok(fee) = fee.parse() {
                config.delivery_fee_rate = fee;
            }
        }

        if let Ok(strict) = std::env::var("CAMBIO_STRICT_CONTACT") {
            config.enforce_contact_format = matches!(strict.as_str(), "1" | "true" | "yes");
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.snapshot_key.trim().is_empty() {
            return Err("Snapshot key cannot be empty".to_string());
        }

        for (name, rate) in [
            ("Service fee", self.service_fee_rate),
            ("Delivery fee", self.delivery_fee_rate),
        ] {
            if rate < Decimal::ZERO || rate >= Decimal::ONE {
                return Err(format!("{name} must be in [0, 1), got {rate}"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config() {
        let config = WizardConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.service_fee_rate, dec!(0.015));
        assert_eq!(config.snapshot_key, "exchangeCalculatorData");
    }

    #[test]
    fn test_invalid_config() {
        let mut config = WizardConfig::default();
        config.delivery_fee_rate = dec!(1.2);
        assert!(config.validate().is_err());

        let mut config = WizardConfig::default();
        config.snapshot_key = " ".to_string();
        assert!(config.validate().is_err());
    }
}
