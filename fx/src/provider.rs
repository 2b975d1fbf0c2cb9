//! Rate source traits and implementations.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use cambio_common::{Currency, CurrencyCode, CurrencyKind, ExchangeRate};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{FxError, FxResult};

/// Serialisable set of currencies and rates produced by a source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSheet {
    /// Currency metadata.
    #[serde(default)]
    pub currencies: Vec<Currency>,
    /// Rate brackets.
    #[serde(default)]
    pub rates: Vec<ExchangeRate>,
}

impl RateSheet {
    /// Parse a sheet from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The storefront's published sheet: cash desks in Buenos Aires
    /// quoting into pesos and stablecoins.
    pub fn storefront() -> Self {
        let fiat = |code: &str, name: &str, symbol: &str| {
            Currency::new(known(code), CurrencyKind::Fiat).with_display(name, symbol)
        };
        let usdt = Currency::new(known("USDT"), CurrencyKind::Crypto)
            .with_display("Tether", "₮")
            .with_decimal_places(2);
        let btc = Currency::new(known("BTC"), CurrencyKind::Crypto).with_display("Bitcoin", "₿");

        let rate = |from: &str, to: &str, r: Decimal| ExchangeRate::new(known(from), known(to), r);
        let bracket = Decimal::new(500, 0);
        let usdt_bracket = Decimal::new(3500, 0);

        Self {
            currencies: vec![
                fiat("USD", "US Dollar", "$"),
                fiat("EUR", "Euro", "€"),
                fiat("RUB", "Russian Ruble", "₽"),
                fiat("ARS", "Argentine Peso", "$"),
                fiat("KZT", "Kazakhstani Tenge", "₸"),
                usdt,
                btc,
            ],
            rates: vec![
                rate("USD", "ARS", Decimal::new(1270, 0)).with_max_amount(bracket),
                rate("USD", "ARS", Decimal::new(1280, 0)).with_min_amount(bracket),
                rate("USDT", "ARS", Decimal::new(1250, 0)).with_max_amount(bracket),
                rate("USDT", "ARS", Decimal::new(1260, 0)).with_min_amount(bracket),
                rate("EUR", "ARS", Decimal::new(1330, 0)).with_max_amount(bracket),
                rate("EUR", "ARS", Decimal::new(1340, 0)).with_min_amount(bracket),
                rate("RUB", "ARS", Decimal::new(136, 1)).with_min_amount(Decimal::new(10000, 0)),
                rate("USD", "USDT", Decimal::ONE).with_min_amount(Decimal::new(100, 0)),
                rate("USDT", "USD", Decimal::new(971, 3)).with_max_amount(usdt_bracket),
                rate("USDT", "USD", Decimal::new(981, 3)).with_min_amount(usdt_bracket),
                rate("KZT", "ARS", Decimal::new(237, 2)).with_min_amount(Decimal::new(10000, 0)),
                rate("RUB", "USD", Decimal::new(108, 4)).with_min_amount(Decimal::new(925, 1)),
                rate("BTC", "USDT", Decimal::new(60000, 0)),
            ],
        }
    }
}

// Only for literal codes above; never empty.
fn known(code: &str) -> CurrencyCode {
    CurrencyCode::new(code).unwrap_or_else(|_| CurrencyCode::usd())
}

/// Trait for rate sheet sources.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Get the source name.
    fn name(&self) -> &str;

    /// Fetch the current sheet.
    async fn fetch(&self) -> FxResult<RateSheet>;
}

/// Serves a sheet held in memory.
pub struct StaticRateSource {
    name: String,
    sheet: Mutex<RateSheet>,
}

impl StaticRateSource {
    /// Create a new static source.
    pub fn new(name: impl Into<String>, sheet: RateSheet) -> Self {
        Self {
            name: name.into(),
            sheet: Mutex::new(sheet),
        }
    }

    /// Replace the sheet returned by later fetches.
    pub fn set_sheet(&self, sheet: RateSheet) {
        *self.sheet.lock() = sheet;
    }
}

#[async_trait]
impl RateSource for StaticRateSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> FxResult<RateSheet> {
        Ok(self.sheet.lock().clone())
    }
}

/// Reads a JSON sheet from disk on every fetch.
pub struct JsonFileRateSource {
    name: String,
    path: PathBuf,
}

impl JsonFileRateSource {
    /// Create a new file source.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: format!("file:{}", path.display()),
            path,
        }
    }

    fn failed(&self, reason: impl ToString) -> FxError {
        FxError::SourceFailed {
            source_name: self.name.clone(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl RateSource for JsonFileRateSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> FxResult<RateSheet> {
        let json = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| self.failed(e))?;
        RateSheet::from_json(&json).map_err(|e| self.failed(e))
    }
}

/// Tries sources in order and returns the first sheet obtained.
pub struct FallbackRateSource {
    sources: Vec<Arc<dyn RateSource>>,
}

impl FallbackRateSource {
    /// Create a new fallback chain.
    pub fn new(sources: Vec<Arc<dyn RateSource>>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl RateSource for FallbackRateSource {
    fn name(&self) -> &str {
        "FALLBACK"
    }

    async fn fetch(&self) -> FxResult<RateSheet> {
        let mut last_error = None;

        for source in &self.sources {
            match source.fetch().await {
                Ok(sheet) => {
                    debug!(
                        source = source.name(),
                        rates = sheet.rates.len(),
                        "Got rate sheet from source"
                    );
                    return Ok(sheet);
                }
                Err(e) => {
                    warn!(
                        source = source.name(),
                        error = %e,
                        "Source failed to return rate sheet"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| FxError::SourceFailed {
            source_name: self.name().to_string(),
            reason: "no sources configured".to_string(),
        }))
    }
}
