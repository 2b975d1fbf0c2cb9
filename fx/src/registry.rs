//! Currency metadata lookup.

use std::collections::BTreeMap;

use cambio_common::{Currency, CurrencyCode, FIAT_DEFAULT_DECIMALS};
use tracing::debug;

use crate::error::{FxError, FxResult};

/// Session-wide set of known currencies.
#[derive(Debug, Clone, Default)]
pub struct CurrencyRegistry {
    currencies: BTreeMap<CurrencyCode, Currency>,
}

impl CurrencyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry, rejecting duplicate codes.
    pub fn from_currencies(currencies: impl IntoIterator<Item = Currency>) -> FxResult<Self> {
        let mut registry = Self::new();
        for currency in currencies {
            registry.insert(currency)?;
        }
        Ok(registry)
    }

    /// Add a currency.
    pub fn insert(&mut self, currency: Currency) -> FxResult<()> {
        if self.currencies.contains_key(&currency.code) {
            return Err(FxError::DuplicateCurrency(currency.code));
        }
        self.currencies.insert(currency.code.clone(), currency);
        Ok(())
    }

    /// Look up a currency by code.
    pub fn get_currency(&self, code: &CurrencyCode) -> FxResult<&Currency> {
        self.currencies
            .get(code)
            .ok_or_else(|| FxError::UnknownCurrency(code.clone()))
    }

    /// Display precision for a currency.
    ///
    /// Precedence: the record's own precision, then the kind default, then
    /// the fiat default for codes the registry does not know.
    pub fn decimal_places(&self, code: &CurrencyCode) -> u32 {
        match self.currencies.get(code) {
            Some(currency) => currency.resolved_decimal_places(),
            None => {
                debug!(currency = %code, "No metadata, using fiat precision");
                FIAT_DEFAULT_DECIMALS
            }
        }
    }

    pub fn contains(&self, code: &CurrencyCode) -> bool {
        self.currencies.contains_key(code)
    }

    /// All currencies ordered by code.
    pub fn currencies(&self) -> impl Iterator<Item = &Currency> {
        self.currencies.values()
    }

    pub fn len(&self) -> usize {
        self.currencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.currencies.is_empty()
    }
}
