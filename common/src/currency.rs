//! Currency and exchange rate types for the Cambio exchange core.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CurrencyCodeError;

/// Default display precision for fiat currencies.
pub const FIAT_DEFAULT_DECIMALS: u32 = 2;

/// Default display precision for crypto currencies.
pub const CRYPTO_DEFAULT_DECIMALS: u32 = 8;

/// Short currency identifier such as `USD` or `BTC`.
///
/// Codes are trimmed and upper-cased on construction. The only validation
/// is that the code is not empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Create a new currency code.
    pub fn new(code: impl Into<String>) -> Result<Self, CurrencyCodeError> {
        let code = code.into().trim().to_uppercase();
        if code.is_empty() {
            return Err(CurrencyCodeError::Empty);
        }
        Ok(Self(code))
    }

    /// Parse an optional selector value, treating a blank string as unset.
    pub fn parse_optional(code: &str) -> Option<Self> {
        Self::new(code).ok()
    }

    /// Get the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Common currencies
    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    pub fn eur() -> Self {
        Self("EUR".to_string())
    }

    pub fn ars() -> Self {
        Self("ARS".to_string())
    }

    pub fn usdt() -> Self {
        Self("USDT".to_string())
    }

    pub fn btc() -> Self {
        Self("BTC".to_string())
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = CurrencyCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = CurrencyCodeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<&str> for CurrencyCode {
    type Error = CurrencyCodeError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

/// Whether a currency is a government-issued fiat or a crypto asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyKind {
    #[default]
    Fiat,
    Crypto,
}

impl CurrencyKind {
    /// Display precision used when a currency record does not carry its own.
    pub fn default_decimal_places(&self) -> u32 {
        match self {
            CurrencyKind::Fiat => FIAT_DEFAULT_DECIMALS,
            CurrencyKind::Crypto => CRYPTO_DEFAULT_DECIMALS,
        }
    }
}

/// Currency metadata, loaded once per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    /// Currency code.
    pub code: CurrencyCode,
    /// Human readable name.
    #[serde(default, alias = "name", alias = "displayName")]
    pub display_name: String,
    /// Display symbol.
    #[serde(default)]
    pub symbol: String,
    /// Fiat or crypto.
    #[serde(default, alias = "type")]
    pub kind: CurrencyKind,
    /// Explicit display precision, if the record carries one.
    #[serde(
        default,
        alias = "decimal_digits",
        alias = "decimals",
        alias = "decimalPlaces",
        skip_serializing_if = "Option::is_none"
    )]
    pub decimal_places: Option<u32>,
}

impl Currency {
    /// Create a new currency without an explicit precision.
    pub fn new(code: CurrencyCode, kind: CurrencyKind) -> Self {
        Self {
            code,
            display_name: String::new(),
            symbol: String::new(),
            kind,
            decimal_places: None,
        }
    }

    /// Set the display name and symbol.
    pub fn with_display(mut self, name: impl Into<String>, symbol: impl Into<String>) -> Self {
        self.display_name = name.into();
        self.symbol = symbol.into();
        self
    }

    /// Set an explicit display precision.
    pub fn with_decimal_places(mut self, places: u32) -> Self {
        self.decimal_places = Some(places);
        self
    }

    /// Precision from the record, falling back to the kind default.
    pub fn resolved_decimal_places(&self) -> u32 {
        self.decimal_places
            .unwrap_or_else(|| self.kind.default_decimal_places())
    }

    pub fn is_crypto(&self) -> bool {
        self.kind == CurrencyKind::Crypto
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.symbol.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{} ({})", self.code, self.symbol)
        }
    }
}

/// An ordered pair of currencies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CurrencyPair {
    /// Currency being sold.
    pub from: CurrencyCode,
    /// Currency being bought.
    pub to: CurrencyCode,
}

impl CurrencyPair {
    /// Create a new currency pair.
    pub fn new(from: CurrencyCode, to: CurrencyCode) -> Self {
        Self { from, to }
    }

    /// Get the inverse pair.
    pub fn inverse(&self) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
        }
    }

    /// Both sides name the same currency.
    pub fn is_self_pair(&self) -> bool {
        self.from == self.to
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.from, self.to)
    }
}

/// Rate for one ordered pair and one amount bracket.
///
/// `min_amount` and `max_amount` are expressed in units of `from`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    /// Source currency.
    #[serde(alias = "fromCurrency", alias = "from_currency")]
    pub from: CurrencyCode,
    /// Target currency.
    #[serde(alias = "toCurrency", alias = "to_currency")]
    pub to: CurrencyCode,
    /// Units of `to` received per unit of `from`.
    pub rate: Decimal,
    /// Smallest transactable amount.
    #[serde(default, alias = "minAmount")]
    pub min_amount: Decimal,
    /// Largest amount this bracket applies to.
    #[serde(default, alias = "maxAmount", skip_serializing_if = "Option::is_none")]
    pub max_amount: Option<Decimal>,
}

impl ExchangeRate {
    /// Create a rate with no minimum and no upper bound.
    pub fn new(from: CurrencyCode, to: CurrencyCode, rate: Decimal) -> Self {
        Self {
            from,
            to,
            rate,
            min_amount: Decimal::ZERO,
            max_amount: None,
        }
    }

    /// Set the minimum amount.
    pub fn with_min_amount(mut self, min_amount: Decimal) -> Self {
        self.min_amount = min_amount;
        self
    }

    /// Set the maximum amount.
    pub fn with_max_amount(mut self, max_amount: Decimal) -> Self {
        self.max_amount = Some(max_amount);
        self
    }

    /// Get the currency pair.
    pub fn pair(&self) -> CurrencyPair {
        CurrencyPair::new(self.from.clone(), self.to.clone())
    }

    /// Check the record invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.from == self.to {
            return Err(format!("rate {} converts a currency into itself", self.pair()));
        }

        if self.rate <= Decimal::ZERO {
            return Err(format!("rate {} must be positive, got {}", self.pair(), self.rate));
        }

        if self.min_amount < Decimal::ZERO {
            return Err(format!(
                "rate {} has negative minimum {}",
                self.pair(),
                self.min_amount
            ));
        }

        if let Some(max) = self.max_amount {
            if max < self.min_amount {
                return Err(format!(
                    "rate {} has maximum {} below minimum {}",
                    self.pair(),
                    max,
                    self.min_amount
                ));
            }
        }

        Ok(())
    }

    /// Whether `amount` falls inside this bracket.
    pub fn contains(&self, amount: Decimal) -> bool {
        amount >= self.min_amount && self.max_amount.map_or(true, |max| amount <= max)
    }

    /// Synthesize the opposite direction.
    ///
    /// The rate becomes `1 / rate`; the bracket bounds are converted into
    /// units of the new source currency. Returns `None` for a zero rate.
    pub fn inverse(&self) -> Option<Self> {
        let rate = Decimal::ONE.checked_div(self.rate)?;
        let min_amount = self.min_amount.checked_mul(self.rate)?;
        let max_amount = match self.max_amount {
            Some(max) => Some(max.checked_mul(self.rate)?),
            None => None,
        };

        Some(Self {
            from: self.to.clone(),
            to: self.from.clone(),
            rate,
            min_amount,
            max_amount,
        })
    }

    /// Chain this rate with a second leg starting where this one ends.
    ///
    /// The second leg's bounds are converted back into units of this
    /// rate's source currency and intersected with ours. Returns `None`
    /// when the legs do not connect or the brackets do not overlap.
    pub fn compose(&self, next: &ExchangeRate) -> Option<Self> {
        if self.to != next.from || self.from == next.to {
            return None;
        }

        let rate = self.rate.checked_mul(next.rate)?;
        let next_min = next.min_amount.checked_div(self.rate)?;
        let min_amount = self.min_amount.max(next_min);

        let next_max = match next.max_amount {
            Some(max) => Some(max.checked_div(self.rate)?),
            None => None,
        };
        let max_amount = match (self.max_amount, next_max) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        };

        if max_amount.map_or(false, |max| max < min_amount) {
            return None;
        }

        Some(Self {
            from: self.from.clone(),
            to: next.to.clone(),
            rate,
            min_amount,
            max_amount,
        })
    }
}

impl fmt::Display for ExchangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.pair(), self.rate)?;
        match self.max_amount {
            Some(max) => write!(f, " [{}..{}]", self.min_amount, max),
            None => write!(f, " [{}..]", self.min_amount),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn code(s: &str) -> CurrencyCode {
        CurrencyCode::new(s).unwrap()
    }

    #[test]
    fn test_currency_code_normalised() {
        assert_eq!(code(" usd ").as_str(), "USD");
        assert_eq!(code("usdt"), CurrencyCode::usdt());
    }

    #[test]
    fn test_currency_code_rejects_empty() {
        assert!(CurrencyCode::new("").is_err());
        assert!(CurrencyCode::new("   ").is_err());
        assert!(CurrencyCode::parse_optional("").is_none());
    }

    #[test]
    fn test_currency_code_deserialize_rejects_empty() {
        let parsed: Result<CurrencyCode, _> = serde_json::from_str("\"\"");
        assert!(parsed.is_err());

        let parsed: CurrencyCode = serde_json::from_str("\"btc\"").unwrap();
        assert_eq!(parsed, CurrencyCode::btc());
    }

    #[test]
    fn test_currency_decimal_places() {
        let usd = Currency::new(CurrencyCode::usd(), CurrencyKind::Fiat);
        let btc = Currency::new(CurrencyCode::btc(), CurrencyKind::Crypto);
        let eth = Currency::new(code("ETH"), CurrencyKind::Crypto).with_decimal_places(6);

        assert_eq!(usd.resolved_decimal_places(), 2);
        assert_eq!(btc.resolved_decimal_places(), 8);
        assert_eq!(eth.resolved_decimal_places(), 6);
    }

    #[test]
    fn test_currency_deserialize_aliases() {
        let json = r#"{"code":"usdt","name":"Tether","symbol":"₮","type":"crypto","decimals":6}"#;
        let currency: Currency = serde_json::from_str(json).unwrap();

        assert_eq!(currency.code, CurrencyCode::usdt());
        assert_eq!(currency.display_name, "Tether");
        assert!(currency.is_crypto());
        assert_eq!(currency.decimal_places, Some(6));
    }

    #[test]
    fn test_rate_deserialize_aliases() {
        let json = r#"{"fromCurrency":"USDT","toCurrency":"USD","rate":0.971,"minAmount":0,"maxAmount":3500}"#;
        let rate: ExchangeRate = serde_json::from_str(json).unwrap();

        assert_eq!(rate.pair(), CurrencyPair::new(CurrencyCode::usdt(), CurrencyCode::usd()));
        assert_eq!(rate.rate, dec!(0.971));
        assert_eq!(rate.max_amount, Some(dec!(3500)));
    }

    #[test]
    fn test_rate_validation() {
        let ok = ExchangeRate::new(CurrencyCode::usd(), CurrencyCode::ars(), dec!(950));
        assert!(ok.validate().is_ok());

        let zero = ExchangeRate::new(CurrencyCode::usd(), CurrencyCode::ars(), Decimal::ZERO);
        assert!(zero.validate().is_err());

        let self_pair = ExchangeRate::new(CurrencyCode::usd(), CurrencyCode::usd(), dec!(1));
        assert!(self_pair.validate().is_err());

        let inverted_bounds = ExchangeRate::new(CurrencyCode::usd(), CurrencyCode::ars(), dec!(950))
            .with_min_amount(dec!(500))
            .with_max_amount(dec!(100));
        assert!(inverted_bounds.validate().is_err());
    }

    #[test]
    fn test_rate_bracket_contains() {
        let rate = ExchangeRate::new(CurrencyCode::usdt(), CurrencyCode::usd(), dec!(0.971))
            .with_max_amount(dec!(3500));

        assert!(rate.contains(dec!(0)));
        assert!(rate.contains(dec!(3500)));
        assert!(!rate.contains(dec!(3500.01)));
    }

    #[test]
    fn test_inverse_converts_bounds() {
        let rate = ExchangeRate::new(CurrencyCode::usd(), CurrencyCode::ars(), dec!(1000))
            .with_min_amount(dec!(10))
            .with_max_amount(dec!(500));

        let inverse = rate.inverse().unwrap();

        assert_eq!(inverse.pair(), rate.pair().inverse());
        assert_eq!(inverse.rate, dec!(0.001));
        assert_eq!(inverse.min_amount, dec!(10000));
        assert_eq!(inverse.max_amount, Some(dec!(500000)));
    }

    #[test]
    fn test_compose_intersects_bounds() {
        let leg1 = ExchangeRate::new(code("RUB"), CurrencyCode::usd(), dec!(0.01))
            .with_min_amount(dec!(1000));
        let leg2 = ExchangeRate::new(CurrencyCode::usd(), CurrencyCode::ars(), dec!(1000))
            .with_min_amount(dec!(50))
            .with_max_amount(dec!(500));

        let cross = leg1.compose(&leg2).unwrap();

        assert_eq!(cross.pair(), CurrencyPair::new(code("RUB"), CurrencyCode::ars()));
        assert_eq!(cross.rate, dec!(10));
        // 50 USD is 5000 RUB, which beats the 1000 RUB floor
        assert_eq!(cross.min_amount, dec!(5000));
        assert_eq!(cross.max_amount, Some(dec!(50000)));
    }

    #[test]
    fn test_compose_rejects_disjoint_brackets() {
        let leg1 = ExchangeRate::new(code("RUB"), CurrencyCode::usd(), dec!(0.01))
            .with_max_amount(dec!(1000));
        let leg2 = ExchangeRate::new(CurrencyCode::usd(), CurrencyCode::ars(), dec!(1000))
            .with_min_amount(dec!(500));

        assert!(leg1.compose(&leg2).is_none());
    }

    #[test]
    fn test_compose_rejects_unconnected_legs() {
        let leg1 = ExchangeRate::new(code("RUB"), CurrencyCode::usd(), dec!(0.01));
        let leg2 = ExchangeRate::new(CurrencyCode::eur(), CurrencyCode::ars(), dec!(1000));

        assert!(leg1.compose(&leg2).is_none());
    }
}
