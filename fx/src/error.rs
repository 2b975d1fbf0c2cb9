//! FX error types.

use cambio_common::{Classify, CurrencyCode, CurrencyPair, ErrorKind};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur when looking up rates or currency metadata.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FxError {
    /// Both sides of the pair name the same currency.
    #[error("Cannot convert {0} into itself")]
    InvalidPair(CurrencyCode),

    /// No direct, inverse or triangulated rate exists.
    #[error("Rate not available for {0}")]
    RateNotFound(CurrencyPair),

    /// A rate exists but no bracket covers the amount.
    #[error("No rate bracket for {pair} covers amount {amount}")]
    AmountOutOfRange { pair: CurrencyPair, amount: Decimal },

    /// A rate record violates its invariants.
    #[error("Invalid rate: {0}")]
    InvalidRate(String),

    /// The same currency code appears twice in a registry.
    #[error("Duplicate currency: {0}")]
    DuplicateCurrency(CurrencyCode),

    /// Currency metadata is missing.
    #[error("Unknown currency: {0}")]
    UnknownCurrency(CurrencyCode),

    /// Arithmetic left the representable range.
    #[error("Arithmetic overflow while converting {0}")]
    Overflow(CurrencyPair),

    /// A rate source failed to produce a sheet.
    #[error("Rate source {source_name} failed: {reason}")]
    SourceFailed { source_name: String, reason: String },
}

impl Classify for FxError {
    fn kind(&self) -> ErrorKind {
        match self {
            FxError::InvalidPair(_) => ErrorKind::InvalidPair,
            FxError::RateNotFound(_) | FxError::UnknownCurrency(_) => ErrorKind::NotFound,
            FxError::AmountOutOfRange { .. } | FxError::Overflow(_) => ErrorKind::Unavailable,
            FxError::InvalidRate(_) | FxError::DuplicateCurrency(_) => ErrorKind::Configuration,
            FxError::SourceFailed { .. } => ErrorKind::Network,
        }
    }
}

/// Result type for FX operations.
pub type FxResult<T> = Result<T, FxError>;

/// Reason the quote calculator could not produce an amount.
///
/// Never fatal: callers keep the previous value of the paired field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuoteUnavailable {
    /// One side of the pair has not been selected yet.
    #[error("Currency not selected")]
    MissingCurrency,

    /// The input amount is zero or negative.
    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    /// The rate table could not serve the pair.
    #[error(transparent)]
    Rate(#[from] FxError),
}

impl QuoteUnavailable {
    /// Kind of the underlying cause.
    pub fn cause_kind(&self) -> ErrorKind {
        match self {
            QuoteUnavailable::Rate(e) => e.kind(),
            _ => ErrorKind::Unavailable,
        }
    }
}

impl Classify for QuoteUnavailable {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Unavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_wraps_rate_errors() {
        let err: QuoteUnavailable = FxError::InvalidPair(CurrencyCode::usd()).into();

        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert_eq!(err.cause_kind(), ErrorKind::InvalidPair);
        assert_eq!(err.error_code(), "UNAVAILABLE");
    }

    #[test]
    fn test_not_found_kind() {
        let pair = CurrencyPair::new(CurrencyCode::usd(), CurrencyCode::ars());
        assert_eq!(FxError::RateNotFound(pair).kind(), ErrorKind::NotFound);
    }
}
