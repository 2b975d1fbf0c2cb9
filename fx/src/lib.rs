//! Cambio FX
//!
//! Rate lookup and quote calculation for the exchange wizard.
//!
//! # Features
//!
//! - Tiered rate table with inverse and base-currency routes
//! - Currency metadata with precision defaults per kind
//! - Bidirectional quote calculator with half-up rounding
//! - Atomically swapped rate book with background refresh
//!
//! # Example
//!
//! ```rust,ignore
//! use cambio_fx::{FxConfig, RateBook, RateSheet};
//! use cambio_common::CurrencyCode;
//! use rust_decimal_macros::dec;
//!
//! let book = RateBook::from_sheet(FxConfig::default(), RateSheet::storefront(), "storefront")?;
//! let calculator = book.calculator();
//!
//! let ars = calculator.to_amount_from(&CurrencyCode::usd(), &CurrencyCode::ars(), dec!(100))?;
//! ```

pub mod book;
pub mod config;
pub mod error;
pub mod provider;
pub mod quote;
pub mod registry;
pub mod table;

pub use book::{spawn_refresh_loop, BookStats, MarketSnapshot, RateBook};
pub use config::FxConfig;
pub use error::{FxError, FxResult, QuoteUnavailable};
pub use provider::{FallbackRateSource, JsonFileRateSource, RateSheet, RateSource, StaticRateSource};
pub use quote::{round_amount, Quote, QuoteCalculator, QuoteInput, QUOTE_ROUNDING};
pub use registry::CurrencyRegistry;
pub use table::{RateRoute, RateTable, RouteKind};
