//! Quote calculation between two currencies.

use std::sync::Arc;

use cambio_common::{CurrencyCode, CurrencyPair, ExchangeRate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FxError, QuoteUnavailable};
use crate::registry::CurrencyRegistry;
use crate::table::{RateTable, RouteKind};

/// Rounding applied to every computed amount.
///
/// Amounts are positive, so midpoint-away-from-zero is round-half-up.
pub const QUOTE_ROUNDING: RoundingStrategy = RoundingStrategy::MidpointAwayFromZero;

/// Which side of a pair the user typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteInput {
    /// Amount of the source currency to sell.
    From(Decimal),
    /// Amount of the target currency to receive.
    To(Decimal),
}

/// A computed quote with both amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// The currency pair.
    pub pair: CurrencyPair,
    /// Amount of the source currency.
    pub from_amount: Decimal,
    /// Amount of the target currency.
    pub to_amount: Decimal,
    /// Rate of the bracket that was applied.
    pub rate: Decimal,
    /// Smallest transactable amount for the pair.
    pub min_amount: Decimal,
    /// How the rate was obtained.
    pub route: RouteKind,
    /// The side the caller supplied.
    pub input: QuoteInput,
}

/// Converts amounts using a rate table and currency precision.
///
/// Pure: repeated calls with the same inputs return the same output for
/// as long as the calculator is alive, since it holds one table snapshot.
#[derive(Debug, Clone)]
pub struct QuoteCalculator {
    table: Arc<RateTable>,
    currencies: Arc<CurrencyRegistry>,
}

impl QuoteCalculator {
    /// Create a calculator over a table snapshot.
    pub fn new(table: Arc<RateTable>, currencies: Arc<CurrencyRegistry>) -> Self {
        Self { table, currencies }
    }

    /// The rate table in use.
    pub fn table(&self) -> &RateTable {
        &self.table
    }

    /// The currency metadata in use.
    pub fn currencies(&self) -> &CurrencyRegistry {
        &self.currencies
    }

    /// Amount of `to` received for `from_amount` of `from`.
    ///
    /// Rounded half-up to the precision of `to`.
    pub fn to_amount_from<'c>(
        &self,
        from: impl Into<Option<&'c CurrencyCode>>,
        to: impl Into<Option<&'c CurrencyCode>>,
        from_amount: Decimal,
    ) -> Result<Decimal, QuoteUnavailable> {
        let (from, to) = require_pair(from.into(), to.into())?;
        self.forward(from, to, from_amount).map(|(amount, _)| amount)
    }

    /// Amount of `from` needed to receive `to_amount` of `to`.
    ///
    /// Rounded half-up to the precision of `from`.
    pub fn from_amount_from<'c>(
        &self,
        from: impl Into<Option<&'c CurrencyCode>>,
        to: impl Into<Option<&'c CurrencyCode>>,
        to_amount: Decimal,
    ) -> Result<Decimal, QuoteUnavailable> {
        let (from, to) = require_pair(from.into(), to.into())?;
        self.backward(from, to, to_amount).map(|(amount, _)| amount)
    }

    /// Quote a pair given exactly one side.
    pub fn quote(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        input: QuoteInput,
    ) -> Result<Quote, QuoteUnavailable> {
        let route = self.table.route(from, to)?;

        let (from_amount, to_amount, applied) = match input {
            QuoteInput::From(amount) => {
                let (to_amount, rate) = self.forward(from, to, amount)?;
                (amount, to_amount, rate)
            }
            QuoteInput::To(amount) => {
                let (from_amount, rate) = self.backward(from, to, amount)?;
                (from_amount, amount, rate)
            }
        };

        Ok(Quote {
            pair: CurrencyPair::new(from.clone(), to.clone()),
            from_amount,
            to_amount,
            rate: applied.rate,
            min_amount: route.min_amount(),
            route: route.kind,
            input,
        })
    }

    fn forward(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        from_amount: Decimal,
    ) -> Result<(Decimal, ExchangeRate), QuoteUnavailable> {
        require_positive(from_amount)?;

        let rate = self.table.get_rate_for_amount(from, to, from_amount)?;
        let raw = from_amount
            .checked_mul(rate.rate)
            .ok_or_else(|| FxError::Overflow(rate.pair()))?;
        let amount = round_amount(raw, self.currencies.decimal_places(to));

        debug!(from = %from, to = %to, %from_amount, rate = %rate.rate, %amount, "Computed target amount");
        Ok((amount, rate))
    }

    fn backward(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        to_amount: Decimal,
    ) -> Result<(Decimal, ExchangeRate), QuoteUnavailable> {
        require_positive(to_amount)?;

        let route = self.table.route(from, to)?;
        let places = self.currencies.decimal_places(from);

        // The bracket depends on the source amount we are solving for, so
        // try each one and keep the first that is self-consistent.
        for tier in &route.tiers {
            let Some(raw) = to_amount.checked_div(tier.rate) else {
                continue;
            };
            if tier.contains(raw) {
                let amount = round_amount(raw, places);
                debug!(from = %from, to = %to, %to_amount, rate = %tier.rate, %amount, "Computed source amount");
                return Ok((amount, tier.clone()));
            }
        }

        Err(FxError::AmountOutOfRange {
            pair: CurrencyPair::new(from.clone(), to.clone()),
            amount: to_amount,
        }
        .into())
    }
}

/// Round half-up and pin the scale so `95000` displays as `95000.00`.
pub fn round_amount(value: Decimal, places: u32) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(places, QUOTE_ROUNDING);
    rounded.rescale(places);
    rounded
}

fn require_pair<'c>(
    from: Option<&'c CurrencyCode>,
    to: Option<&'c CurrencyCode>,
) -> Result<(&'c CurrencyCode, &'c CurrencyCode), QuoteUnavailable> {
    match (from, to) {
        (Some(from), Some(to)) => Ok((from, to)),
        _ => Err(QuoteUnavailable::MissingCurrency),
    }
}

fn require_positive(amount: Decimal) -> Result<(), QuoteUnavailable> {
    if amount <= Decimal::ZERO {
        return Err(QuoteUnavailable::NonPositiveAmount(amount));
    }
    Ok(())
}
