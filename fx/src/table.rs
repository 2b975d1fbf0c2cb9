//! Rate table lookups with inversion and triangulation.

use std::collections::HashMap;
use std::fmt;

use cambio_common::{CurrencyCode, CurrencyPair, ExchangeRate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FxError, FxResult};

/// How a rate between two currencies was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    /// Listed for the requested direction.
    Direct,
    /// Synthesized as `1 / rate` of the opposite direction.
    Inverse,
    /// Composed through the base currency.
    Triangulated,
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteKind::Direct => write!(f, "direct"),
            RouteKind::Inverse => write!(f, "inverse"),
            RouteKind::Triangulated => write!(f, "triangulated"),
        }
    }
}

/// Resolved brackets for one ordered pair.
#[derive(Debug, Clone)]
pub struct RateRoute {
    /// How the brackets were obtained.
    pub kind: RouteKind,
    /// Brackets sorted by minimum amount. Never empty.
    pub tiers: Vec<ExchangeRate>,
}

impl RateRoute {
    /// Bracket with the lowest minimum.
    pub fn primary(&self) -> &ExchangeRate {
        &self.tiers[0]
    }

    /// First bracket containing `amount`.
    pub fn tier_for(&self, amount: Decimal) -> Option<&ExchangeRate> {
        self.tiers.iter().find(|tier| tier.contains(amount))
    }

    /// Smallest transactable amount over all brackets.
    pub fn min_amount(&self) -> Decimal {
        self.primary().min_amount
    }
}

/// Immutable snapshot of every listed rate.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    tiers: HashMap<CurrencyPair, Vec<ExchangeRate>>,
    base_currency: Option<CurrencyCode>,
}

impl RateTable {
    /// Create an empty table.
    pub fn new(base_currency: Option<CurrencyCode>) -> Self {
        Self {
            tiers: HashMap::new(),
            base_currency,
        }
    }

    /// Build a table, validating every record.
    pub fn from_rates(
        rates: impl IntoIterator<Item = ExchangeRate>,
        base_currency: Option<CurrencyCode>,
    ) -> FxResult<Self> {
        let mut table = Self::new(base_currency);
        for rate in rates {
            table.insert(rate)?;
        }
        Ok(table)
    }

    /// Add a rate bracket.
    pub fn insert(&mut self, rate: ExchangeRate) -> FxResult<()> {
        rate.validate().map_err(FxError::InvalidRate)?;

        let tiers = self.tiers.entry(rate.pair()).or_default();
        tiers.push(rate);
        tiers.sort_by(|a, b| a.min_amount.cmp(&b.min_amount));
        Ok(())
    }

    /// Currency used for triangulation.
    pub fn base_currency(&self) -> Option<&CurrencyCode> {
        self.base_currency.as_ref()
    }

    /// Directly listed pairs, sorted.
    pub fn pairs(&self) -> Vec<CurrencyPair> {
        let mut pairs: Vec<CurrencyPair> = self.tiers.keys().cloned().collect();
        pairs.sort();
        pairs
    }

    /// Number of directly listed pairs.
    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Resolve every bracket for a pair.
    pub fn route(&self, from: &CurrencyCode, to: &CurrencyCode) -> FxResult<RateRoute> {
        if from == to {
            return Err(FxError::InvalidPair(from.clone()));
        }

        let pair = CurrencyPair::new(from.clone(), to.clone());

        if let Some(route) = self.one_hop(&pair) {
            return Ok(route);
        }

        if let Some(route) = self.triangulate(&pair) {
            debug!(pair = %pair, tiers = route.tiers.len(), "Triangulated rate");
            return Ok(route);
        }

        Err(FxError::RateNotFound(pair))
    }

    /// Rate for a pair, using the bracket with the lowest minimum.
    pub fn get_rate(&self, from: &CurrencyCode, to: &CurrencyCode) -> FxResult<ExchangeRate> {
        self.route(from, to).map(|route| route.primary().clone())
    }

    /// Rate for the bracket that covers `amount` of `from`.
    pub fn get_rate_for_amount(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        amount: Decimal,
    ) -> FxResult<ExchangeRate> {
        let route = self.route(from, to)?;
        route
            .tier_for(amount)
            .cloned()
            .ok_or_else(|| FxError::AmountOutOfRange {
                pair: CurrencyPair::new(from.clone(), to.clone()),
                amount,
            })
    }

    /// Every resolved bracket for a pair.
    pub fn tiers(&self, from: &CurrencyCode, to: &CurrencyCode) -> FxResult<Vec<ExchangeRate>> {
        self.route(from, to).map(|route| route.tiers)
    }

    /// Smallest transactable amount of `from` for the pair.
    pub fn min_amount(&self, from: &CurrencyCode, to: &CurrencyCode) -> FxResult<Decimal> {
        self.route(from, to).map(|route| route.min_amount())
    }

    /// Direct brackets, or the inverse brackets synthesized.
    fn one_hop(&self, pair: &CurrencyPair) -> Option<RateRoute> {
        if let Some(tiers) = self.tiers.get(pair) {
            return Some(RateRoute {
                kind: RouteKind::Direct,
                tiers: tiers.clone(),
            });
        }

        let inverse = self.tiers.get(&pair.inverse())?;
        let mut tiers: Vec<ExchangeRate> =
            inverse.iter().filter_map(ExchangeRate::inverse).collect();
        if tiers.is_empty() {
            return None;
        }
        tiers.sort_by(|a, b| a.min_amount.cmp(&b.min_amount));
        close_gaps(&mut tiers);

        debug!(pair = %pair, "Synthesized rate from inverse");
        Some(RateRoute {
            kind: RouteKind::Inverse,
            tiers,
        })
    }

    /// Compose `from -> base -> to` when both legs resolve in one hop.
    fn triangulate(&self, pair: &CurrencyPair) -> Option<RateRoute> {
        let base = self.base_currency.as_ref()?;
        if &pair.from == base || &pair.to == base {
            return None;
        }

        let first = self.one_hop(&CurrencyPair::new(pair.from.clone(), base.clone()))?;
        let second = self.one_hop(&CurrencyPair::new(base.clone(), pair.to.clone()))?;

        let mut tiers: Vec<ExchangeRate> = first
            .tiers
            .iter()
            .flat_map(|a| second.tiers.iter().filter_map(move |b| a.compose(b)))
            .collect();

        if tiers.is_empty() {
            return None;
        }

        tiers.sort_by(|a, b| a.min_amount.cmp(&b.min_amount));
        close_gaps(&mut tiers);
        Some(RateRoute {
            kind: RouteKind::Triangulated,
            tiers,
        })
    }
}

/// Stretch brackets so converted bounds leave no hole between them.
///
/// Each bracket is converted at its own rate, so adjacent listed brackets
/// can drift apart. A bracket that ends before the next one starts is
/// extended up to that start. Expects `tiers` sorted by minimum.
fn close_gaps(tiers: &mut [ExchangeRate]) {
    let mut reach: Option<usize> = None;

    for i in 0..tiers.len() {
        if let Some(j) = reach {
            if let Some(max) = tiers[j].max_amount {
                if tiers[i].min_amount > max {
                    tiers[j].max_amount = Some(tiers[i].min_amount);
                }
            }
        }

        let Some(max) = tiers[i].max_amount else {
            return;
        };
        if reach.and_then(|j| tiers[j].max_amount).map_or(true, |r| max >= r) {
            reach = Some(i);
        }
    }
}
