//! Fee estimate shown on the contact step.

use cambio_common::CurrencyCode;
use cambio_fx::{round_amount, CurrencyRegistry};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::WizardConfig;
use crate::draft::OrderDraft;
use crate::submission::totals_by_currency;

/// Estimate for one source currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencySummary {
    pub currency: CurrencyCode,
    pub total: Decimal,
    pub service_fee: Decimal,
    pub delivery_fee: Decimal,
    pub net: Decimal,
}

/// Order totals and estimated fees per source currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub lines: usize,
    pub delivery: bool,
    pub currencies: Vec<CurrencySummary>,
}

impl OrderSummary {
    /// Summarise a draft. Fees are rounded to each currency's precision.
    ///
    /// Returns `None` when a currency total overflows.
    pub fn for_draft(
        draft: &OrderDraft,
        currencies: &CurrencyRegistry,
        config: &WizardConfig,
    ) -> Option<Self> {
        let delivery = draft.contact().delivery;

        let summaries = totals_by_currency(draft.lines())?
            .into_iter()
            .map(|total| {
                let places = currencies.decimal_places(&total.currency);
                let service_fee =
                    round_amount(total.amount.checked_mul(config.service_fee_rate)?, places);
                let delivery_fee = if delivery {
                    round_amount(total.amount.checked_mul(config.delivery_fee_rate)?, places)
                } else {
                    round_amount(Decimal::ZERO, places)
                };

                Some(CurrencySummary {
                    net: total.amount - service_fee - delivery_fee,
                    currency: total.currency,
                    total: total.amount,
                    service_fee,
                    delivery_fee,
                })
            })
            .collect::<Option<Vec<_>>>()?;

        Some(Self {
            lines: draft.lines().len(),
            delivery,
            currencies: summaries,
        })
    }

    /// Estimate for one currency.
    pub fn currency(&self, code: &CurrencyCode) -> Option<&CurrencySummary> {
        self.currencies.iter().find(|s| &s.currency == code)
    }
}
