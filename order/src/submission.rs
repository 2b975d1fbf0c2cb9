//! Handoff of finished orders to the backend.

use async_trait::async_trait;
use cambio_common::{Classify, CurrencyCode, ErrorKind, OrderId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::draft::{ContactInfo, ExchangePairLine, OrderDraft};
use crate::error::{ValidationFailure, WizardError, WizardResult};

/// Lifecycle of a submitted order as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    Processing,
    Delivery,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// No further status changes are expected.
    pub fn is_final(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

/// Sum of source amounts for one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyTotal {
    pub currency: CurrencyCode,
    pub amount: Decimal,
}

/// Sum source amounts per currency, ordered by code.
///
/// Returns `None` when a sum overflows.
pub fn totals_by_currency(lines: &[ExchangePairLine]) -> Option<Vec<CurrencyTotal>> {
    let mut totals: Vec<CurrencyTotal> = Vec::new();

    for line in lines {
        let Some(currency) = &line.from_currency else {
            continue;
        };
        match totals.iter_mut().find(|t| &t.currency == currency) {
            Some(total) => total.amount = total.amount.checked_add(line.from_amount)?,
            None => totals.push(CurrencyTotal {
                currency: currency.clone(),
                amount: line.from_amount,
            }),
        }
    }

    totals.sort_by(|a, b| a.currency.cmp(&b.currency));
    Some(totals)
}

/// Payload handed to the submission adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSubmission {
    pub exchange_pairs: Vec<ExchangePairLine>,
    /// Plain sum of every line's source amount, whatever the currency.
    pub total_from_amount: Decimal,
    pub totals: Vec<CurrencyTotal>,
    #[serde(flatten)]
    pub contact: ContactInfo,
}

impl OrderSubmission {
    /// Build the payload from a draft.
    ///
    /// Fails with the draft's line issues when the totals overflow.
    pub fn from_draft(draft: &OrderDraft) -> WizardResult<Self> {
        let lines = draft.lines().to_vec();
        let overflow = || WizardError::ValidationFailed(ValidationFailure::Lines(draft.line_issues()));

        let total_from_amount = lines
            .iter()
            .try_fold(Decimal::ZERO, |sum, line| sum.checked_add(line.from_amount))
            .ok_or_else(overflow)?;
        let totals = totals_by_currency(&lines).ok_or_else(overflow)?;

        Ok(Self {
            total_from_amount,
            totals,
            exchange_pairs: lines,
            contact: draft.contact().clone(),
        })
    }
}

/// Backend acknowledgement of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub accepted_at: DateTime<Utc>,
}

impl SubmissionReceipt {
    /// Receipt for a freshly accepted order.
    pub fn accepted(order_id: OrderId) -> Self {
        Self {
            order_id,
            status: OrderStatus::New,
            accepted_at: Utc::now(),
        }
    }
}

/// Errors reported by a submission adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// The backend could not be reached.
    #[error("Network error: {0}")]
    Network(String),

    /// The backend refused the order.
    #[error("Order rejected: {0}")]
    Rejected(String),
}

impl Classify for SubmissionError {
    fn kind(&self) -> ErrorKind {
        match self {
            SubmissionError::Network(_) => ErrorKind::Network,
            SubmissionError::Rejected(_) => ErrorKind::ValidationFailed,
        }
    }
}

/// Delivers finished orders. Called once per submission, never retried.
#[async_trait]
pub trait SubmissionAdapter: Send + Sync {
    async fn submit(&self, order: &OrderSubmission) -> Result<SubmissionReceipt, SubmissionError>;
}

/// Adapter that logs the order and accepts it.
pub struct LoggingSubmission;

#[async_trait]
impl SubmissionAdapter for LoggingSubmission {
    async fn submit(&self, order: &OrderSubmission) -> Result<SubmissionReceipt, SubmissionError> {
        let receipt = SubmissionReceipt::accepted(OrderId::generate());

        info!(
            order_id = %receipt.order_id,
            lines = order.exchange_pairs.len(),
            total_from_amount = %order.total_from_amount,
            delivery = order.contact.delivery,
            "Order submitted"
        );

        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn lines() -> Vec<ExchangePairLine> {
        vec![
            ExchangePairLine::new(CurrencyCode::usd(), CurrencyCode::ars(), dec!(100)),
            ExchangePairLine::new(CurrencyCode::eur(), CurrencyCode::ars(), dec!(50)),
            ExchangePairLine::new(CurrencyCode::usd(), CurrencyCode::usdt(), dec!(250)),
        ]
    }

    #[test]
    fn test_totals_by_currency() {
        let totals = totals_by_currency(&lines()).unwrap();

        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].currency, CurrencyCode::eur());
        assert_eq!(totals[0].amount, dec!(50));
        assert_eq!(totals[1].currency, CurrencyCode::usd());
        assert_eq!(totals[1].amount, dec!(350));
    }

    #[test]
    fn test_totals_overflow_is_reported() {
        let huge = Decimal::MAX / dec!(2) + Decimal::ONE;
        let lines = vec![
            ExchangePairLine::new(CurrencyCode::usd(), CurrencyCode::ars(), huge),
            ExchangePairLine::new(CurrencyCode::usd(), CurrencyCode::usdt(), huge),
        ];

        assert!(totals_by_currency(&lines).is_none());
        assert!(totals_by_currency(&lines[..1]).is_some());
    }

    #[test]
    fn test_payload_wire_names() {
        let mut draft = OrderDraft::with_line(lines()[0].clone());
        draft.advance().unwrap();
        draft
            .set_contact(ContactInfo::default().with_telegram("@cambio_desk"))
            .unwrap();

        let json = serde_json::to_value(OrderSubmission::from_draft(&draft).unwrap()).unwrap();

        assert!(json.get("exchangePairs").is_some());
        assert_eq!(json["exchangePairs"][0]["fromCurrency"], "USD");
        assert_eq!(json["totalFromAmount"], "100");
        assert_eq!(json["telegram"], "@cambio_desk");
        assert_eq!(json["delivery"], false);
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Processing).unwrap(),
            "\"PROCESSING\""
        );
        assert!(OrderStatus::Cancelled.is_final());
        assert!(!OrderStatus::New.is_final());
    }

    #[tokio::test]
    async fn test_logging_submission_accepts() {
        let draft = OrderDraft::with_line(lines()[0].clone());
        let receipt = LoggingSubmission
            .submit(&OrderSubmission::from_draft(&draft).unwrap())
            .await
            .unwrap();

        assert_eq!(receipt.status, OrderStatus::New);
        assert!(receipt.order_id.as_str().starts_with("ORD-"));
    }

    #[test]
    fn test_submission_error_kinds() {
        assert_eq!(
            SubmissionError::Network("timeout".into()).error_code(),
            "NETWORK_ERROR"
        );
    }
}
