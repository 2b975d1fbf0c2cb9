//! One-shot draft handoff from the simplified calculator.

use std::sync::Arc;

use cambio_common::CurrencyCode;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::draft::ExchangePairLine;
use crate::storage::{ClientStorage, StorageResult};

/// Slot name used by the storefront calculator.
pub const DEFAULT_SNAPSHOT_KEY: &str = "exchangeCalculatorData";

/// Single-line quote posted by the simplified calculator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSnapshot {
    pub from_currency: CurrencyCode,
    pub to_currency: CurrencyCode,
    pub from_amount: Decimal,
    pub to_amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl DraftSnapshot {
    /// Snapshot of a quote taken now.
    pub fn new(
        from_currency: CurrencyCode,
        to_currency: CurrencyCode,
        from_amount: Decimal,
        to_amount: Decimal,
    ) -> Self {
        Self {
            from_currency,
            to_currency,
            from_amount,
            to_amount,
            rate: None,
            timestamp: Some(Utc::now()),
        }
    }

    pub fn with_rate(mut self, rate: Decimal) -> Self {
        self.rate = Some(rate);
        self
    }
}

impl From<DraftSnapshot> for ExchangePairLine {
    fn from(snapshot: DraftSnapshot) -> Self {
        Self {
            from_currency: Some(snapshot.from_currency),
            to_currency: Some(snapshot.to_currency),
            from_amount: snapshot.from_amount,
            to_amount: snapshot.to_amount,
        }
    }
}

/// Read-once inbox over a single storage slot.
#[derive(Clone)]
pub struct SnapshotInbox {
    storage: Arc<dyn ClientStorage>,
    key: String,
}

impl SnapshotInbox {
    /// Inbox on the default slot.
    pub fn new(storage: Arc<dyn ClientStorage>) -> Self {
        Self::with_key(storage, DEFAULT_SNAPSHOT_KEY)
    }

    pub fn with_key(storage: Arc<dyn ClientStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Write a snapshot, replacing any pending one.
    pub fn post(&self, snapshot: &DraftSnapshot) -> StorageResult<()> {
        let json = serde_json::to_string(snapshot)?;
        self.storage.set(&self.key, &json)?;
        debug!(
            key = %self.key,
            from = %snapshot.from_currency,
            to = %snapshot.to_currency,
            "Snapshot posted"
        );
        Ok(())
    }

    /// Take the pending snapshot, if any.
    ///
    /// The slot is deleted before parsing, so malformed content is consumed
    /// too. Storage and parse failures are logged and yield `None`.
    pub fn take_pending_snapshot(&self) -> Option<DraftSnapshot> {
        let raw = match self.storage.remove(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Could not read snapshot slot");
                return None;
            }
        };

        match serde_json::from_str::<DraftSnapshot>(&raw) {
            Ok(snapshot) => {
                debug!(key = %self.key, "Pending snapshot taken");
                Some(snapshot)
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Discarding malformed snapshot");
                None
            }
        }
    }

    /// Delete any pending snapshot.
    pub fn discard(&self) -> StorageResult<()> {
        self.storage.remove(&self.key)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use rust_decimal_macros::dec;

    fn inbox() -> (Arc<MemoryStorage>, SnapshotInbox) {
        let storage = Arc::new(MemoryStorage::new());
        let inbox = SnapshotInbox::new(storage.clone());
        (storage, inbox)
    }

    #[test]
    fn test_post_then_take_once() {
        let (_, inbox) = inbox();
        let snapshot =
            DraftSnapshot::new(CurrencyCode::usd(), CurrencyCode::ars(), dec!(100), dec!(95000))
                .with_rate(dec!(950));

        inbox.post(&snapshot).unwrap();

        assert_eq!(inbox.take_pending_snapshot(), Some(snapshot));
        assert_eq!(inbox.take_pending_snapshot(), None);
    }

    #[test]
    fn test_reads_calculator_json() {
        let (storage, inbox) = inbox();
        storage
            .set(
                DEFAULT_SNAPSHOT_KEY,
                r#"{"fromCurrency":"USD","toCurrency":"ARS","fromAmount":100,"toAmount":127000,"rate":1270,"timestamp":"2024-05-01T12:00:00.000Z"}"#,
            )
            .unwrap();

        let snapshot = inbox.take_pending_snapshot().unwrap();

        assert_eq!(snapshot.from_currency, CurrencyCode::usd());
        assert_eq!(snapshot.to_amount, dec!(127000));
        assert!(snapshot.timestamp.is_some());
    }

    #[test]
    fn test_malformed_snapshot_is_cleared() {
        let (storage, inbox) = inbox();
        storage
            .set(
                DEFAULT_SNAPSHOT_KEY,
                r#"{"fromCurrency":"USD","toCurrency":"ARS","fromAmount":100}"#,
            )
            .unwrap();

        assert_eq!(inbox.take_pending_snapshot(), None);
        assert!(storage.is_empty());
    }

    #[test]
    fn test_wrong_types_and_garbage_are_cleared() {
        let (storage, inbox) = inbox();

        for raw in [
            r#"{"fromCurrency":"","toCurrency":"ARS","fromAmount":1,"toAmount":1}"#,
            r#"{"fromCurrency":"USD","toCurrency":"ARS","fromAmount":true,"toAmount":1}"#,
            "not json",
        ] {
            storage.set(DEFAULT_SNAPSHOT_KEY, raw).unwrap();
            assert_eq!(inbox.take_pending_snapshot(), None);
            assert!(storage.is_empty());
        }
    }

    #[test]
    fn test_discard() {
        let (storage, inbox) = inbox();
        storage.set(DEFAULT_SNAPSHOT_KEY, "{}").unwrap();

        inbox.discard().unwrap();

        assert!(storage.is_empty());
    }
}
