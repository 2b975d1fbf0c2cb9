//! Swappable holder of the current rate table.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::config::FxConfig;
use crate::error::FxResult;
use crate::provider::{RateSheet, RateSource};
use crate::quote::QuoteCalculator;
use crate::registry::CurrencyRegistry;
use crate::table::RateTable;

/// One loaded rate sheet, immutable once published.
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    /// Rates.
    pub table: Arc<RateTable>,
    /// Currency metadata.
    pub currencies: Arc<CurrencyRegistry>,
    /// When the sheet was loaded.
    pub refreshed_at: DateTime<Utc>,
    /// Name of the source that produced the sheet.
    pub source: String,
    /// Incremented on every successful load.
    pub version: u64,
}

impl MarketSnapshot {
    /// Calculator bound to this snapshot.
    pub fn calculator(&self) -> QuoteCalculator {
        QuoteCalculator::new(self.table.clone(), self.currencies.clone())
    }

    /// Time since the sheet was loaded.
    pub fn age(&self) -> Duration {
        Utc::now()
            .signed_duration_since(self.refreshed_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

/// Rate book statistics.
#[derive(Debug, Clone)]
pub struct BookStats {
    pub version: u64,
    pub source: String,
    pub pairs: usize,
    pub currencies: usize,
    pub age: Duration,
    pub stale: bool,
}

/// Shared, atomically swapped rate table.
///
/// Readers clone an `Arc<MarketSnapshot>`, so a refresh never changes the
/// table under a computation in progress.
pub struct RateBook {
    current: RwLock<Arc<MarketSnapshot>>,
    config: FxConfig,
}

impl RateBook {
    /// Create an empty book.
    pub fn new(config: FxConfig) -> Self {
        let empty = MarketSnapshot {
            table: Arc::new(RateTable::new(config.base_currency.clone())),
            currencies: Arc::new(CurrencyRegistry::new()),
            refreshed_at: Utc::now(),
            source: "empty".to_string(),
            version: 0,
        };

        Self {
            current: RwLock::new(Arc::new(empty)),
            config,
        }
    }

    /// Create a book loaded with a sheet.
    pub fn from_sheet(config: FxConfig, sheet: RateSheet, source: &str) -> FxResult<Self> {
        let book = Self::new(config);
        book.load(sheet, source)?;
        Ok(book)
    }

    /// Validate a sheet and publish it.
    ///
    /// The previous snapshot stays in place when the sheet is rejected.
    pub fn load(&self, sheet: RateSheet, source: &str) -> FxResult<u64> {
        let table = RateTable::from_rates(sheet.rates, self.config.base_currency.clone())?;
        let currencies = CurrencyRegistry::from_currencies(sheet.currencies)?;

        let mut current = self.current.write();
        let version = current.version + 1;
        *current = Arc::new(MarketSnapshot {
            table: Arc::new(table),
            currencies: Arc::new(currencies),
            refreshed_at: Utc::now(),
            source: source.to_string(),
            version,
        });

        debug!(source, version, pairs = current.table.len(), "Rate sheet loaded");
        Ok(version)
    }

    /// Fetch from a source and publish the result.
    #[instrument(skip(self, source), fields(source = source.name()))]
    pub async fn refresh(&self, source: &dyn RateSource) -> FxResult<u64> {
        let sheet = source.fetch().await?;
        let version = self.load(sheet, source.name())?;
        info!(version, "Rate book refreshed");
        Ok(version)
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<MarketSnapshot> {
        self.current.read().clone()
    }

    /// Calculator over the current snapshot.
    pub fn calculator(&self) -> QuoteCalculator {
        self.snapshot().calculator()
    }

    /// Whether the current snapshot is older than the configured maximum.
    pub fn is_stale(&self) -> bool {
        self.snapshot().age() > self.config.max_rate_age
    }

    pub fn config(&self) -> &FxConfig {
        &self.config
    }

    /// Get book statistics.
    pub fn stats(&self) -> BookStats {
        let snapshot = self.snapshot();
        let age = snapshot.age();

        BookStats {
            version: snapshot.version,
            source: snapshot.source.clone(),
            pairs: snapshot.table.len(),
            currencies: snapshot.currencies.len(),
            age,
            stale: age > self.config.max_rate_age,
        }
    }
}

/// Refresh the book on the configured interval until shutdown.
///
/// A failed refresh keeps the previous snapshot and is retried on the next
/// tick.
pub fn spawn_refresh_loop(
    book: Arc<RateBook>,
    source: Arc<dyn RateSource>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    let interval = book.config.refresh_interval;

    tokio::spawn(async move {
        info!(
            source = source.name(),
            interval_secs = interval.as_secs(),
            "Rate refresh loop started"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("Rate refresh loop shutting down");
                    return;
                }
                _ = tokio::time::sleep(interval) => {
                    if let Err(e) = book.refresh(source.as_ref()).await {
                        warn!(error = %e, "Rate refresh failed, keeping previous table");
                    }
                }
            }
        }
    })
}
