//! Page-level controller owning one order draft.

use std::sync::Arc;

use cambio_fx::RateBook;
use tracing::{info, instrument, warn};

use crate::config::WizardConfig;
use crate::draft::{ContactInfo, LineEdit, OrderDraft, Recalculation, UserProfile, WizardStep};
use crate::error::{WizardError, WizardResult};
use crate::snapshot::SnapshotInbox;
use crate::submission::{OrderSubmission, SubmissionAdapter, SubmissionReceipt};
use crate::summary::OrderSummary;

/// Drives an [`OrderDraft`] from details to submission.
pub struct OrderWizard {
    draft: OrderDraft,
    rates: Arc<RateBook>,
    inbox: SnapshotInbox,
    submission: Arc<dyn SubmissionAdapter>,
    config: WizardConfig,
    receipt: Option<SubmissionReceipt>,
    seeded: bool,
}

impl OrderWizard {
    /// Open the wizard, consuming any pending snapshot.
    ///
    /// A valid snapshot seeds a single-line draft; anything else starts from
    /// one empty line.
    pub fn open(
        rates: Arc<RateBook>,
        inbox: SnapshotInbox,
        submission: Arc<dyn SubmissionAdapter>,
        config: WizardConfig,
    ) -> Self {
        let snapshot = inbox.take_pending_snapshot();
        let seeded = snapshot.is_some();
        let draft = match snapshot {
            Some(snapshot) => OrderDraft::with_line(snapshot.into()),
            None => OrderDraft::new(),
        };

        info!(seeded, "Order wizard opened");

        Self {
            draft,
            rates,
            inbox,
            submission,
            config,
            receipt: None,
            seeded,
        }
    }

    /// Prefill contact data from a signed-in user's profile.
    pub fn with_profile(mut self, profile: &UserProfile) -> Self {
        self.draft.prefill_contact(ContactInfo::from_profile(profile));
        self
    }

    pub fn draft(&self) -> &OrderDraft {
        &self.draft
    }

    pub fn step(&self) -> WizardStep {
        self.draft.step()
    }

    pub fn config(&self) -> &WizardConfig {
        &self.config
    }

    /// Whether the draft was seeded from a snapshot.
    pub fn was_seeded(&self) -> bool {
        self.seeded
    }

    /// Receipt of the accepted submission.
    pub fn receipt(&self) -> Option<&SubmissionReceipt> {
        self.receipt.as_ref()
    }

    pub fn add_line(&mut self) -> WizardResult<usize> {
        self.draft.add_line()
    }

    pub fn remove_line(&mut self, index: usize) -> WizardResult<()> {
        self.draft.remove_line(index).map(|_| ())
    }

    /// Edit a line against the current rate table.
    pub fn update_line(&mut self, index: usize, edit: LineEdit) -> WizardResult<Recalculation> {
        let calculator = self.rates.calculator();
        self.draft.update_line(index, edit, &calculator)
    }

    pub fn can_advance_to_contact(&self) -> bool {
        self.draft.can_advance_to_contact()
    }

    pub fn advance(&mut self) -> WizardResult<()> {
        self.draft.advance()
    }

    pub fn back(&mut self) -> WizardResult<()> {
        self.draft.back()
    }

    pub fn set_contact(&mut self, contact: ContactInfo) -> WizardResult<()> {
        self.draft.set_contact(contact)
    }

    pub fn can_submit(&self) -> bool {
        self.draft.can_submit(self.config.enforce_contact_format)
    }

    /// Totals and fee estimate for the current draft, unless a total
    /// overflows.
    pub fn summary(&self) -> Option<OrderSummary> {
        let snapshot = self.rates.snapshot();
        OrderSummary::for_draft(&self.draft, &snapshot.currencies, &self.config)
    }

    /// Hand the order to the submission adapter.
    ///
    /// On success the draft becomes submitted and the snapshot slot is
    /// cleared. On failure the draft stays in the contact step and the
    /// error is returned as is.
    #[instrument(skip(self), fields(lines = self.draft.lines().len()))]
    pub async fn submit(&mut self) -> WizardResult<SubmissionReceipt> {
        self.draft
            .check_submittable(self.config.enforce_contact_format)?;

        let order = OrderSubmission::from_draft(&self.draft)?;

        let receipt = match self.submission.submit(&order).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(error = %e, "Order submission failed");
                return Err(WizardError::Submission(e));
            }
        };

        self.draft.mark_submitted();
        if let Err(e) = self.inbox.discard() {
            warn!(error = %e, "Could not clear snapshot slot");
        }

        info!(
            order_id = %receipt.order_id,
            status = ?receipt.status,
            "Order accepted"
        );

        self.receipt = Some(receipt.clone());
        Ok(receipt)
    }

    /// Abandon the wizard and drop the draft.
    pub fn cancel(self) {
        info!(step = %self.draft.step(), "Order wizard cancelled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationFailure;
    use crate::snapshot::{DraftSnapshot, DEFAULT_SNAPSHOT_KEY};
    use crate::storage::{ClientStorage, MemoryStorage};
    use crate::submission::{LoggingSubmission, OrderStatus, SubmissionError};
    use async_trait::async_trait;
    use cambio_common::{Classify, CurrencyCode, ErrorKind, ExchangeRate};
    use cambio_fx::{FxConfig, RateSheet};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FailingSubmission {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SubmissionAdapter for FailingSubmission {
        async fn submit(
            &self,
            _order: &OrderSubmission,
        ) -> Result<SubmissionReceipt, SubmissionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(SubmissionError::Network("connection reset".to_string()))
        }
    }

    fn rates() -> Arc<RateBook> {
        let sheet = RateSheet {
            currencies: Vec::new(),
            rates: vec![ExchangeRate::new(
                CurrencyCode::usd(),
                CurrencyCode::ars(),
                dec!(950),
            )],
        };
        Arc::new(RateBook::from_sheet(FxConfig::default(), sheet, "test").unwrap())
    }

    fn open_with(
        storage: Arc<MemoryStorage>,
        submission: Arc<dyn SubmissionAdapter>,
    ) -> OrderWizard {
        OrderWizard::open(
            rates(),
            SnapshotInbox::new(storage),
            submission,
            WizardConfig::default(),
        )
    }

    fn set_pair(wizard: &mut OrderWizard, index: usize, amount: Decimal) {
        wizard
            .update_line(index, LineEdit::FromCurrency(Some(CurrencyCode::usd())))
            .unwrap();
        wizard
            .update_line(index, LineEdit::ToCurrency(Some(CurrencyCode::ars())))
            .unwrap();
        wizard.update_line(index, LineEdit::FromAmount(amount)).unwrap();
    }

    fn ready_for_contact(wizard: &mut OrderWizard) {
        wizard
            .update_line(0, LineEdit::FromCurrency(Some(CurrencyCode::usd())))
            .unwrap();
        wizard
            .update_line(0, LineEdit::ToCurrency(Some(CurrencyCode::ars())))
            .unwrap();
        wizard.update_line(0, LineEdit::FromAmount(dec!(100))).unwrap();
        wizard.advance().unwrap();
    }

    #[test]
    fn test_open_seeds_from_snapshot() {
        let storage = Arc::new(MemoryStorage::new());
        let inbox = SnapshotInbox::new(storage.clone());
        inbox
            .post(&DraftSnapshot::new(
                CurrencyCode::usd(),
                CurrencyCode::ars(),
                dec!(100),
                dec!(95000),
            ))
            .unwrap();

        let wizard = open_with(storage.clone(), Arc::new(LoggingSubmission));

        assert!(wizard.was_seeded());
        assert_eq!(wizard.draft().lines().len(), 1);
        assert_eq!(wizard.draft().lines()[0].to_amount, dec!(95000));
        assert!(wizard.can_advance_to_contact());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_open_with_malformed_snapshot() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .set(
                DEFAULT_SNAPSHOT_KEY,
                r#"{"fromCurrency":"USD","toCurrency":"ARS","fromAmount":100}"#,
            )
            .unwrap();

        let wizard = open_with(storage.clone(), Arc::new(LoggingSubmission));

        assert!(!wizard.was_seeded());
        assert_eq!(wizard.draft(), &OrderDraft::new());
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_full_flow() {
        let storage = Arc::new(MemoryStorage::new());
        let mut wizard = open_with(storage, Arc::new(LoggingSubmission));

        ready_for_contact(&mut wizard);
        assert_eq!(wizard.draft().lines()[0].to_amount.to_string(), "95000.00");
        assert_eq!(wizard.step(), WizardStep::Contact);

        assert!(!wizard.can_submit());
        wizard
            .set_contact(ContactInfo::default().with_whatsapp("+5491122334455"))
            .unwrap();
        assert!(wizard.can_submit());

        let receipt = wizard.submit().await.unwrap();

        assert_eq!(receipt.status, OrderStatus::New);
        assert_eq!(wizard.step(), WizardStep::Submitted);
        assert_eq!(wizard.receipt(), Some(&receipt));
        assert!(matches!(wizard.back(), Err(WizardError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_submit_blocked_by_missing_contact() {
        let storage = Arc::new(MemoryStorage::new());
        let mut wizard = open_with(storage, Arc::new(LoggingSubmission));
        ready_for_contact(&mut wizard);

        let err = wizard.submit().await.unwrap_err();

        match err {
            WizardError::ValidationFailed(failure) => {
                assert!(matches!(failure, ValidationFailure::Contact(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(wizard.step(), WizardStep::Contact);
    }

    #[tokio::test]
    async fn test_submit_from_details_is_invalid() {
        let storage = Arc::new(MemoryStorage::new());
        let mut wizard = open_with(storage, Arc::new(LoggingSubmission));

        let err = wizard.submit().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    }

    #[tokio::test]
    async fn test_failed_submission_stays_in_contact() {
        let storage = Arc::new(MemoryStorage::new());
        let adapter = Arc::new(FailingSubmission::default());
        let mut wizard = open_with(storage.clone(), adapter.clone());
        ready_for_contact(&mut wizard);
        wizard
            .set_contact(ContactInfo::default().with_telegram("@cambio_desk"))
            .unwrap();
        storage.set(DEFAULT_SNAPSHOT_KEY, "{}").unwrap();

        let err = wizard.submit().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Network);
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 1);
        assert_eq!(wizard.step(), WizardStep::Contact);
        assert!(wizard.receipt().is_none());
        assert!(!storage.is_empty());
    }

    #[tokio::test]
    async fn test_submit_clears_snapshot_slot() {
        let storage = Arc::new(MemoryStorage::new());
        let mut wizard = open_with(storage.clone(), Arc::new(LoggingSubmission));
        ready_for_contact(&mut wizard);
        wizard
            .set_contact(ContactInfo::default().with_telegram("@cambio_desk"))
            .unwrap();
        storage.set(DEFAULT_SNAPSHOT_KEY, "{}").unwrap();

        wizard.submit().await.unwrap();

        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_overflowing_order_never_reaches_adapter() {
        let storage = Arc::new(MemoryStorage::new());
        let adapter = Arc::new(FailingSubmission::default());
        let mut wizard = open_with(storage, adapter.clone());
        let huge = Decimal::MAX / dec!(2) + Decimal::ONE;

        set_pair(&mut wizard, 0, huge);
        wizard.add_line().unwrap();
        set_pair(&mut wizard, 1, huge);

        assert!(!wizard.can_advance_to_contact());
        assert!(wizard.summary().is_none());
        let err = wizard.advance().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);

        wizard
            .set_contact(ContactInfo::default().with_telegram("@cambio_desk"))
            .unwrap();
        let err = wizard.submit().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 0);
        assert_eq!(wizard.step(), WizardStep::Details);
    }

    #[test]
    fn test_profile_prefill_and_summary() {
        let storage = Arc::new(MemoryStorage::new());
        let profile = UserProfile {
            whatsapp: None,
            telegram: Some("@cambio_desk".to_string()),
            preferred_delivery_address: Some("Florida 100".to_string()),
        };

        let mut wizard = open_with(storage, Arc::new(LoggingSubmission)).with_profile(&profile);
        ready_for_contact(&mut wizard);

        assert!(wizard.can_submit());
        let summary = wizard.summary().unwrap();
        let usd = summary.currency(&CurrencyCode::usd()).unwrap();
        assert_eq!(usd.service_fee, dec!(1.50));
        assert_eq!(usd.delivery_fee, dec!(3.00));
        wizard.cancel();
    }
}
