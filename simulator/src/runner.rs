//! Session runner.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use cambio_common::Classify;
use cambio_fx::RateBook;
use cambio_order::{
    ClientStorage, LoggingSubmission, OrderSubmission, OrderWizard, SnapshotInbox,
    SubmissionAdapter, SubmissionError, SubmissionReceipt, WizardConfig, WizardError, WizardStep,
};
use tracing::{info, warn};

use crate::metrics::SessionMetrics;
use crate::script::{Expectation, SessionScript, SessionStep};

/// Backend stand-in that can be switched offline.
#[derive(Default)]
pub struct SimulatedBackend {
    offline: AtomicBool,
}

impl SimulatedBackend {
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl SubmissionAdapter for SimulatedBackend {
    async fn submit(&self, order: &OrderSubmission) -> Result<SubmissionReceipt, SubmissionError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(SubmissionError::Network("backend offline".to_string()));
        }
        LoggingSubmission.submit(order).await
    }
}

/// Result of a finished session.
#[derive(Debug)]
pub struct SessionReport {
    pub name: String,
    pub final_step: WizardStep,
    pub receipt: Option<SubmissionReceipt>,
    pub metrics: SessionMetrics,
}

impl SessionReport {
    pub fn passed(&self) -> bool {
        self.metrics.expectations_failed == 0
    }
}

/// Replays session scripts against a fresh wizard.
pub struct SessionRunner {
    rates: Arc<RateBook>,
    storage: Arc<dyn ClientStorage>,
    config: WizardConfig,
}

impl SessionRunner {
    /// Create a new session runner.
    pub fn new(rates: Arc<RateBook>, storage: Arc<dyn ClientStorage>, config: WizardConfig) -> Self {
        Self {
            rates,
            storage,
            config,
        }
    }

    /// Run a script to completion.
    pub async fn run(&self, script: &SessionScript) -> anyhow::Result<SessionReport> {
        info!("Running session: {} - {}", script.name, script.description);

        let inbox = SnapshotInbox::with_key(self.storage.clone(), self.config.snapshot_key.clone());
        if let Some(snapshot) = &script.snapshot {
            inbox.post(snapshot)?;
        }
        if let Some(raw) = &script.raw_snapshot {
            self.storage.set(inbox.key(), raw)?;
        }

        let backend = Arc::new(SimulatedBackend::default());
        let mut wizard =
            OrderWizard::open(self.rates.clone(), inbox, backend.clone(), self.config.clone());
        if let Some(profile) = &script.profile {
            wizard = wizard.with_profile(profile);
        }

        let mut metrics = SessionMetrics::new();
        let mut last_error: Option<&'static str> = None;

        for (index, step) in script.steps.iter().enumerate() {
            metrics.record_step();

            if let SessionStep::Expect { condition } = step {
                let passed = Self::check(&wizard, condition, last_error);
                if !passed {
                    warn!(step = index, condition = ?condition, "Expectation failed");
                }
                metrics.record_expectation(passed);
                continue;
            }

            let result = self.execute_step(&mut wizard, &backend, step, &mut metrics).await;
            last_error = match result {
                Ok(()) => None,
                Err(e) => {
                    info!(step = index, error = %e, "Step rejected");
                    metrics.record_error(&e);
                    Some(e.error_code())
                }
            };
        }

        Ok(SessionReport {
            name: script.name.clone(),
            final_step: wizard.step(),
            receipt: wizard.receipt().cloned(),
            metrics,
        })
    }

    /// Execute a single session step.
    async fn execute_step(
        &self,
        wizard: &mut OrderWizard,
        backend: &SimulatedBackend,
        step: &SessionStep,
        metrics: &mut SessionMetrics,
    ) -> Result<(), WizardError> {
        match step {
            SessionStep::AddLine => {
                wizard.add_line()?;
            }
            SessionStep::RemoveLine { line } => wizard.remove_line(*line)?,
            SessionStep::Edit { line, edit } => {
                let outcome = wizard.update_line(*line, edit.clone())?;
                metrics.record_recalculation(&outcome);
            }
            SessionStep::Advance => wizard.advance()?,
            SessionStep::Back => wizard.back()?,
            SessionStep::Contact { contact } => wizard.set_contact(contact.clone())?,
            SessionStep::Submit => {
                let receipt = wizard.submit().await?;
                info!(order_id = %receipt.order_id, "Session order accepted");
                metrics.record_submission();
            }
            SessionStep::GoOffline => {
                info!("Backend going offline");
                backend.set_offline(true);
            }
            SessionStep::GoOnline => {
                info!("Backend back online");
                backend.set_offline(false);
            }
            SessionStep::Expect { .. } => {}
        }

        Ok(())
    }

    fn check(wizard: &OrderWizard, condition: &Expectation, last_error: Option<&str>) -> bool {
        match condition {
            Expectation::Step(step) => wizard.step() == *step,
            Expectation::CanAdvance(expected) => wizard.can_advance_to_contact() == *expected,
            Expectation::CanSubmit(expected) => wizard.can_submit() == *expected,
            Expectation::LineCount(count) => wizard.draft().lines().len() == *count,
            Expectation::Line {
                line,
                from_amount,
                to_amount,
            } => match wizard.draft().line(*line) {
                Some(actual) => {
                    from_amount.map_or(true, |a| a == actual.from_amount)
                        && to_amount.map_or(true, |a| a == actual.to_amount)
                }
                None => false,
            },
            Expectation::LastError(code) => code.as_deref() == last_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cambio_fx::{FxConfig, RateSheet};
    use cambio_order::{MemoryStorage, OrderStatus};

    fn runner() -> SessionRunner {
        let book =
            RateBook::from_sheet(FxConfig::default(), RateSheet::storefront(), "storefront").unwrap();
        SessionRunner::new(
            Arc::new(book),
            Arc::new(MemoryStorage::new()),
            WizardConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_builtin_sessions_pass() {
        let runner = runner();

        for name in ["storefront-order", "snapshot-handoff", "offline-backend"] {
            let script = SessionScript::load(name).unwrap();
            let report = runner.run(&script).await.unwrap();

            assert!(report.passed(), "{name} failed: {:?}", report.metrics);
            assert_eq!(report.final_step, WizardStep::Submitted);
            assert_eq!(report.receipt.map(|r| r.status), Some(OrderStatus::New));
        }
    }

    #[tokio::test]
    async fn test_failed_expectation_is_reported() {
        let script: SessionScript = serde_json::from_str(
            r#"{
                "name": "wrong",
                "steps": [
                    {"action": "remove_line", "line": 0},
                    {"action": "expect", "condition": {"last_error": "INVARIANT_VIOLATION"}},
                    {"action": "expect", "condition": {"step": "contact"}}
                ]
            }"#,
        )
        .unwrap();

        let report = runner().run(&script).await.unwrap();

        assert!(!report.passed());
        assert_eq!(report.metrics.expectations_passed, 1);
        assert_eq!(report.metrics.errors("INVARIANT_VIOLATION"), 1);
    }
}
