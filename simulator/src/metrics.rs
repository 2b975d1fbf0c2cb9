//! Session metrics.

use std::collections::BTreeMap;

use cambio_common::Classify;
use cambio_order::{Recalculation, WizardError};

/// Session metrics.
#[derive(Debug, Clone, Default)]
pub struct SessionMetrics {
    /// Steps executed.
    pub steps: u64,
    /// Edits that rewrote the paired amount.
    pub recalculated: u64,
    /// Edits where the calculator had no answer.
    pub unavailable: u64,
    /// Submissions accepted by the backend.
    pub submitted: u64,
    /// Expectations that held.
    pub expectations_passed: u64,
    /// Expectations that did not hold.
    pub expectations_failed: u64,
    /// Rejected operations by error code.
    errors: BTreeMap<&'static str, u64>,
}

impl SessionMetrics {
    /// Create new metrics.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_step(&mut self) {
        self.steps += 1;
    }

    pub fn record_recalculation(&mut self, outcome: &Recalculation) {
        match outcome {
            Recalculation::Updated(_) => self.recalculated += 1,
            Recalculation::Unavailable(_) => self.unavailable += 1,
            Recalculation::Skipped => {}
        }
    }

    pub fn record_error(&mut self, error: &WizardError) {
        *self.errors.entry(error.error_code()).or_default() += 1;
    }

    pub fn record_submission(&mut self) {
        self.submitted += 1;
    }

    pub fn record_expectation(&mut self, passed: bool) {
        if passed {
            self.expectations_passed += 1;
        } else {
            self.expectations_failed += 1;
        }
    }

    /// Count of rejected operations with a given code.
    pub fn errors(&self, code: &str) -> u64 {
        self.errors.get(code).copied().unwrap_or(0)
    }

    /// Every error code seen, with counts.
    pub fn error_counts(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        self.errors.iter().map(|(code, count)| (*code, *count))
    }

    /// Share of expectations that held.
    pub fn pass_rate(&self) -> f64 {
        let total = self.expectations_passed + self.expectations_failed;
        if total == 0 {
            return 1.0;
        }

        self.expectations_passed as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cambio_fx::QuoteUnavailable;
    use rust_decimal::Decimal;

    #[test]
    fn test_metrics() {
        let mut metrics = SessionMetrics::new();

        metrics.record_recalculation(&Recalculation::Updated(Decimal::ONE));
        metrics.record_recalculation(&Recalculation::Unavailable(
            QuoteUnavailable::MissingCurrency,
        ));
        metrics.record_recalculation(&Recalculation::Skipped);
        metrics.record_error(&WizardError::InvariantViolation("last line".to_string()));
        metrics.record_expectation(true);
        metrics.record_expectation(true);
        metrics.record_expectation(true);
        metrics.record_expectation(false);

        assert_eq!(metrics.recalculated, 1);
        assert_eq!(metrics.unavailable, 1);
        assert_eq!(metrics.errors("INVARIANT_VIOLATION"), 1);
        assert_eq!(metrics.errors("NETWORK_ERROR"), 0);
        assert_eq!(metrics.pass_rate(), 0.75);
    }
}
