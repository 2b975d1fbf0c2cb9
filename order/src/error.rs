//! Wizard error types.

use std::fmt;

use cambio_common::{Classify, ErrorKind};
use serde::Serialize;
use thiserror::Error;

use crate::draft::WizardStep;
use crate::submission::SubmissionError;

/// Why a single line blocks the details step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LineProblem {
    MissingFromCurrency,
    MissingToCurrency,
    SameCurrency,
    NonPositiveAmount,
    /// Adding the line overflows the order total.
    TotalTooLarge,
}

impl fmt::Display for LineProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LineProblem::MissingFromCurrency => "source currency not selected",
            LineProblem::MissingToCurrency => "target currency not selected",
            LineProblem::SameCurrency => "source and target currency are the same",
            LineProblem::NonPositiveAmount => "amount must be greater than zero",
            LineProblem::TotalTooLarge => "amount too large for the order total",
        };
        f.write_str(text)
    }
}

/// Problems found on one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineIssue {
    pub index: usize,
    pub problems: Vec<LineProblem>,
}

/// Contact field that blocks submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ContactField {
    /// Neither WhatsApp nor Telegram was given.
    Channel,
    /// Delivery was requested without an address.
    Address,
    /// WhatsApp number is not in international format.
    Whatsapp,
    /// Telegram username is malformed.
    Telegram,
    /// Comment is too long.
    Comment,
}

impl fmt::Display for ContactField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ContactField::Channel => "whatsapp or telegram required",
            ContactField::Address => "delivery address required",
            ContactField::Whatsapp => "invalid whatsapp number",
            ContactField::Telegram => "invalid telegram username",
            ContactField::Comment => "comment too long",
        };
        f.write_str(text)
    }
}

/// Field-level detail of a blocked transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", content = "issues", rename_all = "camelCase")]
pub enum ValidationFailure {
    Lines(Vec<LineIssue>),
    Contact(Vec<ContactField>),
}

impl ValidationFailure {
    /// Indices of the failing lines.
    pub fn line_indices(&self) -> Vec<usize> {
        match self {
            ValidationFailure::Lines(issues) => issues.iter().map(|i| i.index).collect(),
            ValidationFailure::Contact(_) => Vec::new(),
        }
    }

    /// Contact fields that failed.
    pub fn contact_fields(&self) -> &[ContactField] {
        match self {
            ValidationFailure::Contact(fields) => fields,
            ValidationFailure::Lines(_) => &[],
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationFailure::Lines(issues) => {
                let parts: Vec<String> = issues
                    .iter()
                    .map(|issue| {
                        let problems: Vec<String> =
                            issue.problems.iter().map(ToString::to_string).collect();
                        format!("line {}: {}", issue.index, problems.join(", "))
                    })
                    .collect();
                write!(f, "{}", parts.join("; "))
            }
            ValidationFailure::Contact(fields) => {
                let parts: Vec<String> = fields.iter().map(ToString::to_string).collect();
                write!(f, "{}", parts.join(", "))
            }
        }
    }
}

/// Errors raised by the order wizard.
#[derive(Debug, Error)]
pub enum WizardError {
    /// A transition was blocked by missing or malformed input.
    #[error("Validation failed: {0}")]
    ValidationFailed(ValidationFailure),

    /// The call would break a draft invariant. The draft is unchanged.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// The operation is not allowed in the current step.
    #[error("Cannot {operation} in step {step}")]
    InvalidTransition {
        operation: &'static str,
        step: WizardStep,
    },

    /// The submission adapter failed. Reported once, never retried.
    #[error("Submission failed: {0}")]
    Submission(#[from] SubmissionError),
}

impl Classify for WizardError {
    fn kind(&self) -> ErrorKind {
        match self {
            WizardError::ValidationFailed(_) => ErrorKind::ValidationFailed,
            WizardError::InvariantViolation(_) => ErrorKind::InvariantViolation,
            WizardError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            WizardError::Submission(e) => e.kind(),
        }
    }
}

/// Result type for wizard operations.
pub type WizardResult<T> = Result<T, WizardError>;
