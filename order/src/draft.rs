//! Order draft state machine.

use std::fmt;
use std::sync::OnceLock;

use cambio_common::{CurrencyCode, CurrencyPair};
use cambio_fx::{QuoteCalculator, QuoteUnavailable};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{
    ContactField, LineIssue, LineProblem, ValidationFailure, WizardError, WizardResult,
};

/// Longest comment accepted when contact format is enforced.
pub const MAX_COMMENT_CHARS: usize = 500;

const WHATSAPP_PATTERN: &str = r"^\+?[1-9]\d{1,14}$";
const TELEGRAM_PATTERN: &str = r"^@?[a-zA-Z0-9_]{5,32}$";

/// Wizard step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    /// Choosing pairs and amounts.
    #[default]
    Details,
    /// Entering contact and delivery data.
    Contact,
    /// Handed to the submission adapter. Terminal.
    Submitted,
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WizardStep::Details => "details",
            WizardStep::Contact => "contact",
            WizardStep::Submitted => "submitted",
        };
        f.write_str(name)
    }
}

/// One currency pair row of an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangePairLine {
    pub from_currency: Option<CurrencyCode>,
    pub to_currency: Option<CurrencyCode>,
    #[serde(default)]
    pub from_amount: Decimal,
    #[serde(default)]
    pub to_amount: Decimal,
}

impl ExchangePairLine {
    /// Create a line with both currencies selected.
    pub fn new(from: CurrencyCode, to: CurrencyCode, from_amount: Decimal) -> Self {
        Self {
            from_currency: Some(from),
            to_currency: Some(to),
            from_amount,
            to_amount: Decimal::ZERO,
        }
    }

    /// The selected pair, once both sides are set.
    pub fn pair(&self) -> Option<CurrencyPair> {
        match (&self.from_currency, &self.to_currency) {
            (Some(from), Some(to)) => Some(CurrencyPair::new(from.clone(), to.clone())),
            _ => None,
        }
    }

    /// Everything that keeps this line from advancing.
    pub fn problems(&self) -> Vec<LineProblem> {
        let mut problems = Vec::new();

        if self.from_currency.is_none() {
            problems.push(LineProblem::MissingFromCurrency);
        }
        if self.to_currency.is_none() {
            problems.push(LineProblem::MissingToCurrency);
        }
        if self.from_currency.is_some() && self.from_currency == self.to_currency {
            problems.push(LineProblem::SameCurrency);
        }
        if self.from_amount <= Decimal::ZERO {
            problems.push(LineProblem::NonPositiveAmount);
        }

        problems
    }

    pub fn is_complete(&self) -> bool {
        self.problems().is_empty()
    }
}

/// A single field change on a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum LineEdit {
    FromCurrency(Option<CurrencyCode>),
    ToCurrency(Option<CurrencyCode>),
    FromAmount(Decimal),
    ToAmount(Decimal),
}

impl LineEdit {
    fn field(&self) -> &'static str {
        match self {
            LineEdit::FromCurrency(_) => "fromCurrency",
            LineEdit::ToCurrency(_) => "toCurrency",
            LineEdit::FromAmount(_) => "fromAmount",
            LineEdit::ToAmount(_) => "toAmount",
        }
    }
}

/// Outcome of recomputing the paired amount after an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recalculation {
    /// The paired amount was rewritten.
    Updated(Decimal),
    /// At least one currency is unset, so nothing ran.
    Skipped,
    /// The calculator had no answer; the paired amount kept its value.
    Unavailable(QuoteUnavailable),
}

/// Profile data used to prefill the contact step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub whatsapp: Option<String>,
    pub telegram: Option<String>,
    pub preferred_delivery_address: Option<String>,
}

/// Contact and delivery metadata of an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    pub whatsapp: Option<String>,
    pub telegram: Option<String>,
    #[serde(default)]
    pub delivery: bool,
    pub address: Option<String>,
    pub comment: Option<String>,
}

fn filled(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ContactInfo {
    /// Prefill from a signed-in user's profile.
    pub fn from_profile(profile: &UserProfile) -> Self {
        let address = filled(&profile.preferred_delivery_address).map(str::to_string);

        Self {
            whatsapp: filled(&profile.whatsapp).map(str::to_string),
            telegram: filled(&profile.telegram).map(str::to_string),
            delivery: address.is_some(),
            address,
            comment: None,
        }
    }

    pub fn with_whatsapp(mut self, whatsapp: impl Into<String>) -> Self {
        self.whatsapp = Some(whatsapp.into());
        self
    }

    pub fn with_telegram(mut self, telegram: impl Into<String>) -> Self {
        self.telegram = Some(telegram.into());
        self
    }

    /// Request delivery to an address.
    pub fn with_delivery(mut self, address: impl Into<String>) -> Self {
        self.delivery = true;
        self.address = Some(address.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// WhatsApp or Telegram is present.
    pub fn has_channel(&self) -> bool {
        filled(&self.whatsapp).is_some() || filled(&self.telegram).is_some()
    }

    /// Missing required fields. Empty means submittable.
    pub fn missing_fields(&self) -> Vec<ContactField> {
        let mut missing = Vec::new();

        if !self.has_channel() {
            missing.push(ContactField::Channel);
        }
        if self.delivery && filled(&self.address).is_none() {
            missing.push(ContactField::Address);
        }

        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Fields present but not in the accepted format.
    pub fn format_issues(&self) -> Vec<ContactField> {
        let Some(rules) = contact_rules() else {
            warn!("Contact format rules unavailable, skipping format checks");
            return Vec::new();
        };

        let mut issues = Vec::new();

        if let Some(whatsapp) = filled(&self.whatsapp) {
            if !rules.whatsapp.is_match(whatsapp) {
                issues.push(ContactField::Whatsapp);
            }
        }
        if let Some(telegram) = filled(&self.telegram) {
            if !rules.telegram.is_match(telegram) {
                issues.push(ContactField::Telegram);
            }
        }
        if let Some(comment) = &self.comment {
            if comment.chars().count() > MAX_COMMENT_CHARS {
                issues.push(ContactField::Comment);
            }
        }

        issues
    }
}

struct ContactRules {
    whatsapp: Regex,
    telegram: Regex,
}

fn contact_rules() -> Option<&'static ContactRules> {
    static RULES: OnceLock<Option<ContactRules>> = OnceLock::new();

    RULES
        .get_or_init(|| {
            Some(ContactRules {
                whatsapp: Regex::new(WHATSAPP_PATTERN).ok()?,
                telegram: Regex::new(TELEGRAM_PATTERN).ok()?,
            })
        })
        .as_ref()
}

/// An in-progress exchange order.
///
/// Always holds at least one line. Line edits are only accepted in the
/// details step; contact edits until submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    lines: Vec<ExchangePairLine>,
    step: WizardStep,
    contact: ContactInfo,
}

impl Default for OrderDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderDraft {
    /// Create a draft with one empty line.
    pub fn new() -> Self {
        Self::with_line(ExchangePairLine::default())
    }

    /// Create a draft seeded with one line.
    pub fn with_line(line: ExchangePairLine) -> Self {
        Self {
            lines: vec![line],
            step: WizardStep::Details,
            contact: ContactInfo::default(),
        }
    }

    pub fn lines(&self) -> &[ExchangePairLine] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> Option<&ExchangePairLine> {
        self.lines.get(index)
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    fn require_step(&self, step: WizardStep, operation: &'static str) -> WizardResult<()> {
        if self.step != step {
            return Err(WizardError::InvalidTransition {
                operation,
                step: self.step,
            });
        }
        Ok(())
    }

    /// Append an empty line.
    pub fn add_line(&mut self) -> WizardResult<usize> {
        self.require_step(WizardStep::Details, "add a line")?;

        self.lines.push(ExchangePairLine::default());
        debug!(lines = self.lines.len(), "Line added");
        Ok(self.lines.len() - 1)
    }

    /// Remove a line. The last remaining line cannot be removed.
    pub fn remove_line(&mut self, index: usize) -> WizardResult<ExchangePairLine> {
        self.require_step(WizardStep::Details, "remove a line")?;

        if index >= self.lines.len() {
            return Err(WizardError::InvariantViolation(format!(
                "line {} does not exist, draft has {}",
                index,
                self.lines.len()
            )));
        }
        if self.lines.len() == 1 {
            return Err(WizardError::InvariantViolation(
                "cannot remove the last line".to_string(),
            ));
        }

        let removed = self.lines.remove(index);
        debug!(index, lines = self.lines.len(), "Line removed");
        Ok(removed)
    }

    /// Apply an edit and recompute the paired amount.
    ///
    /// Currency and source amount edits recompute the target amount; target
    /// amount edits recompute the source amount. An unavailable quote leaves
    /// the paired amount as it was.
    pub fn update_line(
        &mut self,
        index: usize,
        edit: LineEdit,
        calculator: &QuoteCalculator,
    ) -> WizardResult<Recalculation> {
        self.require_step(WizardStep::Details, "edit a line")?;

        let line_count = self.lines.len();
        let line = self.lines.get_mut(index).ok_or_else(|| {
            WizardError::InvariantViolation(format!(
                "line {} does not exist, draft has {}",
                index, line_count
            ))
        })?;

        let field = edit.field();
        let backward = matches!(edit, LineEdit::ToAmount(_));

        match edit {
            LineEdit::FromCurrency(code) => line.from_currency = code,
            LineEdit::ToCurrency(code) => line.to_currency = code,
            LineEdit::FromAmount(amount) => line.from_amount = amount,
            LineEdit::ToAmount(amount) => line.to_amount = amount,
        }

        let (Some(from), Some(to)) = (&line.from_currency, &line.to_currency) else {
            return Ok(Recalculation::Skipped);
        };

        let result = if backward {
            calculator.from_amount_from(from, to, line.to_amount)
        } else {
            calculator.to_amount_from(from, to, line.from_amount)
        };

        match result {
            Ok(amount) => {
                if backward {
                    line.from_amount = amount;
                } else {
                    line.to_amount = amount;
                }
                debug!(index, field, amount = %amount, "Paired amount recomputed");
                Ok(Recalculation::Updated(amount))
            }
            Err(reason) => {
                debug!(index, field, reason = %reason, "Quote unavailable, paired amount kept");
                Ok(Recalculation::Unavailable(reason))
            }
        }
    }

    /// Per-line problems blocking the details step.
    pub fn line_issues(&self) -> Vec<LineIssue> {
        let mut total = Some(Decimal::ZERO);

        self.lines
            .iter()
            .enumerate()
            .filter_map(|(index, line)| {
                let mut problems = line.problems();
                if let Some(sum) = total {
                    total = sum.checked_add(line.from_amount);
                    if total.is_none() {
                        problems.push(LineProblem::TotalTooLarge);
                    }
                }
                (!problems.is_empty()).then_some(LineIssue { index, problems })
            })
            .collect()
    }

    pub fn can_advance_to_contact(&self) -> bool {
        self.line_issues().is_empty()
    }

    /// Move from details to contact.
    pub fn advance(&mut self) -> WizardResult<()> {
        self.require_step(WizardStep::Details, "advance")?;

        let issues = self.line_issues();
        if !issues.is_empty() {
            return Err(WizardError::ValidationFailed(ValidationFailure::Lines(issues)));
        }

        self.step = WizardStep::Contact;
        info!(lines = self.lines.len(), "Draft advanced to contact step");
        Ok(())
    }

    /// Return from contact to details, keeping every line.
    pub fn back(&mut self) -> WizardResult<()> {
        self.require_step(WizardStep::Contact, "go back")?;

        self.step = WizardStep::Details;
        info!("Draft returned to details step");
        Ok(())
    }

    /// Replace the contact data.
    pub fn set_contact(&mut self, contact: ContactInfo) -> WizardResult<()> {
        if self.step == WizardStep::Submitted {
            return Err(WizardError::InvalidTransition {
                operation: "edit contact",
                step: self.step,
            });
        }
        self.contact = contact;
        Ok(())
    }

    /// Contact fields blocking submission.
    pub fn contact_issues(&self, enforce_format: bool) -> Vec<ContactField> {
        let mut issues = self.contact.missing_fields();
        if enforce_format {
            issues.extend(self.contact.format_issues());
        }
        issues
    }

    pub fn can_submit(&self, enforce_format: bool) -> bool {
        self.contact_issues(enforce_format).is_empty()
    }

    /// Check the draft is ready to hand over.
    pub fn check_submittable(&self, enforce_format: bool) -> WizardResult<()> {
        self.require_step(WizardStep::Contact, "submit")?;

        let issues = self.contact_issues(enforce_format);
        if !issues.is_empty() {
            return Err(WizardError::ValidationFailed(ValidationFailure::Contact(issues)));
        }
        Ok(())
    }

    /// Contact prefill before the user edits anything.
    pub(crate) fn prefill_contact(&mut self, contact: ContactInfo) {
        self.contact = contact;
    }

    pub(crate) fn mark_submitted(&mut self) {
        self.step = WizardStep::Submitted;
    }
}
