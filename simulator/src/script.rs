//! Scripted wizard sessions.

use std::path::Path;

use cambio_common::CurrencyCode;
use cambio_order::{ContactInfo, DraftSnapshot, LineEdit, UserProfile, WizardStep};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A scripted wizard session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionScript {
    /// Script name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Snapshot posted by the storefront calculator before the wizard opens.
    #[serde(default)]
    pub snapshot: Option<DraftSnapshot>,
    /// Raw slot content, for replaying malformed handoffs.
    #[serde(default)]
    pub raw_snapshot: Option<String>,
    /// Signed-in user's profile.
    #[serde(default)]
    pub profile: Option<UserProfile>,
    /// Steps in the session.
    pub steps: Vec<SessionStep>,
}

/// A step in a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SessionStep {
    AddLine,
    RemoveLine { line: usize },
    Edit { line: usize, edit: LineEdit },
    Advance,
    Back,
    Contact { contact: ContactInfo },
    Submit,
    /// Backend stops accepting orders.
    GoOffline,
    /// Backend accepts orders again.
    GoOnline,
    Expect { condition: Expectation },
}

/// Conditions that can be asserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    Step(WizardStep),
    CanAdvance(bool),
    CanSubmit(bool),
    LineCount(usize),
    Line {
        line: usize,
        #[serde(default)]
        from_amount: Option<Decimal>,
        #[serde(default)]
        to_amount: Option<Decimal>,
    },
    /// Error code of the previous step, such as `VALIDATION_FAILED`.
    LastError(Option<String>),
}

impl SessionScript {
    /// Load a built-in script by name, or a JSON script from disk.
    pub fn load(name: &str) -> anyhow::Result<Self> {
        match name {
            "storefront-order" => Ok(Self::storefront_order()),
            "snapshot-handoff" => Ok(Self::snapshot_handoff()),
            "offline-backend" => Ok(Self::offline_backend()),
            path if Path::new(path).exists() => {
                let json = std::fs::read_to_string(path)?;
                Ok(serde_json::from_str(&json)?)
            }
            _ => Err(anyhow::anyhow!("Unknown session script: {}", name)),
        }
    }

    fn edit(line: usize, edit: LineEdit) -> SessionStep {
        SessionStep::Edit { line, edit }
    }

    fn expect(condition: Expectation) -> SessionStep {
        SessionStep::Expect { condition }
    }

    /// Two-line order typed from scratch.
    fn storefront_order() -> Self {
        Self {
            name: "storefront-order".to_string(),
            description: "Two pairs into pesos, WhatsApp contact".to_string(),
            snapshot: None,
            raw_snapshot: None,
            profile: None,
            steps: vec![
                Self::edit(0, LineEdit::FromCurrency(Some(CurrencyCode::usd()))),
                Self::edit(0, LineEdit::ToCurrency(Some(CurrencyCode::ars()))),
                Self::edit(0, LineEdit::FromAmount(Decimal::new(100, 0))),
                Self::expect(Expectation::Line {
                    line: 0,
                    from_amount: None,
                    to_amount: Some(Decimal::new(127000, 0)),
                }),
                SessionStep::AddLine,
                Self::expect(Expectation::CanAdvance(false)),
                Self::edit(1, LineEdit::FromCurrency(Some(CurrencyCode::eur()))),
                Self::edit(1, LineEdit::ToCurrency(Some(CurrencyCode::ars()))),
                Self::edit(1, LineEdit::ToAmount(Decimal::new(804000, 0))),
                Self::expect(Expectation::Line {
                    line: 1,
                    from_amount: Some(Decimal::new(600, 0)),
                    to_amount: None,
                }),
                SessionStep::Advance,
                Self::expect(Expectation::Step(WizardStep::Contact)),
                Self::expect(Expectation::CanSubmit(false)),
                SessionStep::Contact {
                    contact: ContactInfo::default().with_whatsapp("+5491122334455"),
                },
                SessionStep::Submit,
                Self::expect(Expectation::Step(WizardStep::Submitted)),
            ],
        }
    }

    /// Draft started from the storefront calculator.
    fn snapshot_handoff() -> Self {
        Self {
            name: "snapshot-handoff".to_string(),
            description: "Seeded draft, delivery without address then fixed".to_string(),
            snapshot: Some(
                DraftSnapshot::new(
                    CurrencyCode::usdt(),
                    CurrencyCode::ars(),
                    Decimal::new(200, 0),
                    Decimal::new(250000, 0),
                )
                .with_rate(Decimal::new(1250, 0)),
            ),
            raw_snapshot: None,
            profile: None,
            steps: vec![
                Self::expect(Expectation::LineCount(1)),
                Self::expect(Expectation::CanAdvance(true)),
                SessionStep::Advance,
                SessionStep::Contact {
                    contact: ContactInfo {
                        telegram: Some("@cambio_desk".to_string()),
                        delivery: true,
                        ..Default::default()
                    },
                },
                SessionStep::Submit,
                Self::expect(Expectation::LastError(Some("VALIDATION_FAILED".to_string()))),
                SessionStep::Contact {
                    contact: ContactInfo::default()
                        .with_telegram("@cambio_desk")
                        .with_delivery("Av. Corrientes 1234"),
                },
                SessionStep::Submit,
                Self::expect(Expectation::Step(WizardStep::Submitted)),
            ],
        }
    }

    /// Backend outage during submission.
    fn offline_backend() -> Self {
        Self {
            name: "offline-backend".to_string(),
            description: "Submission fails once, draft kept, retried by the user".to_string(),
            snapshot: None,
            raw_snapshot: Some(r#"{"fromCurrency":"USD","toCurrency":"ARS"}"#.to_string()),
            profile: Some(UserProfile {
                whatsapp: Some("+5491122334455".to_string()),
                telegram: None,
                preferred_delivery_address: None,
            }),
            steps: vec![
                Self::expect(Expectation::LineCount(1)),
                Self::expect(Expectation::CanAdvance(false)),
                Self::edit(0, LineEdit::FromCurrency(Some(CurrencyCode::usd()))),
                Self::edit(0, LineEdit::ToCurrency(Some(CurrencyCode::ars()))),
                Self::edit(0, LineEdit::FromAmount(Decimal::new(50, 0))),
                SessionStep::Advance,
                SessionStep::GoOffline,
                SessionStep::Submit,
                Self::expect(Expectation::LastError(Some("NETWORK_ERROR".to_string()))),
                Self::expect(Expectation::Step(WizardStep::Contact)),
                SessionStep::GoOnline,
                SessionStep::Submit,
                Self::expect(Expectation::Step(WizardStep::Submitted)),
            ],
        }
    }
}
