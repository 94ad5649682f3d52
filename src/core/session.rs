//! Link session state machine.
//!
//! [`LinkSession::apply`] is a pure transition function: it takes the
//! current session, an event and the catalog snapshot, and returns the next
//! session. Side effects (network calls, opening URLs) live in the
//! orchestrator, which feeds their outcomes back in as events.
//!
//! ```text
//! Browsing ──select──▶ AwaitingCredential ──submit──▶ Exchanging ──ok──▶ HandedOff
//!    ▲                        │                           │
//!    └──────────back──────────┘                         error
//!    ▲                                                    ▼
//!    └───────────────────dismiss──────────────────────  Failed
//! ```

use serde::Serialize;

use crate::core::catalog::ProviderCatalog;

/// Where the user is in the linking flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkPhase {
    /// Looking at the catalog; nothing selected.
    #[default]
    Browsing,
    /// A provider is selected; waiting for the account email.
    AwaitingCredential,
    /// Token exchange in flight.
    Exchanging,
    /// Authorization URL obtained and handed to the host. Terminal.
    HandedOff,
    /// The last exchange failed; `last_error` says why.
    Failed,
}

impl LinkPhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Browsing => "browsing",
            Self::AwaitingCredential => "awaiting_credential",
            Self::Exchanging => "exchanging",
            Self::HandedOff => "handed_off",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for LinkPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// User picked a provider by slug.
    Select(String),
    /// User typed into the credential field.
    EditCredential(String),
    /// User backed out of the credential prompt.
    Back,
    /// User asked to connect.
    Submit,
    /// Exchange for `attempt` produced an authorization URL.
    ExchangeSucceeded {
        attempt: u64,
        authorization_url: String,
    },
    /// Exchange for `attempt` failed with a user-facing message.
    ExchangeFailed { attempt: u64, message: String },
    /// User acknowledged the failure.
    Dismiss,
}

/// State of one linking flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSession {
    pub selected_provider: Option<String>,
    pub credential_input: String,
    pub phase: LinkPhase,
    pub last_error: Option<String>,
    /// Bumped on every selection and submit; results tagged with an older
    /// value are stale.
    pub attempt: u64,
    pub authorization_url: Option<String>,
}

impl LinkSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a submit would start an exchange.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.phase == LinkPhase::AwaitingCredential
            && self.selected_provider.is_some()
            && !self.credential_input.trim().is_empty()
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self.phase, LinkPhase::HandedOff)
    }

    /// Apply one event.
    #[must_use]
    pub fn apply(self, event: LinkEvent, catalog: &ProviderCatalog) -> Self {
        if self.is_terminal() {
            return self;
        }

        match event {
            LinkEvent::Select(slug) => self.select(slug, catalog),
            LinkEvent::EditCredential(value) => Self {
                credential_input: value,
                ..self
            },
            LinkEvent::Back if self.phase == LinkPhase::AwaitingCredential => Self {
                selected_provider: None,
                phase: LinkPhase::Browsing,
                ..self
            },
            LinkEvent::Submit if self.can_submit() => Self {
                phase: LinkPhase::Exchanging,
                last_error: None,
                attempt: self.attempt + 1,
                ..self
            },
            LinkEvent::ExchangeSucceeded {
                attempt,
                authorization_url,
            } if self.is_current(attempt) => Self {
                phase: LinkPhase::HandedOff,
                authorization_url: Some(authorization_url),
                ..self
            },
            LinkEvent::ExchangeFailed { attempt, message } if self.is_current(attempt) => Self {
                phase: LinkPhase::Failed,
                last_error: Some(message),
                ..self
            },
            LinkEvent::Dismiss if self.phase == LinkPhase::Failed => Self {
                selected_provider: None,
                phase: LinkPhase::Browsing,
                ..self
            },
            _ => self,
        }
    }

    fn is_current(&self, attempt: u64) -> bool {
        self.phase == LinkPhase::Exchanging && self.attempt == attempt
    }

    fn select(self, slug: String, catalog: &ProviderCatalog) -> Self {
        if !catalog.contains(&slug) {
            return self;
        }

        let base = if self.phase == LinkPhase::Failed {
            Self {
                selected_provider: None,
                phase: LinkPhase::Browsing,
                last_error: None,
                ..self
            }
        } else {
            self
        };

        if catalog.is_connected(&slug) {
            // Toggle off; a connected provider cannot be linked again.
            return Self {
                selected_provider: None,
                phase: LinkPhase::Browsing,
                last_error: None,
                attempt: base.attempt + 1,
                ..base
            };
        }

        Self {
            selected_provider: Some(slug),
            phase: LinkPhase::AwaitingCredential,
            last_error: None,
            attempt: base.attempt + 1,
            ..base
        }
    }
}
