//! Device link orchestrator.
//!
//! Drives a [`LinkSession`] through selection, credential capture, token
//! exchange and hand-off. Every state change goes through
//! [`LinkSession::apply`]; this type only performs the side effects and
//! feeds their outcomes back as events.

use std::sync::Arc;

use crate::backend::{HealthBackend, LinkRequest};
use crate::core::account::{HealthAccountLink, UserSession};
use crate::core::catalog::{CatalogService, ProviderCatalog};
use crate::core::opener::UrlOpener;
use crate::core::retry::RetryPolicies;
use crate::core::session::{LinkEvent, LinkPhase, LinkSession};
use crate::error::{HealthLinkError, Result};
use crate::storage::config::is_loopback;

/// Result of a successful exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handoff {
    pub provider: String,
    pub authorization_url: String,
    /// Whether the opener accepted the URL. When `false` the host shows it.
    pub opened: bool,
}

/// Owns one linking flow for one signed-in user.
pub struct LinkOrchestrator<B: ?Sized> {
    backend: Arc<B>,
    policies: RetryPolicies,
    catalog: CatalogService<B>,
    opener: Arc<dyn UrlOpener>,
    user: UserSession,
    link: HealthAccountLink,
    session: LinkSession,
}

impl<B: HealthBackend + ?Sized> LinkOrchestrator<B> {
    #[must_use]
    pub fn new(
        backend: Arc<B>,
        policies: RetryPolicies,
        opener: Arc<dyn UrlOpener>,
        user: UserSession,
        link: HealthAccountLink,
    ) -> Self {
        let catalog = CatalogService::new(Arc::clone(&backend), policies);
        Self {
            backend,
            policies,
            catalog,
            opener,
            user,
            link,
            session: LinkSession::new(),
        }
    }

    /// Replace the featured allow-list used when sorting.
    #[must_use]
    pub fn with_featured(mut self, featured: Vec<String>) -> Self {
        self.catalog = self.catalog.with_featured(featured);
        self
    }

    #[must_use]
    pub const fn session(&self) -> &LinkSession {
        &self.session
    }

    #[must_use]
    pub const fn link(&self) -> &HealthAccountLink {
        &self.link
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<ProviderCatalog> {
        self.catalog.catalog()
    }

    /// Reload providers. Failures keep the previous catalog.
    pub async fn refresh(&mut self) -> Arc<ProviderCatalog> {
        self.catalog.refresh(&self.user, &self.link).await
    }

    /// Reload providers, surfacing a failed provider list. A failed connected
    /// list only keeps the previous connected set.
    ///
    /// # Errors
    ///
    /// Returns the provider list fetch error.
    pub async fn try_refresh(&mut self) -> Result<Arc<ProviderCatalog>> {
        self.catalog.try_refresh(&self.user, &self.link).await
    }

    fn dispatch(&mut self, event: LinkEvent) {
        let catalog = self.catalog.catalog();
        let before = self.session.phase;
        self.session = std::mem::take(&mut self.session).apply(event, &catalog);
        if before != self.session.phase {
            tracing::debug!(
                from = %before,
                to = %self.session.phase,
                attempt = self.session.attempt,
                "Link session transition"
            );
        }
    }

    /// Pick a provider.
    ///
    /// Picking a connected provider clears the selection.
    ///
    /// # Errors
    ///
    /// Returns [`HealthLinkError::UnknownProvider`] when the slug is not in
    /// the current catalog; the session is left unchanged.
    pub fn select(&mut self, slug: &str) -> Result<&LinkSession> {
        if !self.catalog.catalog().contains(slug) {
            return Err(HealthLinkError::UnknownProvider(slug.to_string()));
        }
        self.dispatch(LinkEvent::Select(slug.to_string()));
        Ok(&self.session)
    }

    pub fn set_credential(&mut self, value: impl Into<String>) {
        self.dispatch(LinkEvent::EditCredential(value.into()));
    }

    pub fn back(&mut self) {
        self.dispatch(LinkEvent::Back);
    }

    pub fn dismiss(&mut self) {
        self.dispatch(LinkEvent::Dismiss);
    }

    /// Run the exchange for the selected provider.
    ///
    /// On failure the session moves to `Failed` with the user-facing message
    /// and the typed error is returned as well.
    ///
    /// # Errors
    ///
    /// Returns [`HealthLinkError::NoProviderSelected`] or
    /// [`HealthLinkError::EmptyCredential`] without touching the session or
    /// the network, or the exchange error.
    pub async fn submit(&mut self) -> Result<Handoff> {
        let Some(slug) = self.session.selected_provider.clone() else {
            return Err(HealthLinkError::NoProviderSelected);
        };
        if self.session.credential_input.trim().is_empty() {
            return Err(HealthLinkError::EmptyCredential);
        }
        if self.session.phase != LinkPhase::AwaitingCredential {
            return Err(HealthLinkError::NoProviderSelected);
        }

        self.dispatch(LinkEvent::Submit);
        let attempt = self.session.attempt;
        let credential = self.session.credential_input.trim().to_string();

        tracing::info!(provider = %slug, attempt, user = %self.user.user_id, "Starting device link");
        match self.exchange(&slug, &credential).await {
            Ok(url) => {
                self.dispatch(LinkEvent::ExchangeSucceeded {
                    attempt,
                    authorization_url: url.clone(),
                });
                let opened = match self.opener.open(&url) {
                    Ok(()) => true,
                    Err(err) => {
                        tracing::warn!(provider = %slug, error = %err, "Could not open authorization URL");
                        false
                    }
                };
                tracing::info!(provider = %slug, attempt, opened, "Device link handed off");
                Ok(Handoff {
                    provider: slug,
                    authorization_url: url,
                    opened,
                })
            }
            Err(err) => {
                tracing::warn!(
                    provider = %slug,
                    attempt,
                    error = %err,
                    error_code = err.error_code(),
                    "Device link failed"
                );
                self.dispatch(LinkEvent::ExchangeFailed {
                    attempt,
                    message: err.user_message(),
                });
                Err(err)
            }
        }
    }

    /// Verify the account, mint a link token, fetch the authorization URL.
    async fn exchange(&mut self, slug: &str, credential: &str) -> Result<String> {
        let user = &self.user;
        let backend = &self.backend;

        let remote = self
            .policies
            .read(|| backend.lookup_health_account(user))
            .await?;
        let Some(remote) = remote else {
            self.link.remote_account_id = None;
            return Err(HealthLinkError::SetupRequired);
        };
        self.link.remote_account_id = Some(remote);

        let request = LinkRequest::new(user.user_id.clone(), slug, credential);

        let granted = self
            .policies
            .write(|| backend.request_link_token(user, &request))
            .await?;
        if !granted {
            return Err(HealthLinkError::LinkTokenDenied {
                provider: slug.to_string(),
            });
        }

        let url = self
            .policies
            .write(|| backend.connect_device(user, &request))
            .await?;
        validate_authorization_url(&url)?;
        Ok(url)
    }
}

/// The authorization URL must be absolute `https`, or plain `http` on a
/// loopback host.
///
/// # Errors
///
/// Returns [`HealthLinkError::ParseResponse`] otherwise.
pub fn validate_authorization_url(url: &str) -> Result<()> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| HealthLinkError::ParseResponse(format!("invalid authorization URL: {e}")))?;
    match parsed.scheme() {
        "https" => Ok(()),
        "http" if is_loopback(&parsed) => Ok(()),
        "http" => Err(HealthLinkError::ParseResponse(
            "authorization URL uses plain http on a remote host".to_string(),
        )),
        other => Err(HealthLinkError::ParseResponse(format!(
            "authorization URL has unsupported scheme '{other}'"
        ))),
    }
}
