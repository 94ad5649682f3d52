//! Backend-as-a-service boundary.
//!
//! [`HealthBackend`] names the six remote procedures the linking flow needs.
//! [`HttpBackend`] talks to the real service; tests substitute the fake in
//! `test_utils`.

pub mod http;
pub mod wire;

use async_trait::async_trait;

use crate::core::account::UserSession;
use crate::core::provider::Provider;
use crate::error::Result;

pub use http::{BackendSettings, HttpBackend};

/// Inputs shared by the token exchange and the device connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRequest {
    pub user_id: String,
    pub provider_slug: String,
    /// Email of the account on the provider side.
    pub credential: String,
}

impl LinkRequest {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        provider_slug: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            provider_slug: provider_slug.into(),
            credential: credential.into(),
        }
    }
}

/// Remote procedures used by the catalog, registrar and orchestrator.
///
/// Implementations make exactly one attempt per call; retrying is the
/// caller's decision.
#[async_trait]
pub trait HealthBackend: Send + Sync {
    /// Remote account id for the user, if one exists.
    async fn lookup_health_account(&self, session: &UserSession) -> Result<Option<String>>;

    /// Create the remote account. Returns the new id when the backend echoes it.
    async fn create_health_account(&self, session: &UserSession) -> Result<Option<String>>;

    /// Every provider the aggregation service offers.
    async fn list_providers(&self, session: &UserSession) -> Result<Vec<Provider>>;

    /// Providers already linked to the remote account.
    async fn list_connected_providers(
        &self,
        session: &UserSession,
        remote_account_id: &str,
    ) -> Result<Vec<Provider>>;

    /// Ask the backend to mint a link token. `false` means refused.
    async fn request_link_token(&self, session: &UserSession, request: &LinkRequest)
    -> Result<bool>;

    /// Start the device connection and return the authorization URL.
    async fn connect_device(&self, session: &UserSession, request: &LinkRequest) -> Result<String>;
}
