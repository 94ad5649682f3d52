//! Output payloads and the JSON envelope shared by every command.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::account::HealthAccountLink;
use super::catalog::ProviderCatalog;
use super::orchestrator::Handoff;
use super::provider::{AuthType, Provider};

/// Schema identifier stamped on every JSON document.
pub const SCHEMA_VERSION: &str = "healthlink.v1";

/// Top-level JSON envelope for machine-readable output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotOutput<T> {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub command: String,
    pub data: T,

    #[serde(default)]
    pub errors: Vec<String>,

    pub meta: RobotMeta,
}

/// Metadata for robot output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotMeta {
    pub format: String,
    pub flags: Vec<String>,
    pub runtime: String,
}

impl<T> RobotOutput<T> {
    /// Create a new robot output envelope.
    pub fn new(command: impl Into<String>, data: T) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            command: command.into(),
            data,
            errors: Vec::new(),
            meta: RobotMeta {
                format: "json".to_string(),
                flags: Vec::new(),
                runtime: "cli".to_string(),
            },
        }
    }

    /// Builder: record the flags that shaped this output.
    #[must_use]
    pub fn with_flags(mut self, flags: Vec<String>) -> Self {
        self.meta.flags = flags;
        self
    }

    /// Builder: attach non-fatal errors.
    #[must_use]
    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = errors;
        self
    }
}

/// A provider as listed to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderEntry {
    pub slug: String,
    pub name: String,
    pub description: String,
    pub auth_type: AuthType,
    pub featured: bool,
    pub connected: bool,
}

impl ProviderEntry {
    #[must_use]
    pub fn from_catalog<S: AsRef<str>>(
        provider: &Provider,
        catalog: &ProviderCatalog,
        featured: &[S],
    ) -> Self {
        Self {
            slug: provider.slug.clone(),
            name: provider.name.clone(),
            description: provider.display_description().to_string(),
            auth_type: provider.auth_type,
            featured: provider.is_featured(featured),
            connected: catalog.is_connected(&provider.slug),
        }
    }
}

/// `setup` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupPayload {
    pub user_id: String,
    pub remote_account_id: String,
    /// Whether this invocation created the account.
    pub created: bool,
}

/// `status` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
    pub user_id: String,
    pub registered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_account_id: Option<String>,
    pub connected: Vec<ProviderEntry>,
    pub available: usize,
}

impl StatusPayload {
    #[must_use]
    pub fn new<S: AsRef<str>>(
        link: &HealthAccountLink,
        catalog: &ProviderCatalog,
        featured: &[S],
    ) -> Self {
        Self {
            user_id: link.local_user_id.clone(),
            registered: link.is_registered(),
            remote_account_id: link.remote_account_id.clone(),
            connected: catalog
                .connected_providers()
                .into_iter()
                .map(|p| ProviderEntry::from_catalog(p, catalog, featured))
                .collect(),
            available: catalog.all.len(),
        }
    }
}

/// `providers` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvidersPayload {
    pub registered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    pub total: usize,
    pub providers: Vec<ProviderEntry>,
}

/// `connect` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectPayload {
    pub provider: String,
    pub provider_name: String,
    pub authorization_url: String,
    pub opened: bool,
}

impl ConnectPayload {
    #[must_use]
    pub fn new(handoff: Handoff, provider_name: impl Into<String>) -> Self {
        Self {
            provider: handoff.provider,
            provider_name: provider_name.into(),
            authorization_url: handoff.authorization_url,
            opened: handoff.opened,
        }
    }
}

/// `login` and `logout` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Whether a session is stored after the command.
    pub stored: bool,
    /// Whether the command changed the store.
    pub changed: bool,
}
