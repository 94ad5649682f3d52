//! Linkable health data providers.
//!
//! A provider is identified by its `slug`; every other field is descriptive
//! and may change between catalog fetches without changing identity.

use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Providers shown ahead of the alphabetical remainder, matched by display name.
pub const DEFAULT_FEATURED: &[&str] = &[
    "Oura",
    "Garmin",
    "Whoop V2",
    "Strava",
    "Peloton",
    "Eight Sleep",
    "MyFitnessPal",
    "Fitbit",
];

/// How a provider account is authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    /// Browser-based OAuth consent.
    #[default]
    Oauth,
    /// Email plus password entered in the hosted link flow.
    EmailPassword,
    /// Username/password.
    Password,
    /// Email only.
    Email,
    /// Companion mobile app.
    App,
    /// Native SDK on the device; cannot be linked through this flow.
    Sdk,
    /// Anything the backend adds later.
    #[serde(other)]
    Other,
}

impl AuthType {
    /// Whether providers with this auth type can be linked here.
    #[must_use]
    pub const fn is_linkable(self) -> bool {
        !matches!(self, Self::Sdk)
    }

    /// Stable label for output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Oauth => "oauth",
            Self::EmailPassword => "email_password",
            Self::Password => "password",
            Self::Email => "email",
            Self::App => "app",
            Self::Sdk => "sdk",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for AuthType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A third-party wearable or health data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    /// Unique, stable identifier.
    pub slug: String,
    /// Display name.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "logo", alias = "logoUrl", skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub auth_type: AuthType,
    #[serde(default)]
    pub supported_resources: BTreeSet<String>,
}

impl Provider {
    /// Create a provider with only the identifying fields set.
    #[must_use]
    pub fn new(slug: impl Into<String>, name: impl Into<String>, auth_type: AuthType) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
            description: None,
            logo_url: None,
            auth_type,
            supported_resources: BTreeSet::new(),
        }
    }

    /// Builder: sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Description for display, with a fallback.
    #[must_use]
    pub fn display_description(&self) -> &str {
        self.description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or("No description available")
    }

    /// Whether this provider is on the featured allow-list.
    #[must_use]
    pub fn is_featured<S: AsRef<str>>(&self, featured: &[S]) -> bool {
        featured
            .iter()
            .any(|name| name.as_ref().eq_ignore_ascii_case(&self.name))
    }
}

impl PartialEq for Provider {
    fn eq(&self, other: &Self) -> bool {
        self.slug == other.slug
    }
}

impl Eq for Provider {}

impl Hash for Provider {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.slug.hash(state);
    }
}
