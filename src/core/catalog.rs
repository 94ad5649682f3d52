//! Provider catalog: fetching, ordering and searching.
//!
//! Ordering and search are pure functions over provider lists. The
//! [`CatalogService`] owns the last good [`ProviderCatalog`] and swaps it
//! whole on each successful refresh.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::backend::HealthBackend;
use crate::core::account::{HealthAccountLink, UserSession};
use crate::core::provider::{DEFAULT_FEATURED, Provider};
use crate::core::retry::RetryPolicies;
use crate::error::Result;

/// Order providers for display.
///
/// SDK-only providers are dropped. Featured providers (matched by name,
/// ignoring case) come first; each tier is sorted by name ignoring case,
/// then by slug.
#[must_use]
pub fn sort_for_display<S: AsRef<str>>(providers: Vec<Provider>, featured: &[S]) -> Vec<Provider> {
    let (mut top, mut rest): (Vec<_>, Vec<_>) = providers
        .into_iter()
        .filter(|p| p.auth_type.is_linkable())
        .partition(|p| p.is_featured(featured));

    top.sort_by(compare_by_name);
    rest.sort_by(compare_by_name);
    top.extend(rest);
    dedup_by_slug(top)
}

fn compare_by_name(a: &Provider, b: &Provider) -> std::cmp::Ordering {
    a.name
        .to_lowercase()
        .cmp(&b.name.to_lowercase())
        .then_with(|| a.slug.cmp(&b.slug))
}

fn dedup_by_slug(providers: Vec<Provider>) -> Vec<Provider> {
    let mut seen = BTreeSet::new();
    providers
        .into_iter()
        .filter(|p| seen.insert(p.slug.clone()))
        .collect()
}

/// Case-insensitive substring match on the display name.
///
/// Surrounding whitespace in `term` is ignored. Keeps the incoming order. A
/// blank term matches everything.
#[must_use]
pub fn filter_by_search<'a>(sorted: &'a [Provider], term: &str) -> Vec<&'a Provider> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return sorted.iter().collect();
    }
    sorted
        .iter()
        .filter(|p| p.name.to_lowercase().contains(&needle))
        .collect()
}

/// A display-ready snapshot of the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderCatalog {
    /// Sorted, linkable providers.
    pub all: Vec<Provider>,
    /// Slugs of providers already connected; always a subset of `all`.
    pub connected: BTreeSet<String>,
}

impl ProviderCatalog {
    /// Build a catalog from raw backend lists.
    ///
    /// Connected providers missing from the displayed list are dropped.
    #[must_use]
    pub fn build<S: AsRef<str>>(
        providers: Vec<Provider>,
        connected: &[Provider],
        featured: &[S],
    ) -> Self {
        let all = sort_for_display(providers, featured);
        let shown: BTreeSet<&str> = all.iter().map(|p| p.slug.as_str()).collect();
        let connected = connected
            .iter()
            .filter(|p| shown.contains(p.slug.as_str()))
            .map(|p| p.slug.clone())
            .collect();
        Self { all, connected }
    }

    #[must_use]
    pub fn get(&self, slug: &str) -> Option<&Provider> {
        self.all.iter().find(|p| p.slug == slug)
    }

    #[must_use]
    pub fn contains(&self, slug: &str) -> bool {
        self.get(slug).is_some()
    }

    #[must_use]
    pub fn is_connected(&self, slug: &str) -> bool {
        self.connected.contains(slug)
    }

    /// Connected providers in display order.
    #[must_use]
    pub fn connected_providers(&self) -> Vec<&Provider> {
        self.all
            .iter()
            .filter(|p| self.connected.contains(&p.slug))
            .collect()
    }

    #[must_use]
    pub fn search(&self, term: &str) -> Vec<&Provider> {
        filter_by_search(&self.all, term)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}

/// Fetches provider lists and keeps the last good catalog.
pub struct CatalogService<B: ?Sized> {
    backend: Arc<B>,
    policies: RetryPolicies,
    featured: Vec<String>,
    current: Arc<ProviderCatalog>,
}

impl<B: HealthBackend + ?Sized> CatalogService<B> {
    #[must_use]
    pub fn new(backend: Arc<B>, policies: RetryPolicies) -> Self {
        Self {
            backend,
            policies,
            featured: DEFAULT_FEATURED.iter().map(ToString::to_string).collect(),
            current: Arc::new(ProviderCatalog::default()),
        }
    }

    /// Replace the featured allow-list.
    #[must_use]
    pub fn with_featured(mut self, featured: Vec<String>) -> Self {
        self.featured = featured;
        self
    }

    /// The current snapshot. Cheap to clone and safe to hold across refreshes.
    #[must_use]
    pub fn catalog(&self) -> Arc<ProviderCatalog> {
        Arc::clone(&self.current)
    }

    /// Every provider, retried as an idempotent read.
    ///
    /// # Errors
    ///
    /// Returns the last backend error once retries are exhausted.
    pub async fn fetch_all(&self, session: &UserSession) -> Result<Vec<Provider>> {
        self.policies
            .read(|| self.backend.list_providers(session))
            .await
    }

    /// Providers linked to the remote account, retried as an idempotent read.
    ///
    /// # Errors
    ///
    /// Returns the last backend error once retries are exhausted.
    pub async fn fetch_connected(
        &self,
        session: &UserSession,
        remote_account_id: &str,
    ) -> Result<Vec<Provider>> {
        self.policies
            .read(|| {
                self.backend
                    .list_connected_providers(session, remote_account_id)
            })
            .await
    }

    /// Fetch both lists and install a new catalog.
    ///
    /// A failed connected list does not block the refresh: the new catalog
    /// keeps the previous connected slugs that are still listed, and the
    /// failure is logged at `warn`. Only a failed provider list leaves the
    /// previous catalog in place and is returned.
    ///
    /// # Errors
    ///
    /// Returns the provider list fetch error.
    pub async fn try_refresh(
        &mut self,
        session: &UserSession,
        link: &HealthAccountLink,
    ) -> Result<Arc<ProviderCatalog>> {
        let this = &*self;
        let connected = async {
            match link.remote_account_id.as_deref() {
                Some(remote_id) => this.fetch_connected(session, remote_id).await,
                None => Ok(Vec::new()),
            }
        };
        let (all, connected) = futures::join!(this.fetch_all(session), connected);
        let all = all?;

        let catalog = match connected {
            Ok(connected) => ProviderCatalog::build(all, &connected, &self.featured),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    error_code = err.error_code(),
                    kept = self.current.connected.len(),
                    "Connected providers unavailable, keeping previous connected set"
                );
                let mut catalog = ProviderCatalog::build(all, &[], &self.featured);
                let still_listed: BTreeSet<String> = self
                    .current
                    .connected
                    .iter()
                    .filter(|slug| catalog.contains(slug))
                    .cloned()
                    .collect();
                catalog.connected = still_listed;
                catalog
            }
        };
        tracing::info!(
            providers = catalog.all.len(),
            connected = catalog.connected.len(),
            user = %session.user_id,
            "Provider catalog refreshed"
        );
        self.current = Arc::new(catalog);
        Ok(self.catalog())
    }

    /// Fetch both lists; on any failure keep the stale catalog.
    ///
    /// Never fails. Returns the catalog in effect afterwards.
    pub async fn refresh(
        &mut self,
        session: &UserSession,
        link: &HealthAccountLink,
    ) -> Arc<ProviderCatalog> {
        match self.try_refresh(session, link).await {
            Ok(catalog) => catalog,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    error_code = err.error_code(),
                    kept = self.current.all.len(),
                    "Provider catalog refresh failed, keeping previous catalog"
                );
                self.catalog()
            }
        }
    }
}
