//! Providers command implementation.

use std::sync::Arc;

use crate::backend::HealthBackend;
use crate::cli::args::ProvidersArgs;
use crate::cli::context::CommandContext;
use crate::core::account::UserSession;
use crate::core::catalog::CatalogService;
use crate::core::models::{ProviderEntry, ProvidersPayload};
use crate::core::registrar::Registrar;
use crate::core::retry::RetryPolicies;
use crate::error::Result;
use crate::render;

/// The display-ordered catalog, optionally filtered by name.
///
/// Catalog fetch failures are logged and yield an empty listing.
///
/// # Errors
///
/// Returns lookup failures.
pub async fn run<B: HealthBackend + ?Sized>(
    backend: Arc<B>,
    policies: RetryPolicies,
    featured: Vec<String>,
    session: &UserSession,
    search: Option<&str>,
) -> Result<ProvidersPayload> {
    let link = Registrar::new(Arc::clone(&backend), policies)
        .lookup(session)
        .await?;
    let mut catalog = CatalogService::new(backend, policies).with_featured(featured.clone());
    let snapshot = catalog.refresh(session, &link).await;

    let search = search.map(str::trim).filter(|term| !term.is_empty());
    let shown = match search {
        Some(term) => snapshot.search(term),
        None => snapshot.all.iter().collect(),
    };
    tracing::debug!(shown = shown.len(), total = snapshot.all.len(), ?search, "Providers listed");

    Ok(ProvidersPayload {
        registered: link.is_registered(),
        search: search.map(str::to_string),
        total: snapshot.all.len(),
        providers: shown
            .into_iter()
            .map(|p| ProviderEntry::from_catalog(p, &snapshot, &featured))
            .collect(),
    })
}

/// Execute the providers command.
///
/// # Errors
///
/// Returns configuration, session or backend failures.
pub async fn execute(args: &ProvidersArgs, ctx: &CommandContext) -> Result<()> {
    let session = ctx.session()?;
    let backend = ctx.backend()?;
    let payload = run(
        backend,
        ctx.config.retry,
        ctx.config.featured.clone(),
        &session,
        args.search.as_deref(),
    )
    .await?;
    let output = if args.search.is_some() {
        ctx.output_with(&["search"])
    } else {
        ctx.output.clone()
    };
    ctx.emit(&render::render_providers(&payload, &output)?);
    Ok(())
}
