//! Status command implementation.

use std::sync::Arc;

use crate::backend::HealthBackend;
use crate::cli::context::CommandContext;
use crate::core::account::UserSession;
use crate::core::catalog::CatalogService;
use crate::core::models::StatusPayload;
use crate::core::registrar::Registrar;
use crate::core::retry::RetryPolicies;
use crate::error::Result;
use crate::render;

/// Registration state plus connected providers. Never creates anything.
///
/// Catalog fetch failures are logged and reported as an empty catalog.
///
/// # Errors
///
/// Returns lookup failures.
pub async fn run<B: HealthBackend + ?Sized>(
    backend: Arc<B>,
    policies: RetryPolicies,
    featured: Vec<String>,
    session: &UserSession,
) -> Result<StatusPayload> {
    let link = Registrar::new(Arc::clone(&backend), policies)
        .lookup(session)
        .await?;
    let mut catalog = CatalogService::new(backend, policies).with_featured(featured.clone());
    let snapshot = catalog.refresh(session, &link).await;
    Ok(StatusPayload::new(&link, &snapshot, &featured))
}

/// Execute the status command.
///
/// # Errors
///
/// Returns configuration, session or backend failures.
pub async fn execute(ctx: &CommandContext) -> Result<()> {
    let session = ctx.session()?;
    let backend = ctx.backend()?;
    let payload = run(backend, ctx.config.retry, ctx.config.featured.clone(), &session).await?;
    ctx.emit(&render::render_status(&payload, &ctx.output)?);
    Ok(())
}
