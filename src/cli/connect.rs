//! Connect command implementation.

use std::sync::Arc;

use crate::backend::HealthBackend;
use crate::cli::args::ConnectArgs;
use crate::cli::context::CommandContext;
use crate::core::account::UserSession;
use crate::core::models::ConnectPayload;
use crate::core::opener::{NoopOpener, SystemOpener, UrlOpener};
use crate::core::orchestrator::LinkOrchestrator;
use crate::core::registrar::Registrar;
use crate::core::retry::RetryPolicies;
use crate::error::{HealthLinkError, Result};
use crate::render;

/// Link `args.provider` for the user and hand the authorization URL to
/// `opener`.
///
/// An unavailable connected list does not stop the flow; the provider is
/// then treated as not yet connected.
///
/// # Errors
///
/// Returns [`HealthLinkError::UnknownProvider`],
/// [`HealthLinkError::ProviderAlreadyConnected`], the provider list fetch
/// failure, or the exchange failure.
pub async fn run<B: HealthBackend + ?Sized>(
    backend: Arc<B>,
    policies: RetryPolicies,
    featured: Vec<String>,
    opener: Arc<dyn UrlOpener>,
    session: UserSession,
    args: &ConnectArgs,
) -> Result<ConnectPayload> {
    let link = Registrar::new(Arc::clone(&backend), policies)
        .lookup(&session)
        .await?;
    let mut orchestrator =
        LinkOrchestrator::new(backend, policies, opener, session, link).with_featured(featured);

    let catalog = orchestrator.try_refresh().await?;
    let slug = args.provider.trim();
    let provider_name = match catalog.get(slug) {
        Some(provider) => provider.name.clone(),
        None => return Err(HealthLinkError::UnknownProvider(slug.to_string())),
    };
    if catalog.is_connected(slug) {
        return Err(HealthLinkError::ProviderAlreadyConnected(slug.to_string()));
    }

    orchestrator.select(slug)?;
    orchestrator.set_credential(args.email.as_str());
    let handoff = orchestrator.submit().await?;
    Ok(ConnectPayload::new(handoff, provider_name))
}

/// Execute the connect command.
///
/// # Errors
///
/// Returns configuration, session, precondition or backend failures.
pub async fn execute(args: &ConnectArgs, ctx: &CommandContext) -> Result<()> {
    let session = ctx.session()?;
    let backend = ctx.backend()?;
    let opener: Arc<dyn UrlOpener> = if args.no_open {
        Arc::new(NoopOpener::new())
    } else {
        Arc::new(SystemOpener)
    };

    let mut payload = run(
        backend,
        ctx.config.retry,
        ctx.config.featured.clone(),
        opener,
        session,
        args,
    )
    .await?;
    if args.no_open {
        payload.opened = false;
    }

    let output = if args.no_open {
        ctx.output_with(&["no-open"])
    } else {
        ctx.output.clone()
    };
    ctx.emit(&render::render_connect(&payload, &output)?);
    Ok(())
}
