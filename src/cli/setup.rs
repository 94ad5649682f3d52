//! Setup command implementation.

use std::sync::Arc;

use crate::backend::HealthBackend;
use crate::cli::context::CommandContext;
use crate::core::account::UserSession;
use crate::core::models::SetupPayload;
use crate::core::registrar::Registrar;
use crate::core::retry::RetryPolicies;
use crate::error::Result;
use crate::render;

/// Register the user, creating the health account if needed.
///
/// # Errors
///
/// Returns registration failures.
pub async fn run<B: HealthBackend + ?Sized>(
    backend: Arc<B>,
    policies: RetryPolicies,
    session: &UserSession,
) -> Result<SetupPayload> {
    let registration = Registrar::new(backend, policies).register(session).await?;
    Ok(SetupPayload {
        user_id: session.user_id.clone(),
        remote_account_id: registration.remote_account_id,
        created: registration.created,
    })
}

/// Execute the setup command.
///
/// # Errors
///
/// Returns configuration, session or registration failures.
pub async fn execute(ctx: &CommandContext) -> Result<()> {
    let session = ctx.session()?;
    let backend = ctx.backend()?;
    let payload = run(backend, ctx.config.retry, &session).await?;
    ctx.emit(&render::render_setup(&payload, &ctx.output)?);
    Ok(())
}
