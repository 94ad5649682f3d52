//! Login and logout commands.

use crate::cli::context::CommandContext;
use crate::core::account::UserSession;
use crate::core::models::SessionPayload;
use crate::error::Result;
use crate::render;
use crate::storage::session::SessionStore;

/// Store `session`, replacing any previous one.
///
/// # Errors
///
/// Returns error if the store is unwritable.
pub fn run_login(store: &dyn SessionStore, session: &UserSession) -> Result<SessionPayload> {
    store.save(session)?;
    tracing::info!(user = %session.user_id, token = %session.token_fingerprint(), "Session stored");
    Ok(SessionPayload {
        user_id: Some(session.user_id.clone()),
        stored: true,
        changed: true,
    })
}

/// Remove the stored session.
///
/// # Errors
///
/// Returns error if the store is unwritable.
pub fn run_logout(store: &dyn SessionStore) -> Result<SessionPayload> {
    let previous = store.load().ok().flatten().map(|s| s.user_id);
    let removed = store.clear()?;
    if removed {
        tracing::info!(user = previous.as_deref().unwrap_or("unknown"), "Session removed");
    }
    Ok(SessionPayload {
        user_id: previous,
        stored: false,
        changed: removed,
    })
}

/// Execute the login command.
///
/// # Errors
///
/// Returns [`crate::error::HealthLinkError::SessionMissing`] without both
/// `--user-id` and `--access-token` (or their environment variables), or a
/// keyring failure.
pub fn execute_login(ctx: &CommandContext) -> Result<()> {
    let session = ctx.explicit_session()?;
    let payload = run_login(ctx.store(), &session)?;
    ctx.emit(&render::render_login(&payload, &ctx.output)?);
    Ok(())
}

/// Execute the logout command.
///
/// # Errors
///
/// Returns a keyring failure.
pub fn execute_logout(ctx: &CommandContext) -> Result<()> {
    let payload = run_logout(ctx.store())?;
    ctx.emit(&render::render_logout(&payload, &ctx.output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::session::MemoryStore;

    #[test]
    fn login_then_logout() {
        let store = MemoryStore::new();
        let payload = run_login(&store, &UserSession::new("u-1", "tok")).unwrap();
        assert!(payload.stored);
        assert_eq!(store.load().unwrap(), Some(UserSession::new("u-1", "tok")));

        let payload = run_logout(&store).unwrap();
        assert!(payload.changed);
        assert_eq!(payload.user_id.as_deref(), Some("u-1"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn logout_without_session_changes_nothing() {
        let payload = run_logout(&MemoryStore::new()).unwrap();
        assert!(!payload.changed);
        assert!(payload.user_id.is_none());
    }
}
