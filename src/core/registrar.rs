//! Idempotent create-or-fetch of the user's health account.

use std::sync::Arc;

use crate::backend::HealthBackend;
use crate::core::account::{HealthAccountLink, UserSession};
use crate::core::retry::RetryPolicies;
use crate::error::{HealthLinkError, Result};

/// Outcome of [`Registrar::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub remote_account_id: String,
    /// Whether the create call made the account.
    pub created: bool,
}

/// Registers local users with the aggregation service.
pub struct Registrar<B: ?Sized> {
    backend: Arc<B>,
    policies: RetryPolicies,
}

impl<B: HealthBackend + ?Sized> Registrar<B> {
    #[must_use]
    pub const fn new(backend: Arc<B>, policies: RetryPolicies) -> Self {
        Self { backend, policies }
    }

    /// Current registration state. No side effects.
    ///
    /// # Errors
    ///
    /// Returns the last backend error once retries are exhausted.
    pub async fn lookup(&self, session: &UserSession) -> Result<HealthAccountLink> {
        let remote = self
            .policies
            .read(|| self.backend.lookup_health_account(session))
            .await?;
        Ok(HealthAccountLink {
            local_user_id: session.user_id.clone(),
            remote_account_id: remote,
        })
    }

    /// Return the remote account id, creating the account if needed.
    ///
    /// At most one create call is made. A conflict on create means another
    /// client won the race; the existing account is then looked up. If the
    /// lookup after a create fails, the id returned by create is used.
    ///
    /// # Errors
    ///
    /// Returns lookup or create failures, or
    /// [`HealthLinkError::RegistrationUnconfirmed`] when no id can be found.
    pub async fn ensure_registered(&self, session: &UserSession) -> Result<String> {
        self.register(session).await.map(|r| r.remote_account_id)
    }

    /// [`Self::ensure_registered`], also reporting whether this call created
    /// the account.
    ///
    /// # Errors
    ///
    /// See [`Self::ensure_registered`].
    pub async fn register(&self, session: &UserSession) -> Result<Registration> {
        if let Some(existing) = self.lookup(session).await?.remote_account_id {
            tracing::debug!(user = %session.user_id, "Health account already registered");
            return Ok(Registration {
                remote_account_id: existing,
                created: false,
            });
        }

        tracing::info!(user = %session.user_id, "Creating health account");
        let (created_id, created) = match self
            .policies
            .write(|| self.backend.create_health_account(session))
            .await
        {
            Ok(id) => (id, true),
            Err(HealthLinkError::AlreadyExists { message }) => {
                tracing::info!(
                    user = %session.user_id,
                    message = %message,
                    "Health account already exists, resolving"
                );
                (None, false)
            }
            Err(err) => return Err(err),
        };

        let confirmed = match self.lookup(session).await {
            Ok(link) => link.remote_account_id,
            Err(err) if created_id.is_some() => {
                tracing::warn!(
                    user = %session.user_id,
                    error = %err,
                    error_code = err.error_code(),
                    "Confirmation lookup failed, using id returned by create"
                );
                None
            }
            Err(err) => return Err(err),
        };
        match confirmed.or(created_id) {
            Some(id) => {
                tracing::info!(user = %session.user_id, created, "Health account registered");
                Ok(Registration {
                    remote_account_id: id,
                    created,
                })
            }
            None => Err(HealthLinkError::RegistrationUnconfirmed {
                user_id: session.user_id.clone(),
            }),
        }
    }

    /// [`Self::ensure_registered`], returned as a link.
    ///
    /// # Errors
    ///
    /// See [`Self::ensure_registered`].
    pub async fn ensure_link(&self, session: &UserSession) -> Result<HealthAccountLink> {
        let remote = self.ensure_registered(session).await?;
        Ok(HealthAccountLink::registered(session.user_id.clone(), remote))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeBackend, FakeCall, make_test_session};
    use tracing_test::traced_test;

    fn registrar(backend: &Arc<FakeBackend>) -> Registrar<FakeBackend> {
        Registrar::new(Arc::clone(backend), RetryPolicies::immediate(1))
    }

    #[test]
    fn register_reports_creation() {
        let backend = Arc::new(FakeBackend::new());
        let registration = tokio_test::block_on(registrar(&backend).register(&make_test_session()))
            .unwrap();
        assert_eq!(
            registration,
            Registration {
                remote_account_id: "vital-user-123".to_string(),
                created: true,
            }
        );
    }

    #[test]
    fn lookup_failure_stops_before_create() {
        let backend = Arc::new(FakeBackend::new());
        backend.fail_always(FakeCall::Lookup, || HealthLinkError::Unauthorized {
            status: 401,
            message: "expired".to_string(),
        });
        let result = tokio_test::block_on(registrar(&backend).ensure_registered(&make_test_session()));
        assert!(matches!(result, Err(HealthLinkError::Unauthorized { .. })));
        assert_eq!(backend.calls(FakeCall::Create), 0);
    }

    #[test]
    fn unpersisted_create_without_echo_is_unconfirmed() {
        let backend = Arc::new(FakeBackend::new().with_unpersisted_create().without_created_id());
        let result = tokio_test::block_on(registrar(&backend).ensure_link(&make_test_session()));
        assert!(matches!(
            result,
            Err(HealthLinkError::RegistrationUnconfirmed { .. })
        ));
    }

    #[test]
    #[traced_test]
    fn failed_confirmation_falls_back_to_created_id() {
        let backend = Arc::new(FakeBackend::new());
        backend.fail_after(FakeCall::Lookup, 1, || HealthLinkError::Timeout(5));
        let registration = tokio_test::block_on(registrar(&backend).register(&make_test_session()))
            .unwrap();

        assert_eq!(registration.remote_account_id, "vital-user-123");
        assert!(registration.created);
        assert_eq!(backend.calls(FakeCall::Create), 1);
        assert!(logs_contain("Confirmation lookup failed"));
    }

    #[test]
    fn failed_confirmation_without_created_id_propagates() {
        let backend = Arc::new(FakeBackend::new().without_created_id());
        backend.fail_after(FakeCall::Lookup, 1, || HealthLinkError::Timeout(5));
        let result = tokio_test::block_on(registrar(&backend).register(&make_test_session()));
        assert!(matches!(result, Err(HealthLinkError::Timeout(5))));
    }
}
