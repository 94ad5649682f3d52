//! Signed-in user session and the link to the health aggregation account.

use serde::{Deserialize, Serialize};

use super::credential_hash::display_fingerprint;

/// The signed-in local user, as provided by the host application.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    /// Local application user id.
    pub user_id: String,
    /// Bearer token for backend calls.
    pub access_token: String,
}

impl UserSession {
    #[must_use]
    pub fn new(user_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            access_token: access_token.into(),
        }
    }

    /// Token fingerprint safe for logs.
    #[must_use]
    pub fn token_fingerprint(&self) -> String {
        display_fingerprint(&self.access_token)
    }
}

impl std::fmt::Debug for UserSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserSession")
            .field("user_id", &self.user_id)
            .field("access_token", &self.token_fingerprint())
            .finish()
    }
}

/// Relationship between the local user and the aggregation service.
///
/// `remote_account_id == None` means the user has not been registered yet;
/// no provider can be connected until it is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthAccountLink {
    pub local_user_id: String,
    pub remote_account_id: Option<String>,
}

impl HealthAccountLink {
    /// A link for a user who is not registered yet.
    #[must_use]
    pub fn unregistered(local_user_id: impl Into<String>) -> Self {
        Self {
            local_user_id: local_user_id.into(),
            remote_account_id: None,
        }
    }

    /// A link for a registered user.
    #[must_use]
    pub fn registered(local_user_id: impl Into<String>, remote_account_id: impl Into<String>) -> Self {
        Self {
            local_user_id: local_user_id.into(),
            remote_account_id: Some(remote_account_id.into()),
        }
    }

    #[must_use]
    pub const fn is_registered(&self) -> bool {
        self.remote_account_id.is_some()
    }
}
