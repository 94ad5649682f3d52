//! Request and response bodies exchanged with the backend.
//!
//! Field names follow the backend's own conventions: RPC parameters are
//! `p_`-prefixed, edge functions use `snake_case` inputs and mixed outputs.

use serde::{Deserialize, Serialize};

use crate::core::provider::Provider;

#[derive(Debug, Serialize)]
pub struct AccountLookupParams<'a> {
    pub p_user_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct UserIdBody<'a> {
    pub user_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct LinkTokenParams<'a> {
    pub p_user_id: &'a str,
    pub p_provider: &'a str,
    pub p_device_email: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ConnectDeviceBody<'a> {
    pub user_id: &'a str,
    pub provider: &'a str,
    pub device_email: &'a str,
}

/// A row carrying the remote account id.
#[derive(Debug, Default, Deserialize)]
pub struct AccountRow {
    #[serde(default, alias = "remote_account_id", alias = "vitalUserId")]
    pub vital_user_id: Option<String>,
}

/// Account lookups come back as an object, a one-row array, or `null`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AccountResponse {
    Row(AccountRow),
    Rows(Vec<AccountRow>),
    Id(String),
    Empty(()),
}

impl AccountResponse {
    /// The non-blank account id, if any.
    #[must_use]
    pub fn into_id(self) -> Option<String> {
        let id = match self {
            Self::Row(row) => row.vital_user_id,
            Self::Rows(rows) => rows.into_iter().find_map(|row| row.vital_user_id),
            Self::Id(id) => Some(id),
            Self::Empty(()) => None,
        };
        id.filter(|id| !id.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct ProvidersResponse {
    #[serde(default)]
    pub providers: Vec<Provider>,
}

#[derive(Debug, Deserialize)]
pub struct ConnectedProvidersResponse {
    #[serde(default, rename = "connectedProviders", alias = "connected")]
    pub connected: Vec<Provider>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LinkTokenRow {
    #[serde(default)]
    pub success: bool,
}

/// The link-token RPC answers a bare object or a one-row array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum LinkTokenResponse {
    Row(LinkTokenRow),
    Rows(Vec<LinkTokenRow>),
    Flag(bool),
    Empty(()),
}

impl LinkTokenResponse {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        match self {
            Self::Row(row) => row.success,
            Self::Rows(rows) => rows.first().is_some_and(|row| row.success),
            Self::Flag(flag) => *flag,
            Self::Empty(()) => false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LinkPayload {
    #[serde(
        default,
        rename = "linkWebUrl",
        alias = "authorization_url",
        alias = "authorizationUrl",
        alias = "link_web_url"
    )]
    pub url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConnectDeviceResponse {
    #[serde(default)]
    pub link: Option<LinkPayload>,
}

impl ConnectDeviceResponse {
    #[must_use]
    pub fn into_url(self) -> Option<String> {
        self.link
            .and_then(|link| link.url)
            .filter(|url| !url.trim().is_empty())
    }
}
