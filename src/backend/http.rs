//! `reqwest` implementation of [`HealthBackend`].

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::wire::{
    AccountLookupParams, AccountResponse, ConnectDeviceBody, ConnectDeviceResponse,
    ConnectedProvidersResponse, LinkTokenParams, LinkTokenResponse, ProvidersResponse,
    UserIdBody,
};
use super::{HealthBackend, LinkRequest};
use crate::core::account::UserSession;
use crate::core::http::{CLIENT_INFO, build_client, decode_json, transport_error};
use crate::core::provider::Provider;
use crate::error::{HealthLinkError, Result};

const RPC_GET_USER: &str = "/rest/v1/rpc/get_vital_user";
const RPC_LINK_TOKEN: &str = "/rest/v1/rpc/get_vital_link_token";
const FN_CREATE_USER: &str = "/functions/v1/create-vital-user";
const FN_ALL_PROVIDERS: &str = "/functions/v1/get-all-providers";
const FN_CONNECTED_PROVIDERS: &str = "/functions/v1/get-connected-providers";
const FN_CONNECT_DEVICE: &str = "/functions/v1/connect-vital-device";

/// Where and how to reach the backend.
#[derive(Clone)]
pub struct BackendSettings {
    /// Base URL without trailing slash, e.g. `https://project.supabase.co`.
    pub base_url: String,
    /// Static project key sent as `apikey`.
    pub api_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl BackendSettings {
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout,
        }
    }

    /// Host portion of the base URL, for error messages.
    #[must_use]
    pub fn host(&self) -> String {
        reqwest::Url::parse(&self.base_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_else(|| self.base_url.clone())
    }
}

impl std::fmt::Debug for BackendSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendSettings")
            .field("base_url", &self.base_url)
            .field(
                "api_key",
                &crate::core::credential_hash::display_fingerprint(&self.api_key),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Backend client over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    settings: BackendSettings,
    host: String,
}

impl HttpBackend {
    /// Build a backend client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be constructed.
    pub fn new(settings: BackendSettings) -> Result<Self> {
        let client = build_client(settings.timeout)?;
        let host = settings.host();
        Ok(Self {
            client,
            settings,
            host,
        })
    }

    #[must_use]
    pub const fn settings(&self) -> &BackendSettings {
        &self.settings
    }

    fn request(&self, method: Method, path: &str, session: &UserSession) -> RequestBuilder {
        let url = format!("{}{path}", self.settings.base_url);
        self.client
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {}", session.access_token))
            .header("apikey", &self.settings.api_key)
            .header("x-client-info", CLIENT_INFO)
            .header(CONTENT_TYPE, "application/json")
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder, path: &str) -> Result<T> {
        let started = Instant::now();
        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(&e, &self.host, self.settings.timeout))?;
        let status = response.status();
        let result = decode_json(response, &self.host, self.settings.timeout).await;

        tracing::debug!(
            path,
            status = status.as_u16(),
            duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            ok = result.is_ok(),
            "Backend call finished"
        );
        result
    }

    async fn post<B, T>(&self, path: &str, session: &UserSession, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::POST, path, session).json(body);
        self.send(builder, path).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, session: &UserSession) -> Result<T> {
        let builder = self.request(Method::GET, path, session);
        self.send(builder, path).await
    }
}

#[async_trait]
impl HealthBackend for HttpBackend {
    async fn lookup_health_account(&self, session: &UserSession) -> Result<Option<String>> {
        let params = AccountLookupParams {
            p_user_id: &session.user_id,
        };
        let response: AccountResponse = self.post(RPC_GET_USER, session, &params).await?;
        Ok(response.into_id())
    }

    async fn create_health_account(&self, session: &UserSession) -> Result<Option<String>> {
        let body = UserIdBody {
            user_id: &session.user_id,
        };
        let response: AccountResponse = self.post(FN_CREATE_USER, session, &body).await?;
        Ok(response.into_id())
    }

    async fn list_providers(&self, session: &UserSession) -> Result<Vec<Provider>> {
        let response: ProvidersResponse = self.get(FN_ALL_PROVIDERS, session).await?;
        Ok(response.providers)
    }

    async fn list_connected_providers(
        &self,
        session: &UserSession,
        remote_account_id: &str,
    ) -> Result<Vec<Provider>> {
        let body = UserIdBody {
            user_id: remote_account_id,
        };
        let response: ConnectedProvidersResponse =
            self.post(FN_CONNECTED_PROVIDERS, session, &body).await?;
        Ok(response.connected)
    }

    async fn request_link_token(
        &self,
        session: &UserSession,
        request: &LinkRequest,
    ) -> Result<bool> {
        let params = LinkTokenParams {
            p_user_id: &request.user_id,
            p_provider: &request.provider_slug,
            p_device_email: &request.credential,
        };
        let response: LinkTokenResponse = self.post(RPC_LINK_TOKEN, session, &params).await?;
        Ok(response.succeeded())
    }

    async fn connect_device(&self, session: &UserSession, request: &LinkRequest) -> Result<String> {
        let body = ConnectDeviceBody {
            user_id: &request.user_id,
            provider: &request.provider_slug,
            device_email: &request.credential,
        };
        let response: ConnectDeviceResponse = self.post(FN_CONNECT_DEVICE, session, &body).await?;
        response.into_url().ok_or_else(|| {
            HealthLinkError::ParseResponse("connect response carried no link URL".to_string())
        })
    }
}
