//! HTTP client utilities.
//!
//! Provides the shared HTTP client and the mapping from transport failures
//! and non-2xx responses onto [`HealthLinkError`].

use std::time::Duration;

use reqwest::{Client, ClientBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{HealthLinkError, Result};

/// Default timeout for HTTP requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Value of the `x-client-info` header.
pub const CLIENT_INFO: &str = concat!("healthlink/", env!("CARGO_PKG_VERSION"));

/// Postgres unique-violation code surfaced by the backend's RPC layer.
const PG_UNIQUE_VIOLATION: &str = "23505";

/// Build a configured HTTP client.
///
/// # Errors
///
/// Returns error if client construction fails.
pub fn build_client(timeout: Duration) -> Result<Client> {
    ClientBuilder::new()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .user_agent(CLIENT_INFO)
        .build()
        .map_err(|e| HealthLinkError::Config(format!("HTTP client: {e}")))
}

/// Map a `reqwest` transport failure onto the error taxonomy.
#[must_use]
pub fn transport_error(err: &reqwest::Error, host: &str, timeout: Duration) -> HealthLinkError {
    if err.is_timeout() {
        HealthLinkError::Timeout(timeout.as_secs())
    } else if err.is_connect() {
        HealthLinkError::ConnectionFailed {
            host: host.to_string(),
        }
    } else {
        HealthLinkError::Network(err.to_string())
    }
}

/// Error body shapes returned by the backend.
///
/// Edge functions answer `{"error": "..."}`; the RPC layer answers
/// `{"message": "...", "code": "..."}`; the auth layer uses `msg`.
#[derive(Debug, Default, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

impl ErrorPayload {
    fn text(&self) -> Option<String> {
        let from_error = self.error.as_ref().and_then(|value| match value {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(map) => map
                .get("message")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string),
            _ => None,
        });
        from_error
            .or_else(|| self.message.clone())
            .or_else(|| self.msg.clone())
            .filter(|s| !s.trim().is_empty())
    }

    fn code(&self) -> Option<String> {
        let direct = self.code.as_ref().and_then(|value| match value {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
        direct.or_else(|| {
            self.error
                .as_ref()
                .and_then(|e| e.get("code"))
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        })
    }
}

/// Build the error for a non-2xx response.
///
/// The body is parsed as a structured error payload when possible, falling
/// back to the raw text and then to the status line.
#[must_use]
pub fn error_from_response(status: StatusCode, body: &str) -> HealthLinkError {
    let payload = serde_json::from_str::<ErrorPayload>(body).ok();
    let code = payload.as_ref().and_then(ErrorPayload::code);
    let message = payload
        .as_ref()
        .and_then(ErrorPayload::text)
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| status_line(status));

    let already_exists = status == StatusCode::CONFLICT
        || code
            .as_deref()
            .is_some_and(|c| c == PG_UNIQUE_VIOLATION || c.eq_ignore_ascii_case("already_exists"));

    if already_exists {
        return HealthLinkError::AlreadyExists { message };
    }

    let status_code = status.as_u16();
    if status.is_server_error() {
        HealthLinkError::ServerError {
            status: status_code,
            message,
        }
    } else if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        HealthLinkError::Unauthorized {
            status: status_code,
            message,
        }
    } else {
        HealthLinkError::ClientError {
            status: status_code,
            message,
        }
    }
}

fn status_line(status: StatusCode) -> String {
    status.canonical_reason().map_or_else(
        || format!("HTTP {}", status.as_u16()),
        |reason| format!("HTTP {} {reason}", status.as_u16()),
    )
}

/// Turn a response into `T`, or into a typed error for non-2xx statuses.
///
/// # Errors
///
/// Returns the mapped status error, or `ParseResponse` when a successful
/// body is not the expected JSON.
pub async fn decode_json<T: DeserializeOwned>(
    response: Response,
    host: &str,
    timeout: Duration,
) -> Result<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(&e, host, timeout))?;

    if !status.is_success() {
        return Err(error_from_response(status, &body));
    }

    // Some RPC endpoints answer 204 / empty bodies for "no row".
    let body = if body.trim().is_empty() { "null" } else { body.as_str() };
    serde_json::from_str(body).map_err(|e| HealthLinkError::ParseResponse(e.to_string()))
}
