//! Request gateway — the single choke point for outbound calls.
//!
//! Every request the client makes goes through [`RequestGateway::send`]:
//! - the current session token is attached as a bearer `Authorization` header
//! - a fixed timeout is applied; no response in time is a network error
//! - failure statuses are normalized into [`ClientError`]
//!
//! The gateway never mutates the session or the cache; callers react to the
//! errors it returns.

use mlstudio_config::ClientConfig;
use mlstudio_core::error::{ClientError, Result};
use mlstudio_core::transport::{HttpRequest, Method, RequestBody, Transport, TransportError};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::session::SessionHandle;

/// A successful (status < 400) response with its body parsed as JSON.
///
/// An empty body parses to `null`, which is what `DELETE` endpoints return.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    /// Decode the body into a typed value.
    pub fn json<T: DeserializeOwned>(self) -> Result<T> {
        decode(self.body)
    }
}

/// Decode a JSON value, classifying a shape mismatch as [`ClientError::Decode`].
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| ClientError::Decode(e.to_string()))
}

pub struct RequestGateway {
    transport: Arc<dyn Transport>,
    session: SessionHandle,
    base_url: String,
    timeout: Duration,
}

impl RequestGateway {
    pub fn new(
        transport: Arc<dyn Transport>,
        session: SessionHandle,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            session,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Build a gateway from configuration (base URL and timeout).
    pub fn from_config(
        config: &ClientConfig,
        transport: Arc<dyn Transport>,
        session: SessionHandle,
    ) -> Self {
        Self::new(transport, session, config.base_url(), config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one request and classify the outcome.
    pub async fn send(&self, method: Method, path: &str, body: RequestBody) -> Result<ApiResponse> {
        let request_id = Uuid::new_v4();
        let url = format!("{}{}", self.base_url, path);

        let mut headers = Vec::new();
        if let Some(token) = self.session.token() {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }

        debug!(
            %request_id,
            transport = self.transport.name(),
            method = %method,
            url = %url,
            body = body.kind(),
            authenticated = !headers.is_empty(),
            "Sending request"
        );

        let request = HttpRequest {
            method,
            url,
            headers,
            body,
            timeout: self.timeout,
        };

        let response = match tokio::time::timeout(self.timeout, self.transport.execute(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(TransportError::InvalidRequest(detail))) => {
                warn!(%request_id, error = %detail, "Request could not be built");
                return Err(ClientError::InvalidRequest(detail));
            }
            Ok(Err(e)) => {
                warn!(%request_id, error = %e, "No response from server");
                return Err(ClientError::Network(e.to_string()));
            }
            Err(_) => {
                warn!(%request_id, timeout_secs = self.timeout.as_secs(), "Request timed out");
                return Err(ClientError::Network(format!(
                    "request timed out after {}s",
                    self.timeout.as_secs()
                )));
            }
        };

        if response.status >= 400 {
            let error = classify_failure(response.status, &response.body);
            warn!(%request_id, status = response.status, error = %error, "Server returned error");
            return Err(error);
        }

        debug!(%request_id, status = response.status, bytes = response.body.len(), "Request succeeded");

        let body = if response.body.iter().all(u8::is_ascii_whitespace) {
            Value::Null
        } else {
            serde_json::from_slice(&response.body)
                .map_err(|e| ClientError::Decode(format!("response is not JSON: {e}")))?
        };

        Ok(ApiResponse {
            status: response.status,
            body,
        })
    }

    /// `GET path`, decoded.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(Method::Get, path, RequestBody::Empty).await?.json()
    }

    /// `GET path` as raw JSON; the shape the query cache stores.
    pub async fn get_value(&self, path: &str) -> Result<Value> {
        Ok(self.send(Method::Get, path, RequestBody::Empty).await?.body)
    }
}

/// Turn a failure status and its body into a [`ClientError`].
///
/// The message comes from the body's `detail` or `message` field when
/// present, else from the status text. 401 becomes [`ClientError::Auth`].
pub fn classify_failure(status: u16, body: &[u8]) -> ClientError {
    let message = extract_message(body).unwrap_or_else(|| status_text(status));
    if status == 401 {
        ClientError::Auth { message }
    } else {
        ClientError::Http { status, message }
    }
}

fn extract_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    ["detail", "message"]
        .into_iter()
        .find_map(|field| value.get(field).and_then(message_from))
}

fn message_from(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        // Request validation errors: [{"loc": [...], "msg": "...", ...}]
        Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    }
}

fn status_text(status: u16) -> String {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map(String::from)
        .unwrap_or_else(|| format!("HTTP {status}"))
}
