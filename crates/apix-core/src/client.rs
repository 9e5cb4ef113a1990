//! Authenticated fetch client.
//!
//! Composes the [`TokenCache`] and the [`RetryingInvoker`] to fetch one
//! endpoint's rows for one date window. A rejected credential (HTTP 401 or a
//! token-shaped business error) triggers exactly one forced refresh and replay.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use time::Date;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::ConnectorConfig;
use crate::datetime::format_date;
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::retry::RetryingInvoker;
use crate::row::{rows_from_response, Row};
use crate::token_cache::TokenCache;
use crate::ConnectorError;

const AUTH_ATTEMPTS: u32 = 2;
const DEFAULT_REMOTE_MESSAGE: &str = "endpoint request failed";
const DEFAULT_UNSUCCESSFUL_MESSAGE: &str = "API returned success=false";

/// Endpoint path and the response field that governs date filtering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointDescriptor {
    pub endpoint_name: String,
    pub date_field_name: String,
}

impl EndpointDescriptor {
    pub fn new(endpoint_name: impl Into<String>, date_field_name: impl Into<String>) -> Self {
        Self {
            endpoint_name: endpoint_name.into(),
            date_field_name: date_field_name.into(),
        }
    }
}

/// Request body of every data call: inclusive start and end dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatePayload {
    pub data_inicio: String,
    pub data_termino: String,
}

impl DatePayload {
    pub fn new(start: Date, end: Date) -> Self {
        Self {
            data_inicio: format_date(start),
            data_termino: format_date(end),
        }
    }
}

/// Shared client for one tenant. Cheap to clone; clones share the credential
/// cache and the cancellation token.
#[derive(Clone)]
pub struct ApiClient {
    config: Arc<ConnectorConfig>,
    invoker: RetryingInvoker,
    tokens: Arc<TokenCache>,
    cancel: CancellationToken,
}

impl ApiClient {
    /// Client over the production reqwest transport.
    pub fn new(config: ConnectorConfig) -> Self {
        let transport = ReqwestHttpClient::new(config.connect_timeout());
        Self::with_http_client(config, Arc::new(transport), CancellationToken::new())
    }

    pub fn with_http_client(
        config: ConnectorConfig,
        http: Arc<dyn HttpClient>,
        cancel: CancellationToken,
    ) -> Self {
        let tokens =
            TokenCache::with_validity(config.token_validity(), config.token_refresh_skew());
        let invoker = RetryingInvoker::new(http, config.retry_config(), cancel.clone());
        Self {
            config: Arc::new(config),
            invoker,
            tokens: Arc::new(tokens),
            cancel,
        }
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    pub fn token_cache(&self) -> &TokenCache {
        &self.tokens
    }

    /// Token that aborts every in-flight send and backoff of this client.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Fetches the rows of `endpoint` between `start` and `end`, inclusive.
    pub async fn fetch_rows(
        &self,
        endpoint: &EndpointDescriptor,
        start: Date,
        end: Date,
    ) -> Result<Vec<Row>, ConnectorError> {
        let body = self
            .request_endpoint_data(&endpoint.endpoint_name, &DatePayload::new(start, end))
            .await?;
        let rows = rows_from_response(&body);
        debug!(
            endpoint = %endpoint.endpoint_name,
            start = %format_date(start),
            end = %format_date(end),
            rows = rows.len(),
            "fetched endpoint rows"
        );
        Ok(rows)
    }

    /// Posts `payload` to the data endpoint and returns the parsed body of a
    /// successful response.
    pub async fn request_endpoint_data(
        &self,
        endpoint_name: &str,
        payload: &DatePayload,
    ) -> Result<Value, ConnectorError> {
        let body = serde_json::to_string(payload)
            .map_err(|e| ConnectorError::invalid_response(e.to_string()))?;
        let url = join_url(
            &self.config.base_url,
            &format!("/api/{}/{}", self.config.tenant, endpoint_name),
        );

        for auth_attempt in 0..AUTH_ATTEMPTS {
            let token = self
                .tokens
                .get_valid_token(auth_attempt > 0, || self.issue_token())
                .await?;

            let request = HttpRequest::post(url.clone())
                .bearer(token)
                .json(body.clone())
                .timeout(self.config.read_timeout());
            let response = self.invoker.send(&request).await?;

            if response.status == 401 {
                warn!(endpoint = endpoint_name, auth_attempt, "credential rejected with HTTP 401");
                self.tokens.invalidate();
                continue;
            }

            let parsed = serde_json::from_str::<Value>(&response.body);
            if let Ok(parsed) = &parsed {
                if is_invalid_token_response(parsed) {
                    warn!(endpoint = endpoint_name, auth_attempt, "credential rejected by API");
                    self.tokens.invalidate();
                    continue;
                }
            }

            if !response.is_success() {
                let message = parsed
                    .ok()
                    .as_ref()
                    .and_then(api_message)
                    .unwrap_or(DEFAULT_REMOTE_MESSAGE)
                    .to_owned();
                return Err(ConnectorError::RemoteRequest {
                    endpoint: endpoint_name.to_owned(),
                    status: response.status,
                    message,
                });
            }

            let parsed = parsed.map_err(|e| ConnectorError::invalid_response(e.to_string()))?;
            if !parsed.get("success").and_then(Value::as_bool).unwrap_or(false) {
                return Err(ConnectorError::RemoteRequest {
                    endpoint: endpoint_name.to_owned(),
                    status: response.status,
                    message: api_message(&parsed)
                        .unwrap_or(DEFAULT_UNSUCCESSFUL_MESSAGE)
                        .to_owned(),
                });
            }
            return Ok(parsed);
        }

        Err(ConnectorError::AuthenticationExhausted)
    }

    /// Issues a new bearer token. Called by the token cache under its refresh
    /// lock.
    async fn issue_token(&self) -> Result<String, ConnectorError> {
        let url = join_url(
            &self.config.base_url,
            &format!(
                "/api/auth/{}/key?code={}",
                self.config.tenant,
                urlencoding::encode(self.config.auth_code())
            ),
        );
        let request = HttpRequest::post(url).timeout(self.config.read_timeout());

        let response = self.invoker.send(&request).await?;
        if !response.is_success() {
            return Err(ConnectorError::authentication(format!(
                "token issuance failed (HTTP {})",
                response.status
            )));
        }

        let payload = serde_json::from_str::<Value>(&response.body)
            .map_err(|e| ConnectorError::invalid_response(e.to_string()))?;
        match payload.get("token").and_then(Value::as_str) {
            Some(token) if !token.trim().is_empty() => Ok(token.to_owned()),
            _ => Err(ConnectorError::authentication("issuance response has no token")),
        }
    }
}

fn api_message(body: &Value) -> Option<&str> {
    body.get("message").and_then(Value::as_str)
}

/// A body counts as a credential rejection only when it explicitly reports
/// `success: false` with a token-expiry message. The wording match is
/// case-insensitive and tied to the API's current Portuguese/English phrasing.
fn is_invalid_token_response(body: &Value) -> bool {
    if body.get("success").and_then(Value::as_bool).unwrap_or(true) {
        return false;
    }

    let message = api_message(body).unwrap_or_default().to_lowercase();
    message.contains("token")
        && (message.contains("expir") || message.contains("invál") || message.contains("invalid"))
}

/// Joins `base` and `path` with exactly one slash between them.
fn join_url(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{base}{}", &path[1..]),
        (false, false) => format!("{base}/{path}"),
        _ => format!("{base}{path}"),
    }
}
