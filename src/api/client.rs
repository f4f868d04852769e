//! `reqwest` implementation of [`ActivityApi`]

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::error::ApiError;
use super::types::{ActivitySnapshot, CreateActivityRequest, CreatedActivity};
use super::ActivityApi;
use crate::config::ApiConfig;

const OP_CREATE: &str = "create_activity";
const OP_GET: &str = "get_activity";
const OP_PUBLISH: &str = "publish_activity";

/// Every response body is wrapped as `{"data": ..., "error": ...}`
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    error: Option<serde_json::Value>,
}

/// HTTP client for the activity API
pub struct HttpActivityApi {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl HttpActivityApi {
    /// Create a client for `base_url`, sending `token` as a bearer token when present
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, ApiError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ApiError::not_configured("api.base_url"));
        }

        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::network("build_client", e.to_string()))?;

        Ok(Self {
            base_url,
            token: token.filter(|t| !t.is_empty()),
            client,
        })
    }

    /// Create from config
    ///
    /// The token is read from the environment variable named by
    /// `config.token_env`; requests go out unauthenticated when it is unset.
    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        let token = env::var(&config.token_env).ok();
        Self::new(
            &config.base_url,
            token,
            Duration::from_secs(config.timeout_secs),
            &config.user_agent,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and unwrap the response envelope
    async fn send<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Option<T>, ApiError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| ApiError::network(operation, e.to_string()))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok());

        let body = response
            .text()
            .await
            .map_err(|e| ApiError::network(operation, e.to_string()))?;

        debug!(operation, status = status.as_u16(), "activity API response");

        if !status.is_success() {
            let message = envelope_error(operation, &body)
                .map(|e| match e {
                    ApiError::Rejected { message, .. } => message,
                    other => other.to_string(),
                })
                .unwrap_or(body);
            return Err(ApiError::from_status(
                operation,
                status.as_u16(),
                retry_after,
                message,
            ));
        }

        decode_envelope(operation, &body)
    }
}

/// Decode a 2xx body, treating a populated `error` field as a failure
fn decode_envelope<T: DeserializeOwned>(
    operation: &str,
    body: &str,
) -> Result<Option<T>, ApiError> {
    if body.trim().is_empty() {
        return Ok(None);
    }

    let envelope: Envelope<T> =
        serde_json::from_str(body).map_err(|e| ApiError::decode(operation, e.to_string()))?;

    if let Some(err) = envelope.error.as_ref().and_then(|v| error_from_value(operation, v)) {
        return Err(err);
    }

    Ok(envelope.data)
}

/// Extract the error envelope from a body, if it has one
fn envelope_error(operation: &str, body: &str) -> Option<ApiError> {
    let envelope: Envelope<serde_json::Value> = serde_json::from_str(body).ok()?;
    envelope
        .error
        .as_ref()
        .and_then(|v| error_from_value(operation, v))
}

/// Interpret the `error` member of an envelope.
///
/// Accepts `"text"`, `{"code": .., "message": ..}` or any other JSON value;
/// `null` and `false` mean no error.
fn error_from_value(operation: &str, value: &serde_json::Value) -> Option<ApiError> {
    use serde_json::Value;

    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(message) => Some(ApiError::rejected(operation, None, message.clone())),
        Value::Object(map) => {
            let code = map.get("code").and_then(|c| match c {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            });
            let message = map
                .get("message")
                .and_then(Value::as_str)
                .map_or_else(|| value.to_string(), str::to_string);
            Some(ApiError::rejected(operation, code, message))
        }
        other => Some(ApiError::rejected(operation, None, other.to_string())),
    }
}

#[async_trait]
impl ActivityApi for HttpActivityApi {
    async fn create_activity(
        &self,
        request: &CreateActivityRequest,
    ) -> Result<CreatedActivity, ApiError> {
        debug!(
            organization_id = request.organization_id,
            is_online = request.is_online,
            "creating activity"
        );
        let builder = self.client.post(self.url("/activities")).json(request);
        self.send::<CreatedActivity>(OP_CREATE, builder)
            .await?
            .ok_or_else(|| ApiError::decode(OP_CREATE, "response has no data"))
    }

    async fn get_activity(&self, activity_id: i64) -> Result<ActivitySnapshot, ApiError> {
        debug!(activity_id, "fetching activity");
        let builder = self.client.get(self.url(&format!("/activities/{activity_id}")));
        self.send::<ActivitySnapshot>(OP_GET, builder)
            .await?
            .ok_or_else(|| ApiError::decode(OP_GET, "response has no data"))
    }

    async fn publish_activity(&self, activity_id: i64) -> Result<(), ApiError> {
        debug!(activity_id, "publishing activity");
        let builder = self
            .client
            .post(self.url(&format!("/activities/{activity_id}/publish")));
        self.send::<serde_json::Value>(OP_PUBLISH, builder).await?;
        Ok(())
    }
}
