//! API gateway. Every outbound HTTP call goes through here.
//!
//! Attaches the bearer credential, serializes JSON bodies and turns every
//! failure into an [`HttpError`]. No retries and no shared state.

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

pub use reqwest::Method;

use crate::config::ClientConfig;
use crate::error::HttpError;
use crate::session::AccessToken;

/// Thin wrapper over a `reqwest::Client` bound to one backend.
#[derive(Clone, Debug)]
pub struct ApiGateway {
    http: Client,
    base_url: Url,
}

impl ApiGateway {
    pub fn new(config: &ClientConfig) -> Result<Self, HttpError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| HttpError::Network(format!("http client init: {e}")))?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Issue one request and return the decoded JSON body.
    ///
    /// An empty success body decodes to `Value::Null`.
    pub async fn request<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        token: Option<&AccessToken>,
    ) -> Result<Value, HttpError>
    where
        B: Serialize + ?Sized,
    {
        let url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| HttpError::Network(format!("invalid request path {path:?}: {e}")))?;

        debug!(method = %method, path, authenticated = token.is_some(), "api request");

        let mut builder = self.http.request(method.clone(), url);
        if let Some(token) = token {
            builder = builder.bearer_auth(token.as_str());
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(|e| {
            warn!(method = %method, path, error = %e, "api request failed");
            HttpError::Network(e.to_string())
        })?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| HttpError::Network(format!("reading response body: {e}")))?;

        if !status.is_success() {
            let err = error_for_status(status, &bytes);
            warn!(method = %method, path, status = status.as_u16(), error = %err, "api error response");
            return Err(err);
        }

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| {
            warn!(method = %method, path, error = %e, "malformed JSON response");
            HttpError::Decode(e.to_string())
        })
    }

    /// [`request`](Self::request), then decode into `T`.
    pub async fn request_json<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        token: Option<&AccessToken>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let value = self.request(method, path, body, token).await?;
        decode(value)
    }
}

/// Decode a JSON value into a typed response.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, HttpError> {
    serde_json::from_value(value).map_err(|e| HttpError::Decode(format!("unexpected shape: {e}")))
}

/// Map a non-2xx response to the error taxonomy.
pub(crate) fn error_for_status(status: StatusCode, body: &[u8]) -> HttpError {
    let detail = extract_detail(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => HttpError::Unauthorized {
            status: status.as_u16(),
            detail,
        },
        StatusCode::NOT_FOUND => HttpError::NotFound { detail },
        _ => HttpError::Server {
            status: status.as_u16(),
            detail,
        },
    }
}

/// Pull a human-readable message out of an error body.
///
/// Understands `{"detail": ...}` (string or structured) and
/// `{"error": ..., "message": ...}`; falls back to short plain-text bodies.
fn extract_detail(body: &[u8]) -> Option<String> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => match map.get("detail").or_else(|| map.get("message")) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        },
        Ok(_) => None,
        Err(_) => {
            let text = std::str::from_utf8(body).ok()?.trim();
            (!text.is_empty() && text.len() <= 200).then(|| text.to_string())
        }
    }
}
