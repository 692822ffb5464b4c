//! Authenticated HTTP client for notification event streams.
//!
//! [`StreamClient`] issues a `GET` with `Authorization: Bearer <token>`
//! and `Accept: text/event-stream`, then hands the response body to an
//! [`EventStream`] for line framing. It never retries; reconnection is
//! the [`ConnectionRegistry`](crate::registry::ConnectionRegistry)'s job.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT, ACCESS_CONTROL_ALLOW_ORIGIN, AUTHORIZATION, CACHE_CONTROL};
use reqwest::StatusCode;

use crate::event_stream::EventStream;

/// Opens event streams. Implemented by [`StreamClient`] for HTTP and by
/// in-memory fakes in tests.
#[async_trait]
pub trait StreamConnector: Send + Sync {
    async fn open(&self, url: &str, token: &str) -> Result<EventStream, StreamClientError>;
}

/// HTTP stream builder backed by [`reqwest`].
#[derive(Debug, Clone, Default)]
pub struct StreamClient {
    client: reqwest::Client,
}

impl StreamClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Reuse an existing [`reqwest::Client`] (shared pool, custom TLS).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StreamConnector for StreamClient {
    async fn open(&self, url: &str, token: &str) -> Result<EventStream, StreamClientError> {
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| {
                tracing::debug!(url, error = %e, "Notification stream request failed");
                StreamClientError::Connection(describe(e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let allows_origin = response.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN);
            let body = response.text().await.unwrap_or_default();
            if is_cors_rejection(status, allows_origin, &body) {
                return Err(StreamClientError::Cors(body));
            }
            return Err(StreamClientError::Http {
                status: status.as_u16(),
                message: body,
            });
        }

        tracing::debug!(url, status = status.as_u16(), "Notification stream opened");

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| StreamClientError::Transport(e.to_string())));
        Ok(EventStream::from_byte_stream(body))
    }
}

/// Errors produced while opening or reading a notification stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamClientError {
    /// The request could not be sent (DNS, refused, TLS, ...).
    #[error("Connection error: {0}")]
    Connection(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The request was rejected by a cross-origin policy. Retrying cannot
    /// succeed until the backend configuration is fixed.
    #[error("Cross-origin request blocked: {0}")]
    Cors(String),

    /// The body failed mid-stream.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A single line could not be decoded; the stream itself is intact.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl StreamClientError {
    /// Whether reconnecting is pointless without operator action.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Cors(_))
    }
}

/// Message for a request that never got a response, built from the
/// error's source chain with the URL stripped.
fn describe(error: reqwest::Error) -> String {
    let error = error.without_url();
    let mut message = error.to_string();
    let mut source = std::error::Error::source(&error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// A cross-origin block is a `403` without `Access-Control-Allow-Origin`
/// whose body names the policy. Only the response body is inspected.
fn is_cors_rejection(status: StatusCode, allows_origin: bool, body: &str) -> bool {
    if status != StatusCode::FORBIDDEN || allows_origin {
        return false;
    }
    let lower = body.to_ascii_lowercase();
    lower.contains("cors") || lower.contains("cross-origin")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_with_policy_body_is_cors() {
        assert!(is_cors_rejection(
            StatusCode::FORBIDDEN,
            false,
            "Access blocked by CORS policy: No 'Access-Control-Allow-Origin'",
        ));
        assert!(is_cors_rejection(StatusCode::FORBIDDEN, false, "Cross-Origin Request Blocked"));
        assert!(StreamClientError::Cors(String::new()).is_permanent());
    }

    #[test]
    fn other_rejections_are_not_cors() {
        // The origin was allowed, so the 403 is an ordinary authorisation failure.
        assert!(!is_cors_rejection(StatusCode::FORBIDDEN, true, "CORS policy"));
        assert!(!is_cors_rejection(
            StatusCode::BAD_GATEWAY,
            false,
            "upstream cors-gateway unavailable",
        ));
        assert!(!is_cors_rejection(StatusCode::FORBIDDEN, false, "forbidden"));
    }

    #[test]
    fn ordinary_failures_are_transient() {
        assert!(!StreamClientError::Connection("connection refused".into()).is_permanent());
        assert!(!StreamClientError::Http {
            status: 502,
            message: String::new()
        }
        .is_permanent());
    }
}
