//! Error type for every public operation, and the helpers that turn HTTP
//! statuses and transport failures into it.

use reqwest::StatusCode;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by [`OllamaClient`](crate::OllamaClient) operations.
///
/// Nothing is retried internally. [`Error::is_retryable`] tells callers which
/// failures are worth wrapping in their own retry loop.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The base endpoint, a header, or the HTTP client could not be configured.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Network-level failure (connection refused, DNS, timeout, broken body stream).
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The server answered with a 4xx status.
    ///
    /// `message` is the body's `error` field when present, else the raw body text.
    #[error("api error ({status}): {message}")]
    Api {
        /// Response status.
        status: StatusCode,
        /// Extracted error message.
        message: String,
    },

    /// The server answered with any other non-success status.
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// Response status.
        status: StatusCode,
        /// Raw response body.
        body: String,
    },

    /// A response body or streamed line was not valid JSON of the expected shape.
    #[error("failed to decode {context}: {source}")]
    Decode {
        /// What was being decoded.
        context: &'static str,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// The `/api/version` payload did not contain a parseable version.
    #[error("invalid server version: {0:?}")]
    InvalidVersion(String),
}

impl Error {
    /// Whether this error is likely transient and the call may be retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::HttpStatus { status, .. } => status.is_server_error(),
            _ => false,
        }
    }

    pub(crate) fn decode(context: &'static str) -> impl FnOnce(serde_json::Error) -> Self {
        move |source| Self::Decode { context, source }
    }
}

/// Map a [`reqwest::Error`] to [`Error::Transport`].
pub(crate) fn map_reqwest_error(err: reqwest::Error) -> Error {
    Error::Transport(Box::new(err))
}

/// Classify a non-success status and its body.
///
/// 4xx statuses become [`Error::Api`]; everything else becomes
/// [`Error::HttpStatus`].
pub(crate) fn map_http_status(status: StatusCode, body: &str) -> Error {
    if status.is_client_error() {
        Error::Api {
            status,
            message: extract_error_message(body),
        }
    } else {
        Error::HttpStatus {
            status,
            body: body.to_string(),
        }
    }
}

/// Best-effort extraction of `{"error": "..."}` from a client-error body.
///
/// Parse failures are swallowed here and only here: the raw body is the fallback.
pub(crate) fn extract_error_message(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => match json.get("error").and_then(serde_json::Value::as_str) {
            Some(message) => message.to_string(),
            None => body.to_string(),
        },
        Err(e) => {
            tracing::warn!(error = %e, "client error body is not JSON, using raw text");
            body.to_string()
        }
    }
}
