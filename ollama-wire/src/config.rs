//! Client configuration: base endpoint, default model, credentials and default headers.

use std::fmt;
use std::time::Duration;

use reqwest::Url;

use crate::error::{Error, Result};
use crate::headers::HeaderSet;

/// Default base endpoint of a local server.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Model used when neither the request nor the configuration names one.
pub const DEFAULT_MODEL: &str = "llama3.2";

/// Environment variable holding the server address.
pub const HOST_ENV_VAR: &str = "OLLAMA_HOST";

/// Environment variable holding the default model.
pub const MODEL_ENV_VAR: &str = "OLLAMA_MODEL";

/// Configuration for [`OllamaClient`](crate::OllamaClient).
///
/// Built once and handed to the client, which keeps an immutable copy.
///
/// ```
/// use ollama_wire::ClientConfig;
///
/// let config = ClientConfig::new("http://localhost:11434")?
///     .model("llama3")
///     .default_header("x-team", "research");
/// assert_eq!(config.endpoint().as_str(), "http://localhost:11434/");
/// # Ok::<(), ollama_wire::Error>(())
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    endpoint: Url,
    model: String,
    api_key: Option<String>,
    api_secret: Option<String>,
    jwt_token: Option<String>,
    default_headers: HeaderSet,
    timeout: Option<Duration>,
}

impl ClientConfig {
    /// Parse and validate `endpoint`.
    ///
    /// The endpoint must be an absolute `http` or `https` URI. Its path is
    /// normalised to end in `/` so relative API paths never replace the last
    /// base segment.
    pub fn new(endpoint: &str) -> Result<Self> {
        let url = Url::parse(endpoint)
            .map_err(|e| Error::Configuration(format!("invalid endpoint {endpoint:?}: {e}")))?;
        Self::from_url(url)
    }

    /// Validate an already-parsed endpoint.
    pub fn from_url(mut endpoint: Url) -> Result<Self> {
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(Error::Configuration(format!(
                "unsupported endpoint scheme {:?}",
                endpoint.scheme()
            )));
        }
        if endpoint.cannot_be_a_base() || endpoint.host_str().is_none() {
            return Err(Error::Configuration(format!(
                "endpoint {endpoint} cannot be used as a base URI"
            )));
        }
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }
        endpoint.set_query(None);
        endpoint.set_fragment(None);

        Ok(Self {
            endpoint,
            model: DEFAULT_MODEL.into(),
            api_key: None,
            api_secret: None,
            jwt_token: None,
            default_headers: HeaderSet::new(),
            timeout: None,
        })
    }

    /// Build a configuration from `OLLAMA_HOST` and `OLLAMA_MODEL`.
    ///
    /// A host without a scheme (`127.0.0.1:11434`) is treated as `http`.
    /// Missing variables fall back to [`DEFAULT_ENDPOINT`] and [`DEFAULT_MODEL`].
    pub fn from_env() -> Result<Self> {
        Self::from_env_values(
            std::env::var(HOST_ENV_VAR).ok(),
            std::env::var(MODEL_ENV_VAR).ok(),
        )
    }

    fn from_env_values(host: Option<String>, model: Option<String>) -> Result<Self> {
        let endpoint = match host.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_ENDPOINT.to_string(),
            Some(h) if h.contains("://") => h.to_string(),
            Some(h) => format!("http://{h}"),
        };
        let config = Self::new(&endpoint)?;
        Ok(match model.filter(|m| !m.trim().is_empty()) {
            Some(m) => config.model(m),
            None => config,
        })
    }

    /// Override the default model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Attach an API key, sent as a bearer token.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Carry an API secret alongside the key. It is never transmitted.
    #[must_use]
    pub fn api_secret(mut self, secret: impl Into<String>) -> Self {
        self.api_secret = Some(secret.into());
        self
    }

    /// Attach a JWT, sent as a bearer token. Takes precedence over [`api_key`](Self::api_key).
    #[must_use]
    pub fn jwt_token(mut self, token: impl Into<String>) -> Self {
        self.jwt_token = Some(token.into());
        self
    }

    /// Add a header sent with every request. Later calls for the same name win.
    #[must_use]
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    /// Replace all default headers.
    #[must_use]
    pub fn default_headers(mut self, headers: HeaderSet) -> Self {
        self.default_headers = headers;
        self
    }

    /// Per-request timeout applied by the HTTP client. Unset means no timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The normalised base endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The default model identifier.
    pub fn default_model(&self) -> &str {
        &self.model
    }

    /// The configured API secret, if any.
    pub fn secret(&self) -> Option<&str> {
        self.api_secret.as_deref()
    }

    /// The configured request timeout, if any.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Resolve an API path (e.g. `api/chat`) against the base endpoint.
    pub fn resolve(&self, path: &str) -> Result<Url> {
        self.endpoint
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::Configuration(format!("cannot resolve {path:?}: {e}")))
    }

    /// Default headers as sent on the wire: the bearer credential, if any,
    /// overlaid by the explicitly configured defaults.
    pub fn effective_headers(&self) -> HeaderSet {
        let mut headers = HeaderSet::new();
        if let Some(token) = self.jwt_token.as_ref().or(self.api_key.as_ref()) {
            headers.insert("Authorization", format!("Bearer {token}"));
        }
        headers.overlay(&self.default_headers)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint.as_str())
            .field("model", &self.model)
            .field("api_key", &redact(&self.api_key))
            .field("api_secret", &redact(&self.api_secret))
            .field("jwt_token", &redact(&self.jwt_token))
            .field("default_headers", &self.default_headers)
            .field("timeout", &self.timeout)
            .finish()
    }
}
