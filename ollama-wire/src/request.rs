//! Outbound request construction. Pure: no I/O happens here.

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, Url};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::headers::HeaderSet;
use crate::types::WireRequest;

/// A fully built HTTP request, ready for the transport.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<String>,
}

impl OutboundRequest {
    /// Build a JSON `POST` to `path`.
    ///
    /// Header precedence, lowest first: `content-type`, `defaults`, then the
    /// request's custom headers. Each layer replaces same-named headers.
    /// The body is compact JSON; non-ASCII text is written as-is.
    pub fn post<R: WireRequest>(
        config: &ClientConfig,
        defaults: &HeaderSet,
        path: &str,
        request: &R,
    ) -> Result<Self> {
        let body = serde_json::to_string(request)
            .map_err(|e| Error::Configuration(format!("cannot serialize request body: {e}")))?;
        Self::build(
            config,
            defaults,
            Method::POST,
            path,
            Some(body),
            Some(request.custom_headers()),
        )
    }

    /// Build a bodiless `GET` to `path` carrying only the default headers.
    pub fn get(config: &ClientConfig, defaults: &HeaderSet, path: &str) -> Result<Self> {
        Self::build(config, defaults, Method::GET, path, None, None)
    }

    fn build(
        config: &ClientConfig,
        defaults: &HeaderSet,
        method: Method,
        path: &str,
        body: Option<String>,
        custom: Option<&HeaderSet>,
    ) -> Result<Self> {
        let url = config.resolve(path)?;

        let mut headers = HeaderMap::new();
        if body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        defaults.apply_to(&mut headers)?;
        if let Some(custom) = custom {
            custom.apply_to(&mut headers)?;
        }

        Ok(Self {
            method,
            url,
            headers,
            body,
        })
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Absolute target URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Headers to send.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Serialized JSON body, if any.
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub(crate) fn into_reqwest(self, client: &reqwest::Client) -> reqwest::RequestBuilder {
        let builder = client.request(self.method, self.url).headers(self.headers);
        match self.body {
            Some(body) => builder.body(body),
            None => builder,
        }
    }
}
