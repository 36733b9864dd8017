//! Sends outbound requests and turns non-success statuses into [`Error`](crate::Error)s.

use std::pin::Pin;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::StatusCode;

use crate::error::{Result, map_http_status, map_reqwest_error};
use crate::request::OutboundRequest;

/// Raw response body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send>>;

/// When [`Transport::send`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionMode {
    /// After the whole body has been read.
    Buffered,
    /// As soon as the status and headers arrive; the body is read later.
    Streaming,
}

/// A successful response.
#[derive(Debug)]
pub struct Inbound {
    status: StatusCode,
    body: InboundBody,
}

#[derive(Debug)]
enum InboundBody {
    Buffered(Bytes),
    Streaming(reqwest::Response),
}

impl Inbound {
    /// Response status (always 2xx).
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Read the whole body. Its encoding is the decoder's concern.
    pub async fn bytes(self) -> Result<Bytes> {
        match self.body {
            InboundBody::Buffered(bytes) => Ok(bytes),
            InboundBody::Streaming(response) => response.bytes().await.map_err(map_reqwest_error),
        }
    }

    /// Consume the body incrementally.
    pub fn into_byte_stream(self) -> ByteStream {
        match self.body {
            InboundBody::Buffered(bytes) => {
                futures::stream::once(async move { Ok::<_, reqwest::Error>(bytes) }).boxed()
            }
            InboundBody::Streaming(response) => response.bytes_stream().boxed(),
        }
    }
}

/// HTTP transport. Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct Transport {
    http: reqwest::Client,
}

impl Transport {
    /// Wrap an existing HTTP client.
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Send `request` once.
    ///
    /// 4xx responses fail with [`Error::Api`](crate::Error::Api), other
    /// non-success statuses with [`Error::HttpStatus`](crate::Error::HttpStatus).
    /// No retries.
    pub async fn send(&self, request: OutboundRequest, mode: CompletionMode) -> Result<Inbound> {
        tracing::debug!(method = %request.method(), url = %request.url(), ?mode, "sending request");

        let response = request
            .into_reqwest(&self.http)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.map_err(map_reqwest_error)?;
            tracing::debug!(%status, "request failed");
            return Err(map_http_status(status, &body));
        }

        let body = match mode {
            CompletionMode::Buffered => {
                InboundBody::Buffered(response.bytes().await.map_err(map_reqwest_error)?)
            }
            CompletionMode::Streaming => InboundBody::Streaming(response),
        };
        Ok(Inbound { status, body })
    }
}
