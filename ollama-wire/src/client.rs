//! The HTTP client.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::api::ChatApi;
use crate::config::ClientConfig;
use crate::decode::{ChatStream, decode_chat_stream, decode_inbound};
use crate::error::{Error, Result};
use crate::headers::HeaderSet;
use crate::request::OutboundRequest;
use crate::transport::{CompletionMode, Transport};
use crate::types::{
    ChatRequest, ChatResponse, EmbedRequest, EmbedResponse, ListModelsResponse, ModelInfo,
    ServerVersion, VersionResponse, WireRequest,
};

/// Chat endpoint, relative to the base endpoint.
pub const CHAT_PATH: &str = "api/chat";
/// Embedding endpoint.
pub const EMBED_PATH: &str = "api/embed";
/// Version endpoint.
pub const VERSION_PATH: &str = "api/version";
/// Installed-models endpoint.
pub const TAGS_PATH: &str = "api/tags";

/// Client for an Ollama-style server.
///
/// Cloning is cheap and clones share the connection pool. The configuration
/// and default headers are frozen at construction, so concurrent calls never
/// observe each other's per-request headers.
///
/// ```no_run
/// use ollama_wire::{ChatApi, ChatRequest, ClientConfig, OllamaClient};
///
/// # async fn run() -> ollama_wire::Result<()> {
/// let client = OllamaClient::new(ClientConfig::new("http://localhost:11434")?.model("llama3"))?;
/// let reply = client.chat(ChatRequest::user("Why is the sky blue?")).await?;
/// println!("{}", reply.message.content);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct OllamaClient {
    config: Arc<ClientConfig>,
    defaults: Arc<HeaderSet>,
    transport: Transport,
}

impl OllamaClient {
    /// Create a client with its own HTTP connection pool.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| Error::Configuration(format!("cannot build HTTP client: {e}")))?;
        Ok(Self::with_http_client(config, http))
    }

    /// Create a client on top of an existing HTTP client.
    ///
    /// The configured timeout is ignored; `http` keeps its own settings.
    pub fn with_http_client(config: ClientConfig, http: reqwest::Client) -> Self {
        let defaults = config.effective_headers();
        Self {
            config: Arc::new(config),
            defaults: Arc::new(defaults),
            transport: Transport::new(http),
        }
    }

    /// Create a client from `OLLAMA_HOST` / `OLLAMA_MODEL`.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// The frozen configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `GET /api/tags`: models installed on the server.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response: ListModelsResponse = self.get(TAGS_PATH, "model list").await?;
        Ok(response.models)
    }

    fn resolve_model(&self, model: &mut String) {
        if model.trim().is_empty() {
            *model = self.config.default_model().to_string();
        }
    }

    async fn post<R, T>(&self, path: &str, request: &R, context: &'static str) -> Result<T>
    where
        R: WireRequest + Sync,
        T: DeserializeOwned,
    {
        let outbound = OutboundRequest::post(&self.config, &self.defaults, path, request)?;
        let inbound = self.transport.send(outbound, CompletionMode::Buffered).await?;
        decode_inbound(inbound, context).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, context: &'static str) -> Result<T> {
        let outbound = OutboundRequest::get(&self.config, &self.defaults, path)?;
        let inbound = self.transport.send(outbound, CompletionMode::Buffered).await?;
        decode_inbound(inbound, context).await
    }
}

impl ChatApi for OllamaClient {
    fn chat(&self, mut request: ChatRequest) -> impl Future<Output = Result<ChatResponse>> + Send {
        async move {
            self.resolve_model(&mut request.model);
            request.stream = false;
            tracing::debug!(model = %request.model, messages = request.messages.len(), "chat request");
            self.post(CHAT_PATH, &request, "chat response").await
        }
    }

    fn chat_stream(
        &self,
        mut request: ChatRequest,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<ChatStream>> + Send {
        async move {
            self.resolve_model(&mut request.model);
            request.stream = true;
            tracing::debug!(model = %request.model, messages = request.messages.len(), "streaming chat request");

            let outbound = OutboundRequest::post(&self.config, &self.defaults, CHAT_PATH, &request)?;
            let inbound = self.transport.send(outbound, CompletionMode::Streaming).await?;
            Ok(decode_chat_stream(inbound, cancel))
        }
    }

    fn embed(&self, mut request: EmbedRequest) -> impl Future<Output = Result<EmbedResponse>> + Send {
        async move {
            self.resolve_model(&mut request.model);
            tracing::debug!(model = %request.model, inputs = request.input.len(), "embed request");
            self.post(EMBED_PATH, &request, "embed response").await
        }
    }

    fn version(&self) -> impl Future<Output = Result<ServerVersion>> + Send {
        async move {
            let response: VersionResponse = self.get(VERSION_PATH, "version response").await?;
            response.version.parse()
        }
    }
}
