//! The [`ChatApi`] trait: the surface callers program against.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::decode::ChatStream;
use crate::error::Result;
use crate::types::{ChatRequest, ChatResponse, EmbedRequest, EmbedResponse, ServerVersion};

/// Chat, embedding and version operations of an Ollama-style server.
///
/// Implemented by [`OllamaClient`](crate::OllamaClient). Code that only needs
/// these operations can take `impl ChatApi` and be tested against a fake.
pub trait ChatApi: Send + Sync {
    /// `POST /api/chat` with `stream: false`; waits for the whole reply.
    fn chat(&self, request: ChatRequest) -> impl Future<Output = Result<ChatResponse>> + Send;

    /// `POST /api/chat` with `stream: true`.
    ///
    /// Resolves once response headers arrive. Status errors surface here; line
    /// decoding errors surface from the returned stream.
    fn chat_stream(
        &self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<ChatStream>> + Send;

    /// `POST /api/embed`.
    fn embed(&self, request: EmbedRequest) -> impl Future<Output = Result<EmbedResponse>> + Send;

    /// `GET /api/version`.
    fn version(&self) -> impl Future<Output = Result<ServerVersion>> + Send;
}
