#![deny(missing_docs)]
//! Client for Ollama-style chat and embedding servers.
//!
//! Every call goes through the same three steps:
//!
//! 1. **Build** an [`OutboundRequest`]: resolve the path against the base
//!    endpoint, serialize the body, layer client default headers and then the
//!    request's custom headers (same-named headers are replaced, never duplicated).
//! 2. **Send** it through the [`Transport`]. 4xx responses become
//!    [`Error::Api`] carrying the body's `error` field (or the raw body);
//!    other failures become [`Error::HttpStatus`].
//! 3. **Decode** the body: once for regular calls, or line by line for
//!    [`ChatApi::chat_stream`], where each line is a [`ChatChunk`] and the line
//!    with `done: true` becomes a [`ChatDoneChunk`] carrying completion
//!    statistics.
//!
//! ```no_run
//! use futures::StreamExt;
//! use ollama_wire::{ChatApi, ChatRequest, ChatStreamUpdate, OllamaClient};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> ollama_wire::Result<()> {
//! let client = OllamaClient::from_env()?;
//! let mut stream = client
//!     .chat_stream(ChatRequest::user("Tell me a joke"), CancellationToken::new())
//!     .await?;
//! while let Some(update) = stream.next().await {
//!     match update? {
//!         ChatStreamUpdate::Chunk(chunk) => print!("{}", chunk.content()),
//!         ChatStreamUpdate::Done(done) => println!("\n[{} tokens]", done.stats.eval_count),
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The crate never retries and never installs a `tracing` subscriber.

pub mod accumulate;
pub mod api;
pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod headers;
pub mod request;
pub mod transport;
pub mod types;

pub use accumulate::{ChatTranscript, TranscriptBuilder, collect_stream};
pub use api::ChatApi;
pub use client::OllamaClient;
pub use config::ClientConfig;
pub use decode::{ChatStream, decode_line, decode_once, decode_stream};
pub use error::{Error, Result};
pub use headers::HeaderSet;
pub use request::OutboundRequest;
pub use transport::{CompletionMode, Inbound, Transport};
pub use types::{
    ChatChunk, ChatDoneChunk, ChatRequest, ChatResponse, ChatStreamUpdate, CompletionStats,
    EmbedRequest, EmbedResponse, KeepAlive, Message, ModelInfo, ModelOptions, Role,
    ServerVersion, WireRequest,
};

pub use tokio_util::sync::CancellationToken;
