//! Request and response types for the `/api/chat`, `/api/embed`,
//! `/api/version` and `/api/tags` endpoints.
//!
//! Streaming chat responses arrive as one JSON object per line:
//! ```text
//! {"model":"llama3","created_at":"2024-01-01T00:00:00Z","message":{"role":"assistant","content":"Hel"},"done":false}
//! {"model":"llama3","created_at":"2024-01-01T00:00:01Z","message":{"role":"assistant","content":"lo"},"done":false}
//! {"model":"llama3","created_at":"2024-01-01T00:00:02Z","message":{"role":"assistant","content":""},"done":true,"done_reason":"stop","eval_count":2,...}
//! ```
//! Every line shares the [`ChatChunk`] shape; only the last one carries
//! [`CompletionStats`], and is surfaced as [`ChatStreamUpdate::Done`].

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::headers::HeaderSet;

/// A request body that can travel through the request builder.
pub trait WireRequest: Serialize {
    /// Headers layered over the client defaults for this request only.
    fn custom_headers(&self) -> &HeaderSet;
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions that steer the model.
    System,
    /// The human side of the conversation.
    User,
    /// The model.
    Assistant,
}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who wrote the message.
    pub role: Role,
    /// Text content.
    pub content: String,
}

impl Message {
    /// Create a message with the given role.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// A system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// An assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Generation options passed through as the `options` object.
///
/// Unknown server options can be set through `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelOptions {
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Nucleus sampling cutoff.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Top-k sampling cutoff.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    /// Context window size in tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_ctx: Option<u32>,
    /// Maximum tokens to generate (`-1` for unlimited).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<i32>,
    /// Random seed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    /// Stop sequences.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    /// Any other option, serialized verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// `POST /api/chat` request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChatRequest {
    /// Model identifier. Empty means the client's default model.
    pub model: String,
    /// Conversation so far, in order.
    pub messages: Vec<Message>,
    /// Generation options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<ModelOptions>,
    /// Whether the server should stream. The client sets this per call.
    pub stream: bool,
    /// Per-request header overrides.
    #[serde(skip)]
    pub custom_headers: HeaderSet,
}

impl ChatRequest {
    /// A request for `model` with the given messages.
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            ..Default::default()
        }
    }

    /// A single user message addressed to the client's default model.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(String::new(), vec![Message::user(content)])
    }

    /// Set generation options.
    #[must_use]
    pub fn options(mut self, options: ModelOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Add a header for this request only.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.insert(name, value);
        self
    }
}

impl WireRequest for ChatRequest {
    fn custom_headers(&self) -> &HeaderSet {
        &self.custom_headers
    }
}

/// How long the server keeps a model loaded after a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeepAlive {
    /// Seconds; negative keeps the model loaded indefinitely.
    Seconds(i64),
    /// A duration string such as `"5m"`.
    Duration(String),
}

/// `POST /api/embed` request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EmbedRequest {
    /// Model identifier. Empty means the client's default model.
    pub model: String,
    /// Texts to embed, in order.
    pub input: Vec<String>,
    /// Generation options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<ModelOptions>,
    /// Truncate inputs that exceed the context length instead of failing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncate: Option<bool>,
    /// Model residency after the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<KeepAlive>,
    /// Per-request header overrides.
    #[serde(skip)]
    pub custom_headers: HeaderSet,
}

impl EmbedRequest {
    /// Embed `input` with `model`.
    pub fn new<I, S>(model: impl Into<String>, input: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            model: model.into(),
            input: input.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Add a header for this request only.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.insert(name, value);
        self
    }
}

impl WireRequest for EmbedRequest {
    fn custom_headers(&self) -> &HeaderSet {
        &self.custom_headers
    }
}

/// Statistics reported once generation has finished.
///
/// Durations are nanoseconds, as sent by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionStats {
    /// Why generation stopped (`"stop"`, `"length"`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,
    /// Tokens generated.
    #[serde(default)]
    pub eval_count: u64,
    /// Time spent generating.
    #[serde(default)]
    pub eval_duration: u64,
    /// Time spent loading the model.
    #[serde(default)]
    pub load_duration: u64,
    /// Wall time for the whole request.
    #[serde(default)]
    pub total_duration: u64,
    /// Tokens in the prompt.
    #[serde(default)]
    pub prompt_eval_count: u64,
    /// Time spent evaluating the prompt.
    #[serde(default)]
    pub prompt_eval_duration: u64,
}

impl CompletionStats {
    /// Wall time for the whole request.
    pub fn total(&self) -> Duration {
        Duration::from_nanos(self.total_duration)
    }

    /// Generation throughput, if any time was spent generating.
    pub fn tokens_per_second(&self) -> Option<f64> {
        if self.eval_duration == 0 {
            return None;
        }
        Some(self.eval_count as f64 / Duration::from_nanos(self.eval_duration).as_secs_f64())
    }
}

/// Non-streaming `POST /api/chat` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Model that produced the reply.
    pub model: String,
    /// Creation time as sent by the server.
    #[serde(default)]
    pub created_at: Option<String>,
    /// The assistant's reply.
    pub message: Message,
    /// Always `true` for a complete response.
    pub done: bool,
    /// Statistics, when the server includes them.
    #[serde(flatten)]
    pub stats: CompletionStats,
}

impl ChatResponse {
    /// `created_at` as a timestamp, if present and well-formed.
    pub fn created_at(&self) -> Option<DateTime<FixedOffset>> {
        parse_timestamp(self.created_at.as_deref())
    }
}

/// One line of a streaming chat response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatChunk {
    /// Model producing the stream.
    pub model: String,
    /// Creation time as sent by the server.
    #[serde(default)]
    pub created_at: Option<String>,
    /// Partial assistant message.
    #[serde(default)]
    pub message: Option<Message>,
    /// Whether this is the last line.
    pub done: bool,
}

impl ChatChunk {
    /// `created_at` as a timestamp. A missing or malformed value yields `None`.
    pub fn created_at(&self) -> Option<DateTime<FixedOffset>> {
        parse_timestamp(self.created_at.as_deref())
    }

    /// Content carried by this chunk, or `""`.
    pub fn content(&self) -> &str {
        self.message.as_ref().map_or("", |m| m.content.as_str())
    }
}

/// The final line of a streaming chat response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatDoneChunk {
    /// Fields shared with every other line.
    #[serde(flatten)]
    pub chunk: ChatChunk,
    /// Completion statistics only the final line carries.
    #[serde(flatten)]
    pub stats: CompletionStats,
}

/// An element of a chat stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatStreamUpdate {
    /// An intermediate line (`done == false`).
    Chunk(ChatChunk),
    /// The terminal line (`done == true`) with completion statistics.
    Done(ChatDoneChunk),
}

impl ChatStreamUpdate {
    /// The shared line fields.
    pub fn chunk(&self) -> &ChatChunk {
        match self {
            Self::Chunk(chunk) => chunk,
            Self::Done(done) => &done.chunk,
        }
    }

    /// Whether this is the terminal update.
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    /// Content carried by this update, or `""`.
    pub fn content(&self) -> &str {
        self.chunk().content()
    }

    /// Completion statistics, only present on the terminal update.
    pub fn stats(&self) -> Option<&CompletionStats> {
        match self {
            Self::Chunk(_) => None,
            Self::Done(done) => Some(&done.stats),
        }
    }
}

/// `POST /api/embed` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedResponse {
    /// Model that produced the embeddings.
    #[serde(default)]
    pub model: Option<String>,
    /// One vector per input, in input order.
    pub embeddings: Vec<Vec<f32>>,
    /// Wall time for the whole request, in nanoseconds.
    #[serde(default)]
    pub total_duration: Option<u64>,
    /// Time spent loading the model, in nanoseconds.
    #[serde(default)]
    pub load_duration: Option<u64>,
    /// Tokens processed.
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
}

/// A model installed on the server, from `GET /api/tags`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model name, e.g. `llama3:latest`.
    pub name: String,
    /// Last modification time as sent by the server.
    pub modified_at: String,
    /// Size on disk in bytes.
    pub size: u64,
    /// Content digest.
    pub digest: String,
}

impl ModelInfo {
    /// `modified_at` as a timestamp, if well-formed.
    pub fn modified_at(&self) -> Option<DateTime<FixedOffset>> {
        parse_timestamp(Some(&self.modified_at))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListModelsResponse {
    pub models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VersionResponse {
    pub version: String,
}

/// A server version such as `0.5.7` or `0.1.32-rc1`.
///
/// Ordered by numeric components first. A pre-release sorts before the
/// release it precedes, and pre-release tags compare as plain strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerVersion {
    /// Major component.
    pub major: u64,
    /// Minor component.
    pub minor: u64,
    /// Patch component (`0` when omitted).
    pub patch: u64,
    /// Pre-release suffix after `-`, if any.
    pub pre: Option<String>,
}

impl ServerVersion {
    /// Whether this version is at least `major.minor.patch`, ignoring pre-release tags.
    pub fn at_least(&self, major: u64, minor: u64, patch: u64) -> bool {
        (self.major, self.minor, self.patch) >= (major, minor, patch)
    }
}

impl Ord for ServerVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for ServerVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for ServerVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidVersion(s.to_string());
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let (numbers, pre) = match trimmed.split_once('-') {
            Some((numbers, pre)) if !pre.is_empty() => (numbers, Some(pre.to_string())),
            Some(_) => return Err(invalid()),
            None => (trimmed, None),
        };

        let parts = numbers
            .split('.')
            .map(|p| p.parse::<u64>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        let (major, minor, patch) = match parts.as_slice() {
            [major, minor] => (*major, *minor, 0),
            [major, minor, patch] => (*major, *minor, *patch),
            _ => return Err(invalid()),
        };

        Ok(Self {
            major,
            minor,
            patch,
            pre,
        })
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{pre}")?;
        }
        Ok(())
    }
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw?).ok()
}
