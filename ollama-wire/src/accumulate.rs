//! Folding a [`ChatStream`] into one assistant message.

use futures::StreamExt;

use crate::decode::ChatStream;
use crate::error::Result;
use crate::types::{ChatDoneChunk, ChatStreamUpdate, Message, Role};

/// The assembled result of a streamed chat.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTranscript {
    /// Concatenated assistant content.
    pub message: Message,
    /// The terminal update, if the stream reached one.
    pub done: Option<ChatDoneChunk>,
    /// Number of updates consumed.
    pub updates: usize,
}

impl ChatTranscript {
    /// Whether the server finished the response (as opposed to cancellation
    /// or a connection that closed early).
    pub fn is_complete(&self) -> bool {
        self.done.is_some()
    }
}

/// Incremental builder behind [`collect_stream`], usable when the caller
/// also wants to react to each update.
#[derive(Debug, Default)]
pub struct TranscriptBuilder {
    text: String,
    done: Option<ChatDoneChunk>,
    updates: usize,
}

impl TranscriptBuilder {
    /// Start an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one update.
    pub fn push(&mut self, update: &ChatStreamUpdate) {
        self.updates += 1;
        self.text.push_str(update.content());
        if let ChatStreamUpdate::Done(done) = update {
            self.done = Some(done.clone());
        }
    }

    /// Text accumulated so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Finish and return the transcript.
    pub fn finish(self) -> ChatTranscript {
        ChatTranscript {
            message: Message::new(Role::Assistant, self.text),
            done: self.done,
            updates: self.updates,
        }
    }
}

/// Drain `stream` into a [`ChatTranscript`]. The first error is returned as-is.
pub async fn collect_stream(mut stream: ChatStream) -> Result<ChatTranscript> {
    let mut builder = TranscriptBuilder::new();
    while let Some(update) = stream.next().await {
        builder.push(&update?);
    }
    Ok(builder.finish())
}
