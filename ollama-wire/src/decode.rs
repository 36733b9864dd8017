//! Response decoding.
//!
//! Non-streaming bodies are read whole and deserialized once. Streaming chat
//! bodies are read one line at a time; each line is decoded on its own as a
//! [`ChatChunk`], and a line whose `done` flag is set is decoded a second time
//! as a [`ChatDoneChunk`] so the caller receives the completion statistics.

use std::io;
use std::pin::Pin;

use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use serde::de::DeserializeOwned;
use tokio::io::AsyncBufReadExt;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::transport::Inbound;
use crate::types::{ChatChunk, ChatDoneChunk, ChatStreamUpdate};

/// A lazy, single-pass sequence of chat updates.
///
/// Ends after the terminal update, at end of body, or on cancellation.
/// A malformed line yields one `Err` and ends the sequence. Dropping the
/// stream releases the underlying connection.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<ChatStreamUpdate>> + Send>>;

/// Deserialize a complete body.
///
/// Bytes that are not UTF-8 fail here as [`Error::Decode`], like any other
/// malformed JSON.
pub fn decode_once<T: DeserializeOwned>(body: impl AsRef<[u8]>, context: &'static str) -> Result<T> {
    serde_json::from_slice(body.as_ref()).map_err(Error::decode(context))
}

/// Read an inbound body to the end and deserialize it.
pub async fn decode_inbound<T: DeserializeOwned>(inbound: Inbound, context: &'static str) -> Result<T> {
    let body = inbound.bytes().await?;
    decode_once(&body, context)
}

/// Decode one streamed line.
///
/// The base-versus-terminal decision looks only at this line's `done` field.
pub fn decode_line(line: impl AsRef<[u8]>) -> Result<ChatStreamUpdate> {
    let line = line.as_ref();
    let chunk: ChatChunk = serde_json::from_slice(line).map_err(Error::decode("chat stream line"))?;
    if !chunk.done {
        return Ok(ChatStreamUpdate::Chunk(chunk));
    }
    let done: ChatDoneChunk =
        serde_json::from_slice(line).map_err(Error::decode("final chat stream line"))?;
    Ok(ChatStreamUpdate::Done(done))
}

/// Decode a streaming inbound body.
pub fn decode_chat_stream(inbound: Inbound, cancel: CancellationToken) -> ChatStream {
    decode_stream(inbound.into_byte_stream(), cancel)
}

/// Decode newline-delimited chat updates from a byte stream.
///
/// `cancel` is checked before every line read, and also interrupts a read
/// that is waiting on the network. Cancellation ends the sequence without
/// an error. Whitespace-only lines are skipped. Lines are split on raw
/// `\n` bytes, so a line that is not UTF-8 is a decode failure, while a
/// failing body read is a transport failure.
pub fn decode_stream<S, E>(body: S, cancel: CancellationToken) -> ChatStream
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    let reader = StreamReader::new(Box::pin(body.map_err(io::Error::other)));

    let updates = async_stream::try_stream! {
        let mut lines = reader.split(b'\n');
        let mut line_no = 0usize;

        loop {
            if cancel.is_cancelled() {
                tracing::debug!(lines = line_no, "chat stream cancelled");
                break;
            }

            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                line = lines.next_segment() => Some(line),
            };
            let Some(read) = read else {
                tracing::debug!(lines = line_no, "chat stream cancelled while waiting");
                break;
            };
            let Some(line) = read.map_err(|e| Error::Transport(Box::new(e)))? else {
                break;
            };

            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            line_no += 1;
            tracing::trace!(line = line_no, bytes = line.len(), "chat stream line");

            let update = decode_line(&line)?;
            let terminal = update.is_done();
            yield update;
            if terminal {
                break;
            }
        }
    };

    Box::pin(updates)
}
