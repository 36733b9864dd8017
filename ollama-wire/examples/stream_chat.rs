//! Streaming chat with Ctrl-C cancellation.
//!
//! Run with: `RUST_LOG=ollama_wire=debug cargo run --example stream_chat -p ollama-wire -- "your prompt"`

use std::io::Write;

use futures::StreamExt;
use ollama_wire::{ChatApi, ChatRequest, ChatStreamUpdate, OllamaClient, TranscriptBuilder};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let prompt = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Write a haiku about rivers.".to_string());

    let client = OllamaClient::from_env()?;
    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let mut stream = client.chat_stream(ChatRequest::user(prompt), cancel).await?;
    let mut transcript = TranscriptBuilder::new();
    while let Some(update) = stream.next().await {
        let update = update?;
        transcript.push(&update);
        match &update {
            ChatStreamUpdate::Chunk(chunk) => {
                print!("{}", chunk.content());
                std::io::stdout().flush()?;
            }
            ChatStreamUpdate::Done(done) => {
                println!();
                println!(
                    "[{} prompt tokens, {} generated, {:?} total, reason: {}]",
                    done.stats.prompt_eval_count,
                    done.stats.eval_count,
                    done.stats.total(),
                    done.stats.done_reason.as_deref().unwrap_or("unknown"),
                );
            }
        }
    }

    let transcript = transcript.finish();
    if !transcript.is_complete() {
        println!("\n[stream ended early after {} updates]", transcript.updates);
    }
    Ok(())
}
