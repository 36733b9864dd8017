//! Basic non-streaming chat and server version check.
//!
//! Make sure an Ollama server is running (or set `OLLAMA_HOST`) and run:
//!   cargo run --example basic -p ollama-wire

use ollama_wire::{ChatApi, ChatRequest, Message, OllamaClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let client = OllamaClient::from_env()?;
    println!("Server version: {}", client.version().await?);

    let request = ChatRequest::new(
        "",
        vec![
            Message::system("Answer in one sentence."),
            Message::user("Say hello."),
        ],
    );
    let response = client.chat(request).await?;
    println!("Response: {}", response.message.content);
    if let Some(rate) = response.stats.tokens_per_second() {
        println!("Throughput: {rate:.1} tokens/s");
    }

    Ok(())
}
