//! Integration tests for the client against a wiremock server.

use futures::StreamExt;
use ollama_wire::{
    ChatApi, ChatRequest, ChatStreamUpdate, ClientConfig, EmbedRequest, Error, Message,
    OllamaClient, collect_stream,
};
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> OllamaClient {
    OllamaClient::new(ClientConfig::new(&server.uri()).unwrap().model("llama3")).unwrap()
}

fn chat_body() -> serde_json::Value {
    serde_json::json!({
        "model": "llama3",
        "created_at": "2024-01-01T00:00:00Z",
        "message": {"role": "assistant", "content": "hello"},
        "done": true
    })
}

fn ndjson(lines: &[&str]) -> String {
    let mut body = lines.join("\n");
    body.push('\n');
    body
}

const CHUNK_1: &str = r#"{"model":"m","created_at":"2024-01-01T00:00:00Z","message":{"role":"assistant","content":"Hel"},"done":false}"#;
const CHUNK_2: &str = r#"{"model":"m","created_at":"2024-01-01T00:00:01Z","message":{"role":"assistant","content":"lo"},"done":false}"#;
const DONE: &str = r#"{"model":"m","created_at":"2024-01-01T00:00:02Z","message":{"role":"assistant","content":""},"done":true,"done_reason":"stop","eval_count":12,"eval_duration":500000000,"load_duration":1000,"total_duration":900000000,"prompt_eval_count":5,"prompt_eval_duration":2000}"#;

// ─── Non-streaming chat ─────────────────────────────────────────────────────

#[tokio::test]
async fn chat_posts_expected_body_and_decodes_reply() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(header("content-type", "application/json"))
        .and(body_json(serde_json::json!({
            "model": "llama3",
            "messages": [{"role": "user", "content": "hi"}],
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let reply = client
        .chat(ChatRequest::new("llama3", vec![Message::user("hi")]))
        .await
        .expect("chat should succeed");

    assert_eq!(reply.message.content, "hello");
    assert_eq!(reply.model, "llama3");
    assert!(reply.done);
    assert!(reply.created_at().is_some());
}

#[tokio::test]
async fn chat_forces_stream_false() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(serde_json::json!({"stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body()))
        .expect(1)
        .mount(&server)
        .await;

    let mut request = ChatRequest::user("hi");
    request.stream = true;
    client_for(&server).chat(request).await.expect("should succeed");
}

#[tokio::test]
async fn chat_uses_default_model_when_unset() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(serde_json::json!({"model": "llama3"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body()))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .chat(ChatRequest::user("hi"))
        .await
        .expect("should succeed");
}

#[tokio::test]
async fn chat_with_invalid_json_body_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .chat(ChatRequest::user("hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Decode { .. }), "got: {err:?}");
}

#[tokio::test]
async fn chat_with_non_utf8_body_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(
            b"{\"model\":\"\xff\",\"message\":{\"role\":\"assistant\",\"content\":\"x\"},\"done\":true}".to_vec(),
        ))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .chat(ChatRequest::user("hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Decode { .. }), "got: {err:?}");
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn stream_with_non_utf8_line_is_decode_error() {
    let server = MockServer::start().await;

    let mut body = format!("{CHUNK_1}\n").into_bytes();
    body.extend_from_slice(b"{\"model\":\"\xff\",\"done\":false}\n");
    body.extend_from_slice(format!("{DONE}\n").as_bytes());
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(&server)
        .await;

    let updates: Vec<_> = client_for(&server)
        .chat_stream(ChatRequest::user("hi"), CancellationToken::new())
        .await
        .expect("should start streaming")
        .collect()
        .await;

    assert_eq!(updates.len(), 2);
    assert!(updates[0].is_ok());
    let err = updates[1].as_ref().unwrap_err();
    assert!(matches!(err, Error::Decode { .. }), "got: {err:?}");
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn chat_missing_required_field_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"model": "llama3", "done": true})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .chat(ChatRequest::user("hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Decode { .. }), "got: {err:?}");
}

// ─── Headers ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn custom_headers_override_defaults_without_duplicates() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body()))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::new(&server.uri())
        .unwrap()
        .default_header("x-shared", "from-default")
        .default_header("x-default-only", "d");
    let client = OllamaClient::new(config).unwrap();

    let request = ChatRequest::user("hi")
        .header("x-shared", "from-request")
        .header("x-request-only", "r");
    client.chat(request).await.expect("should succeed");

    let received = server.received_requests().await.expect("recording enabled");
    assert_eq!(received.len(), 1);
    let headers = &received[0].headers;

    let shared: Vec<_> = headers.get_all("x-shared").iter().collect();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0], "from-request");
    assert_eq!(headers.get("x-default-only").unwrap(), "d");
    assert_eq!(headers.get("x-request-only").unwrap(), "r");
}

#[tokio::test]
async fn api_key_is_sent_as_bearer_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/version"))
        .and(header("authorization", "Bearer secret-key"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"version": "0.5.7"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client =
        OllamaClient::new(ClientConfig::new(&server.uri()).unwrap().api_key("secret-key")).unwrap();
    client.version().await.expect("should succeed");
}

#[tokio::test]
async fn concurrent_calls_do_not_share_custom_headers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body()))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let (a, b) = tokio::join!(
        client.chat(ChatRequest::user("a").header("x-call", "a")),
        client.chat(ChatRequest::user("b").header("x-other", "b")),
    );
    a.expect("a succeeds");
    b.expect("b succeeds");

    let received = server.received_requests().await.expect("recording enabled");
    for request in &received {
        let has_call = request.headers.get("x-call").is_some();
        let has_other = request.headers.get("x-other").is_some();
        assert!(has_call ^ has_other, "headers leaked between calls");
    }
}

// ─── Base path resolution ───────────────────────────────────────────────────

#[tokio::test]
async fn base_path_segment_is_preserved() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/proxy/ollama/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body()))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::new(&format!("{}/proxy/ollama", server.uri())).unwrap();
    let client = OllamaClient::new(config).unwrap();
    client.chat(ChatRequest::user("hi")).await.expect("should succeed");
}

// ─── Error classification ───────────────────────────────────────────────────

#[tokio::test]
async fn bad_request_error_field_becomes_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"error":"bad request"}"#))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .chat(ChatRequest::user("hi"))
        .await
        .unwrap_err();
    assert!(
        matches!(&err, Error::Api { status, message } if *status == StatusCode::BAD_REQUEST && message == "bad request"),
        "got: {err:?}"
    );
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn bad_request_plain_text_is_kept_verbatim() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(400).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .chat(ChatRequest::user("hi"))
        .await
        .unwrap_err();
    assert!(matches!(&err, Error::Api { message, .. } if message == "not json"), "got: {err:?}");
}

#[tokio::test]
async fn not_found_on_stream_is_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(404).set_body_string(r#"{"error":"model \"nope\" not found"}"#),
        )
        .mount(&server)
        .await;

    let result = client_for(&server)
        .chat_stream(ChatRequest::user("hi"), CancellationToken::new())
        .await;
    let Err(err) = result else {
        panic!("expected an error before streaming starts");
    };
    assert!(
        matches!(&err, Error::Api { status, message } if *status == StatusCode::NOT_FOUND && message == r#"model "nope" not found"#),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn server_error_is_http_status_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .embed(EmbedRequest::new("", ["x"]))
        .await
        .unwrap_err();
    assert!(
        matches!(&err, Error::HttpStatus { status, body } if *status == StatusCode::SERVICE_UNAVAILABLE && body == "overloaded"),
        "got: {err:?}"
    );
    assert!(err.is_retryable());
}

#[tokio::test]
async fn connection_refused_is_transport_error() {
    // Bind then drop a server so the port is closed.
    let uri = {
        let server = MockServer::start().await;
        server.uri()
    };
    let client = OllamaClient::new(ClientConfig::new(&uri).unwrap()).unwrap();
    let err = client.version().await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "got: {err:?}");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn no_retry_on_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let _ = client_for(&server).chat(ChatRequest::user("hi")).await;
}

// ─── Streaming chat ─────────────────────────────────────────────────────────

#[tokio::test]
async fn stream_yields_chunks_then_terminal_with_stats() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(serde_json::json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_string(ndjson(&[CHUNK_1, CHUNK_2, DONE])))
        .expect(1)
        .mount(&server)
        .await;

    let stream = client_for(&server)
        .chat_stream(ChatRequest::user("hi"), CancellationToken::new())
        .await
        .expect("should start streaming");
    let updates: Vec<_> = stream.collect().await;

    assert_eq!(updates.len(), 3);
    let updates: Vec<ChatStreamUpdate> = updates.into_iter().map(Result::unwrap).collect();
    assert!(matches!(&updates[0], ChatStreamUpdate::Chunk(c) if c.content() == "Hel"));
    assert!(matches!(&updates[1], ChatStreamUpdate::Chunk(c) if c.content() == "lo"));
    match &updates[2] {
        ChatStreamUpdate::Done(done) => {
            assert_eq!(done.stats.eval_count, 12);
            assert_eq!(done.stats.prompt_eval_count, 5);
            assert_eq!(done.stats.done_reason.as_deref(), Some("stop"));
            assert_eq!(done.stats.tokens_per_second(), Some(24.0));
            assert!(done.chunk.created_at().is_some());
        }
        other => panic!("expected terminal update, got: {other:?}"),
    }
}

#[tokio::test]
async fn stream_with_malformed_line_stops_at_fault() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(ndjson(&[CHUNK_1, "garbage", CHUNK_2, DONE])),
        )
        .mount(&server)
        .await;

    let stream = client_for(&server)
        .chat_stream(ChatRequest::user("hi"), CancellationToken::new())
        .await
        .expect("should start streaming");
    let updates: Vec<_> = stream.collect().await;

    assert_eq!(updates.len(), 2);
    assert!(updates[0].is_ok());
    assert!(matches!(&updates[1], Err(Error::Decode { .. })));
}

#[tokio::test]
async fn stream_cancelled_after_first_update() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ndjson(&[CHUNK_1, CHUNK_2, DONE])))
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    let mut stream = client_for(&server)
        .chat_stream(ChatRequest::user("hi"), token.clone())
        .await
        .expect("should start streaming");

    let first = stream.next().await.expect("one update").expect("valid update");
    assert_eq!(first.content(), "Hel");

    token.cancel();
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn stream_collects_into_transcript() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ndjson(&[CHUNK_1, CHUNK_2, DONE])))
        .mount(&server)
        .await;

    let stream = client_for(&server)
        .chat_stream(ChatRequest::user("hi"), CancellationToken::new())
        .await
        .expect("should start streaming");
    let transcript = collect_stream(stream).await.expect("clean stream");

    assert_eq!(transcript.message, Message::assistant("Hello"));
    assert_eq!(transcript.updates, 3);
    assert!(transcript.is_complete());
}

#[tokio::test]
async fn stream_keeps_multilingual_prompt_readable_on_the_wire() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ndjson(&[DONE])))
        .mount(&server)
        .await;

    let stream = client_for(&server)
        .chat_stream(ChatRequest::user("Grüß dich, 世界 <&>"), CancellationToken::new())
        .await
        .expect("should start streaming");
    let _: Vec<_> = stream.collect().await;

    let received = server.received_requests().await.expect("recording enabled");
    let body = String::from_utf8(received[0].body.clone()).expect("utf-8 body");
    assert!(body.contains("Grüß dich, 世界 <&>"), "body: {body}");
}

// ─── Embeddings, version, models ────────────────────────────────────────────

#[tokio::test]
async fn embed_posts_inputs_and_decodes_vectors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_json(serde_json::json!({
            "model": "nomic-embed-text",
            "input": ["first", "second"],
            "truncate": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "model": "nomic-embed-text",
            "embeddings": [[0.1, 0.2], [0.3, 0.4]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut request = EmbedRequest::new("nomic-embed-text", ["first", "second"]);
    request.truncate = Some(true);
    let response = client_for(&server).embed(request).await.expect("should succeed");

    assert_eq!(response.embeddings.len(), 2);
    assert_eq!(response.embeddings[1], vec![0.3, 0.4]);
}

#[tokio::test]
async fn version_is_parsed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/version"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"version": "0.5.7"})),
        )
        .mount(&server)
        .await;

    let version = client_for(&server).version().await.expect("should succeed");
    assert_eq!(version.to_string(), "0.5.7");
    assert!(version.at_least(0, 5, 0));
}

#[tokio::test]
async fn unparseable_version_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/version"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"version": "dev"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server).version().await.unwrap_err();
    assert!(matches!(err, Error::InvalidVersion(v) if v == "dev"));
}

#[tokio::test]
async fn list_models_decodes_tags() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "models": [{
                "name": "llama3:latest",
                "modified_at": "2024-05-01T10:00:00.123456789-07:00",
                "size": 4661224676_u64,
                "digest": "365c0bd3c000"
            }]
        })))
        .mount(&server)
        .await;

    let models = client_for(&server).list_models().await.expect("should succeed");
    assert_eq!(models.len(), 1);
    assert_eq!(models[0].name, "llama3:latest");
    assert_eq!(models[0].size, 4_661_224_676);
    assert!(models[0].modified_at().is_some());
}
