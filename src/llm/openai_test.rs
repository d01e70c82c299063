use super::*;

// ===== request building =====

#[test]
fn build_messages_prepends_system() {
    let history = vec![Message::user("Why?"), Message::assistant("Because."), Message::user("Really?")];
    let msgs = build_chat_messages("be helpful", &history);
    assert_eq!(msgs.len(), 4);
    assert_eq!(msgs[0], CcMessage { role: "system", content: "be helpful" });
    assert_eq!(msgs[1], CcMessage { role: "user", content: "Why?" });
    assert_eq!(msgs[2], CcMessage { role: "assistant", content: "Because." });
    assert_eq!(msgs[3], CcMessage { role: "user", content: "Really?" });
}

#[test]
fn build_messages_empty_history_is_system_only() {
    let msgs = build_chat_messages(SYSTEM_PROMPT, &[]);
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].role, "system");
}

#[test]
fn request_body_carries_sampling_and_stream_flag() {
    let history = vec![Message::user("hi")];
    let msgs = build_chat_messages("sys", &history);
    let body = CcRequest { model: "deepseek-chat", messages: &msgs, temperature: 0.7, max_tokens: 2000, stream: true };
    let json = serde_json::to_value(&body).unwrap();
    assert_eq!(json["model"], "deepseek-chat");
    assert_eq!(json["max_tokens"], 2000);
    assert_eq!(json["stream"], true);
    assert!((json["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    assert_eq!(json["messages"][1]["role"], "user");
    assert_eq!(json["messages"][1]["content"], "hi");
}

// ===== SSE decoding =====

#[test]
fn decoder_yields_data_lines() {
    let mut decoder = SseDecoder::default();
    let payloads = decoder.feed(b"data: {\"a\":1}\n\ndata: [DONE]\n\n");
    assert_eq!(payloads, vec!["{\"a\":1}".to_string(), "[DONE]".to_string()]);
}

#[test]
fn decoder_reassembles_split_lines() {
    let mut decoder = SseDecoder::default();
    assert!(decoder.feed(b"data: {\"choi").is_empty());
    let payloads = decoder.feed(b"ces\":[]}\r\n");
    assert_eq!(payloads, vec!["{\"choices\":[]}".to_string()]);
}

#[test]
fn decoder_reassembles_split_utf8() {
    let line = "data: 你好\n".as_bytes();
    // Split inside the first multi-byte character.
    let (head, tail) = line.split_at(7);
    let mut decoder = SseDecoder::default();
    assert!(decoder.feed(head).is_empty());
    assert_eq!(decoder.feed(tail), vec!["你好".to_string()]);
}

#[test]
fn decoder_skips_comments_and_other_fields() {
    let mut decoder = SseDecoder::default();
    let payloads = decoder.feed(b": keep-alive\nevent: message\nid: 7\n\ndata:{}\n");
    assert_eq!(payloads, vec!["{}".to_string()]);
}

#[test]
fn decoder_finish_flushes_unterminated_line() {
    let mut decoder = SseDecoder::default();
    assert!(decoder.feed(b"data: [DONE]").is_empty());
    assert_eq!(decoder.finish().as_deref(), Some("[DONE]"));
}

#[test]
fn decoder_finish_empty_buffer_is_none() {
    let decoder = SseDecoder::default();
    assert!(decoder.finish().is_none());
}

// ===== payload parsing =====

#[test]
fn parse_delta_content() {
    let payload = serde_json::json!({
        "id": "chatcmpl-1",
        "choices": [{ "index": 0, "delta": { "content": "Hel" }, "finish_reason": null }]
    })
    .to_string();
    assert_eq!(parse_stream_payload(&payload).unwrap(), StreamPayload::Delta("Hel".into()));
}

#[test]
fn parse_missing_content_is_empty_delta() {
    let role_only = serde_json::json!({ "choices": [{ "delta": { "role": "assistant" } }] }).to_string();
    assert_eq!(parse_stream_payload(&role_only).unwrap(), StreamPayload::Delta(String::new()));

    let null_content = serde_json::json!({ "choices": [{ "delta": { "content": null } }] }).to_string();
    assert_eq!(parse_stream_payload(&null_content).unwrap(), StreamPayload::Delta(String::new()));

    let no_choices = serde_json::json!({ "choices": [] }).to_string();
    assert_eq!(parse_stream_payload(&no_choices).unwrap(), StreamPayload::Delta(String::new()));
}

#[test]
fn parse_done_marker() {
    assert_eq!(parse_stream_payload("[DONE]").unwrap(), StreamPayload::Done);
}

#[test]
fn parse_malformed_payload_errors() {
    assert!(matches!(parse_stream_payload("{not json"), Err(LlmError::ApiParse(_))));
}

#[test]
fn parse_in_stream_error() {
    let payload = serde_json::json!({ "error": { "message": "server overloaded", "type": "overloaded" } }).to_string();
    let err = parse_stream_payload(&payload).unwrap_err();
    assert!(matches!(err, LlmError::StreamError(ref m) if m == "server overloaded"));
}

#[test]
fn apply_payload_reports_cumulative_text() {
    let mut reply = String::new();
    let mut seen = Vec::new();
    let mut on_fragment = |text: &str| seen.push(text.to_string());
    for delta in ["H", "e", "", "llo"] {
        let payload = serde_json::json!({ "choices": [{ "delta": { "content": delta } }] }).to_string();
        assert!(apply_payload(&payload, &mut reply, &mut on_fragment).unwrap());
    }
    assert!(!apply_payload("[DONE]", &mut reply, &mut on_fragment).unwrap());
    assert_eq!(reply, "Hello");
    assert_eq!(seen, vec!["H", "He", "He", "Hello"]);
}

// ===== OpenAiClient::send against a local server =====

use axum::Router;
use axum::http::{StatusCode, header};
use axum::routing::post;

use crate::llm::config::{LlmTimeouts, MAX_TOKENS, TEMPERATURE};

/// Serve `body` with `status` at `/chat/completions` on an ephemeral port.
async fn serve_completions(status: StatusCode, body: &'static str) -> String {
    let app = Router::new().route(
        "/chat/completions",
        post(move || async move { (status, [(header::CONTENT_TYPE, "text/event-stream")], body) }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client_for(base_url: String) -> OpenAiClient {
    let config = LlmConfig {
        api_key: "sk-test".into(),
        base_url,
        model: "deepseek-chat".into(),
        temperature: TEMPERATURE,
        max_tokens: MAX_TOKENS,
        timeouts: LlmTimeouts { request_secs: 5, connect_secs: 5 },
    };
    OpenAiClient::new(&config).unwrap()
}

async fn send_collecting(client: &OpenAiClient) -> (Result<Message, LlmError>, Vec<String>) {
    let mut seen = Vec::new();
    let result = client
        .send(&[Message::user("hi")], &mut |text: &str| seen.push(text.to_string()))
        .await;
    (result, seen)
}

#[tokio::test]
async fn send_streams_cumulative_text_until_done() {
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"He\"}}]}\n\n",
        ": ping\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"llo\"}}]}\n\n",
        "data: [DONE]\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\" ignored\"}}]}\n\n",
    );
    let client = client_for(serve_completions(StatusCode::OK, body).await);

    let (result, seen) = send_collecting(&client).await;
    assert_eq!(result.unwrap(), Message::assistant("Hello"));
    assert_eq!(seen, vec!["", "He", "Hello"]);
}

#[tokio::test]
async fn send_flushes_unterminated_last_line() {
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"!\"}}]}",
    );
    let client = client_for(serve_completions(StatusCode::OK, body).await);

    let (result, seen) = send_collecting(&client).await;
    assert_eq!(result.unwrap(), Message::assistant("Hi!"));
    assert_eq!(seen, vec!["Hi", "Hi!"]);
}

#[tokio::test]
async fn send_non_success_status_carries_body() {
    let client = client_for(serve_completions(StatusCode::INTERNAL_SERVER_ERROR, "boom").await);

    let (result, seen) = send_collecting(&client).await;
    assert!(matches!(result, Err(LlmError::ApiResponse { status: 500, ref body }) if body == "boom"));
    assert!(seen.is_empty());
}

#[tokio::test]
async fn send_malformed_payload_aborts_after_partial_text() {
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"par\"}}]}\n\n",
        "data: {bad\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"tial\"}}]}\n\n",
    );
    let client = client_for(serve_completions(StatusCode::OK, body).await);

    let (result, seen) = send_collecting(&client).await;
    assert!(matches!(result, Err(LlmError::ApiParse(_))));
    assert_eq!(seen, vec!["par"]);
}

#[tokio::test]
async fn send_in_stream_error_aborts() {
    let body = "data: {\"error\":{\"message\":\"rate limited\"}}\n\n";
    let client = client_for(serve_completions(StatusCode::OK, body).await);

    let (result, _) = send_collecting(&client).await;
    assert!(matches!(result, Err(LlmError::StreamError(ref m)) if m == "rate limited"));
}
