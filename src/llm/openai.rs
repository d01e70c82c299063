//! OpenAI-compatible streaming chat completions client.
//!
//! DESIGN
//! ======
//! Issues `POST {base_url}/chat/completions` with `stream: true` and decodes
//! the Server-Sent Events body incrementally. Each `data:` payload carries a
//! delta; the client folds deltas into a running total and hands the caller
//! the cumulative text after every payload. `data: [DONE]` (or the end of
//! the body) finishes the reply.

use std::time::Duration;

use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::config::LlmConfig;
use super::prompts::SYSTEM_PROMPT;
use super::types::{CompletionClient, FragmentFn, LlmError, Message};

pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiClient {
    /// Build the HTTP client once from typed config.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::HttpClientBuild`] if reqwest cannot build a client.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| LlmError::HttpClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait::async_trait]
impl CompletionClient for OpenAiClient {
    async fn send(
        &self,
        history: &[Message],
        on_fragment: &mut FragmentFn<'_>,
    ) -> Result<Message, LlmError> {
        let messages = build_chat_messages(SYSTEM_PROMPT, history);
        let body = CcRequest {
            model: &self.model,
            messages: &messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: true,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiResponse { status, body });
        }

        let mut decoder = SseDecoder::default();
        let mut reply = String::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| LlmError::ApiRequest(e.to_string()))?;
            for payload in decoder.feed(&chunk) {
                if !apply_payload(&payload, &mut reply, on_fragment)? {
                    return Ok(Message::assistant(reply));
                }
            }
        }
        if let Some(payload) = decoder.finish() {
            apply_payload(&payload, &mut reply, on_fragment)?;
        }

        debug!(chars = reply.chars().count(), "llm: stream ended without [DONE]");
        Ok(Message::assistant(reply))
    }
}

/// Fold one `data:` payload into `reply`. Returns `false` once the stream is done.
fn apply_payload(
    payload: &str,
    reply: &mut String,
    on_fragment: &mut FragmentFn<'_>,
) -> Result<bool, LlmError> {
    match parse_stream_payload(payload)? {
        StreamPayload::Done => Ok(false),
        StreamPayload::Delta(delta) => {
            reply.push_str(&delta);
            on_fragment(reply.as_str());
            Ok(true)
        }
    }
}

// =============================================================================
// REQUEST WIRE TYPES
// =============================================================================

#[derive(Serialize)]
pub(crate) struct CcRequest<'a> {
    model: &'a str,
    messages: &'a [CcMessage<'a>],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub(crate) struct CcMessage<'a> {
    role: &'static str,
    content: &'a str,
}

pub(crate) fn build_chat_messages<'a>(system: &'a str, history: &'a [Message]) -> Vec<CcMessage<'a>> {
    let mut out = Vec::with_capacity(history.len() + 1);
    out.push(CcMessage { role: "system", content: system });
    out.extend(
        history
            .iter()
            .map(|m| CcMessage { role: m.role.as_str(), content: &m.content }),
    );
    out
}

// =============================================================================
// STREAM DECODING
// =============================================================================

/// Line-oriented SSE decoder that yields `data:` payloads.
///
/// Bytes are buffered until a full line is available, so payloads (and
/// multi-byte UTF-8 sequences) split across network chunks reassemble.
#[derive(Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub(crate) fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(payload) = data_payload(&line) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flush a trailing line that was never newline-terminated.
    pub(crate) fn finish(self) -> Option<String> {
        data_payload(&self.buffer)
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches(['\r', '\n']);
    // Blank separators, `:` comments (keep-alives), and `event:`/`id:` fields carry no text.
    let data = line.strip_prefix("data:")?;
    Some(data.trim_start().to_string())
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum StreamPayload {
    Delta(String),
    Done,
}

pub(crate) fn parse_stream_payload(payload: &str) -> Result<StreamPayload, LlmError> {
    if payload == "[DONE]" {
        return Ok(StreamPayload::Done);
    }
    let root: Value = serde_json::from_str(payload).map_err(|e| LlmError::ApiParse(e.to_string()))?;
    if let Some(error) = root.get("error").filter(|e| !e.is_null()) {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| error.to_string(), str::to_owned);
        return Err(LlmError::StreamError(message));
    }
    let delta = root
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("delta"))
        .and_then(|delta| delta.get("content"))
        .and_then(Value::as_str)
        .unwrap_or("");
    Ok(StreamPayload::Delta(delta.to_string()))
}

#[cfg(test)]
#[path = "openai_test.rs"]
mod tests;
