//! LLM types: chat messages, errors, and the completion client seam.

use serde::{Deserialize, Serialize};

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by LLM client operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    ConfigParse(String),

    /// The required API key environment variable is not set.
    #[error("missing API key: env var {var} not set")]
    MissingApiKey { var: String },

    /// The HTTP request failed or the response stream broke mid-flight.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// The provider returned a non-success HTTP status.
    #[error("API response error: status {status}")]
    ApiResponse { status: u16, body: String },

    /// A stream payload could not be deserialized.
    #[error("API response parse failed: {0}")]
    ApiParse(String),

    /// The provider reported an error inside an otherwise healthy stream.
    #[error("stream error reported by provider: {0}")]
    StreamError(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl crate::events::ErrorCode for LlmError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigParse(_) => "E_CONFIG_PARSE",
            Self::MissingApiKey { .. } => "E_MISSING_API_KEY",
            Self::ApiRequest(_) => "E_API_REQUEST",
            Self::ApiResponse { .. } => "E_API_RESPONSE",
            Self::ApiParse(_) => "E_API_PARSE",
            Self::StreamError(_) => "E_STREAM_ERROR",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::ApiRequest(_) | Self::ApiResponse { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// MESSAGE TYPES
// =============================================================================

/// Author of a conversation turn. The system role only exists on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single turn in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

// =============================================================================
// COMPLETION CLIENT TRAIT
// =============================================================================

/// Receives the cumulative reply text after every streamed fragment.
pub type FragmentFn<'f> = dyn for<'a> FnMut(&'a str) + Send + 'f;

/// Streaming chat completion. Enables fake clients in tests.
#[async_trait::async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send `history` (system instruction is prepended by the client) and
    /// stream the reply.
    ///
    /// `on_fragment` receives the cumulative reply text after every received
    /// fragment; each call supersedes the previous one.
    ///
    /// # Errors
    ///
    /// Returns an [`LlmError`] on transport failure, non-success status, or a
    /// malformed stream. Nothing is retried.
    async fn send(
        &self,
        history: &[Message],
        on_fragment: &mut FragmentFn<'_>,
    ) -> Result<Message, LlmError>;
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
