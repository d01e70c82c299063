//! LLM: streaming completion client for the chat service.
//!
//! DESIGN
//! ======
//! One provider: an OpenAI-compatible chat-completions endpoint (DeepSeek by
//! default). `LlmClient` is built once at startup from environment variables
//! and handed to the conversation manager as an `Arc<dyn CompletionClient>`,
//! so tests can substitute a fake stream without network access.

pub mod config;
pub mod openai;
pub mod prompts;
pub mod types;

use config::LlmConfig;
pub use types::CompletionClient;
use types::{FragmentFn, LlmError, Message};

// =============================================================================
// CLIENT
// =============================================================================

/// Concrete completion client configured by [`LlmClient::from_env`].
pub struct LlmClient {
    inner: openai::OpenAiClient,
}

impl LlmClient {
    /// Build an LLM client from environment variables.
    ///
    /// - `DEEPSEEK_API_KEY`: provider API key (required)
    /// - `LLM_BASE_URL`: custom base URL for OpenAI-compatible APIs
    /// - `LLM_MODEL`: model name (default `deepseek-chat`)
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or the HTTP client fails.
    pub fn from_env() -> Result<Self, LlmError> {
        let config = LlmConfig::from_env()?;
        Self::from_config(&config)
    }

    /// Build an LLM client from a parsed typed config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        Ok(Self { inner: openai::OpenAiClient::new(config)? })
    }

    /// Return the configured model name (e.g. `"deepseek-chat"`).
    #[must_use]
    pub fn model(&self) -> &str {
        self.inner.model()
    }
}

#[async_trait::async_trait]
impl CompletionClient for LlmClient {
    async fn send(
        &self,
        history: &[Message],
        on_fragment: &mut FragmentFn<'_>,
    ) -> Result<Message, LlmError> {
        self.inner.send(history, on_fragment).await
    }
}
