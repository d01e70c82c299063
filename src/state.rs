//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It wraps the conversation manager, which already holds its shared state
//! behind an `Arc`, so cloning per request is cheap.

use std::sync::Arc;

use crate::llm::CompletionClient;
use crate::services::conversation::ConversationManager;
use crate::services::title::TitlePolicy;

#[derive(Clone)]
pub struct AppState {
    pub conversations: ConversationManager,
}

impl AppState {
    #[must_use]
    pub fn new(client: Arc<dyn CompletionClient>, title_policy: TitlePolicy) -> Self {
        Self { conversations: ConversationManager::new(client).with_title_policy(title_policy) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
