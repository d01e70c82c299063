//! Conversation events: the change feed consumed by the browser.
//!
//! DESIGN
//! ======
//! Every state change in the conversation manager is published as a
//! `ConversationEvent` on a broadcast channel. The SSE route forwards them
//! verbatim as JSON. Message updates always carry the cumulative content,
//! so a renderer replaces what it shows instead of appending.

use serde::Serialize;
use uuid::Uuid;

use crate::llm::types::Message;
use crate::services::conversation::ConversationSummary;

// =============================================================================
// ERROR CODES
// =============================================================================

/// Stable machine-readable codes for error enums surfaced to clients.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// EVENTS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationEvent {
    ConversationCreated {
        conversation: ConversationSummary,
    },
    ConversationDeleted {
        id: Uuid,
    },
    /// The current selection moved. `None` once the last conversation is gone.
    CurrentChanged {
        id: Option<Uuid>,
    },
    TitleChanged {
        id: Uuid,
        title: String,
    },
    MessageAppended {
        conversation_id: Uuid,
        index: usize,
        message: Message,
    },
    /// Full replacement of the message at `index`.
    MessageUpdated {
        conversation_id: Uuid,
        index: usize,
        content: String,
    },
    LoadingChanged {
        loading: bool,
    },
    ReplyFailed {
        conversation_id: Uuid,
        error_code: &'static str,
    },
}

impl ConversationEvent {
    /// Event name used for the SSE `event:` field.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ConversationCreated { .. } => "conversation_created",
            Self::ConversationDeleted { .. } => "conversation_deleted",
            Self::CurrentChanged { .. } => "current_changed",
            Self::TitleChanged { .. } => "title_changed",
            Self::MessageAppended { .. } => "message_appended",
            Self::MessageUpdated { .. } => "message_updated",
            Self::LoadingChanged { .. } => "loading_changed",
            Self::ReplyFailed { .. } => "reply_failed",
        }
    }
}

#[cfg(test)]
#[path = "events_test.rs"]
mod tests;
