//! Conversation manager: in-memory conversations and streamed replies.
//!
//! DESIGN
//! ======
//! All conversations live in one `Vec`, newest first, behind a
//! `std::sync::Mutex`. The current selection is an id into that vector, never
//! a second copy, so list and detail views cannot drift apart. The lock is
//! only taken in short synchronous sections and is never held across an
//! `.await`.
//!
//! SUBMISSION
//! ==========
//! `begin_submit` validates input, appends the user message and an empty
//! assistant placeholder, and raises the loading flag in a single critical
//! section. It captures the target conversation id. `PendingSubmission::run`
//! then streams the reply and every fragment is written to that captured id,
//! regardless of what the user has selected since. If the target is deleted
//! mid-stream, the remaining fragments are dropped.
//!
//! No capacity bound and no persistence: conversations live until deleted
//! or until the process exits.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::title::{DEFAULT_TITLE, TitlePolicy};
use crate::events::{ConversationEvent, ErrorCode};
use crate::llm::CompletionClient;
use crate::llm::types::{Message, Role};

/// Replaces the assistant placeholder when a reply fails.
pub const APOLOGY_MESSAGE: &str = "抱歉，我遇到了一些问题。请稍后再试。";

const EVENT_CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversation {
    pub id: Uuid,
    pub title: String,
    pub messages: Vec<Message>,
    /// Unix epoch milliseconds.
    pub created_at_ms: i64,
}

impl Conversation {
    fn new() -> Self {
        Self { id: Uuid::new_v4(), title: DEFAULT_TITLE.to_string(), messages: Vec::new(), created_at_ms: now_ms() }
    }

    #[must_use]
    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id,
            title: self.title.clone(),
            message_count: self.messages.len(),
            created_at_ms: self.created_at_ms,
        }
    }
}

/// List-view projection of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub title: String,
    pub message_count: usize,
    pub created_at_ms: i64,
}

/// Everything a freshly connected client needs to render the sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub conversations: Vec<ConversationSummary>,
    pub current_id: Option<Uuid>,
    pub loading: bool,
}

/// Why a submission was ignored. Not an error: state is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitRejection {
    Blank,
    NoCurrentConversation,
    InFlight,
}

impl SubmitRejection {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blank => "blank",
            Self::NoCurrentConversation => "no_current_conversation",
            Self::InFlight => "in_flight",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The reply streamed to completion.
    Completed,
    /// The client failed; the placeholder now holds [`APOLOGY_MESSAGE`].
    Failed,
}

#[derive(Default)]
struct ConversationStore {
    /// Newest first.
    conversations: Vec<Conversation>,
    current: Option<Uuid>,
    loading: bool,
}

impl ConversationStore {
    fn position(&self, id: Uuid) -> Option<usize> {
        self.conversations.iter().position(|c| c.id == id)
    }

    fn get(&self, id: Uuid) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    fn get_mut(&mut self, id: Uuid) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.id == id)
    }
}

// =============================================================================
// MANAGER
// =============================================================================

/// Cloneable handle to the shared conversation state.
#[derive(Clone)]
pub struct ConversationManager {
    store: Arc<Mutex<ConversationStore>>,
    client: Arc<dyn CompletionClient>,
    events: broadcast::Sender<ConversationEvent>,
    title_policy: TitlePolicy,
}

impl ConversationManager {
    #[must_use]
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store: Arc::new(Mutex::new(ConversationStore::default())),
            client,
            events,
            title_policy: TitlePolicy::default(),
        }
    }

    #[must_use]
    pub fn with_title_policy(mut self, title_policy: TitlePolicy) -> Self {
        self.title_policy = title_policy;
        self
    }

    /// Receive every subsequent state change.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ConversationEvent> {
        self.events.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, ConversationStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: ConversationEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Create an empty conversation at the front and make it current.
    pub fn create_conversation(&self) -> Conversation {
        let conversation = Conversation::new();
        let mut store = self.lock();
        store.conversations.insert(0, conversation.clone());
        store.current = Some(conversation.id);
        self.emit(ConversationEvent::ConversationCreated { conversation: conversation.summary() });
        self.emit(ConversationEvent::CurrentChanged { id: Some(conversation.id) });
        info!(conversation_id = %conversation.id, total = store.conversations.len(), "conversation: created");
        conversation
    }

    /// Make `id` current. Returns `false` (and changes nothing) if it does not exist.
    pub fn select_conversation(&self, id: Uuid) -> bool {
        let mut store = self.lock();
        if store.position(id).is_none() {
            debug!(conversation_id = %id, "conversation: select ignored, unknown id");
            return false;
        }
        if store.current != Some(id) {
            store.current = Some(id);
            self.emit(ConversationEvent::CurrentChanged { id: Some(id) });
        }
        true
    }

    /// Remove `id`. Returns `false` (and changes nothing) if it does not exist.
    ///
    /// Deleting the current conversation selects the newest remaining one,
    /// or nothing when the collection is empty.
    pub fn delete_conversation(&self, id: Uuid) -> bool {
        let mut store = self.lock();
        let Some(index) = store.position(id) else {
            debug!(conversation_id = %id, "conversation: delete ignored, unknown id");
            return false;
        };
        store.conversations.remove(index);
        self.emit(ConversationEvent::ConversationDeleted { id });

        if store.current == Some(id) {
            store.current = store.conversations.first().map(|c| c.id);
            self.emit(ConversationEvent::CurrentChanged { id: store.current });
        }
        info!(conversation_id = %id, remaining = store.conversations.len(), "conversation: deleted");
        true
    }

    // -------------------------------------------------------------------------
    // Submission
    // -------------------------------------------------------------------------

    /// Submit `text` to the current conversation and wait for the reply.
    ///
    /// Client errors become in-conversation apology text, so the only
    /// `Err` is a rejected submission.
    #[cfg(test)]
    pub async fn submit(&self, text: &str) -> Result<SubmitOutcome, SubmitRejection> {
        Ok(self.begin_submit(text)?.run().await)
    }

    /// Record the user's message and the reply placeholder, then hand back
    /// the request to stream. Callers that do not want to wait (the HTTP
    /// route) spawn [`PendingSubmission::run`].
    ///
    /// # Errors
    ///
    /// Returns the [`SubmitRejection`] for blank text, no current
    /// conversation, or a submission already in flight. Nothing is mutated.
    pub fn begin_submit(&self, text: &str) -> Result<PendingSubmission, SubmitRejection> {
        let result = self.try_begin_submit(text);
        if let Err(reason) = &result {
            debug!(reason = reason.as_str(), "conversation: submission ignored");
        }
        result
    }

    fn try_begin_submit(&self, text: &str) -> Result<PendingSubmission, SubmitRejection> {
        if text.trim().is_empty() {
            return Err(SubmitRejection::Blank);
        }

        let mut store = self.lock();
        if store.loading {
            return Err(SubmitRejection::InFlight);
        }
        let conversation_id = store.current.ok_or(SubmitRejection::NoCurrentConversation)?;
        let title_policy = self.title_policy;
        let conversation = store
            .get_mut(conversation_id)
            .ok_or(SubmitRejection::NoCurrentConversation)?;

        let is_first_message = !conversation
            .messages
            .iter()
            .any(|m| m.role == Role::User);
        let user_index = conversation.messages.len();
        conversation.messages.push(Message::user(text));
        let history = conversation.messages.clone();

        let title = title_policy
            .next_title(is_first_message, text)
            .filter(|title| *title != conversation.title);
        if let Some(title) = &title {
            conversation.title.clone_from(title);
        }
        conversation.messages.push(Message::assistant(""));
        store.loading = true;

        self.emit(ConversationEvent::MessageAppended {
            conversation_id,
            index: user_index,
            message: Message::user(text),
        });
        if let Some(title) = title {
            self.emit(ConversationEvent::TitleChanged { id: conversation_id, title });
        }
        self.emit(ConversationEvent::MessageAppended {
            conversation_id,
            index: user_index + 1,
            message: Message::assistant(""),
        });
        self.emit(ConversationEvent::LoadingChanged { loading: true });

        info!(%conversation_id, chars = text.chars().count(), "conversation: submission started");
        Ok(PendingSubmission { manager: self.clone(), conversation_id, history })
    }

    /// Overwrite the last message of `conversation_id` if it is an assistant
    /// message. Returns `false` when the conversation is gone.
    fn write_reply(&self, conversation_id: Uuid, content: &str) -> bool {
        let mut store = self.lock();
        let Some(conversation) = store.get_mut(conversation_id) else {
            return false;
        };
        let index = conversation.messages.len().saturating_sub(1);
        let Some(last) = conversation.messages.last_mut() else {
            return false;
        };
        if last.role != Role::Assistant {
            return false;
        }
        if last.content != content {
            last.content = content.to_string();
            self.emit(ConversationEvent::MessageUpdated { conversation_id, index, content: content.to_string() });
        }
        true
    }

    fn finish_loading(&self) {
        let mut store = self.lock();
        store.loading = false;
        self.emit(ConversationEvent::LoadingChanged { loading: false });
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// All conversations, newest first.
    #[cfg(test)]
    #[must_use]
    pub fn conversations(&self) -> Vec<Conversation> {
        self.lock().conversations.clone()
    }

    #[must_use]
    pub fn summaries(&self) -> Vec<ConversationSummary> {
        self.lock()
            .conversations
            .iter()
            .map(Conversation::summary)
            .collect()
    }

    #[must_use]
    pub fn conversation(&self, id: Uuid) -> Option<Conversation> {
        self.lock().get(id).cloned()
    }

    #[cfg(test)]
    #[must_use]
    pub fn current(&self) -> Option<Conversation> {
        let store = self.lock();
        store.current.and_then(|id| store.get(id)).cloned()
    }

    #[cfg(test)]
    #[must_use]
    pub fn current_id(&self) -> Option<Uuid> {
        self.lock().current
    }

    #[cfg(test)]
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let store = self.lock();
        SessionSnapshot {
            conversations: store
                .conversations
                .iter()
                .map(Conversation::summary)
                .collect(),
            current_id: store.current,
            loading: store.loading,
        }
    }
}

// =============================================================================
// PENDING SUBMISSION
// =============================================================================

/// An accepted submission whose reply has not been streamed yet.
pub struct PendingSubmission {
    manager: ConversationManager,
    conversation_id: Uuid,
    /// History sent to the client: everything up to the user message, no placeholder.
    history: Vec<Message>,
}

impl PendingSubmission {
    #[must_use]
    pub fn conversation_id(&self) -> Uuid {
        self.conversation_id
    }

    /// Stream the reply into the captured conversation and clear loading.
    pub async fn run(self) -> SubmitOutcome {
        let Self { manager, conversation_id, history } = self;

        let mut dropped = false;
        let mut on_fragment = |content: &str| {
            if !manager.write_reply(conversation_id, content) && !dropped {
                dropped = true;
                debug!(%conversation_id, "conversation: target gone, dropping fragments");
            }
        };
        let result = manager.client.send(&history, &mut on_fragment).await;

        let outcome = match result {
            Ok(reply) => {
                manager.write_reply(conversation_id, &reply.content);
                info!(%conversation_id, chars = reply.content.chars().count(), "conversation: reply completed");
                SubmitOutcome::Completed
            }
            Err(e) => {
                warn!(
                    %conversation_id,
                    error = %e,
                    code = e.error_code(),
                    retryable = e.retryable(),
                    "conversation: reply failed"
                );
                manager.write_reply(conversation_id, APOLOGY_MESSAGE);
                manager.emit(ConversationEvent::ReplyFailed { conversation_id, error_code: e.error_code() });
                SubmitOutcome::Failed
            }
        };
        manager.finish_loading();
        outcome
    }
}

/// Current time as milliseconds since Unix epoch.
fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

#[cfg(test)]
#[path = "conversation_test.rs"]
mod tests;
