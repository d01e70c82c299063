//! Conversation routes: thin JSON wrappers over the conversation manager.
//!
//! Select and delete on an unknown id are no-ops that still answer with the
//! session snapshot; only reading a missing conversation is a 404.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::conversation::{Conversation, ConversationSummary, SessionSnapshot};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SubmitBody {
    pub text: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct SubmitResponse {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

/// `GET /api/session`. Sidebar state with summaries, current id and loading flag.
pub async fn session(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.conversations.snapshot())
}

/// `GET /api/conversations`: summaries, newest first.
pub async fn list_conversations(State(state): State<AppState>) -> Json<Vec<ConversationSummary>> {
    Json(state.conversations.summaries())
}

/// `POST /api/conversations`: create and select a new conversation.
pub async fn create_conversation(State(state): State<AppState>) -> (StatusCode, Json<Conversation>) {
    (StatusCode::CREATED, Json(state.conversations.create_conversation()))
}

/// `GET /api/conversations/{id}`: full conversation with messages.
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Conversation>, StatusCode> {
    state
        .conversations
        .conversation(id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// `DELETE /api/conversations/{id}`
pub async fn delete_conversation(State(state): State<AppState>, Path(id): Path<Uuid>) -> Json<SessionSnapshot> {
    state.conversations.delete_conversation(id);
    Json(state.conversations.snapshot())
}

/// `POST /api/conversations/{id}/select`
pub async fn select_conversation(State(state): State<AppState>, Path(id): Path<Uuid>) -> Json<SessionSnapshot> {
    state.conversations.select_conversation(id);
    Json(state.conversations.snapshot())
}

/// `POST /api/messages`: submit to the current conversation.
///
/// The reply streams in a background task; progress arrives on `/api/events`.
pub async fn submit_message(
    State(state): State<AppState>,
    Json(body): Json<SubmitBody>,
) -> (StatusCode, Json<SubmitResponse>) {
    match state.conversations.begin_submit(&body.text) {
        Ok(pending) => {
            let conversation_id = pending.conversation_id();
            tokio::spawn(pending.run());
            (
                StatusCode::ACCEPTED,
                Json(SubmitResponse { accepted: true, conversation_id: Some(conversation_id), reason: None }),
            )
        }
        Err(reason) => (
            StatusCode::OK,
            Json(SubmitResponse { accepted: false, conversation_id: None, reason: Some(reason.as_str()) }),
        ),
    }
}

#[cfg(test)]
#[path = "conversations_test.rs"]
mod tests;
