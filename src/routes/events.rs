//! Server-Sent Events relay for conversation changes.
//!
//! Each manager event becomes one SSE message named after its `type`. A
//! subscriber that falls behind the broadcast buffer gets a `lagged` event
//! and should re-fetch `/api/session`.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::events::ConversationEvent;
use crate::state::AppState;

/// `GET /api/events`
pub async fn stream_events(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.conversations.subscribe();
    let stream = futures::stream::unfold(rx, |mut rx| async move {
        let (name, data) = encode(rx.recv().await)?;
        Some((Ok::<_, Infallible>(Event::default().event(name).data(data)), rx))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Map one broadcast receive to an SSE `(event, data)` pair. `None` ends the stream.
pub(crate) fn encode(received: Result<ConversationEvent, RecvError>) -> Option<(&'static str, String)> {
    match received {
        Ok(event) => {
            let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
            Some((event.name(), data))
        }
        Err(RecvError::Lagged(skipped)) => {
            warn!(skipped, "events: subscriber lagged");
            Some(("lagged", serde_json::json!({ "skipped": skipped }).to_string()))
        }
        Err(RecvError::Closed) => None,
    }
}
