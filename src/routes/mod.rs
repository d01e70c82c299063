//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! The browser client renders conversations and Markdown itself; this
//! router exposes the conversation manager as JSON endpoints and relays its
//! change feed over Server-Sent Events at `/api/events`.

pub mod conversations;
pub mod events;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/session", get(conversations::session))
        .route(
            "/api/conversations",
            get(conversations::list_conversations).post(conversations::create_conversation),
        )
        .route(
            "/api/conversations/{id}",
            get(conversations::get_conversation).delete(conversations::delete_conversation),
        )
        .route("/api/conversations/{id}/select", post(conversations::select_conversation))
        .route("/api/messages", post(conversations::submit_message))
        .route("/api/events", get(events::stream_events))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
