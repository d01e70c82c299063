mod events;
mod llm;
mod routes;
mod services;
mod state;

use std::sync::Arc;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()
        .expect("invalid PORT");

    let title_policy = match std::env::var(services::title::TITLE_POLICY_VAR) {
        Ok(raw) => match raw.parse::<services::title::TitlePolicy>() {
            Ok(policy) => policy,
            Err(e) => {
                tracing::error!(error = %e, "invalid title policy");
                std::process::exit(1);
            }
        },
        Err(_) => services::title::TitlePolicy::default(),
    };

    // The completion client is mandatory: refuse to start without a credential.
    let llm = match llm::LlmClient::from_env() {
        Ok(client) => {
            tracing::info!(model = client.model(), "LLM client initialized");
            client
        }
        Err(e) => {
            tracing::error!(error = %e, "LLM client not configured");
            std::process::exit(1);
        }
    };

    tracing::info!(?title_policy, "title policy selected");
    let state = state::AppState::new(Arc::new(llm), title_policy);
    state.conversations.create_conversation();

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "colloquy listening");
    axum::serve(listener, app).await.expect("server failed");
}
