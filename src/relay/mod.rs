//! Relay endpoint: the server side of the chat wire protocol.
//!
//! Accepts `{"message": ...}`, asks an OpenAI-compatible upstream for a
//! completion and answers `{"reply": ..., "request_id": ...}`.

pub mod error;
pub mod upstream;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{Method, StatusCode, header},
    routing::post,
};
use serde::{Deserialize, Serialize};
use tokio::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::RelayConfig;
pub use error::RelayError;
pub use upstream::{CompletionBackend, OpenAiBackend};

/// Shared handler state
#[derive(Clone)]
pub struct RelayState {
    pub backend: Arc<dyn CompletionBackend>,
}

#[derive(Debug, Deserialize)]
struct RelayRequest {
    #[serde(default)]
    message: Option<String>,
}

/// Success body; `request_id` identifies the exchange in the relay's logs
#[derive(Debug, Serialize, Deserialize)]
pub struct RelayReply {
    pub reply: String,
    pub request_id: String,
}

pub fn router(state: RelayState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    let chat = post(chat_handler)
        .options(|| async { StatusCode::OK })
        .fallback(|| async { RelayError::MethodNotAllowed });

    Router::new()
        .route("/", chat.clone())
        .route("/chat", chat)
        .layer(cors)
        .with_state(state)
}

/// `POST /chat`: relay one message upstream
async fn chat_handler(
    State(state): State<RelayState>,
    body: Bytes,
) -> Result<Json<RelayReply>, RelayError> {
    let request: RelayRequest = serde_json::from_slice(&body).map_err(|_| RelayError::InvalidBody)?;
    let message = request
        .message
        .filter(|m| !m.is_empty())
        .ok_or(RelayError::MissingMessage)?;

    let request_id = uuid::Uuid::new_v4().to_string();
    info!(%request_id, chars = message.chars().count(), "relaying message");

    let reply = state.backend.complete(&message).await.inspect_err(|e| {
        warn!(%request_id, error = %e, "upstream completion failed");
    })?;

    Ok(Json(RelayReply { reply, request_id }))
}

/// Run the relay until Ctrl+C
pub async fn serve(config: &RelayConfig) -> Result<()> {
    let backend = OpenAiBackend::new(config)?;
    let app = router(RelayState {
        backend: Arc::new(backend),
    });

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    let addr = listener.local_addr()?;
    info!(%addr, upstream = %config.upstream_url, model = %config.model, "relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down relay");
        })
        .await
        .context("Relay server failed")?;

    Ok(())
}
