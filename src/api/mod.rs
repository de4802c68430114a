use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::{
    config::RelayConfig,
    relay::RelayService,
    speech::{SpeechService, MAX_AUDIO_BYTES},
    upstream::build_http_client,
};

pub mod handlers;
pub mod types;

use handlers::{chat_handler, health_handler, recognize_handler};

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<RelayService>,
    pub speech: Arc<SpeechService>,
}

impl AppState {
    pub fn new(config: &RelayConfig) -> Result<Self> {
        let client = build_http_client(config.upstream_timeout)?;
        Ok(Self {
            relay: Arc::new(RelayService::new(config, client.clone())),
            speech: Arc::new(SpeechService::new(client, config.speech.clone())),
        })
    }
}

/// Relay API: chat completions, speech recognition and health.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/chat", post(chat_handler))
        .route(
            "/api/audio/recognize",
            post(recognize_handler).layer(DefaultBodyLimit::max(MAX_AUDIO_BYTES)),
        )
        .route("/health", get(health_handler))
}
