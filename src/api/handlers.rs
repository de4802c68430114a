use axum::{
    body::Bytes,
    extract::{
        multipart::{Multipart, MultipartRejection},
        rejection::JsonRejection,
        State,
    },
    Json,
};
use tracing::warn;

use crate::{
    api::{
        types::{HealthResponse, RecognizeResponse},
        AppState,
    },
    error::{RelayError, SpeechError},
    model::{ChatCompletion, ChatRequest},
};

/// Multipart field carrying the recorded clip.
pub const AUDIO_FIELD: &str = "audio";

pub async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatCompletion>, RelayError> {
    state.relay.api_key()?;

    let Json(req) = payload.map_err(|rejection| {
        warn!(status = %rejection.status(), "unreadable chat request: {}", rejection.body_text());
        RelayError::from(rejection)
    })?;

    let completion = state.relay.handle(&req).await?;
    Ok(Json(completion))
}

pub async fn recognize_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<RecognizeResponse>, SpeechError> {
    let mut multipart = multipart.map_err(|e| SpeechError::InvalidUpload(e.body_text()))?;
    let audio = read_audio_field(&mut multipart).await?;

    let text = state.speech.recognize(&audio).await?;
    Ok(Json(RecognizeResponse {
        success: true,
        text,
    }))
}

async fn read_audio_field(multipart: &mut Multipart) -> Result<Bytes, SpeechError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| SpeechError::InvalidUpload(e.body_text()))?
    {
        if field.name() == Some(AUDIO_FIELD) {
            return field
                .bytes()
                .await
                .map_err(|e| SpeechError::InvalidUpload(e.body_text()));
        }
    }
    Err(SpeechError::MissingAudio)
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}
