use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::{config::SpeechConfig, error::SpeechError};

/// Uploads larger than this are refused before they reach the handler.
pub const MAX_AUDIO_BYTES: usize = 10 * 1024 * 1024;

const AUDIO_FORMAT: &str = "wav";
const SAMPLE_RATE: u32 = 16_000;
const CHANNELS: u32 = 1;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
    error_msg: Option<String>,
}

#[derive(Debug, Serialize)]
struct RecognizeRequest<'a> {
    format: &'static str,
    rate: u32,
    channel: u32,
    cuid: &'a str,
    dev_pid: u32,
    token: &'a str,
    len: usize,
    speech: String,
}

#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    result: Vec<String>,
    err_no: Option<i64>,
    err_msg: Option<String>,
}

/// Turns an uploaded 16 kHz mono WAV clip into text through the Baidu
/// short-speech API: one OAuth token request, then one recognition request.
pub struct SpeechService {
    client: reqwest::Client,
    config: Option<SpeechConfig>,
}

impl SpeechService {
    pub fn new(client: reqwest::Client, config: Option<SpeechConfig>) -> Self {
        Self { client, config }
    }

    #[tracing::instrument(
        name = "recognize",
        skip_all,
        fields(request_id = %Uuid::new_v4(), bytes = audio.len())
    )]
    pub async fn recognize(&self, audio: &[u8]) -> Result<String, SpeechError> {
        let config = self.config.as_ref().ok_or(SpeechError::NotConfigured)?;
        if audio.is_empty() {
            return Err(SpeechError::MissingAudio);
        }

        let result = self.recognize_with(config, audio).await;
        match &result {
            Ok(text) => info!(chars = text.chars().count(), "speech recognized"),
            Err(err) => error!(error = %err, "speech recognition failed"),
        }
        result
    }

    async fn recognize_with(
        &self,
        config: &SpeechConfig,
        audio: &[u8],
    ) -> Result<String, SpeechError> {
        let token = self.access_token(config).await?;

        let payload = RecognizeRequest {
            format: AUDIO_FORMAT,
            rate: SAMPLE_RATE,
            channel: CHANNELS,
            cuid: &config.cuid,
            dev_pid: config.dev_pid,
            token: &token,
            len: audio.len(),
            speech: STANDARD.encode(audio),
        };

        let response = self
            .client
            .post(&config.recognize_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_else(|e| e.to_string());
            return Err(SpeechError::Recognition(format!(
                "service returned {status}: {text}"
            )));
        }

        let body: RecognizeResponse = response.json().await?;
        match body.result.into_iter().next() {
            Some(text) => Ok(text),
            None => Err(SpeechError::Recognition(match (body.err_no, body.err_msg) {
                (Some(no), Some(msg)) => format!("{msg} (err_no {no})"),
                (None, Some(msg)) => msg,
                _ => "no usable result".to_string(),
            })),
        }
    }

    /// The token endpoint reports bad credentials with a JSON body on a
    /// non-2xx status, so the body is read regardless of status.
    async fn access_token(&self, config: &SpeechConfig) -> Result<String, SpeechError> {
        let response = self
            .client
            .post(&config.token_url)
            .query(&[
                ("grant_type", "client_credentials"),
                ("client_id", config.api_key.as_str()),
                ("client_secret", config.secret_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SpeechError::Token(e.to_string()))?;

        let status = response.status();
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| SpeechError::Token(format!("{status}: {e}")))?;

        body.access_token.ok_or_else(|| {
            SpeechError::Token(
                body.error_description
                    .or(body.error_msg)
                    .or(body.error)
                    .unwrap_or_else(|| format!("{status}: no access_token in response")),
            )
        })
    }
}
