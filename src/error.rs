use std::fmt;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

pub const API_KEY_MISSING: &str = "API key not configured";
pub const UPSTREAM_FAILED: &str = "Failed to get response from API";

/// Failures surfaced by the chat relay. Every variant is reported to the
/// caller as HTTP 500 with a JSON envelope.
#[derive(Debug)]
pub enum RelayError {
    /// No upstream credential is configured.
    Configuration,
    /// The upstream call failed or returned something unusable.
    Upstream {
        message: String,
        details: Option<Value>,
    },
}

impl RelayError {
    pub fn upstream(message: impl Into<String>) -> Self {
        RelayError::Upstream {
            message: message.into(),
            details: None,
        }
    }

    /// Non-2xx reply. The body becomes `details`: parsed as JSON when it is
    /// JSON, otherwise kept as text. An empty body leaves `details` unset.
    pub fn upstream_status(status: reqwest::StatusCode, body: &str) -> Self {
        let details = if body.trim().is_empty() {
            None
        } else {
            Some(
                serde_json::from_str::<Value>(body)
                    .unwrap_or_else(|_| Value::String(body.to_string())),
            )
        };
        RelayError::Upstream {
            message: format!("upstream returned {status}"),
            details,
        }
    }

    pub fn malformed(reason: impl fmt::Display) -> Self {
        RelayError::upstream(format!("malformed upstream response: {reason}"))
    }

    pub fn details(&self) -> Option<&Value> {
        match self {
            RelayError::Configuration => None,
            RelayError::Upstream { details, .. } => details.as_ref(),
        }
    }

    fn body(&self) -> Value {
        match self {
            RelayError::Configuration => json!({ "error": API_KEY_MISSING }),
            RelayError::Upstream { message, details } => json!({
                "error": UPSTREAM_FAILED,
                "details": details.clone().unwrap_or_else(|| Value::String(message.clone())),
                "type": "api_error",
            }),
        }
    }
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::Configuration => f.write_str(API_KEY_MISSING),
            RelayError::Upstream { message, .. } => write!(f, "upstream error: {message}"),
        }
    }
}

impl std::error::Error for RelayError {}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        RelayError::upstream(err.to_string())
    }
}

/// Unreadable `/chat` bodies are reported like any other relay failure.
impl From<JsonRejection> for RelayError {
    fn from(rejection: JsonRejection) -> Self {
        RelayError::upstream(rejection.body_text())
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self.body())).into_response()
    }
}

pub const SPEECH_NOT_CONFIGURED: &str = "speech recognition not configured";
pub const AUDIO_MISSING: &str = "no audio file received";

/// Failures of `/api/audio/recognize`, reported as `{success: false, error}`.
#[derive(Debug)]
pub enum SpeechError {
    NotConfigured,
    MissingAudio,
    InvalidUpload(String),
    Token(String),
    Recognition(String),
}

impl SpeechError {
    pub fn status(&self) -> StatusCode {
        match self {
            SpeechError::MissingAudio | SpeechError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for SpeechError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeechError::NotConfigured => f.write_str(SPEECH_NOT_CONFIGURED),
            SpeechError::MissingAudio => f.write_str(AUDIO_MISSING),
            SpeechError::InvalidUpload(e) => write!(f, "invalid audio upload: {e}"),
            SpeechError::Token(e) => write!(f, "failed to obtain access token: {e}"),
            SpeechError::Recognition(e) => write!(f, "recognition failed: {e}"),
        }
    }
}

impl std::error::Error for SpeechError {}

impl From<reqwest::Error> for SpeechError {
    fn from(err: reqwest::Error) -> Self {
        SpeechError::Recognition(err.to_string())
    }
}

impl IntoResponse for SpeechError {
    fn into_response(self) -> Response {
        let body = json!({ "success": false, "error": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}
