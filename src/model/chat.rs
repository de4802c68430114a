use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::message::ChatTurn;

pub const DEFAULT_MODEL: &str = "deepseek-chat";
pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

pub const FREQUENCY_PENALTY: f64 = 0.5;
pub const PRESENCE_PENALTY: f64 = 0.5;

const FIRST_CONTENT_POINTER: &str = "/choices/0/message/content";

/// Body of `POST /chat`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatTurn>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatTurn>) -> Self {
        Self {
            messages,
            model: default_model(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// Payload posted to the completion endpoint. Penalties are fixed.
#[derive(Debug, Serialize)]
pub struct UpstreamRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatTurn],
    pub max_tokens: u32,
    pub temperature: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
}

impl<'a> UpstreamRequest<'a> {
    pub fn new(request: &'a ChatRequest, outbound: &'a [ChatTurn]) -> Self {
        Self {
            model: &request.model,
            messages: outbound,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            frequency_penalty: FREQUENCY_PENALTY,
            presence_penalty: PRESENCE_PENALTY,
        }
    }
}

/// Completion object returned by the provider.
///
/// Only `choices[0].message.content` is known to the relay; every other field
/// (ids, usage, further choices, provider extensions) is carried as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatCompletion(Value);

impl ChatCompletion {
    pub fn first_content(&self) -> Option<&str> {
        self.0.pointer(FIRST_CONTENT_POINTER)?.as_str()
    }

    /// Returns the completion with `choices[0].message.content` replaced.
    pub fn with_first_content(mut self, content: String) -> Self {
        if let Some(slot) = self.0.pointer_mut(FIRST_CONTENT_POINTER) {
            *slot = Value::String(content);
        }
        self
    }
}
