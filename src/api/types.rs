use serde::Serialize;

use crate::prompts::PROMPT_VERSION;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub api: &'static str,
    pub prompt_version: &'static str,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "OK",
            message: "Server is running",
            api: "DeepSeek",
            prompt_version: PROMPT_VERSION,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecognizeResponse {
    pub success: bool,
    pub text: String,
}
