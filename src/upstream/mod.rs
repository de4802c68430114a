use std::time::Duration;

use anyhow::Result;
use tracing::debug;

use crate::{
    error::RelayError,
    model::{ChatCompletion, UpstreamRequest},
};

/// Outbound HTTP client shared by the completion and speech providers.
pub fn build_http_client(timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// HTTP client for the provider's chat completion endpoint.
#[derive(Clone)]
pub struct CompletionClient {
    client: reqwest::Client,
    url: String,
}

impl CompletionClient {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Single attempt, no retry. Any transport failure, non-2xx status or
    /// non-JSON body is an upstream error.
    pub async fn complete(
        &self,
        api_key: &str,
        payload: &UpstreamRequest<'_>,
    ) -> Result<ChatCompletion, RelayError> {
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {}", api_key))
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        debug!(%status, "upstream responded");

        if !status.is_success() {
            return Err(match response.text().await {
                Ok(text) => RelayError::upstream_status(status, &text),
                Err(e) => RelayError::upstream(format!("upstream returned {status}: {e}")),
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice::<ChatCompletion>(&bytes).map_err(RelayError::malformed)
    }
}
