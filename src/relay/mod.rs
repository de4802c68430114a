use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    config::RelayConfig,
    conversation::{build_outbound, filter_symbols},
    error::RelayError,
    model::{ChatCompletion, ChatRequest, UpstreamRequest},
    upstream::CompletionClient,
};

/// Forwards a conversation to the provider behind the coaching prompt and
/// cleans the reply. Holds no per-request state.
pub struct RelayService {
    api_key: Option<String>,
    client: CompletionClient,
}

impl RelayService {
    pub fn new(config: &RelayConfig, client: reqwest::Client) -> Self {
        Self {
            api_key: config.api_key.clone(),
            client: CompletionClient::new(client, config.upstream_url.clone()),
        }
    }

    /// The upstream credential, or `Configuration` when none is set. Checked
    /// before anything else about a request, including its body.
    pub fn api_key(&self) -> Result<&str, RelayError> {
        self.api_key.as_deref().ok_or_else(|| {
            error!("upstream credential missing, refusing request");
            RelayError::Configuration
        })
    }

    #[tracing::instrument(
        name = "chat",
        skip_all,
        fields(
            request_id = %Uuid::new_v4(),
            model = %request.model,
            turns = request.messages.len(),
        )
    )]
    pub async fn handle(&self, request: &ChatRequest) -> Result<ChatCompletion, RelayError> {
        let api_key = self.api_key()?;

        let outbound = build_outbound(&request.messages);
        let payload = UpstreamRequest::new(request, &outbound);

        let completion = match self.client.complete(api_key, &payload).await {
            Ok(completion) => completion,
            Err(err) => {
                error!(error = %err, details = ?err.details(), "upstream completion failed");
                return Err(err);
            }
        };

        let original = completion
            .first_content()
            .ok_or_else(|| RelayError::malformed("missing choices[0].message.content"))
            .inspect_err(|err| error!(error = %err, "upstream completion unusable"))?
            .to_string();

        let filtered = filter_symbols(&original);
        if filtered != original {
            warn!(
                original = %original,
                filtered = %filtered,
                "filtered symbols from response"
            );
        }

        info!(chars = filtered.chars().count(), "completion relayed");
        Ok(completion.with_first_content(filtered))
    }
}
