use serde_json::{Value, json};
use tracing::debug;

use crate::catalog::ProviderFamily;
use crate::errors::ProviderError;
use crate::provider::{ProviderAdapter, ProviderEvent, ProviderRequest, ProviderStream};

use super::transport::{ensure_success, frame_event_stream};

const FAMILY: ProviderFamily = ProviderFamily::Anthropic;
const ENV_KEY: &str = "ANTHROPIC_API_KEY";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Configuration for the Anthropic message-stream client.
#[derive(Clone, Debug)]
pub struct AnthropicConfig {
    /// API key; when absent, every run fails before any network call.
    pub api_key: Option<String>,
    /// Base URL for the API endpoint, overridable for test servers.
    pub base_url: String,
}

impl AnthropicConfig {
    /// Creates a config with an explicit API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Builds a config from `ANTHROPIC_API_KEY`; a missing or blank value
    /// leaves the adapter unconfigured rather than failing construction.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var(ENV_KEY).ok().filter(|k| !k.trim().is_empty()),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Overrides the API base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }
}

/// Adapter for the Anthropic message-stream protocol (family A).
pub struct AnthropicAdapter {
    client: reqwest::Client,
    config: AnthropicConfig,
}

impl AnthropicAdapter {
    /// Creates an adapter from explicit configuration.
    pub fn new(config: AnthropicConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Creates an adapter using `ANTHROPIC_API_KEY` when present.
    pub fn from_env() -> Self {
        Self::new(AnthropicConfig::from_env())
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn family(&self) -> ProviderFamily {
        FAMILY
    }

    async fn open_stream(&self, req: &ProviderRequest) -> Result<ProviderStream, ProviderError> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Err(ProviderError::missing_credential(ENV_KEY));
        };

        let body = build_request_body(req);
        debug!(model = %req.model.id, "starting anthropic message stream");
        let response = self
            .client
            .post(self.config.messages_url())
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::transport(FAMILY, format!("request failed: {e}")))?;
        let response = ensure_success(FAMILY, response).await?;

        Ok(frame_event_stream(
            FAMILY,
            Box::pin(response.bytes_stream()),
            map_frame,
        ))
    }
}

fn build_request_body(req: &ProviderRequest) -> Value {
    let mut body = json!({
        "model": req.model.id,
        "messages": [{ "role": "user", "content": req.prompt }],
        "max_tokens": req.max_tokens,
        "stream": true,
    });
    if let Some(system) = req.system_prompt.as_deref() {
        body["system"] = json!(system);
    }
    if let Some(temperature) = req.temperature {
        body["temperature"] = json!(temperature);
    }
    if req.web_search {
        body["tools"] = json!([{
            "type": "web_search_20250305",
            "name": "web_search",
            "max_uses": 5,
        }]);
    }
    body
}

fn map_frame(value: &Value) -> Result<Vec<ProviderEvent>, ProviderError> {
    match value.get("type").and_then(Value::as_str) {
        Some("message_start") => Ok(value
            .pointer("/message/usage/input_tokens")
            .and_then(Value::as_u64)
            .map(ProviderEvent::InputTokens)
            .into_iter()
            .collect()),
        Some("content_block_delta") => {
            match value.pointer("/delta/text").and_then(Value::as_str) {
                Some(text) if !text.is_empty() => Ok(vec![ProviderEvent::TextDelta {
                    text: text.to_string(),
                }]),
                _ => Ok(Vec::new()),
            }
        }
        Some("message_delta") => Ok(value
            .pointer("/usage/output_tokens")
            .and_then(Value::as_u64)
            .map(ProviderEvent::OutputTokens)
            .into_iter()
            .collect()),
        Some("error") => {
            let message = value
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("anthropic stream error");
            Err(ProviderError::provider(FAMILY, message, None))
        }
        _ => Ok(Vec::new()),
    }
}
