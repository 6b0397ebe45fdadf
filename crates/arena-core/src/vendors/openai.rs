use serde_json::{Value, json};
use tracing::debug;

use crate::catalog::ProviderFamily;
use crate::errors::ProviderError;
use crate::provider::{ProviderAdapter, ProviderEvent, ProviderRequest, ProviderStream};

use super::transport::{ensure_success, frame_event_stream};

const FAMILY: ProviderFamily = ProviderFamily::OpenAi;
const ENV_KEY: &str = "OPENAI_API_KEY";
const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Configuration for the OpenAI response-object client.
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// API key; when absent, every run fails before any network call.
    pub api_key: Option<String>,
    /// Base URL for the API endpoint, overridable for test servers.
    pub base_url: String,
}

impl OpenAiConfig {
    /// Creates a config with an explicit API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Builds a config from `OPENAI_API_KEY`; a missing or blank value
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

    fn responses_url(&self) -> String {
        format!("{}/v1/responses", self.base_url.trim_end_matches('/'))
    }
}

/// Adapter for the OpenAI response-object protocol (family B).
pub struct OpenAiAdapter {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiAdapter {
    /// Creates an adapter from explicit configuration.
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Creates an adapter using `OPENAI_API_KEY` when present.
    pub fn from_env() -> Self {
        Self::new(OpenAiConfig::from_env())
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn family(&self) -> ProviderFamily {
        FAMILY
    }

    async fn open_stream(&self, req: &ProviderRequest) -> Result<ProviderStream, ProviderError> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Err(ProviderError::missing_credential(ENV_KEY));
        };

        let body = build_request_body(req);
        debug!(model = %req.model.id, "starting openai responses stream");
        let response = self
            .client
            .post(self.config.responses_url())
            .bearer_auth(api_key)
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
    let mut input = Vec::new();
    if let Some(system) = req.system_prompt.as_deref() {
        input.push(json!({ "role": "system", "content": system }));
    }
    input.push(json!({ "role": "user", "content": req.prompt }));

    let mut body = json!({
        "model": req.model.id,
        "input": input,
        "max_output_tokens": req.max_tokens,
        "stream": true,
    });
    if let Some(temperature) = req.temperature {
        body["temperature"] = json!(temperature);
    }
    if req.web_search {
        body["tools"] = json!([{ "type": "web_search" }]);
    }
    body
}

fn map_frame(value: &Value) -> Result<Vec<ProviderEvent>, ProviderError> {
    match value.get("type").and_then(Value::as_str) {
        Some("response.output_text.delta") => {
            match value.get("delta").and_then(Value::as_str) {
                Some(text) if !text.is_empty() => Ok(vec![ProviderEvent::TextDelta {
                    text: text.to_string(),
                }]),
                _ => Ok(Vec::new()),
            }
        }
        Some("response.completed") => {
            let mut events = Vec::new();
            if let Some(count) = value
                .pointer("/response/usage/input_tokens")
                .and_then(Value::as_u64)
            {
                events.push(ProviderEvent::InputTokens(count));
            }
            if let Some(count) = value
                .pointer("/response/usage/output_tokens")
                .and_then(Value::as_u64)
            {
                events.push(ProviderEvent::OutputTokens(count));
            }
            Ok(events)
        }
        _ => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ModelDescriptor;

    fn request(temperature: Option<f64>) -> ProviderRequest {
        ProviderRequest {
            model: ModelDescriptor {
                id: "gpt-5".to_string(),
                name: "GPT-5".to_string(),
                provider: FAMILY,
                input_cost_per_1m: 1.25,
                output_cost_per_1m: 10.0,
                no_temperature: true,
            },
            prompt: "hello".to_string(),
            system_prompt: Some("sys".to_string()),
            max_tokens: 4096,
            temperature,
            web_search: false,
        }
    }

    #[test]
    fn request_body_places_system_before_user_input() {
        let body = build_request_body(&request(None));
        assert_eq!(body["input"][0]["role"], json!("system"));
        assert_eq!(body["input"][1]["role"], json!("user"));
        assert_eq!(body["max_output_tokens"], json!(4096));
        assert_eq!(body["stream"], json!(true));
    }

    #[test]
    fn temperature_is_omitted_entirely_when_unset() {
        assert!(build_request_body(&request(None)).get("temperature").is_none());
        assert_eq!(
            build_request_body(&request(Some(0.0)))["temperature"],
            json!(0.0)
        );
    }

    #[test]
    fn web_search_toggle_adds_the_tool() {
        let mut req = request(None);
        req.web_search = true;
        let body = build_request_body(&req);
        assert_eq!(body["tools"], json!([{ "type": "web_search" }]));
    }

    #[test]
    fn maps_delta_and_completed_usage_frames() {
        let delta = json!({ "type": "response.output_text.delta", "delta": "Hi" });
        assert_eq!(
            map_frame(&delta).expect("map"),
            vec![ProviderEvent::TextDelta { text: "Hi".to_string() }]
        );

        let completed = json!({
            "type": "response.completed",
            "response": { "usage": { "input_tokens": 9, "output_tokens": 120 } }
        });
        assert_eq!(
            map_frame(&completed).expect("map"),
            vec![
                ProviderEvent::InputTokens(9),
                ProviderEvent::OutputTokens(120)
            ]
        );
    }

    #[test]
    fn frames_without_usage_or_text_are_ignored() {
        let created = json!({ "type": "response.created" });
        assert!(map_frame(&created).expect("map").is_empty());
        let empty_delta = json!({ "type": "response.output_text.delta", "delta": "" });
        assert!(map_frame(&empty_delta).expect("map").is_empty());
    }

    #[tokio::test]
    async fn missing_credential_fails_before_any_network_call() {
        let adapter = OpenAiAdapter::new(OpenAiConfig {
            api_key: None,
            base_url: "http://127.0.0.1:9".to_string(),
        });
        let err = match adapter.open_stream(&request(None)).await {
            Err(e) => e,
            Ok(_) => panic!("should fail"),
        };
        assert!(matches!(
            err,
            ProviderError::MissingCredential { env_key } if env_key == ENV_KEY
        ));
    }
}
