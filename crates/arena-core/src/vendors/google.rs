use serde_json::{Value, json};
use tracing::debug;

use crate::catalog::ProviderFamily;
use crate::errors::ProviderError;
use crate::provider::{ProviderAdapter, ProviderEvent, ProviderRequest, ProviderStream};

use super::transport::{ensure_success, frame_event_stream};

const FAMILY: ProviderFamily = ProviderFamily::Google;
const ENV_KEY: &str = "GEMINI_API_KEY";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Configuration for the Google candidate-stream client.
#[derive(Clone, Debug)]
pub struct GoogleConfig {
    /// API key; when absent, every run fails before any network call.
    pub api_key: Option<String>,
    /// Base URL for the API endpoint, overridable for test servers.
    pub base_url: String,
}

impl GoogleConfig {
    /// Creates a config with an explicit API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Builds a config from `GEMINI_API_KEY`; a missing or blank value
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

    fn stream_url(&self, model_id: &str) -> String {
        format!(
            "{}/v1beta/models/{model_id}:streamGenerateContent?alt=sse",
            self.base_url.trim_end_matches('/')
        )
    }
}

/// Adapter for the Google candidate-stream protocol (family C).
pub struct GoogleAdapter {
    client: reqwest::Client,
    config: GoogleConfig,
}

impl GoogleAdapter {
    /// Creates an adapter from explicit configuration.
    pub fn new(config: GoogleConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Creates an adapter using `GEMINI_API_KEY` when present.
    pub fn from_env() -> Self {
        Self::new(GoogleConfig::from_env())
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for GoogleAdapter {
    fn family(&self) -> ProviderFamily {
        FAMILY
    }

    async fn open_stream(&self, req: &ProviderRequest) -> Result<ProviderStream, ProviderError> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Err(ProviderError::missing_credential(ENV_KEY));
        };

        let body = build_request_body(req);
        debug!(model = %req.model.id, "starting google candidate stream");
        let response = self
            .client
            .post(self.config.stream_url(&req.model.id))
            .header("x-goog-api-key", api_key)
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
    let mut generation_config = json!({ "maxOutputTokens": req.max_tokens });
    if let Some(temperature) = req.temperature {
        generation_config["temperature"] = json!(temperature);
    }

    let mut body = json!({
        "contents": [{ "parts": [{ "text": req.prompt }] }],
        "generationConfig": generation_config,
    });
    if let Some(system) = req.system_prompt.as_deref() {
        body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
    }
    if req.web_search {
        body["tools"] = json!([{ "google_search": {} }]);
    }
    body
}

fn map_frame(value: &Value) -> Result<Vec<ProviderEvent>, ProviderError> {
    let mut events = Vec::new();
    if let Some(text) = value
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        && !text.is_empty()
    {
        events.push(ProviderEvent::TextDelta {
            text: text.to_string(),
        });
    }
    // Token counts are cumulative and may arrive on any frame; the latest
    // value wins downstream.
    if let Some(usage) = value.get("usageMetadata") {
        if let Some(count) = usage.get("promptTokenCount").and_then(Value::as_u64) {
            events.push(ProviderEvent::InputTokens(count));
        }
        if let Some(count) = usage.get("candidatesTokenCount").and_then(Value::as_u64) {
            events.push(ProviderEvent::OutputTokens(count));
        }
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ModelDescriptor;

    fn request() -> ProviderRequest {
        ProviderRequest {
            model: ModelDescriptor {
                id: "gemini-2.5-flash".to_string(),
                name: "Gemini 2.5 Flash".to_string(),
                provider: FAMILY,
                input_cost_per_1m: 0.3,
                output_cost_per_1m: 2.5,
                no_temperature: false,
            },
            prompt: "hello".to_string(),
            system_prompt: None,
            max_tokens: 2048,
            temperature: Some(0.0),
            web_search: false,
        }
    }

    #[test]
    fn stream_url_embeds_the_model_id() {
        let config = GoogleConfig::new("key").base_url("http://localhost:8000/");
        assert_eq!(
            config.stream_url("gemini-2.5-flash"),
            "http://localhost:8000/v1beta/models/gemini-2.5-flash:streamGenerateContent?alt=sse"
        );
    }

    #[test]
    fn request_body_nests_generation_config() {
        let body = build_request_body(&request());
        assert_eq!(body["contents"][0]["parts"][0]["text"], json!("hello"));
        assert_eq!(body["generationConfig"]["maxOutputTokens"], json!(2048));
        assert_eq!(body["generationConfig"]["temperature"], json!(0.0));
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn system_instruction_and_search_tool_are_optional() {
        let mut req = request();
        req.system_prompt = Some("be brief".to_string());
        req.web_search = true;
        req.temperature = None;
        let body = build_request_body(&req);
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            json!("be brief")
        );
        assert_eq!(body["tools"], json!([{ "google_search": {} }]));
        assert!(body["generationConfig"].get("temperature").is_none());
    }

    #[test]
    fn maps_candidate_text_and_usage_from_one_frame() {
        let frame = json!({
            "candidates": [{ "content": { "parts": [{ "text": "Hi" }] } }],
            "usageMetadata": { "promptTokenCount": 4, "candidatesTokenCount": 11 }
        });
        assert_eq!(
            map_frame(&frame).expect("map"),
            vec![
                ProviderEvent::TextDelta { text: "Hi".to_string() },
                ProviderEvent::InputTokens(4),
                ProviderEvent::OutputTokens(11),
            ]
        );
    }

    #[test]
    fn frames_without_text_or_usage_are_ignored() {
        let frame = json!({ "candidates": [{ "finishReason": "STOP" }] });
        assert!(map_frame(&frame).expect("map").is_empty());
    }

    #[tokio::test]
    async fn missing_credential_fails_before_any_network_call() {
        let adapter = GoogleAdapter::new(GoogleConfig {
            api_key: None,
            base_url: "http://127.0.0.1:9".to_string(),
        });
        let err = match adapter.open_stream(&request()).await {
            Err(e) => e,
            Ok(_) => panic!("should fail"),
        };
        assert!(matches!(
            err,
            ProviderError::MissingCredential { env_key } if env_key == ENV_KEY
        ));
    }
}
