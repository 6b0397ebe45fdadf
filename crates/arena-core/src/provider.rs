use std::pin::Pin;

use crate::catalog::{ModelDescriptor, ProviderFamily};
use crate::errors::ProviderError;

/// One normalized increment decoded from a provider's wire stream.
#[derive(Clone, Debug, PartialEq)]
pub enum ProviderEvent {
    /// One fragment of generated text, in generation order.
    TextDelta { text: String },
    /// Input-side token count reported by the provider; the latest value wins.
    InputTokens(u64),
    /// Output-side token count reported by the provider; the latest value wins.
    OutputTokens(u64),
}

/// Normalized event stream for one in-flight provider call.
///
/// The stream ends normally at end of the provider's response body; an `Err`
/// item is terminal and reports an in-band or transport failure. Dropping the
/// stream aborts the underlying call.
pub type ProviderStream =
    Pin<Box<dyn futures::Stream<Item = Result<ProviderEvent, ProviderError>> + Send + 'static>>;

/// Generation parameters handed to an adapter for one model run.
#[derive(Clone, Debug)]
pub struct ProviderRequest {
    /// Resolved catalogue entry for the model being run.
    pub model: ModelDescriptor,
    /// User prompt.
    pub prompt: String,
    /// Optional system prompt; omitted from the payload when `None`.
    pub system_prompt: Option<String>,
    /// Maximum output tokens.
    pub max_tokens: u32,
    /// Sampling temperature; `None` for models that reject the parameter,
    /// in which case it is omitted from the payload entirely.
    pub temperature: Option<f64>,
    /// Enables the provider's web-search tool.
    pub web_search: bool,
}

/// Contract shared by all vendor integrations.
#[async_trait::async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Protocol family this adapter speaks.
    fn family(&self) -> ProviderFamily;

    /// Issues the streaming call and returns the normalized event stream.
    ///
    /// Fails without touching the network when the family's credential is
    /// absent, and on any non-2xx response to the initial call.
    async fn open_stream(&self, req: &ProviderRequest) -> Result<ProviderStream, ProviderError>;
}

/// Counters accumulated while driving one provider stream.
///
/// Owned exclusively by the task that drives the stream and handed to the
/// metrics calculator by value on completion.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StreamTotals {
    /// Milliseconds to the first text fragment; zero if none was produced.
    pub ttft_ms: u64,
    /// Total elapsed milliseconds for the call.
    pub total_ms: u64,
    /// Final input token count.
    pub input_tokens: u64,
    /// Final output token count.
    pub output_tokens: u64,
    /// Accumulated output text.
    pub output: String,
}
