//! Shared model adapter traits and data structures.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use capbridge_primitives::{CallRequest, CallResult, CanonicalCallSchema};
use capbridge_prompts::PromptMessage;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias used by model adapters.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Streaming response emitted by [`ModelAdapter::infer`].
pub type AdapterStream = Pin<Box<dyn Stream<Item = AdapterResult<InferenceChunk>> + Send>>;

/// Error type shared by adapter implementations.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Adapter is misconfigured or missing credentials.
    #[error("adapter not configured: {reason}")]
    Configuration {
        /// Additional context for the failure.
        reason: String,
    },

    /// The supplied request was invalid for the target model.
    #[error("invalid inference request: {reason}")]
    InvalidRequest {
        /// Reason describing why the request could not be processed.
        reason: String,
    },

    /// Transport-level failures (network, protocol, etc.).
    #[error("adapter transport error: {reason}")]
    Transport {
        /// Additional context about the error.
        reason: String,
    },

    /// The provider rejected the request due to rate limiting.
    #[error("adapter rate limited (retry after {retry_after:?})")]
    RateLimited {
        /// Suggested delay before retrying.
        retry_after: Option<Duration>,
    },

    /// The provider returned a malformed response.
    #[error("adapter response error: {reason}")]
    Response {
        /// Additional context about the response failure.
        reason: String,
    },
}

impl AdapterError {
    /// Convenience constructor for invalid requests.
    #[must_use]
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for configuration issues.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for transport failures.
    #[must_use]
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for malformed responses.
    #[must_use]
    pub fn response(reason: impl Into<String>) -> Self {
        Self::Response {
            reason: reason.into(),
        }
    }
}

/// Minimal metadata describing a model adapter instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdapterMetadata {
    provider: &'static str,
    model: String,
}

impl AdapterMetadata {
    /// Creates metadata for the supplied provider and model identifier.
    #[must_use]
    pub fn new(provider: &'static str, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Returns the provider identifier (e.g., "openai").
    #[must_use]
    pub const fn provider(&self) -> &'static str {
        self.provider
    }

    /// Returns the configured model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

/// One entry of the conversation handed to the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationItem {
    /// A role-tagged text message.
    Message(PromptMessage),
    /// A call request previously issued by the model.
    FunctionCall(CallRequest),
    /// The result paired to a previously issued call request.
    FunctionCallOutput(CallResult),
}

impl From<PromptMessage> for ConversationItem {
    fn from(message: PromptMessage) -> Self {
        Self::Message(message)
    }
}

impl From<CallRequest> for ConversationItem {
    fn from(call: CallRequest) -> Self {
        Self::FunctionCall(call)
    }
}

impl From<CallResult> for ConversationItem {
    fn from(result: CallResult) -> Self {
        Self::FunctionCallOutput(result)
    }
}

/// Request submitted to a model adapter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InferenceRequest {
    /// Optional system prompt that guides model behavior.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    system_prompt: Option<String>,
    /// Conversation so far, in order.
    input: Vec<ConversationItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    /// Callable functions offered for this turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tools: Vec<CanonicalCallSchema>,
}

impl InferenceRequest {
    /// Creates a request with the supplied conversation items.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidRequest`] if the item list is empty.
    pub fn new(input: Vec<ConversationItem>) -> AdapterResult<Self> {
        if input.is_empty() {
            return Err(AdapterError::invalid_request(
                "inference request requires at least one input item",
            ));
        }

        Ok(Self {
            system_prompt: None,
            input,
            max_output_tokens: None,
            temperature: None,
            tools: Vec::new(),
        })
    }

    /// Sets the system prompt that guides model behavior.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Sets the maximum output token budget.
    #[must_use]
    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Offers callable functions to the model.
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<CanonicalCallSchema>) -> Self {
        self.tools = tools;
        self
    }

    /// Returns the system prompt if configured.
    #[must_use]
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    /// Returns the conversation items.
    #[must_use]
    pub fn input(&self) -> &[ConversationItem] {
        &self.input
    }

    /// Returns the configured maximum output tokens.
    #[must_use]
    pub const fn max_output_tokens(&self) -> Option<u32> {
        self.max_output_tokens
    }

    /// Returns the configured sampling temperature.
    #[must_use]
    pub const fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    /// Returns the offered functions.
    #[must_use]
    pub fn tools(&self) -> &[CanonicalCallSchema] {
        &self.tools
    }
}

/// Streaming chunk returned by the adapter.
#[derive(Clone, Debug, PartialEq)]
pub enum InferenceChunk {
    /// Partial answer text.
    Text(String),
    /// The model asked for a function to be called.
    FunctionCall(CallRequest),
    /// The generation is complete.
    Done,
}

/// A fully collected model response.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelResponse {
    text: String,
    calls: Vec<CallRequest>,
}

impl ModelResponse {
    /// Drains an adapter stream, concatenating text and gathering call
    /// requests in the order they were emitted. Chunks after
    /// [`InferenceChunk::Done`] are ignored.
    ///
    /// # Errors
    ///
    /// Returns the first error yielded by the stream.
    pub async fn collect(mut stream: AdapterStream) -> AdapterResult<Self> {
        let mut response = Self::default();
        while let Some(chunk) = stream.next().await {
            match chunk? {
                InferenceChunk::Text(delta) => response.text.push_str(&delta),
                InferenceChunk::FunctionCall(call) => response.calls.push(call),
                InferenceChunk::Done => break,
            }
        }
        Ok(response)
    }

    /// Answer text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Call requests in emission order.
    #[must_use]
    pub fn calls(&self) -> &[CallRequest] {
        &self.calls
    }

    /// Splits the response into its text and call requests.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<CallRequest>) {
        (self.text, self.calls)
    }
}

/// Trait implemented by all model adapters.
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    /// Returns basic metadata describing the adapter instance.
    fn metadata(&self) -> &AdapterMetadata;

    /// Executes the inference request, returning a streaming response.
    async fn infer(&self, request: InferenceRequest) -> AdapterResult<AdapterStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    use capbridge_primitives::CallId;
    use futures::stream;

    #[test]
    fn validates_request_input() {
        let err = InferenceRequest::new(Vec::new()).expect_err("input required");
        assert!(matches!(err, AdapterError::InvalidRequest { .. }));
    }

    #[test]
    fn builds_request() {
        let request = InferenceRequest::new(vec![PromptMessage::user("ping").into()])
            .unwrap()
            .with_max_output_tokens(256)
            .with_temperature(0.7)
            .with_system_prompt("be brief");

        assert_eq!(request.input().len(), 1);
        assert_eq!(request.max_output_tokens(), Some(256));
        assert_eq!(request.temperature(), Some(0.7));
        assert_eq!(request.system_prompt(), Some("be brief"));
        assert!(request.tools().is_empty());
    }

    #[tokio::test]
    async fn collects_text_and_calls_until_done() {
        let call = CallRequest::new(CallId::new("call_1").unwrap(), "add", r#"{"a":1}"#);
        let chunks = vec![
            Ok(InferenceChunk::Text("Hel".into())),
            Ok(InferenceChunk::FunctionCall(call.clone())),
            Ok(InferenceChunk::Text("lo".into())),
            Ok(InferenceChunk::Done),
            Ok(InferenceChunk::Text("ignored".into())),
        ];
        let stream: AdapterStream = Box::pin(stream::iter(chunks));

        let response = ModelResponse::collect(stream).await.unwrap();
        assert_eq!(response.text(), "Hello");
        assert_eq!(response.calls(), &[call]);
    }

    #[tokio::test]
    async fn collect_propagates_stream_errors() {
        let chunks = vec![
            Ok(InferenceChunk::Text("partial".into())),
            Err(AdapterError::transport("reset")),
        ];
        let stream: AdapterStream = Box::pin(stream::iter(chunks));
        let err = ModelResponse::collect(stream).await.expect_err("error");
        assert!(matches!(err, AdapterError::Transport { .. }));
    }
}
