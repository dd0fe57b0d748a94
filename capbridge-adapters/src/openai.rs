//! `OpenAI` Responses API adapter.

use std::{env, fmt, time::Duration};

use async_trait::async_trait;
use capbridge_primitives::{CallArguments, CallId, CallRequest, CanonicalCallSchema};
use capbridge_prompts::PromptMessage;
use futures::stream;
use hyper::Uri;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::http_client::{HyperClient, build_https_client, post_json};
use crate::traits::{
    AdapterError, AdapterMetadata, AdapterResult, AdapterStream, ConversationItem,
    InferenceChunk, InferenceRequest, ModelAdapter,
};

/// Environment variable used when loading configuration automatically.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Default API root.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/";

/// Configuration for the `OpenAI` adapter.
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    api_key: Option<String>,
    model: String,
    base_url: String,
    timeout: Duration,
    default_temperature: Option<f32>,
}

impl OpenAiConfig {
    /// Creates a configuration using the supplied model identifier.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            api_key: None,
            model: model.into(),
            base_url: OPENAI_BASE_URL.to_owned(),
            timeout: Duration::from_secs(60),
            default_temperature: None,
        }
    }

    /// Loads the API key from the `OPENAI_API_KEY` environment variable.
    #[must_use]
    pub fn from_env(model: impl Into<String>) -> Self {
        let mut cfg = Self::new(model);
        cfg.api_key = env::var(OPENAI_API_KEY_ENV).ok();
        cfg
    }

    /// Overrides the base URL used for API calls.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the supplied URL is invalid.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> AdapterResult<Self> {
        self.base_url = sanitize_base_url(base_url.as_ref())?;
        Ok(self)
    }

    /// Sets the default sampling temperature used when requests omit it.
    #[must_use]
    pub fn with_default_temperature(mut self, temperature: f32) -> Self {
        self.default_temperature = Some(temperature);
        self
    }

    /// Sets the HTTP request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Supplies an explicit API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Returns the configured model identifier.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the normalized base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// `OpenAI` adapter that calls the Responses API over HTTPS.
pub struct OpenAiAdapter {
    client: HyperClient,
    endpoint: Uri,
    metadata: AdapterMetadata,
    api_key: String,
    timeout: Duration,
    default_temperature: Option<f32>,
}

impl fmt::Debug for OpenAiAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiAdapter")
            .field("model", &self.metadata.model())
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl OpenAiAdapter {
    /// Constructs a new adapter with the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the API key is missing or the
    /// endpoint cannot be formed.
    pub fn new(config: OpenAiConfig) -> AdapterResult<Self> {
        let api_key = config
            .api_key
            .ok_or_else(|| AdapterError::configuration("OpenAI adapter requires an API key"))?;

        let metadata = AdapterMetadata::new("openai", config.model);
        let endpoint = format!("{}v1/responses", config.base_url)
            .parse::<Uri>()
            .map_err(|err| {
                AdapterError::configuration(format!("invalid OpenAI endpoint: {err}"))
            })?;

        Ok(Self {
            client: build_https_client(),
            endpoint,
            metadata,
            api_key,
            timeout: config.timeout,
            default_temperature: config.default_temperature,
        })
    }

    fn build_request(&self, request: &InferenceRequest) -> AdapterResult<ResponsesRequest> {
        let input = request
            .input()
            .iter()
            .map(map_item)
            .collect::<AdapterResult<Vec<_>>>()?;
        let tools = request.tools().iter().map(map_tool).collect();

        Ok(ResponsesRequest {
            model: self.metadata.model().to_owned(),
            instructions: request.system_prompt().map(str::to_owned),
            input,
            tools,
            temperature: request.temperature().or(self.default_temperature),
            max_output_tokens: request.max_output_tokens(),
        })
    }
}

#[async_trait]
impl ModelAdapter for OpenAiAdapter {
    fn metadata(&self) -> &AdapterMetadata {
        &self.metadata
    }

    async fn infer(&self, request: InferenceRequest) -> AdapterResult<AdapterStream> {
        let payload = self.build_request(&request)?;
        let body = serde_json::to_vec(&payload).map_err(|err| {
            AdapterError::invalid_request(format!("failed to encode OpenAI request: {err}"))
        })?;

        debug!(
            model = self.metadata.model(),
            items = payload.input.len(),
            tools = payload.tools.len(),
            "sending OpenAI responses request"
        );

        let bytes = post_json(
            &self.client,
            &self.endpoint,
            &self.api_key,
            body,
            self.timeout,
        )
        .await?;

        let response: ResponsesResponse = serde_json::from_slice(&bytes).map_err(|err| {
            AdapterError::response(format!("failed to decode OpenAI response: {err}"))
        })?;

        let mut chunks = response.into_chunks()?;
        chunks.push(InferenceChunk::Done);
        Ok(Box::pin(stream::iter(chunks.into_iter().map(Ok))))
    }
}

#[derive(Debug, Serialize)]
struct ResponsesRequest {
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<String>,
    input: Vec<InputItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<FunctionTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum InputItem {
    Message {
        role: String,
        content: String,
    },
    Typed(TypedInputItem),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TypedInputItem {
    FunctionCall {
        call_id: String,
        name: String,
        arguments: String,
    },
    FunctionCallOutput {
        call_id: String,
        output: String,
    },
}

#[derive(Debug, Serialize)]
struct FunctionTool {
    #[serde(rename = "type")]
    kind: &'static str,
    name: String,
    description: String,
    parameters: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ResponsesResponse {
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutputItem {
    Message {
        #[serde(default)]
        content: Vec<OutputContent>,
    },
    FunctionCall {
        call_id: String,
        name: String,
        #[serde(default)]
        arguments: Option<Value>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutputContent {
    OutputText {
        text: String,
    },
    #[serde(other)]
    Other,
}

impl ResponsesResponse {
    fn into_chunks(self) -> AdapterResult<Vec<InferenceChunk>> {
        let mut chunks = Vec::new();
        for item in self.output {
            match item {
                OutputItem::Message { content } => {
                    chunks.extend(content.into_iter().filter_map(|part| match part {
                        OutputContent::OutputText { text } => Some(InferenceChunk::Text(text)),
                        OutputContent::Other => None,
                    }));
                }
                OutputItem::FunctionCall {
                    call_id,
                    name,
                    arguments,
                } => {
                    let call_id = CallId::new(call_id).map_err(|err| {
                        AdapterError::response(format!("function call without id: {err}"))
                    })?;
                    let arguments = match arguments {
                        Some(Value::String(text)) => CallArguments::Encoded(text),
                        Some(Value::Object(map)) => CallArguments::Structured(map),
                        None | Some(Value::Null) => CallArguments::Structured(Map::new()),
                        Some(other) => CallArguments::Encoded(other.to_string()),
                    };
                    chunks.push(InferenceChunk::FunctionCall(CallRequest::new(
                        call_id, name, arguments,
                    )));
                }
                OutputItem::Other => {}
            }
        }
        Ok(chunks)
    }
}

fn map_message(message: &PromptMessage) -> InputItem {
    InputItem::Message {
        role: message.role().to_string(),
        content: message.content().to_owned(),
    }
}

fn map_item(item: &ConversationItem) -> AdapterResult<InputItem> {
    Ok(match item {
        ConversationItem::Message(message) => map_message(message),
        ConversationItem::FunctionCall(call) => {
            let arguments = match call.arguments() {
                CallArguments::Encoded(text) => text.clone(),
                CallArguments::Structured(map) => serde_json::to_string(map).map_err(|err| {
                    AdapterError::invalid_request(format!("cannot encode call arguments: {err}"))
                })?,
            };
            InputItem::Typed(TypedInputItem::FunctionCall {
                call_id: call.call_id().to_string(),
                name: call.name().to_owned(),
                arguments,
            })
        }
        ConversationItem::FunctionCallOutput(result) => {
            InputItem::Typed(TypedInputItem::FunctionCallOutput {
                call_id: result.call_id().to_string(),
                output: result.output().to_owned(),
            })
        }
    })
}

fn map_tool(schema: &CanonicalCallSchema) -> FunctionTool {
    FunctionTool {
        kind: "function",
        name: schema.name().to_owned(),
        description: schema.description().to_owned(),
        parameters: schema.parameters().clone(),
    }
}

fn sanitize_base_url(input: &str) -> AdapterResult<String> {
    let mut base = input.trim().to_owned();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(AdapterError::configuration(
            "OpenAI base URL must start with http:// or https://",
        ));
    }
    if !base.ends_with('/') {
        base.push('/');
    }
    base.parse::<Uri>()
        .map_err(|err| AdapterError::configuration(format!("invalid OpenAI base URL: {err}")))?;
    Ok(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    use capbridge_primitives::CallResult;
    use serde_json::json;

    fn adapter() -> OpenAiAdapter {
        let config = OpenAiConfig::new("gpt-4o")
            .with_default_temperature(0.2)
            .with_api_key("test_key");
        OpenAiAdapter::new(config).expect("adapter")
    }

    #[test]
    fn base_url_requires_scheme() {
        let err = OpenAiConfig::new("gpt-4o")
            .with_base_url("api.openai.com")
            .expect_err("missing scheme should error");

        assert!(matches!(err, AdapterError::Configuration { .. }));
    }

    #[test]
    fn sanitize_allows_trailing_slash() {
        let cfg = OpenAiConfig::new("gpt-4o")
            .with_base_url("https://example.com/openai")
            .expect("valid URL");
        assert_eq!(cfg.base_url(), "https://example.com/openai/");
    }

    #[test]
    fn missing_api_key_is_configuration_error() {
        let err = OpenAiAdapter::new(OpenAiConfig::new("gpt-4o")).expect_err("no key");
        assert!(matches!(err, AdapterError::Configuration { .. }));
    }

    #[test]
    fn request_serializes_transcript_and_tools() {
        let call_id = CallId::new("call_1").unwrap();
        let request = InferenceRequest::new(vec![
            PromptMessage::user("What is 3 + 7?").into(),
            CallRequest::new(call_id.clone(), "add", json!({"a": 3, "b": 7}).as_object().cloned().unwrap()).into(),
            CallResult::success(call_id, "10").into(),
        ])
        .unwrap()
        .with_system_prompt("be terse")
        .with_tools(vec![
            CanonicalCallSchema::from_parameters("add", "Adds", Map::new()).unwrap(),
        ]);

        let payload = adapter().build_request(&request).unwrap();
        let wire = serde_json::to_value(&payload).unwrap();

        assert_eq!(wire["model"], "gpt-4o");
        assert_eq!(wire["instructions"], "be terse");
        assert!((wire["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
        assert_eq!(wire["input"][0], json!({"role": "user", "content": "What is 3 + 7?"}));
        assert_eq!(wire["input"][1]["type"], "function_call");
        assert_eq!(wire["input"][1]["arguments"], r#"{"a":3,"b":7}"#);
        assert_eq!(
            wire["input"][2],
            json!({"type": "function_call_output", "call_id": "call_1", "output": "10"})
        );
        assert_eq!(wire["tools"][0]["type"], "function");
        assert_eq!(wire["tools"][0]["parameters"]["type"], "object");
    }

    #[test]
    fn response_parsing_extracts_text_and_calls() {
        let json = r#"{
            "output": [
                { "type": "reasoning", "summary": [] },
                { "type": "function_call", "call_id": "call_9", "name": "add", "arguments": "{\"a\":3,\"b\":7}" },
                { "type": "message", "content": [
                    { "type": "output_text", "text": "The answer " },
                    { "type": "refusal", "refusal": "no" },
                    { "type": "output_text", "text": "is 10." }
                ] }
            ]
        }"#;

        let parsed: ResponsesResponse = serde_json::from_str(json).unwrap();
        let chunks = parsed.into_chunks().unwrap();

        assert_eq!(chunks.len(), 3);
        let InferenceChunk::FunctionCall(call) = &chunks[0] else {
            panic!("expected function call first");
        };
        assert_eq!(call.call_id().as_str(), "call_9");
        assert_eq!(call.name(), "add");
        assert_eq!(chunks[1], InferenceChunk::Text("The answer ".into()));
    }

    #[test]
    fn blank_call_id_is_response_error() {
        let json = r#"{"output": [{ "type": "function_call", "call_id": "", "name": "add" }]}"#;
        let parsed: ResponsesResponse = serde_json::from_str(json).unwrap();
        let err = parsed.into_chunks().expect_err("blank id");
        assert!(matches!(err, AdapterError::Response { .. }));
    }
}
