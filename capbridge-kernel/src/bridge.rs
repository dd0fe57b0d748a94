//! Two-phase call bridge between a function-calling model and a capability
//! source.
//!
//! A query is answered in at most two model requests. The first offers the
//! available functions alongside the question; if the model requests calls,
//! each is executed, its result appended to the transcript, and the transcript
//! is resubmitted without functions for the final answer. A failing call never
//! aborts the query: its error text becomes that call's result.

use std::fmt;
use std::sync::Arc;

use capbridge_adapters::{ConversationItem, InferenceRequest, ModelAdapter, ModelResponse};
use capbridge_primitives::{CallRequest, CallResult, CanonicalCallSchema, QueryId, normalize};
use capbridge_prompts::PromptMessage;
use capbridge_resources::{ResourceRegistry, ResourceSnapshot};
use capbridge_tools::{CapabilityBackend, render_output};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{Instrument, debug, info_span, warn};

use crate::conversation::{Conversation, ConversationEvent};
use crate::error::{BridgeError, BridgeResult, DispatchError};
use crate::outcome::{CallOutcome, CallOutcomeSink, CallRecord};

/// Name of the single function offered in resource mode.
pub const READ_RESOURCE: &str = "read_resource";

/// How the call requests of one response are executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStrategy {
    /// One after another, in request order.
    #[default]
    Sequential,
    /// All at once; results are still reported in request order.
    Concurrent,
}

/// Per-bridge request options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BridgeOptions {
    strategy: DispatchStrategy,
    system_prompt: Option<String>,
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
}

impl BridgeOptions {
    /// Default options: sequential dispatch and no request overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the dispatch strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: DispatchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets a system prompt sent with both model requests.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Caps output tokens per model request.
    #[must_use]
    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    /// Returns the dispatch strategy.
    #[must_use]
    pub fn strategy(&self) -> DispatchStrategy {
        self.strategy
    }

    /// Returns the system prompt, if any.
    #[must_use]
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }
}

/// Where call requests are routed.
#[derive(Clone)]
pub enum BridgeMode {
    /// Every backend capability is offered as a function.
    Tools(Arc<dyn CapabilityBackend>),
    /// A single `read_resource` function is offered, with the resource catalog
    /// supplied as a system message.
    Resources(Arc<ResourceRegistry>),
}

impl BridgeMode {
    fn label(&self) -> &'static str {
        match self {
            Self::Tools(_) => "tools",
            Self::Resources(_) => "resources",
        }
    }
}

impl fmt::Debug for BridgeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BridgeMode").field(&self.label()).finish()
    }
}

/// Drives one model through the two-phase call protocol.
pub struct CallBridge {
    adapter: Arc<dyn ModelAdapter>,
    mode: BridgeMode,
    options: BridgeOptions,
    sink: Option<Arc<dyn CallOutcomeSink>>,
}

impl fmt::Debug for CallBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallBridge")
            .field("adapter", self.adapter.metadata())
            .field("mode", &self.mode)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl CallBridge {
    /// Creates a bridge for the given adapter and mode.
    #[must_use]
    pub fn new(adapter: Arc<dyn ModelAdapter>, mode: BridgeMode) -> Self {
        Self {
            adapter,
            mode,
            options: BridgeOptions::default(),
            sink: None,
        }
    }

    /// Creates a bridge offering every capability of `backend`.
    #[must_use]
    pub fn tools(adapter: Arc<dyn ModelAdapter>, backend: Arc<dyn CapabilityBackend>) -> Self {
        Self::new(adapter, BridgeMode::Tools(backend))
    }

    /// Creates a bridge reading from `registry` through `read_resource`.
    #[must_use]
    pub fn resources(adapter: Arc<dyn ModelAdapter>, registry: Arc<ResourceRegistry>) -> Self {
        Self::new(adapter, BridgeMode::Resources(registry))
    }

    /// Replaces the request options.
    #[must_use]
    pub fn with_options(mut self, options: BridgeOptions) -> Self {
        self.options = options;
        self
    }

    /// Installs a sink notified after every successful query.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn CallOutcomeSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Returns the configured options.
    #[must_use]
    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    /// Answers `question`, executing any calls the model requests.
    ///
    /// Queries are independent: capabilities are enumerated (or the resource
    /// registry snapshotted) afresh each time, and no state is shared between
    /// concurrent queries on the same bridge.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Capabilities`] if capability enumeration fails,
    /// [`BridgeError::Schema`] if a descriptor cannot be normalized, and
    /// [`BridgeError::Upstream`] if either model request fails. Individual call
    /// failures are not errors; they are recorded in the outcome.
    pub async fn query(&self, question: impl Into<String>) -> BridgeResult<CallOutcome> {
        let query_id = QueryId::random();
        let question = question.into();
        let span = info_span!("bridge_query", %query_id, mode = self.mode.label());
        self.run(query_id, question).instrument(span).await
    }

    async fn run(&self, query_id: QueryId, question: String) -> BridgeResult<CallOutcome> {
        let mut conversation = Conversation::new(query_id);
        let prepared = self.prepare().await?;

        let mut input: Vec<ConversationItem> = prepared.preamble;
        input.push(PromptMessage::user(question).into());

        conversation.transition(ConversationEvent::Submit)?;
        let first = self.request(input.clone(), prepared.schemas).await?;
        let (text, calls) = first.into_parts();

        if calls.is_empty() {
            conversation.transition(ConversationEvent::AnsweredDirectly)?;
            debug!("model answered without calls");
            return Ok(self.finish(CallOutcome::new(query_id, text, input, Vec::new())));
        }

        conversation.transition(ConversationEvent::CallsRequested)?;
        debug!(calls = calls.len(), strategy = ?self.options.strategy, "dispatching calls");
        let records = prepared.dispatcher.dispatch_all(calls, self.options.strategy).await;

        let mut transcript = input;
        for record in &records {
            transcript.push(record.request().clone().into());
            transcript.push(record.result().clone().into());
        }

        conversation.transition(ConversationEvent::ResultsSubmitted)?;
        let last = self.request(transcript.clone(), Vec::new()).await?;
        conversation.transition(ConversationEvent::FinalAnswer)?;

        let (answer, ignored) = last.into_parts();
        if !ignored.is_empty() {
            warn!(calls = ignored.len(), "ignoring call requests in final response");
        }
        Ok(self.finish(CallOutcome::new(query_id, answer, transcript, records)))
    }

    async fn prepare(&self) -> BridgeResult<Prepared> {
        match &self.mode {
            BridgeMode::Tools(backend) => {
                let descriptors = backend
                    .list_capabilities()
                    .await
                    .map_err(BridgeError::Capabilities)?;
                let schemas = descriptors
                    .iter()
                    .map(normalize)
                    .collect::<Result<Vec<_>, _>>()?;
                debug!(capabilities = schemas.len(), "capabilities enumerated");
                Ok(Prepared {
                    preamble: Vec::new(),
                    schemas,
                    dispatcher: Dispatcher::Tools(Arc::clone(backend)),
                })
            }
            BridgeMode::Resources(registry) => {
                let snapshot = registry.snapshot();
                let catalog = snapshot.catalog();
                debug!(
                    fixed = snapshot.list_fixed().len(),
                    templates = snapshot.list_templates().len(),
                    "resource catalog prepared"
                );
                Ok(Prepared {
                    preamble: vec![PromptMessage::system(catalog).into()],
                    schemas: vec![read_resource_schema()?],
                    dispatcher: Dispatcher::Resources(snapshot),
                })
            }
        }
    }

    async fn request(
        &self,
        input: Vec<ConversationItem>,
        tools: Vec<CanonicalCallSchema>,
    ) -> BridgeResult<ModelResponse> {
        let mut request = InferenceRequest::new(input)?;
        if let Some(prompt) = &self.options.system_prompt {
            request = request.with_system_prompt(prompt.clone());
        }
        if let Some(temperature) = self.options.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(tokens) = self.options.max_output_tokens {
            request = request.with_max_output_tokens(tokens);
        }
        if !tools.is_empty() {
            request = request.with_tools(tools);
        }

        let stream = self.adapter.infer(request).await?;
        Ok(ModelResponse::collect(stream).await?)
    }

    fn finish(&self, outcome: CallOutcome) -> CallOutcome {
        if let Some(sink) = &self.sink {
            sink.record(outcome.clone());
        }
        outcome
    }
}

/// Schema of the `read_resource` function offered in resource mode.
///
/// # Errors
///
/// Returns [`BridgeError::Schema`] if the schema fails canonicalization.
pub fn read_resource_schema() -> BridgeResult<CanonicalCallSchema> {
    let mut properties = Map::new();
    properties.insert(
        "uri".into(),
        json!({
            "type": "string",
            "description": "Resource URI, or a template pattern when `params` is supplied",
        }),
    );
    properties.insert(
        "params".into(),
        json!({
            "type": "object",
            "description": "Values for the placeholders of a template pattern",
            "additionalProperties": true,
        }),
    );

    let mut parameters = Map::new();
    parameters.insert("type".into(), Value::from("object"));
    parameters.insert("properties".into(), Value::Object(properties));
    parameters.insert("required".into(), json!(["uri"]));
    Ok(CanonicalCallSchema::from_parameters(
        READ_RESOURCE,
        "Read a resource by URI",
        parameters,
    )?)
}

struct Prepared {
    preamble: Vec<ConversationItem>,
    schemas: Vec<CanonicalCallSchema>,
    dispatcher: Dispatcher,
}

enum Dispatcher {
    Tools(Arc<dyn CapabilityBackend>),
    Resources(ResourceSnapshot),
}

impl Dispatcher {
    async fn dispatch_all(
        &self,
        calls: Vec<CallRequest>,
        strategy: DispatchStrategy,
    ) -> Vec<CallRecord> {
        let results = match strategy {
            DispatchStrategy::Sequential => {
                let mut results = Vec::with_capacity(calls.len());
                for call in &calls {
                    results.push(self.dispatch(call).await);
                }
                results
            }
            DispatchStrategy::Concurrent => {
                join_all(calls.iter().map(|call| self.dispatch(call))).await
            }
        };

        calls
            .into_iter()
            .zip(results)
            .map(|(request, result)| CallRecord::new(request, result))
            .collect()
    }

    async fn dispatch(&self, call: &CallRequest) -> CallResult {
        match self.execute(call).await {
            Ok(output) => {
                debug!(call_id = %call.call_id(), name = call.name(), "call succeeded");
                CallResult::success(call.call_id().clone(), output)
            }
            Err(err) => {
                warn!(call_id = %call.call_id(), name = call.name(), error = %err, "call failed");
                CallResult::failure(call.call_id().clone(), &err)
            }
        }
    }

    async fn execute(&self, call: &CallRequest) -> Result<String, DispatchError> {
        let arguments = call.arguments().clone().into_map()?;
        match self {
            Self::Tools(backend) => {
                let output = backend
                    .invoke(call.name(), arguments)
                    .await
                    .map_err(|source| DispatchError::Capability {
                        name: call.name().to_owned(),
                        source,
                    })?;
                Ok(render_output(&output))
            }
            Self::Resources(snapshot) => {
                if call.name() != READ_RESOURCE {
                    return Err(DispatchError::UnknownFunction {
                        name: call.name().to_owned(),
                    });
                }
                let uri = resource_uri(snapshot, arguments)?;
                Ok(snapshot.resolve(&uri).await?.into_output())
            }
        }
    }
}

/// Works out the concrete URI a `read_resource` call refers to. A registered
/// template pattern with `params` is expanded; anything else is used as-is.
fn resource_uri(
    snapshot: &ResourceSnapshot,
    mut arguments: Map<String, Value>,
) -> Result<String, DispatchError> {
    let Some(Value::String(uri)) = arguments.remove("uri") else {
        return Err(DispatchError::MissingUri);
    };
    let params = match arguments.remove("params") {
        None | Some(Value::Null) => return Ok(uri),
        Some(Value::Object(params)) => params,
        Some(_) => return Err(DispatchError::InvalidParams),
    };

    match snapshot.template(&uri) {
        Some(template) => Ok(template.expand(&params)?),
        None => {
            if !params.is_empty() {
                debug!(%uri, "ignoring params for a uri that is not a template pattern");
            }
            Ok(uri)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use capbridge_adapters::{AdapterError, ScriptedAdapter, ScriptedTurn};
    use capbridge_primitives::{CallId, InputSpec, ParameterRecord};
    use capbridge_resources::{ResourceContent, ResourceResult, TemplateParams};
    use capbridge_tools::{ToolError, ToolMetadata, ToolRegistry, ToolResult};

    use crate::outcome::{CollectingSink, TracingCallSink};

    async fn add(input: Value) -> ToolResult<Value> {
        let a = input["a"]
            .as_i64()
            .ok_or_else(|| ToolError::execution("`a` must be an integer"))?;
        let b = input["b"]
            .as_i64()
            .ok_or_else(|| ToolError::execution("`b` must be an integer"))?;
        Ok(json!(a + b))
    }

    async fn nap(input: Value) -> ToolResult<Value> {
        let ms = input["ms"].as_u64().unwrap_or_default();
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(Value::String(format!("slept {ms}")))
    }

    fn tools() -> Arc<ToolRegistry> {
        let registry = ToolRegistry::new();
        registry
            .register_tool(
                ToolMetadata::new("add")
                    .unwrap()
                    .with_description("Add two integers")
                    .with_input(InputSpec::Parameters(vec![
                        ParameterRecord::new("a", "integer").with_required(true),
                        ParameterRecord::new("b", "integer").with_required(true),
                    ])),
                add,
            )
            .unwrap();
        registry
            .register_tool(ToolMetadata::new("nap").unwrap(), nap)
            .unwrap();
        Arc::new(registry)
    }

    async fn repo_info(params: TemplateParams) -> ResourceResult<ResourceContent> {
        let owner = params.require("owner")?;
        let repo = params.require("repo")?;
        Ok(ResourceContent::json(&json!({
            "full_name": format!("{owner}/{repo}"),
            "stars": 120,
        })))
    }

    fn resources() -> Arc<ResourceRegistry> {
        let registry = ResourceRegistry::new();
        registry
            .register_fixed("greeting://hello", || async {
                Ok(ResourceContent::text("Hello, world!"))
            })
            .unwrap();
        registry
            .register_template("repos://{owner}/{repo}/info", repo_info)
            .unwrap();
        Arc::new(registry)
    }

    fn call(id: &str, name: &str, arguments: &str) -> CallRequest {
        CallRequest::new(CallId::new(id).unwrap(), name, arguments)
    }

    #[tokio::test]
    async fn direct_answer_skips_dispatch() {
        let adapter = Arc::new(ScriptedAdapter::new([ScriptedTurn::answer("Paris")]));
        let bridge = CallBridge::tools(adapter.clone(), tools());

        let outcome = bridge.query("Capital of France?").await.unwrap();
        assert_eq!(outcome.answer(), "Paris");
        assert!(outcome.calls().is_empty());

        let requests = adapter.requests();
        assert_eq!(requests.len(), 1);
        let offered: Vec<&str> = requests[0].tools().iter().map(CanonicalCallSchema::name).collect();
        assert_eq!(offered, ["add", "nap"]);
        assert_eq!(requests[0].tools()[0].required(), ["a", "b"]);
    }

    #[tokio::test]
    async fn executes_calls_and_resubmits_without_tools() {
        let adapter = Arc::new(ScriptedAdapter::new([
            ScriptedTurn::calls(vec![call("call-1", "add", r#"{"a": 4, "b": 6}"#)]),
            ScriptedTurn::answer("The sum is 10."),
        ]));
        let sink = CollectingSink::new();
        let bridge = CallBridge::tools(adapter.clone(), tools()).with_sink(sink.clone());

        let outcome = bridge.query("What is 4 + 6?").await.unwrap();
        assert_eq!(outcome.answer(), "The sum is 10.");
        assert_eq!(outcome.calls().len(), 1);
        assert_eq!(outcome.calls()[0].result().output(), "10");
        assert_eq!(outcome.failures(), 0);

        let requests = adapter.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].tools().is_empty());
        let second = requests[1].input();
        assert_eq!(second.len(), 3);
        assert!(matches!(&second[0], ConversationItem::Message(message) if message.content() == "What is 4 + 6?"));
        assert!(matches!(&second[1], ConversationItem::FunctionCall(request) if request.name() == "add"));
        assert!(matches!(&second[2], ConversationItem::FunctionCallOutput(result) if result.output() == "10"));

        let recorded = sink.drain();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].query_id(), outcome.query_id());
    }

    #[tokio::test]
    async fn failed_calls_become_error_results() {
        let adapter = Arc::new(ScriptedAdapter::new([
            ScriptedTurn::calls(vec![
                call("call-1", "missing", "{}"),
                call("call-2", "add", r#"{"a": 1, "b": 2}"#),
                call("call-3", "add", "not json"),
            ]),
            ScriptedTurn::answer("partial"),
        ]));
        let bridge = CallBridge::tools(adapter, tools());

        let outcome = bridge.query("mixed").await.unwrap();
        let outputs: Vec<&str> = outcome.calls().iter().map(|c| c.result().output()).collect();
        assert!(outputs[0].starts_with("error: "));
        assert!(outputs[0].contains("missing"));
        assert_eq!(outputs[1], "3");
        assert!(outputs[2].starts_with("error: "));
        assert_eq!(outcome.failures(), 2);
        assert_eq!(outcome.answer(), "partial");
    }

    #[tokio::test]
    async fn concurrent_dispatch_keeps_request_order() {
        let adapter = Arc::new(ScriptedAdapter::new([
            ScriptedTurn::calls(vec![
                call("slow", "nap", r#"{"ms": 40}"#),
                call("fast", "nap", r#"{"ms": 1}"#),
            ]),
            ScriptedTurn::answer("rested"),
        ]));
        let bridge = CallBridge::tools(adapter.clone(), tools())
            .with_options(BridgeOptions::new().with_strategy(DispatchStrategy::Concurrent));

        let outcome = bridge.query("nap twice").await.unwrap();
        let ids: Vec<&str> = outcome
            .calls()
            .iter()
            .map(|c| c.result().call_id().as_str())
            .collect();
        assert_eq!(ids, ["slow", "fast"]);
        assert_eq!(outcome.calls()[0].result().output(), "slept 40");

        let transcript = adapter.requests()[1].input().to_vec();
        assert!(matches!(&transcript[1], ConversationItem::FunctionCall(r) if r.call_id().as_str() == "slow"));
        assert!(matches!(&transcript[3], ConversationItem::FunctionCall(r) if r.call_id().as_str() == "fast"));
    }

    #[tokio::test]
    async fn options_flow_into_both_requests() {
        let adapter = Arc::new(ScriptedAdapter::new([
            ScriptedTurn::calls(vec![call("call-1", "add", r#"{"a": 1, "b": 1}"#)]),
            ScriptedTurn::answer("2"),
        ]));
        let bridge = CallBridge::tools(adapter.clone(), tools())
            .with_options(
                BridgeOptions::new()
                    .with_system_prompt("Be brief.")
                    .with_temperature(0.0)
                    .with_max_output_tokens(64),
            )
            .with_sink(Arc::new(TracingCallSink));

        bridge.query("1 + 1").await.unwrap();
        for request in adapter.requests() {
            assert_eq!(request.system_prompt(), Some("Be brief."));
        }
    }

    #[tokio::test]
    async fn resource_mode_offers_catalog_and_read_resource() {
        let adapter = Arc::new(ScriptedAdapter::new([
            ScriptedTurn::calls(vec![call(
                "call-1",
                READ_RESOURCE,
                r#"{"uri": "repos://openai/gpt-4/info"}"#,
            )]),
            ScriptedTurn::answer("It has 120 stars."),
        ]));
        let bridge = CallBridge::resources(adapter.clone(), resources());

        let outcome = bridge.query("How many stars does openai/gpt-4 have?").await.unwrap();
        assert_eq!(outcome.answer(), "It has 120 stars.");

        let output: Value = serde_json::from_str(outcome.calls()[0].result().output()).unwrap();
        assert_eq!(output["stars"], 120);
        assert_eq!(output["full_name"], "openai/gpt-4");

        let first = &adapter.requests()[0];
        assert_eq!(first.tools().len(), 1);
        assert_eq!(first.tools()[0].name(), READ_RESOURCE);
        let ConversationItem::Message(catalog) = &first.input()[0] else {
            panic!("expected catalog message");
        };
        assert!(catalog.content().contains("- greeting://hello"));
        assert!(catalog.content().contains("- repos://{owner}/{repo}/info"));
    }

    #[tokio::test]
    async fn resource_mode_expands_template_params() {
        let adapter = Arc::new(ScriptedAdapter::new([
            ScriptedTurn::calls(vec![
                call(
                    "call-1",
                    READ_RESOURCE,
                    r#"{"uri": "repos://{owner}/{repo}/info", "params": {"owner": "rust-lang", "repo": "rust"}}"#,
                ),
                call(
                    "call-2",
                    READ_RESOURCE,
                    r#"{"uri": "repos://{owner}/{repo}/info", "params": {"owner": "rust-lang"}}"#,
                ),
            ]),
            ScriptedTurn::answer("done"),
        ]));
        let bridge = CallBridge::resources(adapter, resources());

        let outcome = bridge.query("rust stars").await.unwrap();
        let output: Value = serde_json::from_str(outcome.calls()[0].result().output()).unwrap();
        assert_eq!(output["full_name"], "rust-lang/rust");
        assert!(outcome.calls()[1].is_failure());
        assert!(outcome.calls()[1].result().output().contains("repo"));
    }

    #[tokio::test]
    async fn resource_mode_rejects_other_functions_and_unknown_uris() {
        let adapter = Arc::new(ScriptedAdapter::new([
            ScriptedTurn::calls(vec![
                call("call-1", "add", r#"{"a": 1, "b": 2}"#),
                call("call-2", READ_RESOURCE, r#"{"uri": "nothing://here"}"#),
                call("call-3", READ_RESOURCE, "{}"),
                call("call-4", READ_RESOURCE, r#"{"uri": "greeting://hello"}"#),
            ]),
            ScriptedTurn::answer("ok"),
        ]));
        let bridge = CallBridge::resources(adapter, resources());

        let outcome = bridge.query("anything").await.unwrap();
        let calls = outcome.calls();
        assert!(calls[0].result().output().contains("unknown function `add`"));
        assert!(calls[1].is_failure());
        assert!(calls[2].is_failure());
        assert_eq!(calls[3].result().output(), "Hello, world!");
        assert_eq!(outcome.failures(), 3);
    }

    #[tokio::test]
    async fn upstream_failure_aborts_query() {
        let adapter = Arc::new(ScriptedAdapter::new([ScriptedTurn::calls(vec![call(
            "call-1",
            "add",
            r#"{"a": 1, "b": 2}"#,
        )])]));
        let sink = CollectingSink::new();
        let bridge = CallBridge::tools(adapter, tools()).with_sink(sink.clone());

        let err = bridge.query("1 + 2").await.expect_err("second turn missing");
        assert!(matches!(err, BridgeError::Upstream(AdapterError::Response { .. })));
        assert!(sink.drain().is_empty());
    }

    #[tokio::test]
    async fn malformed_descriptor_is_a_schema_error() {
        let registry = ToolRegistry::new();
        let mut broken = Map::new();
        broken.insert("properties".into(), json!(5));
        registry
            .register_tool(
                ToolMetadata::new("broken").unwrap().with_input(InputSpec::Schema(broken)),
                add,
            )
            .unwrap();
        let adapter = Arc::new(ScriptedAdapter::new([ScriptedTurn::answer("unused")]));
        let bridge = CallBridge::tools(adapter.clone(), Arc::new(registry));

        let err = bridge.query("hi").await.expect_err("schema must fail");
        assert!(matches!(err, BridgeError::Schema(_)));
        assert!(adapter.requests().is_empty());
    }

    #[test]
    fn read_resource_schema_requires_uri() {
        let schema = read_resource_schema().unwrap();
        assert_eq!(schema.name(), READ_RESOURCE);
        assert_eq!(schema.required(), ["uri"]);
        assert_eq!(
            schema.properties().unwrap()["params"]["additionalProperties"],
            json!(true)
        );
    }
}
