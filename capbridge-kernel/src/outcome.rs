//! Query outcomes and the sinks that observe them.

use std::sync::{Arc, Mutex};

use capbridge_adapters::ConversationItem;
use capbridge_primitives::{CallRequest, CallResult, QueryId};

/// One executed call request paired with its result.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRecord {
    request: CallRequest,
    result: CallResult,
}

impl CallRecord {
    pub(crate) fn new(request: CallRequest, result: CallResult) -> Self {
        Self { request, result }
    }

    /// The request issued by the model.
    #[must_use]
    pub fn request(&self) -> &CallRequest {
        &self.request
    }

    /// The result handed back to the model.
    #[must_use]
    pub fn result(&self) -> &CallResult {
        &self.result
    }

    /// Returns `true` when execution failed and the result carries an error.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.result.is_failure()
    }
}

/// Everything a finished query produced.
#[derive(Debug, Clone)]
pub struct CallOutcome {
    query_id: QueryId,
    answer: String,
    transcript: Vec<ConversationItem>,
    calls: Vec<CallRecord>,
}

impl CallOutcome {
    pub(crate) fn new(
        query_id: QueryId,
        answer: String,
        transcript: Vec<ConversationItem>,
        calls: Vec<CallRecord>,
    ) -> Self {
        Self {
            query_id,
            answer,
            transcript,
            calls,
        }
    }

    /// Identifier of the query.
    #[must_use]
    pub fn query_id(&self) -> QueryId {
        self.query_id
    }

    /// The model's answer text.
    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// The conversation as last submitted to the model.
    #[must_use]
    pub fn transcript(&self) -> &[ConversationItem] {
        &self.transcript
    }

    /// Executed calls in the order the model requested them.
    #[must_use]
    pub fn calls(&self) -> &[CallRecord] {
        &self.calls
    }

    /// Number of calls whose execution failed.
    #[must_use]
    pub fn failures(&self) -> usize {
        self.calls.iter().filter(|call| call.is_failure()).count()
    }

    /// Consumes the outcome, returning the answer text.
    #[must_use]
    pub fn into_answer(self) -> String {
        self.answer
    }
}

/// Observer trait used to capture query outcomes.
pub trait CallOutcomeSink: Send + Sync {
    /// Records the outcome of a finished query.
    fn record(&self, outcome: CallOutcome);
}

/// Sink implementation that logs to tracing.
#[derive(Default)]
pub struct TracingCallSink;

impl CallOutcomeSink for TracingCallSink {
    fn record(&self, outcome: CallOutcome) {
        let names: Vec<&str> = outcome
            .calls()
            .iter()
            .map(|call| call.request().name())
            .collect();
        tracing::info!(
            query_id = %outcome.query_id(),
            answer = outcome.answer(),
            calls = ?names,
            failures = outcome.failures(),
            "bridge query completed"
        );
    }
}

/// Sink used during testing to capture outcomes.
#[derive(Default)]
pub struct CollectingSink {
    results: Mutex<Vec<CallOutcome>>,
}

impl CollectingSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns the collected outcomes.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex has been poisoned by a previous panic.
    #[must_use]
    pub fn drain(&self) -> Vec<CallOutcome> {
        let mut lock = self.results.lock().expect("collecting sink poisoned");
        lock.drain(..).collect()
    }
}

impl CallOutcomeSink for CollectingSink {
    fn record(&self, outcome: CallOutcome) {
        self.results
            .lock()
            .expect("collecting sink poisoned")
            .push(outcome);
    }
}
