//! Offline adapter that replays canned responses.
//!
//! Useful for exercising the bridge without network access: each call to
//! [`ModelAdapter::infer`] pops the next scripted turn and records the request
//! it was given.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use capbridge_primitives::CallRequest;
use futures::stream;

use crate::traits::{
    AdapterError, AdapterMetadata, AdapterResult, AdapterStream, InferenceChunk,
    InferenceRequest, ModelAdapter,
};

/// One canned model turn.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScriptedTurn {
    text: String,
    calls: Vec<CallRequest>,
}

impl ScriptedTurn {
    /// A turn that answers with text only.
    #[must_use]
    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            calls: Vec::new(),
        }
    }

    /// A turn that issues call requests.
    #[must_use]
    pub fn calls(calls: Vec<CallRequest>) -> Self {
        Self {
            text: String::new(),
            calls,
        }
    }
}

/// Adapter replaying [`ScriptedTurn`]s in order.
#[derive(Debug)]
pub struct ScriptedAdapter {
    metadata: AdapterMetadata,
    turns: Mutex<VecDeque<ScriptedTurn>>,
    requests: Mutex<Vec<InferenceRequest>>,
}

impl ScriptedAdapter {
    /// Creates an adapter that will answer with `turns`, one per request.
    #[must_use]
    pub fn new(turns: impl IntoIterator<Item = ScriptedTurn>) -> Self {
        Self {
            metadata: AdapterMetadata::new("scripted", "scripted"),
            turns: Mutex::new(turns.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn requests(&self) -> Vec<InferenceRequest> {
        self.requests.lock().expect("scripted adapter poisoned").clone()
    }
}

#[async_trait]
impl ModelAdapter for ScriptedAdapter {
    fn metadata(&self) -> &AdapterMetadata {
        &self.metadata
    }

    async fn infer(&self, request: InferenceRequest) -> AdapterResult<AdapterStream> {
        self.requests
            .lock()
            .expect("scripted adapter poisoned")
            .push(request);

        let turn = self
            .turns
            .lock()
            .expect("scripted adapter poisoned")
            .pop_front()
            .ok_or_else(|| AdapterError::response("scripted adapter has no turns left"))?;

        let mut chunks: Vec<InferenceChunk> = turn
            .calls
            .into_iter()
            .map(InferenceChunk::FunctionCall)
            .collect();
        if !turn.text.is_empty() {
            chunks.push(InferenceChunk::Text(turn.text));
        }
        chunks.push(InferenceChunk::Done);

        Ok(Box::pin(stream::iter(chunks.into_iter().map(Ok))))
    }
}
