//! Two-phase conversation state machine.

use capbridge_primitives::QueryId;
use tracing::debug;

use crate::error::{BridgeError, BridgeResult};

/// States a bridged query moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    /// Nothing submitted yet.
    Idle,
    /// The question and offered functions were sent; waiting for the model.
    AwaitingFirstResponse,
    /// The model answered without requesting any call.
    DirectAnswer,
    /// Call requests are being executed.
    DispatchingCalls,
    /// Call results were sent back; waiting for the final answer.
    AwaitingFinalResponse,
    /// The final answer arrived.
    Done,
}

impl ConversationState {
    /// Returns `true` once the query has an answer.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::DirectAnswer | Self::Done)
    }
}

/// Events that drive the conversation forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationEvent {
    /// The first model request was submitted.
    Submit,
    /// The first response carried no call requests.
    AnsweredDirectly,
    /// The first response carried at least one call request.
    CallsRequested,
    /// Every call result was collected and resubmitted.
    ResultsSubmitted,
    /// The final response arrived.
    FinalAnswer,
}

/// Per-query state holder.
#[derive(Debug, Clone, Copy)]
pub struct Conversation {
    query_id: QueryId,
    state: ConversationState,
}

impl Conversation {
    /// Starts an idle conversation for the given query.
    #[must_use]
    pub const fn new(query_id: QueryId) -> Self {
        Self {
            query_id,
            state: ConversationState::Idle,
        }
    }

    /// Returns the owning query identifier.
    #[must_use]
    pub const fn query_id(&self) -> QueryId {
        self.query_id
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> ConversationState {
        self.state
    }

    /// Applies an event, returning the resulting state.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidTransition`] when the event is not allowed
    /// from the current state.
    pub fn transition(&mut self, event: ConversationEvent) -> BridgeResult<ConversationState> {
        use ConversationEvent as E;
        use ConversationState as S;

        let next = match (self.state, event) {
            (S::Idle, E::Submit) => S::AwaitingFirstResponse,
            (S::AwaitingFirstResponse, E::AnsweredDirectly) => S::DirectAnswer,
            (S::AwaitingFirstResponse, E::CallsRequested) => S::DispatchingCalls,
            (S::DispatchingCalls, E::ResultsSubmitted) => S::AwaitingFinalResponse,
            (S::AwaitingFinalResponse, E::FinalAnswer) => S::Done,
            (from, event) => {
                return Err(BridgeError::InvalidTransition {
                    query_id: self.query_id,
                    from,
                    event,
                });
            }
        };

        debug!(
            query_id = %self.query_id,
            from = ?self.state,
            to = ?next,
            ?event,
            "conversation transition"
        );
        self.state = next;
        Ok(next)
    }
}
