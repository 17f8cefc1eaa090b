//! Per-request lifecycle tracking and the lifecycle event bus.
//!
//! `Lifecycle` is the only way a request changes state. It refuses every
//! transition that is not an edge of the lifecycle graph, so a terminal
//! state is entered at most once and never left.

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::debug;

use attesta_contracts::{
    decision::DecisionSummary,
    error::{AttestaError, AttestaResult},
    lifecycle::{LifecycleState, RejectionReason, TransitionRecord},
    request::RequestId,
};

/// Optional context attached to a transition record.
#[derive(Debug, Clone, Default)]
pub struct TransitionDetail {
    pub rejection: Option<RejectionReason>,
    pub note: Option<String>,
    pub summary: Option<DecisionSummary>,
}

impl TransitionDetail {
    pub fn note(note: impl Into<String>) -> Self {
        Self {
            note: Some(note.into()),
            ..Self::default()
        }
    }

    pub fn rejected(reason: RejectionReason) -> Self {
        Self {
            rejection: Some(reason),
            ..Self::default()
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_summary(mut self, summary: DecisionSummary) -> Self {
        self.summary = Some(summary);
        self
    }
}

/// The state machine for one request.
#[derive(Debug)]
pub struct Lifecycle {
    request_id: RequestId,
    state: LifecycleState,
    sequence: u32,
}

impl Lifecycle {
    /// Start a request in REQUESTED.
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            state: LifecycleState::Requested,
            sequence: 0,
        }
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Move to `to` and return the record describing the move.
    ///
    /// # Errors
    ///
    /// `StateMachine` if `to` is not reachable from the current state.
    pub fn advance(&mut self, to: LifecycleState, detail: TransitionDetail) -> AttestaResult<TransitionRecord> {
        if !self.state.can_transition_to(to) {
            return Err(AttestaError::StateMachine {
                reason: format!(
                    "request {}: illegal transition {} -> {}",
                    self.request_id, self.state, to
                ),
            });
        }

        let record = TransitionRecord {
            request_id: self.request_id.clone(),
            sequence: self.sequence,
            from: self.state,
            to,
            rejection: detail.rejection,
            note: detail.note,
            summary: detail.summary,
            timestamp: Utc::now(),
        };

        debug!(
            request_id = %self.request_id,
            from = %self.state,
            to = %to,
            sequence = self.sequence,
            "lifecycle transition"
        );

        self.state = to;
        self.sequence += 1;
        Ok(record)
    }
}

/// Broadcasts every transition record to lifecycle observers.
///
/// Observers are pure listeners; a slow observer lags and drops records
/// rather than slowing the pipeline.
#[derive(Debug, Clone)]
pub struct LifecycleEvents {
    tx: broadcast::Sender<TransitionRecord>,
}

impl LifecycleEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TransitionRecord> {
        self.tx.subscribe()
    }

    pub fn publish(&self, record: &TransitionRecord) {
        // No subscribers is fine.
        let _ = self.tx.send(record.clone());
    }
}

impl Default for LifecycleEvents {
    fn default() -> Self {
        Self::new(256)
    }
}
