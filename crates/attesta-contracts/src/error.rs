//! Error types for the ATTESTA verification pipeline.
//!
//! `AttestaError` is what callers of the orchestrator and its collaborators
//! see. `EngineError` is narrower: it describes how a single call to an
//! evidence engine failed and decides whether the call may be retried.
//!
//! No variant ever carries raw document bytes, claim values, or extracted
//! field values. Messages name fields, never their contents.

use thiserror::Error;

use crate::evidence::SignalKind;

/// The unified error type for the ATTESTA runtime.
#[derive(Debug, Error)]
pub enum AttestaError {
    /// A collaborator is missing, misconfigured, or the configuration value
    /// handed to the orchestrator is invalid. Fatal; never retried.
    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    /// The submission is malformed. Nothing was acquired, so nothing is purged.
    #[error("validation error: {reason}")]
    Validation { reason: String },

    /// An upstream collaborator failed transiently and its retry budget is
    /// spent.
    #[error("upstream '{service}' failed: {reason}")]
    UpstreamEngine { service: String, reason: String },

    /// An engine returned a response that could not be decoded into a
    /// well-formed signal. The signal is excluded from aggregation.
    #[error("aggregation input error ({signal}): {reason}")]
    AggregationInput { signal: SignalKind, reason: String },

    /// Deleting PII for a terminal request failed. Logged and alerted; never
    /// blocks the response path.
    #[error("purge failed for request {request_id}: {reason}")]
    Purge { request_id: String, reason: String },

    /// An illegal lifecycle transition was attempted.
    #[error("state machine error: {reason}")]
    StateMachine { reason: String },

    /// The operation collides with state that already exists, e.g. a request
    /// id that is already in flight.
    #[error("conflict: {reason}")]
    Conflict { reason: String },

    /// No audit case exists under the given identifier.
    #[error("audit case '{case_id}' not found")]
    CaseNotFound { case_id: String },

    /// An engine rejected the orchestrator's credentials mid-request. The
    /// request has already been rejected and purged when this is returned.
    #[error("engine '{engine}' misconfigured while processing request {request_id}: {reason}")]
    EngineMisconfigured {
        request_id: String,
        engine: SignalKind,
        reason: String,
    },

    /// The audit writer could not persist a lifecycle record.
    #[error("audit write failed: {reason}")]
    AuditWriteFailed { reason: String },

    /// A JSON Schema document could not be compiled.
    #[error("schema validation error: {reason}")]
    SchemaValidation { reason: String },
}

/// Convenience alias used throughout the ATTESTA crates.
pub type AttestaResult<T> = Result<T, AttestaError>;

/// How a single evidence-engine call failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The call did not complete within its per-attempt timeout.
    #[error("engine call timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },

    /// The engine could not be reached or reported itself unavailable.
    #[error("engine unavailable: {reason}")]
    Unavailable { reason: String },

    /// The engine answered, but the answer failed schema or range checks.
    #[error("malformed engine response: {reason}")]
    Malformed { reason: String },

    /// The engine refused the orchestrator's credentials.
    #[error("engine rejected credentials: {reason}")]
    Unauthorized { reason: String },
}

impl EngineError {
    /// Only timeouts and unavailability are worth another attempt. A
    /// malformed answer or a credential failure will not fix itself.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::Timeout { .. } | EngineError::Unavailable { .. })
    }
}
