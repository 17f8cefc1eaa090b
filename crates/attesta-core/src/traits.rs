//! Collaborator traits for the ATTESTA verification pipeline.
//!
//! The orchestrator sees every collaborator through one of these seams:
//!
//! - `AttestationGate`: device signature and passive liveness
//! - `VisionEngine`, `ForensicEngine`, `LogicEngine`: untrusted analysis
//! - `ConfidenceAggregator`: trusted, deterministic scoring
//! - `HitlRouter`: human review cases
//! - `ProofIssuer`: compliance proof tokens
//! - `PiiVault`, `AlertSink`: PII retention and purge alerting
//! - `AuditWriter`: the immutable transition record
//! - `RequestIdGenerator`: request identity
//!
//! Engine and gate calls are async because they cross a process boundary.
//! Everything else is synchronous and expected to be fast.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use attesta_contracts::{
    decision::{AggregatedDecision, DecisionStatus, EvidenceSet},
    error::{AttestaError, AttestaResult, EngineError},
    evidence::{AttestationResult, ExtractedFields, ForensicResult, LivenessResult, LogicResult, VisionResult},
    lifecycle::TransitionRecord,
    proof::{ComplianceProofToken, ProofVerification},
    request::{CaptureMetadata, ContextClaims, DocumentPayload, RequestId},
    review::{AuditCase, CaseId, CaseResolution, CaseView, ReviewDecision},
};

use crate::context::RequestContext;

/// Checks the capture device before any analysis runs.
///
/// A failed check is reported as `passed = false`, not as an error. `Err`
/// means the gate itself could not produce a verdict.
#[async_trait]
pub trait AttestationGate: Send + Sync {
    /// Validate the capture device's hardware signature.
    async fn verify_device(&self, capture: &CaptureMetadata) -> AttestaResult<AttestationResult>;

    /// Run the passive-liveness check on the capture stream.
    ///
    /// Only called after `verify_device` passed.
    async fn check_liveness(&self, capture: &CaptureMetadata) -> AttestaResult<LivenessResult>;
}

/// Reads the document image: confidence, anomalies, and extracted fields.
#[async_trait]
pub trait VisionEngine: Send + Sync {
    async fn analyze(&self, payload: &DocumentPayload) -> Result<VisionResult, EngineError>;
}

/// Looks for editing traces in the document bytes.
#[async_trait]
pub trait ForensicEngine: Send + Sync {
    async fn analyze(&self, payload: &DocumentPayload) -> Result<ForensicResult, EngineError>;
}

/// Checks extracted fields against the caller's context claims.
#[async_trait]
pub trait LogicEngine: Send + Sync {
    async fn validate(
        &self,
        fields: &ExtractedFields,
        claims: &ContextClaims,
    ) -> Result<LogicResult, EngineError>;
}

/// Maps the three (possibly partial) signals to one decision.
///
/// Implementations must be total and deterministic: the same `evidence` and
/// `computed_at` always yield the same decision, with confidence in [0, 1].
pub trait ConfidenceAggregator: Send + Sync {
    fn aggregate(
        &self,
        request_id: &RequestId,
        evidence: &EvidenceSet,
        computed_at: DateTime<Utc>,
    ) -> AggregatedDecision;
}

/// Owns human-review cases.
pub trait HitlRouter: Send + Sync {
    /// Open the case for a PENDING_HITL decision.
    ///
    /// Idempotent per request: a second call for the same request returns
    /// the case already open.
    fn open_case(&self, decision: &AggregatedDecision, now: DateTime<Utc>) -> AttestaResult<AuditCase>;

    /// Record a reviewer's decision.
    ///
    /// A case is resolved once. Later calls return the existing resolution
    /// with `newly_resolved = false` and change nothing.
    fn resolve_case(
        &self,
        case_id: CaseId,
        decision: ReviewDecision,
        reviewer_id: &str,
        now: DateTime<Utc>,
    ) -> AttestaResult<CaseResolution>;

    fn get_case(&self, case_id: CaseId) -> AttestaResult<AuditCase>;

    /// Reviewer-facing views of every unresolved case. Never carries PII.
    fn list_open_cases(&self) -> AttestaResult<Vec<CaseView>>;

    /// Resolve every case whose expiry is at or before `now` as rejected.
    /// Returns the cases resolved by this call.
    fn expire_overdue(&self, now: DateTime<Utc>) -> AttestaResult<Vec<AuditCase>>;
}

/// Mints and checks compliance proof tokens.
pub trait ProofIssuer: Send + Sync {
    /// Issue the token for a VERIFIED request.
    ///
    /// Idempotent per request. Any status other than `Verified` is an error.
    fn issue(
        &self,
        request_id: &RequestId,
        status: DecisionStatus,
        now: DateTime<Utc>,
    ) -> AttestaResult<ComplianceProofToken>;

    /// Check signature and expiry. Never reveals anything beyond the status.
    fn verify(&self, token: &ComplianceProofToken, now: DateTime<Utc>) -> ProofVerification;
}

/// Holds a request's PII while it waits for human review.
pub trait PiiVault: Send + Sync {
    /// Keep `context` until the request is purged.
    fn retain(&self, context: RequestContext) -> AttestaResult<()>;

    /// Return true if PII for `request_id` is currently held.
    fn holds(&self, request_id: &RequestId) -> bool;

    /// Destroy whatever is held for `request_id`. Returns true if anything
    /// was held. Purging an unknown request is not an error.
    fn purge(&self, request_id: &RequestId) -> AttestaResult<bool>;
}

/// Receives alerts for failures that must not block the response path.
pub trait AlertSink: Send + Sync {
    fn alert(&self, request_id: &RequestId, error: &AttestaError);
}

/// The audit writer: the immutable transition record.
///
/// Every lifecycle transition produces exactly one `TransitionRecord`.
pub trait AuditWriter: Send + Sync {
    /// Append one transition record. Records are never modified or deleted.
    fn write(&self, record: &TransitionRecord) -> AttestaResult<()>;

    /// Seal the trail for a request that reached a terminal state.
    fn finalize(&self, request_id: &RequestId) -> AttestaResult<()>;
}

/// Produces unique request identifiers.
pub trait RequestIdGenerator: Send + Sync {
    fn next_id(&self) -> RequestId;
}
