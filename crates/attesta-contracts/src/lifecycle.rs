//! Request lifecycle states, legal transitions, and the record written for
//! every transition.
//!
//! ```text
//! REQUESTED → ATTESTED → LIVENESS_OK → EVIDENCE_COLLECTED → LOGIC_VALIDATED
//!           → AGGREGATED → { VERIFIED | PENDING_HITL | REJECTED }
//! PENDING_HITL → VERIFIED | REJECTED        (human decision or expiry)
//! any pre-decision state → REJECTED         (gate failure, evidence failure,
//!                                            cancellation, deadline)
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    decision::{DecisionStatus, DecisionSummary},
    request::RequestId,
};

/// Where a request is in the verification pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Requested,
    Attested,
    LivenessOk,
    EvidenceCollected,
    LogicValidated,
    Aggregated,
    PendingHitl,
    Verified,
    Rejected,
}

impl LifecycleState {
    /// VERIFIED and REJECTED admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Verified | LifecycleState::Rejected)
    }

    /// Return true if `self → next` is an edge of the lifecycle graph.
    pub fn can_transition_to(&self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        match (self, next) {
            (Requested, Attested) => true,
            (Attested, LivenessOk) => true,
            (LivenessOk, EvidenceCollected) => true,
            (EvidenceCollected, LogicValidated) => true,
            (LogicValidated, Aggregated) => true,
            (Aggregated, Verified | PendingHitl | Rejected) => true,
            (PendingHitl, Verified | Rejected) => true,
            (Requested | Attested | LivenessOk | EvidenceCollected | LogicValidated, Rejected) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Requested => "REQUESTED",
            LifecycleState::Attested => "ATTESTED",
            LifecycleState::LivenessOk => "LIVENESS_OK",
            LifecycleState::EvidenceCollected => "EVIDENCE_COLLECTED",
            LifecycleState::LogicValidated => "LOGIC_VALIDATED",
            LifecycleState::Aggregated => "AGGREGATED",
            LifecycleState::PendingHitl => "PENDING_HITL",
            LifecycleState::Verified => "VERIFIED",
            LifecycleState::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<DecisionStatus> for LifecycleState {
    fn from(status: DecisionStatus) -> Self {
        match status {
            DecisionStatus::Verified => LifecycleState::Verified,
            DecisionStatus::PendingHitl => LifecycleState::PendingHitl,
            DecisionStatus::Rejected => LifecycleState::Rejected,
        }
    }
}

/// Why a request ended in REJECTED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    AttestationFailure,
    LivenessFailure,
    EvidenceCollectionFailure,
    BelowThreshold,
    ReviewerRejected,
    ReviewExpired,
    ReviewUnavailable,
    Cancelled,
    DeadlineExceeded,
    EngineMisconfigured,
    PipelineFault,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::AttestationFailure => "attestation failure",
            RejectionReason::LivenessFailure => "liveness failure",
            RejectionReason::EvidenceCollectionFailure => "evidence collection failure",
            RejectionReason::BelowThreshold => "confidence below review threshold",
            RejectionReason::ReviewerRejected => "rejected by reviewer",
            RejectionReason::ReviewExpired => "review case expired",
            RejectionReason::ReviewUnavailable => "review case could not be opened",
            RejectionReason::Cancelled => "cancelled by caller",
            RejectionReason::DeadlineExceeded => "request deadline exceeded",
            RejectionReason::EngineMisconfigured => "engine misconfigured",
            RejectionReason::PipelineFault => "internal pipeline fault",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable record of one lifecycle transition.
///
/// Written to the audit trail and published to lifecycle observers. Carries
/// the decision summary once one exists, never raw PII.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub request_id: RequestId,
    /// Position of this transition within its request, starting at 0.
    pub sequence: u32,
    pub from: LifecycleState,
    pub to: LifecycleState,
    pub rejection: Option<RejectionReason>,
    /// Free-form context, e.g. "forensic unavailable" or the reviewer id.
    pub note: Option<String>,
    pub summary: Option<DecisionSummary>,
    pub timestamp: DateTime<Utc>,
}
