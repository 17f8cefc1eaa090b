//! The caller-visible response for one verification request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    decision::AggregatedDecision,
    evidence::SignalKind,
    lifecycle::{LifecycleState, RejectionReason},
    proof::ComplianceProofToken,
    request::RequestId,
    review::CaseId,
};

/// Whether the request's PII has been deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PurgeStatus {
    /// The request is pending review; its evidence is still held.
    Deferred,
    Completed,
    /// Deletion failed and an alert was raised.
    Failed { reason: String },
}

/// Response returned for every request, terminal or pending.
///
/// `confidence` is always present: the decision's confidence when one was
/// computed, 0.0 when the request was rejected before aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub request_id: RequestId,
    pub state: LifecycleState,
    pub confidence: f64,
    pub decision: Option<AggregatedDecision>,
    pub proof: Option<ComplianceProofToken>,
    pub case_id: Option<CaseId>,
    pub rejection: Option<RejectionReason>,
    /// Liveness warning raised at the gate, if any.
    pub liveness_warning: Option<String>,
    pub purge: PurgeStatus,
    pub completed_at: DateTime<Utc>,
}

impl VerificationOutcome {
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Return true if the given signal contributed to the decision.
    pub fn signal_available(&self, kind: SignalKind) -> bool {
        self.decision
            .as_ref()
            .is_some_and(|d| d.slot(kind).is_available())
    }
}
