//! Human-in-the-loop review types.
//!
//! A case is opened for every decision routed to PENDING_HITL and is resolved
//! exactly once, by a reviewer or by expiry.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    decision::{AggregatedDecision, DecisionSummary},
    lifecycle::LifecycleState,
    request::RequestId,
};

/// Reviewer identity recorded when a case expires without a human decision.
pub const EXPIRY_REVIEWER: &str = "system:expiry";

/// Unique identifier for one audit case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaseId(pub uuid::Uuid);

impl CaseId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for CaseId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The mutable part of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewOutcome {
    Pending,
    Approved,
    Rejected,
}

/// What a reviewer submits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl From<ReviewDecision> for ReviewOutcome {
    fn from(decision: ReviewDecision) -> Self {
        match decision {
            ReviewDecision::Approve => ReviewOutcome::Approved,
            ReviewDecision::Reject => ReviewOutcome::Rejected,
        }
    }
}

/// One review case. Holds the decision snapshot that sent the request to
/// review; the snapshot never changes after the case is opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditCase {
    pub case_id: CaseId,
    pub request_id: RequestId,
    pub snapshot: AggregatedDecision,
    pub outcome: ReviewOutcome,
    pub reviewer_id: Option<String>,
    pub opened_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    /// After this instant the case auto-resolves to rejected.
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuditCase {
    pub fn is_resolved(&self) -> bool {
        self.outcome != ReviewOutcome::Pending
    }

    /// The lifecycle state the resolution drives the request into.
    pub fn terminal_state(&self) -> Option<LifecycleState> {
        match self.outcome {
            ReviewOutcome::Pending => None,
            ReviewOutcome::Approved => Some(LifecycleState::Verified),
            ReviewOutcome::Rejected => Some(LifecycleState::Rejected),
        }
    }

    pub fn resolved_by_expiry(&self) -> bool {
        self.reviewer_id.as_deref() == Some(EXPIRY_REVIEWER)
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_resolved() && self.expires_at.is_some_and(|at| now >= at)
    }

    /// The reviewer-facing projection of this case.
    pub fn view(&self) -> CaseView {
        CaseView {
            case_id: self.case_id,
            request_id: self.request_id.clone(),
            summary: self.snapshot.summary(),
            outcome: self.outcome,
            opened_at: self.opened_at,
            expires_at: self.expires_at,
        }
    }
}

/// What a reviewer sees in the open-case listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseView {
    pub case_id: CaseId,
    pub request_id: RequestId,
    pub summary: DecisionSummary,
    pub outcome: ReviewOutcome,
    pub opened_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Result of a resolution attempt.
///
/// `newly_resolved = false` means the case had already been resolved; `case`
/// then carries the earlier resolution unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResolution {
    pub case: AuditCase,
    pub newly_resolved: bool,
}
