//! In-memory implementation of `HitlRouter`.
//!
//! Cases are keyed by `CaseId` with a secondary index by request, which is
//! what makes `open_case` idempotent. A case is resolved at most once,
//! either by a reviewer or by the expiry sweep. The sweep also drops cases
//! resolved longer ago than the retention window.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use attesta_contracts::{
    config::ReviewConfig,
    decision::{AggregatedDecision, DecisionStatus},
    error::{AttestaError, AttestaResult},
    request::RequestId,
    review::{AuditCase, CaseId, CaseResolution, CaseView, ReviewDecision, ReviewOutcome, EXPIRY_REVIEWER},
};
use attesta_core::traits::HitlRouter;

// ── Internal mutable state ────────────────────────────────────────────────────

#[derive(Default)]
struct CaseBook {
    cases: HashMap<CaseId, AuditCase>,
    by_request: HashMap<RequestId, CaseId>,
}

impl CaseBook {
    /// Drop cases resolved at or before `cutoff`.
    fn prune_resolved(&mut self, cutoff: DateTime<Utc>) -> usize {
        let stale: Vec<CaseId> = self
            .cases
            .values()
            .filter(|c| c.resolved_at.is_some_and(|at| at <= cutoff))
            .map(|c| c.case_id)
            .collect();
        for case_id in &stale {
            if let Some(case) = self.cases.remove(case_id) {
                self.by_request.remove(&case.request_id);
            }
        }
        stale.len()
    }
}

// ── Public router ─────────────────────────────────────────────────────────────

/// Keeps review cases in memory.
///
/// `case_ttl` of `None` disables expiry; cases then wait for a reviewer
/// indefinitely. Resolved cases are kept for `resolved_retention`.
pub struct InMemoryReviewRouter {
    case_ttl: Option<Duration>,
    resolved_retention: Duration,
    book: Mutex<CaseBook>,
}

impl InMemoryReviewRouter {
    pub fn new(case_ttl: Option<Duration>) -> Self {
        Self {
            case_ttl,
            resolved_retention: ReviewConfig::default().resolved_retention(),
            book: Mutex::new(CaseBook::default()),
        }
    }

    /// Build from the `[review]` configuration section.
    pub fn from_config(config: &ReviewConfig) -> Self {
        Self::new(config.case_ttl()).with_resolved_retention(config.resolved_retention())
    }

    pub fn with_resolved_retention(mut self, retention: Duration) -> Self {
        self.resolved_retention = retention;
        self
    }

    /// Number of cases held, open or resolved.
    pub fn len(&self) -> usize {
        self.book.lock().expect("case book lock poisoned").cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up the case opened for `request_id`.
    pub fn case_for_request(&self, request_id: &RequestId) -> Option<AuditCase> {
        let book = self.book.lock().expect("case book lock poisoned");
        book.by_request
            .get(request_id)
            .and_then(|id| book.cases.get(id))
            .cloned()
    }

    fn lock(&self) -> AttestaResult<std::sync::MutexGuard<'_, CaseBook>> {
        self.book.lock().map_err(|e| AttestaError::StateMachine {
            reason: format!("case book lock poisoned: {}", e),
        })
    }
}

impl HitlRouter for InMemoryReviewRouter {
    fn open_case(&self, decision: &AggregatedDecision, now: DateTime<Utc>) -> AttestaResult<AuditCase> {
        if decision.status != DecisionStatus::PendingHitl {
            return Err(AttestaError::Validation {
                reason: format!(
                    "request {} is {}, only PENDING_HITL decisions go to review",
                    decision.request_id,
                    decision.status.as_str()
                ),
            });
        }

        let mut book = self.lock()?;
        if let Some(existing) = book
            .by_request
            .get(&decision.request_id)
            .and_then(|id| book.cases.get(id))
        {
            info!(
                request_id = %decision.request_id,
                case_id = %existing.case_id,
                "review case already open for request"
            );
            return Ok(existing.clone());
        }

        let case = AuditCase {
            case_id: CaseId::new(),
            request_id: decision.request_id.clone(),
            snapshot: decision.clone(),
            outcome: ReviewOutcome::Pending,
            reviewer_id: None,
            opened_at: now,
            resolved_at: None,
            expires_at: self.case_ttl.map(|ttl| now + ttl),
        };
        info!(
            request_id = %case.request_id,
            case_id = %case.case_id,
            confidence = decision.confidence,
            "review case opened"
        );
        book.by_request.insert(case.request_id.clone(), case.case_id);
        book.cases.insert(case.case_id, case.clone());
        Ok(case)
    }

    fn resolve_case(
        &self,
        case_id: CaseId,
        decision: ReviewDecision,
        reviewer_id: &str,
        now: DateTime<Utc>,
    ) -> AttestaResult<CaseResolution> {
        let reviewer_id = reviewer_id.trim();
        if reviewer_id.is_empty() || reviewer_id == EXPIRY_REVIEWER {
            return Err(AttestaError::Validation {
                reason: format!("'{}' is not a valid reviewer id", reviewer_id),
            });
        }

        let mut book = self.lock()?;
        let case = book.cases.get_mut(&case_id).ok_or_else(|| AttestaError::CaseNotFound {
            case_id: case_id.to_string(),
        })?;

        if case.is_resolved() {
            warn!(
                case_id = %case_id,
                reviewer = %reviewer_id,
                "case already resolved, ignoring second resolution"
            );
            return Ok(CaseResolution {
                case: case.clone(),
                newly_resolved: false,
            });
        }

        case.outcome = ReviewOutcome::from(decision);
        case.reviewer_id = Some(reviewer_id.to_string());
        case.resolved_at = Some(now);
        info!(
            case_id = %case_id,
            request_id = %case.request_id,
            reviewer = %reviewer_id,
            outcome = ?case.outcome,
            "review case resolved"
        );
        Ok(CaseResolution {
            case: case.clone(),
            newly_resolved: true,
        })
    }

    fn get_case(&self, case_id: CaseId) -> AttestaResult<AuditCase> {
        self.lock()?
            .cases
            .get(&case_id)
            .cloned()
            .ok_or_else(|| AttestaError::CaseNotFound {
                case_id: case_id.to_string(),
            })
    }

    fn list_open_cases(&self) -> AttestaResult<Vec<CaseView>> {
        let book = self.lock()?;
        let mut open: Vec<CaseView> = book
            .cases
            .values()
            .filter(|c| !c.is_resolved())
            .map(AuditCase::view)
            .collect();
        open.sort_by_key(|v| v.opened_at);
        Ok(open)
    }

    fn expire_overdue(&self, now: DateTime<Utc>) -> AttestaResult<Vec<AuditCase>> {
        let mut book = self.lock()?;
        let pruned = book.prune_resolved(now - self.resolved_retention);
        if pruned > 0 {
            debug!(count = pruned, "resolved review cases pruned");
        }

        let mut expired = Vec::new();
        for case in book.cases.values_mut().filter(|c| c.is_overdue(now)) {
            case.outcome = ReviewOutcome::Rejected;
            case.reviewer_id = Some(EXPIRY_REVIEWER.to_string());
            case.resolved_at = Some(now);
            warn!(
                case_id = %case.case_id,
                request_id = %case.request_id,
                "review case expired unresolved"
            );
            expired.push(case.clone());
        }
        Ok(expired)
    }
}
