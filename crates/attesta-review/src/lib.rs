//! # attesta-review
//!
//! Human-in-the-loop review cases for borderline ATTESTA decisions.
//!
//! [`InMemoryReviewRouter`] implements the
//! [`HitlRouter`](attesta_core::traits::HitlRouter) trait: one case per
//! PENDING_HITL request, one resolution per case, optional expiry.
//! Reviewers see `CaseView`s, which carry the decision summary and never the
//! document or extracted fields.

pub mod router;

pub use router::InMemoryReviewRouter;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use attesta_contracts::{
        decision::{AggregatedDecision, DecisionStatus, SignalSlot},
        error::AttestaError,
        evidence::{Descriptor, Severity, SignalReading},
        request::RequestId,
        review::{CaseId, ReviewDecision, ReviewOutcome, EXPIRY_REVIEWER},
    };
    use attesta_core::traits::HitlRouter;

    use crate::InMemoryReviewRouter;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn make_decision(request: &str, status: DecisionStatus) -> AggregatedDecision {
        AggregatedDecision {
            request_id: RequestId(request.to_string()),
            confidence: 0.64,
            status,
            vision: SignalSlot::available(SignalReading::new(
                0.70,
                vec![Descriptor::new("portrait", "edge halo", Severity::High)],
            )),
            forensic: SignalSlot::available(SignalReading::new(0.65, vec![])),
            logic: SignalSlot::available(SignalReading::new(0.72, vec![])),
            flags: vec![],
            high_severity_count: 1,
            computed_at: Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap(),
        }
    }

    fn t0() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap()
    }

    // ── 1. opening ────────────────────────────────────────────────────────────

    /// Opening twice for one request yields the same case.
    #[test]
    fn test_open_case_is_idempotent() {
        let router = InMemoryReviewRouter::new(Some(Duration::hours(1)));
        let decision = make_decision("req-1", DecisionStatus::PendingHitl);

        let first = router.open_case(&decision, t0()).unwrap();
        let second = router.open_case(&decision, t0() + Duration::minutes(5)).unwrap();

        assert_eq!(first.case_id, second.case_id);
        assert_eq!(first.expires_at, Some(t0() + Duration::hours(1)));
        assert_eq!(router.list_open_cases().unwrap().len(), 1);
    }

    /// Only PENDING_HITL decisions are accepted.
    #[test]
    fn test_open_case_refuses_other_statuses() {
        let router = InMemoryReviewRouter::new(None);
        let result = router.open_case(&make_decision("req-1", DecisionStatus::Verified), t0());
        assert!(matches!(result, Err(AttestaError::Validation { .. })));
    }

    // ── 2. resolving ──────────────────────────────────────────────────────────

    /// The first resolution wins; later ones change nothing.
    #[test]
    fn test_second_resolution_is_noop() {
        let router = InMemoryReviewRouter::new(None);
        let case = router
            .open_case(&make_decision("req-1", DecisionStatus::PendingHitl), t0())
            .unwrap();

        let first = router
            .resolve_case(case.case_id, ReviewDecision::Approve, "alice", t0())
            .unwrap();
        let second = router
            .resolve_case(case.case_id, ReviewDecision::Reject, "bob", t0())
            .unwrap();

        assert!(first.newly_resolved);
        assert!(!second.newly_resolved);
        assert_eq!(second.case.outcome, ReviewOutcome::Approved);
        assert_eq!(second.case.reviewer_id.as_deref(), Some("alice"));
        assert!(router.list_open_cases().unwrap().is_empty());
    }

    /// Unknown cases are reported as such.
    #[test]
    fn test_unknown_case() {
        let router = InMemoryReviewRouter::new(None);
        let result = router.resolve_case(CaseId::new(), ReviewDecision::Approve, "alice", t0());
        assert!(matches!(result, Err(AttestaError::CaseNotFound { .. })));
        assert!(matches!(router.get_case(CaseId::new()), Err(AttestaError::CaseNotFound { .. })));
    }

    /// Reviewers cannot impersonate the expiry sweep or stay anonymous.
    #[test]
    fn test_reserved_and_blank_reviewer_ids_refused() {
        let router = InMemoryReviewRouter::new(None);
        let case = router
            .open_case(&make_decision("req-1", DecisionStatus::PendingHitl), t0())
            .unwrap();

        for reviewer in ["", "   ", EXPIRY_REVIEWER] {
            let result = router.resolve_case(case.case_id, ReviewDecision::Reject, reviewer, t0());
            assert!(matches!(result, Err(AttestaError::Validation { .. })));
        }
        assert!(!router.get_case(case.case_id).unwrap().is_resolved());
    }

    // ── 3. expiry ─────────────────────────────────────────────────────────────

    /// Overdue cases resolve to rejected exactly once.
    #[test]
    fn test_expiry_rejects_overdue_cases_once() {
        let router = InMemoryReviewRouter::new(Some(Duration::hours(2)));
        let case = router
            .open_case(&make_decision("req-1", DecisionStatus::PendingHitl), t0())
            .unwrap();
        router
            .open_case(&make_decision("req-2", DecisionStatus::PendingHitl), t0() + Duration::hours(1))
            .unwrap();

        let expired = router.expire_overdue(t0() + Duration::hours(2)).unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].case_id, case.case_id);
        assert!(expired[0].resolved_by_expiry());
        assert_eq!(expired[0].outcome, ReviewOutcome::Rejected);

        let again = router.expire_overdue(t0() + Duration::hours(2)).unwrap();
        assert!(again.is_empty());
        assert_eq!(router.list_open_cases().unwrap().len(), 1);
    }

    /// Without a TTL nothing ever expires.
    #[test]
    fn test_no_ttl_never_expires() {
        let router = InMemoryReviewRouter::new(None);
        router
            .open_case(&make_decision("req-1", DecisionStatus::PendingHitl), t0())
            .unwrap();
        assert!(router.expire_overdue(t0() + Duration::days(3650)).unwrap().is_empty());
    }

    /// The sweep drops cases resolved longer ago than the retention window
    /// and leaves open cases alone.
    #[test]
    fn test_sweep_prunes_resolved_cases_past_retention() {
        let router = InMemoryReviewRouter::new(None).with_resolved_retention(Duration::days(1));
        let resolved = router
            .open_case(&make_decision("req-1", DecisionStatus::PendingHitl), t0())
            .unwrap();
        let open = router
            .open_case(&make_decision("req-2", DecisionStatus::PendingHitl), t0())
            .unwrap();
        router
            .resolve_case(resolved.case_id, ReviewDecision::Approve, "alice", t0() + Duration::hours(1))
            .unwrap();

        router.expire_overdue(t0() + Duration::hours(12)).unwrap();
        assert_eq!(router.len(), 2, "still inside the window");

        router
            .expire_overdue(t0() + Duration::hours(1) + Duration::days(1))
            .unwrap();
        assert_eq!(router.len(), 1);
        assert!(matches!(
            router.get_case(resolved.case_id),
            Err(AttestaError::CaseNotFound { .. })
        ));
        assert!(router.case_for_request(&RequestId("req-1".to_string())).is_none());
        assert_eq!(router.get_case(open.case_id).unwrap().outcome, ReviewOutcome::Pending);
    }

    // ── 4. reviewer view ──────────────────────────────────────────────────────

    /// The listing carries the decision summary, descriptors included.
    #[test]
    fn test_open_case_view_carries_summary() {
        let router = InMemoryReviewRouter::new(None);
        router
            .open_case(&make_decision("req-1", DecisionStatus::PendingHitl), t0())
            .unwrap();

        let views = router.list_open_cases().unwrap();
        assert_eq!(views[0].summary.descriptors.len(), 1);
        assert_eq!(views[0].summary.descriptors[0].reason, "edge halo");
        assert!(router.case_for_request(&RequestId("req-1".to_string())).is_some());
    }
}
