//! # attesta-contracts
//!
//! Shared types, error taxonomy, and configuration for the ATTESTA
//! verification orchestrator.
//!
//! Every crate in the workspace imports from here. No pipeline logic lives in
//! this crate, only data definitions, validation helpers, and error types.

pub mod config;
pub mod decision;
pub mod error;
pub mod evidence;
pub mod lifecycle;
pub mod outcome;
pub mod proof;
pub mod request;
pub mod review;

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use config::{OrchestratorConfig, PenaltyCurve, RequestLimits};
    use decision::{AggregatedDecision, DecisionFlag, DecisionStatus, SignalSlot};
    use error::{AttestaError, EngineError};
    use evidence::{Descriptor, ExtractedFields, Severity, SignalKind, SignalReading};
    use lifecycle::LifecycleState;
    use request::{
        CaptureMetadata, ContextClaims, DocumentPayload, DocumentType, RequestId,
        VerificationSubmission,
    };

    fn make_submission(bytes: Vec<u8>) -> VerificationSubmission {
        VerificationSubmission {
            payload: DocumentPayload::new(DocumentType::Passport, bytes),
            claims: [("given_name", "Ada"), ("date_of_birth", "1990-01-01")]
                .into_iter()
                .collect(),
            capture: CaptureMetadata {
                device_id: "device-7".to_string(),
                device_signature: "3045022100ab".to_string(),
                liveness_stream: "stream://capture/1".to_string(),
                captured_at: Utc::now(),
            },
        }
    }

    // ── Lifecycle graph ──────────────────────────────────────────────────────

    #[test]
    fn lifecycle_happy_path_edges_are_legal() {
        use LifecycleState::*;
        let path = [
            Requested,
            Attested,
            LivenessOk,
            EvidenceCollected,
            LogicValidated,
            Aggregated,
            Verified,
        ];
        for pair in path.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{} -> {} should be legal",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn terminal_states_admit_no_transition() {
        use LifecycleState::*;
        let all = [
            Requested,
            Attested,
            LivenessOk,
            EvidenceCollected,
            LogicValidated,
            Aggregated,
            PendingHitl,
            Verified,
            Rejected,
        ];
        for terminal in [Verified, Rejected] {
            assert!(terminal.is_terminal());
            for next in all {
                assert!(!terminal.can_transition_to(next), "{terminal} -> {next} must be illegal");
            }
        }
    }

    #[test]
    fn pending_review_resolves_only_to_terminal_states() {
        use LifecycleState::*;
        assert!(PendingHitl.can_transition_to(Verified));
        assert!(PendingHitl.can_transition_to(Rejected));
        assert!(!PendingHitl.can_transition_to(Aggregated));
        assert!(!PendingHitl.can_transition_to(PendingHitl));
    }

    #[test]
    fn stages_cannot_be_skipped() {
        use LifecycleState::*;
        assert!(!Requested.can_transition_to(EvidenceCollected));
        assert!(!LivenessOk.can_transition_to(Aggregated));
        assert!(!EvidenceCollected.can_transition_to(Verified));
        assert!(!Requested.can_transition_to(PendingHitl));
    }

    // ── Submission validation ────────────────────────────────────────────────

    #[test]
    fn valid_submission_passes() {
        let submission = make_submission(vec![0xFF, 0xD8, 0xFF]);
        assert!(submission.validate(&RequestLimits::default()).is_ok());
    }

    #[test]
    fn empty_payload_is_a_validation_error() {
        let submission = make_submission(vec![]);
        match submission.validate(&RequestLimits::default()) {
            Err(AttestaError::Validation { reason }) => assert!(reason.contains("empty")),
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn oversized_payload_is_a_validation_error() {
        let submission = make_submission(vec![1; 64]);
        let limits = RequestLimits {
            max_payload_bytes: 32,
            ..RequestLimits::default()
        };
        assert!(matches!(
            submission.validate(&limits),
            Err(AttestaError::Validation { .. })
        ));
    }

    #[test]
    fn missing_device_signature_is_a_validation_error() {
        let mut submission = make_submission(vec![1, 2, 3]);
        submission.capture.device_signature = "  ".to_string();
        match submission.validate(&RequestLimits::default()) {
            Err(AttestaError::Validation { reason }) => {
                assert!(reason.contains("device signature"))
            }
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn validation_errors_never_echo_claim_values() {
        let mut submission = make_submission(vec![1]);
        submission.claims.insert("", "Secret Value");
        let err = submission.validate(&RequestLimits::default()).unwrap_err();
        assert!(!err.to_string().contains("Secret Value"));
    }

    // ── PII-bearing types ────────────────────────────────────────────────────

    #[test]
    fn debug_output_redacts_sensitive_values() {
        let mut fields = ExtractedFields::new();
        fields.insert("surname", "Lovelace");
        let claims: ContextClaims = [("surname", "Lovelace")].into_iter().collect();
        let payload = DocumentPayload::new(DocumentType::NationalId, b"raw-bytes".to_vec());

        let rendered = format!("{:?} {:?} {:?}", fields, claims, payload);
        assert!(rendered.contains("surname"));
        assert!(!rendered.contains("Lovelace"));
        assert!(!rendered.contains("raw-bytes"));
    }

    // ── Decision summary ─────────────────────────────────────────────────────

    #[test]
    fn decision_summary_tags_descriptors_by_source() {
        let decision = AggregatedDecision {
            request_id: RequestId("req-1".to_string()),
            confidence: 0.64,
            status: DecisionStatus::PendingHitl,
            vision: SignalSlot::available(SignalReading::new(
                0.7,
                vec![Descriptor::new("portrait", "edge halo", Severity::High)],
            )),
            forensic: SignalSlot::unavailable("timed out"),
            logic: SignalSlot::available(SignalReading::new(
                0.72,
                vec![Descriptor::new("date_of_birth", "age mismatch", Severity::Low)],
            )),
            flags: vec![DecisionFlag::SignalUnavailable(SignalKind::Forensic)],
            high_severity_count: 1,
            computed_at: Utc::now(),
        };

        let summary = decision.summary();
        assert_eq!(summary.descriptors.len(), 2);
        assert_eq!(summary.descriptors[0].source, SignalKind::Vision);
        assert_eq!(summary.descriptors[1].source, SignalKind::Logic);
        assert_eq!(summary.flags, decision.flags);
    }

    // ── Wire format ──────────────────────────────────────────────────────────

    #[test]
    fn statuses_serialize_in_screaming_snake_case() {
        assert_eq!(
            serde_json::to_value(DecisionStatus::PendingHitl).unwrap(),
            serde_json::json!("PENDING_HITL")
        );
        assert_eq!(
            serde_json::to_value(LifecycleState::LivenessOk).unwrap(),
            serde_json::json!("LIVENESS_OK")
        );
    }

    #[test]
    fn penalty_curve_is_tagged_by_curve_name() {
        let curve: PenaltyCurve =
            serde_json::from_value(serde_json::json!({ "curve": "exponential", "retain": 0.9 }))
                .unwrap();
        assert_eq!(curve, PenaltyCurve::Exponential { retain: 0.9 });
    }

    #[test]
    fn unavailable_slot_serializes_with_state_tag() {
        let value = serde_json::to_value(SignalSlot::unavailable("timed out")).unwrap();
        assert_eq!(value["state"], "unavailable");
        assert_eq!(value["reason"], "timed out");
    }

    // ── Errors ───────────────────────────────────────────────────────────────

    #[test]
    fn only_timeouts_and_unavailability_are_transient() {
        assert!(EngineError::Timeout { after_ms: 10 }.is_transient());
        assert!(EngineError::Unavailable { reason: "503".to_string() }.is_transient());
        assert!(!EngineError::Malformed { reason: "bad json".to_string() }.is_transient());
        assert!(!EngineError::Unauthorized { reason: "401".to_string() }.is_transient());
    }

    #[test]
    fn error_configuration_display() {
        let err = AttestaError::Configuration {
            reason: "missing vision engine".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("configuration error"));
        assert!(msg.contains("missing vision engine"));
    }

    #[test]
    fn error_engine_misconfigured_display() {
        let err = AttestaError::EngineMisconfigured {
            request_id: "req-9".to_string(),
            engine: SignalKind::Forensic,
            reason: "401".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("forensic"));
        assert!(msg.contains("req-9"));
    }

    // ── Configuration ────────────────────────────────────────────────────────

    #[test]
    fn default_configuration_is_valid() {
        assert!(OrchestratorConfig::default().validate().is_ok());
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let collector = config::CollectorConfig {
            engine_timeout_ms: 1_000,
            retry_budget: 5,
            backoff_base_ms: 100,
            backoff_max_ms: 350,
        };
        assert_eq!(collector.backoff_for(0).as_millis(), 100);
        assert_eq!(collector.backoff_for(1).as_millis(), 200);
        assert_eq!(collector.backoff_for(2).as_millis(), 350);
        assert_eq!(collector.backoff_for(40).as_millis(), 350);
        assert_eq!(collector.max_attempts(), 6);
    }

    #[test]
    fn stage_budget_covers_every_attempt_and_backoff() {
        let collector = config::CollectorConfig::default();
        // 3 attempts of 5 s, plus 200 ms and 400 ms of backoff.
        assert_eq!(collector.stage_budget().as_millis(), 15_600);
    }

    #[test]
    fn deadline_shorter_than_two_collector_stages_is_rejected() {
        let mut config = OrchestratorConfig::default();
        config.request.deadline_ms = Some(30_000);
        match config.validate() {
            Err(AttestaError::Configuration { reason }) => {
                assert!(reason.contains("request.deadline_ms"));
                assert!(reason.contains("31200"));
            }
            other => panic!("expected Configuration, got {:?}", other),
        }

        config.request.deadline_ms = Some(31_200);
        assert!(config.validate().is_ok());
        config.request.deadline_ms = None;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_retention_is_rejected() {
        let mut config = OrchestratorConfig::default();
        config.request.outcome_retention_secs = 0;
        assert!(config.validate().is_err());

        let mut config = OrchestratorConfig::default();
        config.review.resolved_retention_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let mut config = OrchestratorConfig::default();
        config.aggregation.thresholds.review = 0.9;
        assert!(matches!(
            config.validate(),
            Err(AttestaError::Configuration { .. })
        ));
    }

    #[test]
    fn decreasing_penalty_steps_are_rejected() {
        let mut config = OrchestratorConfig::default();
        config.aggregation.penalty = PenaltyCurve::Stepped {
            steps: vec![0.1, 0.05],
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_sized_pool_is_rejected() {
        let mut config = OrchestratorConfig::default();
        config.pools.forensic = 0;
        match config.validate() {
            Err(AttestaError::Configuration { reason }) => assert!(reason.contains("forensic")),
            other => panic!("expected Configuration, got {:?}", other),
        }
    }
}
