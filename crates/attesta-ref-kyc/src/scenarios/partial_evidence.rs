//! Scenario 3: Partial Evidence
//!
//! The forensic engine answers "unavailable" twice and then stops answering.
//! With a retry budget of 2 the collector makes three attempts, gives up,
//! and the decision is renormalized over vision and logic:
//!
//!   Vision 0.90 · Forensic ✗ · Logic 0.90 → 0.90 → VERIFIED,
//!   flagged "forensic unavailable"

use std::sync::Arc;

use attesta_contracts::{config::OrchestratorConfig, error::AttestaResult, outcome::VerificationOutcome};
use attesta_engines::clients::{
    DEVICE_ENDPOINT, FORENSIC_ENDPOINT, LIVENESS_ENDPOINT, LOGIC_ENDPOINT, VISION_ENDPOINT,
};

use crate::{
    mock_data,
    mock_engines::{MockEngineService, Reply},
    runtime::KycRuntime,
    scenarios::print_outcome,
};

const DEVICE: &str = "handset-partial-03";

pub async fn execute(config: &OrchestratorConfig) -> AttestaResult<(KycRuntime, VerificationOutcome)> {
    let mut config = config.clone();
    config.collector.retry_budget = 2;

    let service = Arc::new(MockEngineService::new());
    service.script(DEVICE_ENDPOINT, [Reply::Json(mock_data::device_attested(DEVICE))]);
    service.script(LIVENESS_ENDPOINT, [Reply::Json(mock_data::liveness_passed())]);
    service.script(VISION_ENDPOINT, [Reply::Json(mock_data::vision_clean(0.90))]);
    service.script(
        FORENSIC_ENDPOINT,
        [
            Reply::unavailable("503 from forensic cluster"),
            Reply::unavailable("503 from forensic cluster"),
            Reply::Hang,
        ],
    );
    service.script(LOGIC_ENDPOINT, [Reply::Json(mock_data::logic_consistent(0.90))]);

    let runtime = KycRuntime::new(config, service, "partial")?;
    let outcome = runtime
        .orchestrator
        .verify(mock_data::passport_submission(DEVICE))
        .await?;
    Ok((runtime, outcome))
}

pub async fn run_scenario(config: &OrchestratorConfig) -> AttestaResult<()> {
    println!("=== Scenario 3: Partial Evidence ===");
    println!();
    println!("  Document:   passport (specimen, UTO)");
    println!("  Signals:    vision 0.90 | forensic: unavailable, unavailable, timeout | logic 0.90");
    println!();

    let (runtime, outcome) = execute(config).await?;
    println!("  Forensic attempts: {}", runtime.service.calls_to(FORENSIC_ENDPOINT));
    print_outcome(&runtime, &outcome);
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use attesta_contracts::{
        decision::DecisionFlag,
        evidence::SignalKind,
        lifecycle::LifecycleState,
    };

    use super::*;

    /// Forensic is retried to its budget, then left out of the score.
    #[tokio::test(start_paused = true)]
    async fn test_partial_evidence_scenario() {
        let (runtime, outcome) = execute(&OrchestratorConfig::default()).await.unwrap();

        assert_eq!(runtime.service.calls_to(FORENSIC_ENDPOINT), 3);
        assert_eq!(outcome.state, LifecycleState::Verified);
        assert!((outcome.confidence - 0.90).abs() < 1e-9);
        assert!(!outcome.signal_available(SignalKind::Forensic));
        assert!(outcome.signal_available(SignalKind::Logic));

        let decision = outcome.decision.as_ref().unwrap();
        assert!(decision.has_flag(DecisionFlag::SignalUnavailable(SignalKind::Forensic)));
        assert!(!decision.has_flag(DecisionFlag::ReducedConfidence));

        let noted = runtime
            .audit
            .entries_for(&outcome.request_id)
            .iter()
            .filter_map(|e| e.record.note.clone())
            .any(|note| note.contains("forensic unavailable"));
        assert!(noted, "evidence transition should note the missing signal");
    }
}
