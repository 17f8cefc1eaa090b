//! Scenario 1: Verified
//!
//! Strong evidence on every signal. The request is VERIFIED, a compliance
//! proof is issued, and the document, claims, and extracted fields are
//! purged before the response returns.
//!
//!   Vision 0.95 · Forensic 0.92 · Logic 0.97 → 0.9445 → VERIFIED

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

const DEVICE: &str = "handset-verified-01";

/// Run the scenario and hand back the runtime for inspection.
pub async fn execute(config: &OrchestratorConfig) -> AttestaResult<(KycRuntime, VerificationOutcome)> {
    let service = Arc::new(MockEngineService::new());
    service.script(DEVICE_ENDPOINT, [Reply::Json(mock_data::device_attested(DEVICE))]);
    service.script(LIVENESS_ENDPOINT, [Reply::Json(mock_data::liveness_passed())]);
    service.script(VISION_ENDPOINT, [Reply::Json(mock_data::vision_clean(0.95))]);
    service.script(FORENSIC_ENDPOINT, [Reply::Json(mock_data::forensic_clean(0.92))]);
    service.script(LOGIC_ENDPOINT, [Reply::Json(mock_data::logic_consistent(0.97))]);

    let runtime = KycRuntime::new(config.clone(), service, "verified")?;
    let outcome = runtime
        .orchestrator
        .verify(mock_data::passport_submission(DEVICE))
        .await?;
    Ok((runtime, outcome))
}

pub async fn run_scenario(config: &OrchestratorConfig) -> AttestaResult<()> {
    println!("=== Scenario 1: Verified ===");
    println!();
    println!("  Document:   passport (specimen, UTO)");
    println!("  Signals:    vision 0.95 | forensic 0.92 | logic 0.97");
    println!();

    let (runtime, outcome) = execute(config).await?;
    print_outcome(&runtime, &outcome);

    if let Some(token) = &outcome.proof {
        let report = runtime.orchestrator.verify_proof(token);
        println!(
            "  Proof check:    {}",
            if report.valid { "VALID" } else { "INVALID" }
        );
    }
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use attesta_contracts::{lifecycle::LifecycleState, outcome::PurgeStatus};

    use super::*;

    /// Strong evidence verifies, issues a checkable proof, and purges.
    #[tokio::test]
    async fn test_verified_scenario() {
        let (runtime, outcome) = execute(&OrchestratorConfig::default()).await.unwrap();

        assert_eq!(outcome.state, LifecycleState::Verified);
        assert!((outcome.confidence - 0.9445).abs() < 1e-9);
        assert_eq!(outcome.purge, PurgeStatus::Completed);
        assert!(!runtime.orchestrator.holds_pii(&outcome.request_id));

        let token = outcome.proof.as_ref().unwrap();
        assert!(runtime.orchestrator.verify_proof(token).valid);

        assert!(runtime.audit.verify_integrity());
        assert!(runtime.audit.is_sealed(&outcome.request_id));
        let states: Vec<_> = runtime
            .audit
            .entries_for(&outcome.request_id)
            .iter()
            .map(|e| e.record.to)
            .collect();
        assert_eq!(states.last(), Some(&LifecycleState::Verified));
    }

    /// The proof and the audit trail never carry the extracted fields.
    #[tokio::test]
    async fn test_verified_outputs_carry_no_pii() {
        let (runtime, outcome) = execute(&OrchestratorConfig::default()).await.unwrap();

        let proof = serde_json::to_string(&outcome.proof).unwrap();
        let trail = serde_json::to_string(&runtime.audit.export_trail()).unwrap();
        for value in ["SPECIMEN", "P0000001", "1990-12-10"] {
            assert!(!proof.contains(value), "proof leaks {value}");
            assert!(!trail.contains(value), "audit trail leaks {value}");
        }
    }
}
