//! Scenario 2: Manual Review
//!
//! A borderline score with one high-severity anomaly goes to a human.
//!
//!   Step 1: Vision 0.70 (portrait halo, high) · Forensic 0.65 · Logic 0.72
//!           → 0.6875 − 0.05 penalty = 0.6375 → PENDING_HITL, case opened
//!   Step 2: the reviewer sees the case without any PII
//!   Step 3: the reviewer approves → VERIFIED, proof issued, PII purged
//!
//! While the case is open the orchestrator keeps the request's evidence in
//! its PII vault; nothing else holds it.

use std::sync::Arc;

use attesta_contracts::{
    config::OrchestratorConfig,
    error::{AttestaError, AttestaResult},
    outcome::VerificationOutcome,
    review::ReviewDecision,
};
use attesta_engines::clients::{
    DEVICE_ENDPOINT, FORENSIC_ENDPOINT, LIVENESS_ENDPOINT, LOGIC_ENDPOINT, VISION_ENDPOINT,
};

use crate::{
    mock_data,
    mock_engines::{MockEngineService, Reply},
    runtime::KycRuntime,
    scenarios::print_outcome,
};

const DEVICE: &str = "handset-review-02";
pub const REVIEWER: &str = "reviewer-ana";

/// Outcomes before and after the reviewer acts.
pub struct ManualReviewRun {
    pub runtime: KycRuntime,
    pub pending: VerificationOutcome,
    pub held_pii_while_pending: bool,
    pub resolved: VerificationOutcome,
}

pub async fn execute(config: &OrchestratorConfig) -> AttestaResult<ManualReviewRun> {
    let service = Arc::new(MockEngineService::new());
    service.script(DEVICE_ENDPOINT, [Reply::Json(mock_data::device_attested(DEVICE))]);
    service.script(LIVENESS_ENDPOINT, [Reply::Json(mock_data::liveness_passed())]);
    service.script(VISION_ENDPOINT, [Reply::Json(mock_data::vision_portrait_halo(0.70))]);
    service.script(FORENSIC_ENDPOINT, [Reply::Json(mock_data::forensic_clean(0.65))]);
    service.script(LOGIC_ENDPOINT, [Reply::Json(mock_data::logic_consistent(0.72))]);

    let runtime = KycRuntime::new(config.clone(), service, "review")?;
    let pending = runtime
        .orchestrator
        .verify(mock_data::passport_submission(DEVICE))
        .await?;
    let held_pii_while_pending = runtime.orchestrator.holds_pii(&pending.request_id);

    let case_id = pending.case_id.ok_or_else(|| AttestaError::StateMachine {
        reason: format!("request {} reached review without a case", pending.request_id),
    })?;
    let resolved = runtime
        .orchestrator
        .resolve_case(case_id, ReviewDecision::Approve, REVIEWER)?;

    Ok(ManualReviewRun {
        runtime,
        pending,
        held_pii_while_pending,
        resolved,
    })
}

pub async fn run_scenario(config: &OrchestratorConfig) -> AttestaResult<()> {
    println!("=== Scenario 2: Manual Review ===");
    println!();
    println!("  Document:   passport (specimen, UTO)");
    println!("  Signals:    vision 0.70 + portrait halo (high) | forensic 0.65 | logic 0.72");
    println!();

    let run = execute(config).await?;

    println!("  ── Step 1: automated decision ──");
    print_outcome(&run.runtime, &run.pending);
    println!(
        "  PII held:       {}",
        if run.held_pii_while_pending { "yes, until the case resolves" } else { "no" }
    );
    println!();

    println!("  *** PAUSED: awaiting human review ***");
    println!();
    println!("  [Simulating reviewer {REVIEWER} approving the case...]");
    println!();

    println!("  ── Step 3: after review ──");
    print_outcome(&run.runtime, &run.resolved);
    println!();
    Ok(())
}
