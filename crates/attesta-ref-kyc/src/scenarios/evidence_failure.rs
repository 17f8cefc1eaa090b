//! Scenario 5: Evidence Failure
//!
//! Vision and forensic are both down for every attempt. With no document
//! evidence at all there is nothing to score: the request is REJECTED with
//! "evidence collection failure", logic is never consulted, and no decision
//! is recorded beyond the failure itself.

use std::sync::Arc;

use attesta_contracts::{config::OrchestratorConfig, error::AttestaResult, outcome::VerificationOutcome};
use attesta_engines::clients::{DEVICE_ENDPOINT, LIVENESS_ENDPOINT};

use crate::{
    mock_data,
    mock_engines::{MockEngineService, Reply},
    runtime::KycRuntime,
    scenarios::print_outcome,
};

const DEVICE: &str = "handset-outage-05";

pub async fn execute(config: &OrchestratorConfig) -> AttestaResult<(KycRuntime, VerificationOutcome)> {
    // Vision and forensic have no script: every attempt answers "unavailable".
    let service = Arc::new(MockEngineService::new());
    service.script(DEVICE_ENDPOINT, [Reply::Json(mock_data::device_attested(DEVICE))]);
    service.script(LIVENESS_ENDPOINT, [Reply::Json(mock_data::liveness_passed())]);

    let runtime = KycRuntime::new(config.clone(), service, "outage")?;
    let outcome = runtime
        .orchestrator
        .verify(mock_data::passport_submission(DEVICE))
        .await?;
    Ok((runtime, outcome))
}

pub async fn run_scenario(config: &OrchestratorConfig) -> AttestaResult<()> {
    println!("=== Scenario 5: Evidence Failure ===");
    println!();
    println!("  Document:   passport (specimen, UTO)");
    println!("  Signals:    vision: unavailable | forensic: unavailable");
    println!();

    let (runtime, outcome) = execute(config).await?;
    print_outcome(&runtime, &outcome);
    println!();
    Ok(())
}
