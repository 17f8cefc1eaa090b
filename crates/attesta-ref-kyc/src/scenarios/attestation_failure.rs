//! Scenario 4: Attestation Failure
//!
//! The capture's hardware signature does not verify. The request is
//! REJECTED at the gate: no liveness check, no engine call, and the
//! submission is purged all the same.

use std::sync::Arc;

use attesta_contracts::{config::OrchestratorConfig, error::AttestaResult, outcome::VerificationOutcome};
use attesta_engines::clients::DEVICE_ENDPOINT;

use crate::{
    mock_data,
    mock_engines::{MockEngineService, Reply},
    runtime::KycRuntime,
    scenarios::print_outcome,
};

const DEVICE: &str = "handset-untrusted-04";

pub async fn execute(config: &OrchestratorConfig) -> AttestaResult<(KycRuntime, VerificationOutcome)> {
    let service = Arc::new(MockEngineService::new());
    service.script(DEVICE_ENDPOINT, [Reply::Json(mock_data::device_rejected(DEVICE))]);

    let runtime = KycRuntime::new(config.clone(), service, "attestation")?;
    let outcome = runtime
        .orchestrator
        .verify(mock_data::passport_submission(DEVICE))
        .await?;
    Ok((runtime, outcome))
}

pub async fn run_scenario(config: &OrchestratorConfig) -> AttestaResult<()> {
    println!("=== Scenario 4: Attestation Failure ===");
    println!();
    println!("  Document:   passport (specimen, UTO)");
    println!("  Device:     {DEVICE} (signature does not chain to a trusted root)");
    println!();

    let (runtime, outcome) = execute(config).await?;
    print_outcome(&runtime, &outcome);
    println!("  Remote calls:   {} (gate only)", runtime.service.total_calls());
    println!();
    Ok(())
}
