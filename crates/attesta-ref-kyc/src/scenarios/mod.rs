//! KYC reference runtime demo scenarios.
//!
//! Each scenario scripts the remote engine services, submits the specimen
//! passport through a fully wired orchestrator, and prints what happened.
//! `execute` returns the outcome for tests; `run_scenario` prints it.

pub mod attestation_failure;
pub mod evidence_failure;
pub mod manual_review;
pub mod partial_evidence;
pub mod verified;

use attesta_contracts::{decision::DecisionFlag, outcome::VerificationOutcome};

use crate::runtime::KycRuntime;

/// Print the caller-visible outcome and the audit chain status.
pub(crate) fn print_outcome(runtime: &KycRuntime, outcome: &VerificationOutcome) {
    println!("  Request:        {}", outcome.request_id);
    println!("  Final state:    {}", outcome.state);
    println!("  Confidence:     {:.4}", outcome.confidence);
    if let Some(decision) = &outcome.decision {
        let flags: Vec<String> = decision.flags.iter().map(describe_flag).collect();
        println!(
            "  Flags:          {}",
            if flags.is_empty() { "none".to_string() } else { flags.join(", ") }
        );
        println!("  High severity:  {}", decision.high_severity_count);
    }
    if let Some(reason) = outcome.rejection {
        println!("  Rejection:      {}", reason);
    }
    if let Some(case_id) = outcome.case_id {
        println!("  Review case:    {}", case_id);
    }
    if let Some(token) = &outcome.proof {
        println!("  Proof token:    {} (expires {})", token.token_id, token.expires_at);
    }
    println!("  PII purge:      {:?}", outcome.purge);
    println!("  Audit chain:    {}", runtime.audit_line());
}

fn describe_flag(flag: &DecisionFlag) -> String {
    match flag {
        DecisionFlag::SignalUnavailable(kind) => format!("{kind} unavailable"),
        DecisionFlag::SignalExcluded(kind) => format!("{kind} excluded"),
        DecisionFlag::ReducedConfidence => "reduced confidence".to_string(),
        DecisionFlag::NoEvidence => "no evidence".to_string(),
    }
}
