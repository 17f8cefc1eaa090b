//! ATTESTA KYC Reference Runtime: Demo CLI
//!
//! Runs one or all of the five identity-verification scenarios. Each
//! scenario uses the real ATTESTA components (orchestrator, aggregator,
//! review router, proof issuer, audit writer, engine clients) wired to
//! scripted engine services and fictional documents.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- verified
//!   cargo run -p demo -- manual-review
//!   cargo run -p demo -- partial-evidence
//!   cargo run -p demo -- attestation-failure
//!   cargo run -p demo -- evidence-failure
//!   cargo run -p demo -- --config config/attesta.toml run-all

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use attesta_contracts::{config::OrchestratorConfig, error::AttestaResult};
use attesta_policy::load_config_file;
use attesta_ref_kyc::{
    runtime::demo_config,
    scenarios::{attestation_failure, evidence_failure, manual_review, partial_evidence, verified},
};

// ── CLI definition ────────────────────────────────────────────────────────────

/// ATTESTA: identity-document verification orchestrator demo.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "ATTESTA KYC reference runtime demo",
    long_about = "Runs ATTESTA verification scenarios showing device attestation,\n\
                  evidence aggregation, human review, proof issuance, and PII purging."
)]
struct Cli {
    /// Orchestrator configuration (TOML). Defaults apply when omitted.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all five scenarios in sequence.
    RunAll,
    /// Scenario 1: strong evidence, proof issued.
    Verified,
    /// Scenario 2: borderline score, human review approves.
    ManualReview,
    /// Scenario 3: forensic engine down, decision renormalized.
    PartialEvidence,
    /// Scenario 4: device attestation fails, no engine called.
    AttestationFailure,
    /// Scenario 5: both document engines down, request rejected.
    EvidenceFailure,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Initialize structured logging. Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let config = match load(cli.config.as_ref()) {
        Ok(config) => demo_config(config),
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(2);
        }
    };

    print_banner();

    let result = match cli.command {
        Command::RunAll => run_all(&config).await,
        Command::Verified => verified::run_scenario(&config).await,
        Command::ManualReview => manual_review::run_scenario(&config).await,
        Command::PartialEvidence => partial_evidence::run_scenario(&config).await,
        Command::AttestationFailure => attestation_failure::run_scenario(&config).await,
        Command::EvidenceFailure => evidence_failure::run_scenario(&config).await,
    };

    match result {
        Ok(()) => {
            println!("All selected scenarios completed successfully.");
        }
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

fn load(path: Option<&PathBuf>) -> AttestaResult<OrchestratorConfig> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading orchestrator config");
            load_config_file(path)
        }
        None => Ok(OrchestratorConfig::default()),
    }
}

// ── Scenario dispatch ─────────────────────────────────────────────────────────

async fn run_all(config: &OrchestratorConfig) -> AttestaResult<()> {
    verified::run_scenario(config).await?;
    manual_review::run_scenario(config).await?;
    partial_evidence::run_scenario(config).await?;
    attestation_failure::run_scenario(config).await?;
    evidence_failure::run_scenario(config).await?;
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("ATTESTA: Identity Verification Orchestrator");
    println!("KYC Reference Demo");
    println!("============================================");
    println!();
    println!("ATTESTA pipeline per request:");
    println!("  [1] Device attestation and liveness gate → fail closed");
    println!("  [2] Vision and forensic engines in parallel, bounded retries");
    println!("  [3] Logic engine cross-checks extracted fields against claims");
    println!("  [4] Weighted, renormalized confidence → VERIFIED / PENDING_HITL / REJECTED");
    println!("  [5] Proof issued for VERIFIED; PII purged on every terminal state");
    println!();
}
