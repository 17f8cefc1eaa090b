//! # attesta-ref-kyc
//!
//! KYC reference runtime for the ATTESTA identity-verification orchestrator.
//!
//! Demonstrates five verification scenarios against scripted engines:
//!
//! 1. **Verified**: strong evidence on every signal; a compliance proof is
//!    issued and the PII is purged.
//! 2. **Manual review**: a borderline score with one high-severity anomaly
//!    opens a review case; a reviewer approves it.
//! 3. **Partial evidence**: the forensic engine fails and then hangs; the
//!    decision is renormalized over vision and logic.
//! 4. **Attestation failure**: the capture device fails its hardware check;
//!    no engine is ever called.
//! 5. **Evidence failure**: both document engines are down; the request is
//!    rejected without a score.
//!
//! Every scenario runs the real orchestrator, aggregator, review router,
//! proof issuer, audit writer, engine clients, and response decoder. Only the
//! remote services behind the engine clients are simulated. All documents
//! and identities are fictional.

pub mod mock_data;
pub mod mock_engines;
pub mod runtime;
pub mod scenarios;

pub use mock_engines::{MockEngineService, Reply};
pub use runtime::KycRuntime;
