//! # attesta-core
//!
//! The verification orchestrator for ATTESTA identity-document checks.
//!
//! This crate provides:
//! - The collaborator traits (`AttestationGate`, the three evidence engines,
//!   `ConfidenceAggregator`, `HitlRouter`, `ProofIssuer`, `PiiVault`,
//!   `AuditWriter`, `AlertSink`)
//! - The `EvidenceCollector`, which runs engine calls under pools, timeouts,
//!   retries, and cancellation
//! - The `PiiPurger`, which destroys request PII once per terminal request
//! - The `Orchestrator`, which drives each request through the lifecycle
//!
//! ## Usage
//!
//! ```rust,ignore
//! use attesta_core::{Orchestrator, traits::{AttestationGate, VisionEngine}};
//!
//! let orchestrator = Orchestrator::builder(config)
//!     .attestation_gate(gate)
//!     .vision_engine(vision)
//!     // ...
//!     .build()?;
//! let outcome = orchestrator.verify(submission).await?;
//! ```

pub mod cancel;
pub mod collector;
pub mod context;
pub mod ids;
pub mod lifecycle;
pub mod orchestrator;
pub mod purge;
pub mod traits;

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use collector::{EnginePools, EvidenceCollector};
pub use context::RequestContext;
pub use ids::{MonotonicIdGenerator, UuidIdGenerator};
pub use lifecycle::LifecycleEvents;
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use purge::{InMemoryPiiVault, PiiPurger, TracingAlertSink};
