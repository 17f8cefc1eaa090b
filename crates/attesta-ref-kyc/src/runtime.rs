//! Wiring for the reference runtime.
//!
//! `KycRuntime` assembles an orchestrator from the real ATTESTA components
//! and a `MockEngineService`, and keeps handles to the parts a scenario
//! wants to inspect afterwards.

use std::sync::Arc;

use attesta_audit::InMemoryAuditWriter;
use attesta_contracts::{config::OrchestratorConfig, error::AttestaResult};
use attesta_core::{MonotonicIdGenerator, Orchestrator};
use attesta_engines::{ForensicClient, LogicClient, RemoteAttestationGate, VisionClient};
use attesta_policy::WeightedAggregator;
use attesta_proof::HmacProofIssuer;
use attesta_review::InMemoryReviewRouter;
use attesta_verify::ResponseDecoder;

use crate::mock_engines::MockEngineService;

/// Signing key for reference-runtime proofs. Never use outside the demo.
pub const REFERENCE_SIGNING_KEY: &[u8] = b"attesta-reference-signing-key-0001";

pub struct KycRuntime {
    pub orchestrator: Orchestrator,
    pub service: Arc<MockEngineService>,
    pub audit: InMemoryAuditWriter,
    pub router: Arc<InMemoryReviewRouter>,
}

impl KycRuntime {
    /// Build a runtime whose engines and gate all talk to `service`.
    pub fn new(config: OrchestratorConfig, service: Arc<MockEngineService>, name: &str) -> AttestaResult<Self> {
        let decoder = Arc::new(ResponseDecoder::new()?);
        let audit = InMemoryAuditWriter::new(format!("kyc-{name}"));
        let router = Arc::new(InMemoryReviewRouter::from_config(&config.review));
        let aggregator = WeightedAggregator::new(config.aggregation.clone())?;
        let issuer = HmacProofIssuer::new(REFERENCE_SIGNING_KEY, &config.proof)?;

        let orchestrator = Orchestrator::builder(config)
            .id_generator(Arc::new(MonotonicIdGenerator::new(format!("kyc-{name}"))))
            .attestation_gate(Arc::new(RemoteAttestationGate::new(service.clone())))
            .vision_engine(Arc::new(VisionClient::new(service.clone(), decoder.clone())))
            .forensic_engine(Arc::new(ForensicClient::new(service.clone(), decoder.clone())))
            .logic_engine(Arc::new(LogicClient::new(service.clone(), decoder)))
            .aggregator(Arc::new(aggregator))
            .review_router(router.clone())
            .proof_issuer(Arc::new(issuer))
            .audit_writer(Arc::new(audit.clone()))
            .build()?;

        Ok(Self {
            orchestrator,
            service,
            audit,
            router,
        })
    }

    /// One-line summary of the audit chain, for scenario output.
    pub fn audit_line(&self) -> String {
        format!(
            "{} ({} record(s))",
            if self.audit.verify_integrity() { "VERIFIED" } else { "FAILED" },
            self.audit.len()
        )
    }
}

/// Collector settings short enough for an interactive demo.
pub fn demo_config(mut config: OrchestratorConfig) -> OrchestratorConfig {
    config.collector.engine_timeout_ms = config.collector.engine_timeout_ms.min(250);
    config.collector.backoff_base_ms = config.collector.backoff_base_ms.min(20);
    config.collector.backoff_max_ms = config.collector.backoff_max_ms.min(100);
    config
}
