//! Evidence collection: concurrent Vision/Forensic fan-out and the
//! sequential Logic stage, under one timeout and retry discipline.
//!
//! Every engine call:
//!
//! 1. acquires a permit from that engine's bounded pool,
//! 2. runs under the per-attempt timeout,
//! 3. on a transient failure (timeout, unavailable) releases the permit,
//!    backs off `base · 2^retry` (capped) and tries again, up to
//!    `1 + retry_budget` attempts in total.
//!
//! Malformed responses and credential failures are returned at once.
//! Collection runs inside an `Interrupt`; cancellation or the request
//! deadline drops both in-flight calls and discards partial results.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use attesta_contracts::{
    config::{CollectorConfig, PoolConfig},
    error::EngineError,
    evidence::{ExtractedFields, ForensicResult, LogicResult, SignalKind, VisionResult},
    request::{ContextClaims, DocumentPayload},
};

use crate::{
    cancel::{Interrupt, Interruption},
    traits::{ForensicEngine, LogicEngine, VisionEngine},
};

/// One bounded pool per engine type.
#[derive(Debug, Clone)]
pub struct EnginePools {
    vision: Arc<Semaphore>,
    forensic: Arc<Semaphore>,
    logic: Arc<Semaphore>,
}

impl EnginePools {
    pub fn new(config: &PoolConfig) -> Self {
        Self {
            vision: Arc::new(Semaphore::new(config.vision)),
            forensic: Arc::new(Semaphore::new(config.forensic)),
            logic: Arc::new(Semaphore::new(config.logic)),
        }
    }

    pub fn pool(&self, kind: SignalKind) -> &Semaphore {
        match kind {
            SignalKind::Vision => &self.vision,
            SignalKind::Forensic => &self.forensic,
            SignalKind::Logic => &self.logic,
        }
    }

    /// Permits currently free in `kind`'s pool.
    pub fn available(&self, kind: SignalKind) -> usize {
        self.pool(kind).available_permits()
    }
}

/// The joined result of the Vision/Forensic fan-out.
#[derive(Debug)]
pub struct CollectedEvidence {
    pub vision: Result<VisionResult, EngineError>,
    pub forensic: Result<ForensicResult, EngineError>,
}

pub struct EvidenceCollector {
    vision: Arc<dyn VisionEngine>,
    forensic: Arc<dyn ForensicEngine>,
    logic: Arc<dyn LogicEngine>,
    pools: EnginePools,
    policy: CollectorConfig,
}

impl EvidenceCollector {
    pub fn new(
        vision: Arc<dyn VisionEngine>,
        forensic: Arc<dyn ForensicEngine>,
        logic: Arc<dyn LogicEngine>,
        pools: EnginePools,
        policy: CollectorConfig,
    ) -> Self {
        Self {
            vision,
            forensic,
            logic,
            pools,
            policy,
        }
    }

    pub fn pools(&self) -> &EnginePools {
        &self.pools
    }

    /// Dispatch Vision and Forensic together and wait for both.
    ///
    /// Each side fails independently; the caller decides what a single or
    /// double failure means.
    pub async fn collect(
        &self,
        payload: &DocumentPayload,
        interrupt: &Interrupt,
    ) -> Result<CollectedEvidence, Interruption> {
        let vision = &self.vision;
        let forensic = &self.forensic;

        let vision_call = call_with_retry(
            SignalKind::Vision,
            self.pools.pool(SignalKind::Vision),
            &self.policy,
            move || vision.analyze(payload),
        );
        let forensic_call = call_with_retry(
            SignalKind::Forensic,
            self.pools.pool(SignalKind::Forensic),
            &self.policy,
            move || forensic.analyze(payload),
        );

        interrupt
            .guard(async {
                let (vision, forensic) = tokio::join!(vision_call, forensic_call);
                CollectedEvidence { vision, forensic }
            })
            .await
    }

    /// Run the logic engine over the extracted fields and caller claims.
    pub async fn validate_logic(
        &self,
        fields: &ExtractedFields,
        claims: &ContextClaims,
        interrupt: &Interrupt,
    ) -> Result<Result<LogicResult, EngineError>, Interruption> {
        let logic = &self.logic;
        interrupt
            .guard(call_with_retry(
                SignalKind::Logic,
                self.pools.pool(SignalKind::Logic),
                &self.policy,
                move || logic.validate(fields, claims),
            ))
            .await
    }
}

/// Call an engine under the pool, timeout, and retry discipline.
pub async fn call_with_retry<T, F, Fut>(
    kind: SignalKind,
    pool: &Semaphore,
    policy: &CollectorConfig,
    mut call: F,
) -> Result<T, EngineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EngineError>>,
{
    let max_attempts = policy.max_attempts();
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        let result = {
            let _permit = pool.acquire().await.map_err(|_| EngineError::Unavailable {
                reason: format!("{kind} engine pool closed"),
            })?;
            match tokio::time::timeout(policy.engine_timeout(), call()).await {
                Ok(result) => result,
                Err(_) => Err(EngineError::Timeout {
                    after_ms: policy.engine_timeout_ms,
                }),
            }
        };

        match result {
            Ok(value) => {
                debug!(engine = %kind, attempt, "engine call succeeded");
                return Ok(value);
            }
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let backoff = policy.backoff_for(attempt - 1);
                warn!(
                    engine = %kind,
                    attempt,
                    max_attempts,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "transient engine failure, retrying"
                );
                tokio::time::sleep(backoff).await;
            }
            Err(e) => {
                warn!(engine = %kind, attempt, error = %e, "engine call failed");
                return Err(e);
            }
        }
    }
}
