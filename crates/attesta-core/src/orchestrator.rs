//! The ATTESTA orchestrator: the per-request state machine.
//!
//! The orchestrator enforces the verification pipeline:
//!
//!   Attestation → Liveness → [Vision ‖ Forensic] → Logic → Aggregate → Route
//!
//! Routing sends VERIFIED requests to the proof issuer, PENDING_HITL
//! requests to the review router, and REJECTED requests straight to the
//! terminal state. Whatever the path, the PII purger runs once the request
//! is terminal, including after gate failures, evidence failures,
//! cancellation, and deadline expiry.
//!
//! No engine is called unless the attestation gate passed. This is
//! structural: the collector is only reachable after both gate checks.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use attesta_contracts::{
    config::OrchestratorConfig,
    decision::{AggregatedDecision, DecisionStatus, EvidenceSet, SignalSlot},
    error::{AttestaError, AttestaResult, EngineError},
    evidence::{SignalKind, SignalReading},
    lifecycle::{LifecycleState, RejectionReason, TransitionRecord},
    outcome::{PurgeStatus, VerificationOutcome},
    proof::{ComplianceProofToken, ProofVerification},
    request::{RequestId, VerificationRequest, VerificationSubmission},
    review::{AuditCase, CaseId, CaseView, ReviewDecision, ReviewOutcome},
};

use crate::{
    cancel::{CancelSignal, Interrupt, Interruption},
    collector::{CollectedEvidence, EnginePools, EvidenceCollector},
    context::RequestContext,
    ids::MonotonicIdGenerator,
    lifecycle::{Lifecycle, LifecycleEvents, TransitionDetail},
    purge::{InMemoryPiiVault, PiiPurger, TracingAlertSink},
    traits::{
        AlertSink, AttestationGate, AuditWriter, ConfidenceAggregator, ForensicEngine, HitlRouter,
        LogicEngine, PiiVault, ProofIssuer, RequestIdGenerator, VisionEngine,
    },
};

// ── Builder ───────────────────────────────────────────────────────────────────

/// Assembles an `Orchestrator` from its collaborators.
///
/// The request-id generator, PII vault, alert sink, and event bus have
/// in-memory defaults. Every other collaborator is required; `build()`
/// reports the first one missing as a configuration error.
#[derive(Default)]
pub struct OrchestratorBuilder {
    config: OrchestratorConfig,
    ids: Option<Arc<dyn RequestIdGenerator>>,
    gate: Option<Arc<dyn AttestationGate>>,
    vision: Option<Arc<dyn VisionEngine>>,
    forensic: Option<Arc<dyn ForensicEngine>>,
    logic: Option<Arc<dyn LogicEngine>>,
    aggregator: Option<Arc<dyn ConfidenceAggregator>>,
    router: Option<Arc<dyn HitlRouter>>,
    issuer: Option<Arc<dyn ProofIssuer>>,
    vault: Option<Arc<dyn PiiVault>>,
    alerts: Option<Arc<dyn AlertSink>>,
    audit: Option<Arc<dyn AuditWriter>>,
    events: Option<LifecycleEvents>,
}

impl OrchestratorBuilder {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn id_generator(mut self, ids: Arc<dyn RequestIdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn attestation_gate(mut self, gate: Arc<dyn AttestationGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn vision_engine(mut self, engine: Arc<dyn VisionEngine>) -> Self {
        self.vision = Some(engine);
        self
    }

    pub fn forensic_engine(mut self, engine: Arc<dyn ForensicEngine>) -> Self {
        self.forensic = Some(engine);
        self
    }

    pub fn logic_engine(mut self, engine: Arc<dyn LogicEngine>) -> Self {
        self.logic = Some(engine);
        self
    }

    pub fn aggregator(mut self, aggregator: Arc<dyn ConfidenceAggregator>) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    pub fn review_router(mut self, router: Arc<dyn HitlRouter>) -> Self {
        self.router = Some(router);
        self
    }

    pub fn proof_issuer(mut self, issuer: Arc<dyn ProofIssuer>) -> Self {
        self.issuer = Some(issuer);
        self
    }

    pub fn pii_vault(mut self, vault: Arc<dyn PiiVault>) -> Self {
        self.vault = Some(vault);
        self
    }

    pub fn alert_sink(mut self, alerts: Arc<dyn AlertSink>) -> Self {
        self.alerts = Some(alerts);
        self
    }

    pub fn audit_writer(mut self, audit: Arc<dyn AuditWriter>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn events(mut self, events: LifecycleEvents) -> Self {
        self.events = Some(events);
        self
    }

    /// Validate the configuration and wire the collaborators together.
    ///
    /// # Errors
    ///
    /// `Configuration` if the configuration is invalid or a required
    /// collaborator was never supplied.
    pub fn build(self) -> AttestaResult<Orchestrator> {
        self.config.validate()?;

        let gate = required(self.gate, "attestation gate")?;
        let vision = required(self.vision, "vision engine")?;
        let forensic = required(self.forensic, "forensic engine")?;
        let logic = required(self.logic, "logic engine")?;
        let aggregator = required(self.aggregator, "confidence aggregator")?;
        let router = required(self.router, "review router")?;
        let issuer = required(self.issuer, "proof issuer")?;
        let audit = required(self.audit, "audit writer")?;

        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(MonotonicIdGenerator::default()));
        let vault = self.vault.unwrap_or_else(|| Arc::new(InMemoryPiiVault::new()));
        let alerts = self.alerts.unwrap_or_else(|| Arc::new(TracingAlertSink));

        let collector = EvidenceCollector::new(
            vision,
            forensic,
            logic,
            EnginePools::new(&self.config.pools),
            self.config.collector.clone(),
        );

        Ok(Orchestrator {
            inner: Arc::new(Inner {
                purger: PiiPurger::new(vault.clone(), alerts.clone()),
                config: self.config,
                ids,
                gate,
                collector,
                aggregator,
                router,
                issuer,
                vault,
                alerts,
                audit,
                events: self.events.unwrap_or_default(),
                registry: Mutex::new(Registry::default()),
            }),
        })
    }
}

fn required<T: ?Sized>(value: Option<Arc<T>>, name: &str) -> AttestaResult<Arc<T>> {
    value.ok_or_else(|| AttestaError::Configuration {
        reason: format!("no {} was supplied", name),
    })
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

/// Drives verification requests through the lifecycle.
///
/// Cheap to clone; clones share collaborators, pools, and registries.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn builder(config: OrchestratorConfig) -> OrchestratorBuilder {
        OrchestratorBuilder::new(config)
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    /// Verify one submission. Equivalent to `verify_with_cancel` with a
    /// signal that never fires.
    pub async fn verify(&self, submission: VerificationSubmission) -> AttestaResult<VerificationOutcome> {
        self.verify_with_cancel(submission, CancelSignal::never()).await
    }

    /// Verify one submission on its own task and wait for the outcome.
    ///
    /// Dropping the returned future detaches the task; it still runs to a
    /// terminal or pending state and still purges. Use the `CancelHandle`
    /// paired with `cancel` to abandon the request.
    ///
    /// # Errors
    ///
    /// - `Validation` if the submission is malformed (nothing acquired,
    ///   nothing purged)
    /// - `Conflict` if the generated request id is already known
    /// - `EngineMisconfigured` if an engine refused the credentials; the
    ///   request is rejected and purged first
    /// - any error from proof issuance; the request is VERIFIED and purged
    /// - `StateMachine` if the pipeline broke down internally; the request
    ///   is rejected as `PipelineFault` and purged first
    pub async fn verify_with_cancel(
        &self,
        submission: VerificationSubmission,
        cancel: CancelSignal,
    ) -> AttestaResult<VerificationOutcome> {
        self.spawn(submission, cancel)
            .await
            .map_err(|e| AttestaError::StateMachine {
                reason: format!("verification task failed: {}", e),
            })?
    }

    /// Start verifying `submission` on a new task.
    pub fn spawn(
        &self,
        submission: VerificationSubmission,
        cancel: CancelSignal,
    ) -> JoinHandle<AttestaResult<VerificationOutcome>> {
        let inner = self.inner.clone();
        tokio::spawn(async move { inner.process(submission, cancel).await })
    }

    /// Apply a reviewer's decision to a pending case.
    ///
    /// Approval drives the request to VERIFIED and issues a proof; rejection
    /// drives it to REJECTED. Either way the retained PII is purged. A case
    /// that was already resolved is left untouched and its existing outcome
    /// is returned.
    ///
    /// # Errors
    ///
    /// `CaseNotFound` for an unknown case; errors from proof issuance as for
    /// `verify_with_cancel`.
    pub fn resolve_case(
        &self,
        case_id: CaseId,
        decision: ReviewDecision,
        reviewer_id: &str,
    ) -> AttestaResult<VerificationOutcome> {
        self.inner.resolve_case(case_id, decision, reviewer_id, Utc::now())
    }

    /// Auto-reject every case whose expiry is at or before `now`, after
    /// dropping terminal outcomes older than the retention window.
    pub fn expire_overdue(&self, now: DateTime<Utc>) -> AttestaResult<Vec<VerificationOutcome>> {
        self.inner.expire_overdue(now)
    }

    /// Sweep for overdue review cases on the configured interval until
    /// `shutdown` fires.
    pub async fn run_expiry_sweeper(&self, shutdown: CancelSignal) {
        let mut ticker = tokio::time::interval(self.inner.config.review.sweep_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.inner.config.review.sweep_interval_secs,
            "review expiry sweeper started"
        );
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("review expiry sweeper stopped");
                    return;
                }
                _ = ticker.tick() => {
                    match self.expire_overdue(Utc::now()) {
                        Ok(expired) if !expired.is_empty() => {
                            info!(count = expired.len(), "expired overdue review cases");
                        }
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "review expiry sweep failed"),
                    }
                }
            }
        }
    }

    /// Reviewer-facing listing of unresolved cases. Carries no PII.
    pub fn list_open_cases(&self) -> AttestaResult<Vec<CaseView>> {
        self.inner.router.list_open_cases()
    }

    pub fn get_case(&self, case_id: CaseId) -> AttestaResult<AuditCase> {
        self.inner.router.get_case(case_id)
    }

    /// Check a compliance proof token for a proof consumer.
    pub fn verify_proof(&self, token: &ComplianceProofToken) -> ProofVerification {
        self.inner.issuer.verify(token, Utc::now())
    }

    /// The terminal outcome recorded for `request_id`, if it has one and it
    /// is still inside the retention window.
    pub fn outcome(&self, request_id: &RequestId) -> Option<VerificationOutcome> {
        self.inner.registry().ok()?.finalized.get(request_id).cloned()
    }

    /// Observe every lifecycle transition from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<TransitionRecord> {
        self.inner.events.subscribe()
    }

    /// Return true if PII for `request_id` is still retained for review.
    pub fn holds_pii(&self, request_id: &RequestId) -> bool {
        self.inner.vault.holds(request_id)
    }
}

// ── Internals ─────────────────────────────────────────────────────────────────

struct Inner {
    config: OrchestratorConfig,
    ids: Arc<dyn RequestIdGenerator>,
    gate: Arc<dyn AttestationGate>,
    collector: EvidenceCollector,
    aggregator: Arc<dyn ConfidenceAggregator>,
    router: Arc<dyn HitlRouter>,
    issuer: Arc<dyn ProofIssuer>,
    vault: Arc<dyn PiiVault>,
    alerts: Arc<dyn AlertSink>,
    purger: PiiPurger,
    audit: Arc<dyn AuditWriter>,
    events: LifecycleEvents,
    registry: Mutex<Registry>,
}

/// Request bookkeeping. Holds no PII.
#[derive(Default)]
struct Registry {
    /// Requests between ingress and terminal state, pending review included.
    active: HashSet<RequestId>,
    /// Requests parked in PENDING_HITL, by case.
    pending: HashMap<CaseId, PendingReview>,
    /// Terminal outcomes, used to answer repeated resolutions. Pruned by the
    /// expiry sweep once older than `request.outcome_retention_secs`.
    finalized: HashMap<RequestId, VerificationOutcome>,
}

impl Registry {
    /// Drop outcomes completed at or before `cutoff`.
    fn prune_finalized(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.finalized.len();
        self.finalized.retain(|_, outcome| outcome.completed_at > cutoff);
        before - self.finalized.len()
    }
}

struct PendingReview {
    lifecycle: Lifecycle,
    decision: AggregatedDecision,
    liveness_warning: Option<String>,
}

/// How the automated stages ended.
enum StageEnd {
    Decided(AggregatedDecision),
    Rejected {
        reason: RejectionReason,
        note: String,
    },
    Misconfigured {
        engine: SignalKind,
        reason: String,
    },
}

impl StageEnd {
    fn rejected(reason: RejectionReason, note: impl Into<String>) -> Self {
        StageEnd::Rejected {
            reason,
            note: note.into(),
        }
    }

    fn interrupted(interruption: Interruption) -> Self {
        match interruption {
            Interruption::Cancelled => StageEnd::rejected(RejectionReason::Cancelled, "request cancelled"),
            Interruption::DeadlineExceeded => {
                StageEnd::rejected(RejectionReason::DeadlineExceeded, "request deadline exceeded")
            }
        }
    }
}

/// What happened on terminal entry.
struct Settled {
    purge: PurgeStatus,
    proof: Option<ComplianceProofToken>,
    proof_error: Option<AttestaError>,
}

impl Inner {
    async fn process(
        &self,
        submission: VerificationSubmission,
        cancel: CancelSignal,
    ) -> AttestaResult<VerificationOutcome> {
        submission.validate(&self.config.request)?;

        let request_id = self.ids.next_id();
        self.register(&request_id)?;

        let deadline = self.config.request.deadline().map(|d| Instant::now() + d);
        let interrupt = Interrupt::new(cancel, deadline);

        info!(
            request_id = %request_id,
            doc_type = submission.payload.doc_type().as_str(),
            payload_bytes = submission.payload.len(),
            "verification request received"
        );

        let mut context = RequestContext::new(VerificationRequest::new(
            request_id.clone(),
            submission,
            Utc::now(),
        ));
        let mut lifecycle = Lifecycle::new(request_id.clone());
        let mut liveness_warning = None;

        let stages = self
            .run_stages(&mut lifecycle, &mut context, &interrupt, &mut liveness_warning)
            .await;

        match stages {
            Ok(StageEnd::Decided(decision)) => self.route(lifecycle, context, decision, liveness_warning),
            Ok(StageEnd::Rejected { reason, note }) => Ok(self.reject(
                lifecycle,
                Some(context),
                reason,
                note,
                None,
                liveness_warning,
            )),
            Ok(StageEnd::Misconfigured { engine, reason }) => {
                error!(
                    request_id = %request_id,
                    engine = %engine,
                    reason = %reason,
                    "engine refused credentials, rejecting request"
                );
                self.reject(
                    lifecycle,
                    Some(context),
                    RejectionReason::EngineMisconfigured,
                    format!("{engine} engine: {reason}"),
                    None,
                    liveness_warning,
                );
                Err(AttestaError::EngineMisconfigured {
                    request_id: request_id.to_string(),
                    engine,
                    reason,
                })
            }
            Err(e) => self.abort(lifecycle, context, e, liveness_warning),
        }
    }

    /// Reject a request whose pipeline broke down, then surface the error.
    fn abort(
        &self,
        lifecycle: Lifecycle,
        context: RequestContext,
        error: AttestaError,
        liveness_warning: Option<String>,
    ) -> AttestaResult<VerificationOutcome> {
        error!(request_id = %lifecycle.request_id(), error = %error, "verification pipeline aborted");
        self.alerts.alert(lifecycle.request_id(), &error);
        self.reject(
            lifecycle,
            Some(context),
            RejectionReason::PipelineFault,
            error.to_string(),
            None,
            liveness_warning,
        );
        Err(error)
    }

    /// Run every stage up to and including aggregation.
    async fn run_stages(
        &self,
        lifecycle: &mut Lifecycle,
        context: &mut RequestContext,
        interrupt: &Interrupt,
        liveness_warning: &mut Option<String>,
    ) -> AttestaResult<StageEnd> {
        let request_id = lifecycle.request_id().clone();

        // ── Device attestation ───────────────────────────────────────────────
        let attestation = match interrupt
            .guard(self.gate.verify_device(context.request().capture()))
            .await
        {
            Err(interruption) => return Ok(StageEnd::interrupted(interruption)),
            Ok(Err(e)) => {
                warn!(request_id = %request_id, error = %e, "attestation gate could not run");
                return Ok(StageEnd::rejected(
                    RejectionReason::AttestationFailure,
                    format!("attestation gate error: {}", e),
                ));
            }
            Ok(Ok(result)) => result,
        };
        if !attestation.passed {
            warn!(
                request_id = %request_id,
                device_id = %attestation.device_id,
                "device attestation failed"
            );
            return Ok(StageEnd::rejected(
                RejectionReason::AttestationFailure,
                attestation
                    .detail
                    .unwrap_or_else(|| "device signature rejected".to_string()),
            ));
        }
        self.record(
            lifecycle,
            LifecycleState::Attested,
            TransitionDetail::note(format!("signature scheme {}", attestation.signature_scheme)),
        )?;

        // ── Passive liveness ─────────────────────────────────────────────────
        let liveness = match interrupt
            .guard(self.gate.check_liveness(context.request().capture()))
            .await
        {
            Err(interruption) => return Ok(StageEnd::interrupted(interruption)),
            Ok(Err(e)) => {
                warn!(request_id = %request_id, error = %e, "liveness check could not run");
                return Ok(StageEnd::rejected(
                    RejectionReason::LivenessFailure,
                    format!("liveness check error: {}", e),
                ));
            }
            Ok(Ok(result)) => result,
        };
        if !liveness.passed {
            warn!(request_id = %request_id, "liveness check failed");
            return Ok(StageEnd::rejected(
                RejectionReason::LivenessFailure,
                liveness
                    .warning
                    .unwrap_or_else(|| "liveness not detected".to_string()),
            ));
        }
        let detail = match &liveness.warning {
            Some(warning) => {
                info!(request_id = %request_id, warning = %warning, "liveness passed with warning");
                TransitionDetail::note(warning.clone())
            }
            None => TransitionDetail::default(),
        };
        *liveness_warning = liveness.warning;
        self.record(lifecycle, LifecycleState::LivenessOk, detail)?;

        // ── Vision ‖ Forensic ────────────────────────────────────────────────
        //
        // Only reachable once both gate checks passed.
        let CollectedEvidence { vision, forensic } = match self
            .collector
            .collect(context.request().payload(), interrupt)
            .await
        {
            Err(interruption) => return Ok(StageEnd::interrupted(interruption)),
            Ok(evidence) => evidence,
        };

        for (engine, result) in [
            (SignalKind::Vision, vision.as_ref().err()),
            (SignalKind::Forensic, forensic.as_ref().err()),
        ] {
            if let Some(EngineError::Unauthorized { reason }) = result {
                return Ok(StageEnd::Misconfigured {
                    engine,
                    reason: reason.clone(),
                });
            }
        }

        if let (Err(v), Err(f)) = (&vision, &forensic) {
            warn!(
                request_id = %request_id,
                vision_error = %v,
                forensic_error = %f,
                "both evidence engines failed"
            );
            return Ok(StageEnd::rejected(
                RejectionReason::EvidenceCollectionFailure,
                format!("vision: {}; forensic: {}", v, f),
            ));
        }

        let mut gaps = Vec::new();
        if let Err(e) = &vision {
            warn!(request_id = %request_id, error = %e, "vision signal unavailable");
            gaps.push(format!("vision unavailable: {}", e));
        }
        if let Err(e) = &forensic {
            warn!(request_id = %request_id, error = %e, "forensic signal unavailable");
            gaps.push(format!("forensic unavailable: {}", e));
        }
        let detail = if gaps.is_empty() {
            TransitionDetail::default()
        } else {
            TransitionDetail::note(gaps.join("; "))
        };
        self.record(lifecycle, LifecycleState::EvidenceCollected, detail)?;

        let vision_slot = slot_from(&vision);
        let forensic_slot = slot_from(&forensic);

        // Extracted fields move into the request context; the vision result
        // keeps only its PII-free reading.
        if let Ok(mut result) = vision {
            context.attach_fields(std::mem::take(&mut result.extracted_fields));
        }

        // ── Logic ────────────────────────────────────────────────────────────
        let logic_slot = match context.extracted() {
            Some(fields) => {
                match self
                    .collector
                    .validate_logic(fields, context.request().claims(), interrupt)
                    .await
                {
                    Err(interruption) => return Ok(StageEnd::interrupted(interruption)),
                    Ok(Err(EngineError::Unauthorized { reason })) => {
                        return Ok(StageEnd::Misconfigured {
                            engine: SignalKind::Logic,
                            reason,
                        })
                    }
                    Ok(result) => slot_from(&result),
                }
            }
            None => {
                debug!(request_id = %request_id, "no extracted fields, logic check skipped");
                SignalSlot::unavailable("no extracted fields; logic check skipped")
            }
        };
        let detail = match &logic_slot {
            SignalSlot::Available { .. } => TransitionDetail::default(),
            SignalSlot::Unavailable { reason } | SignalSlot::Excluded { reason } => {
                warn!(request_id = %request_id, reason = %reason, "logic signal unavailable");
                TransitionDetail::note(format!("logic unavailable: {}", reason))
            }
        };
        self.record(lifecycle, LifecycleState::LogicValidated, detail)?;

        // ── Aggregation ──────────────────────────────────────────────────────
        let evidence = EvidenceSet {
            vision: vision_slot,
            forensic: forensic_slot,
            logic: logic_slot,
        };
        let decision = self.aggregator.aggregate(&request_id, &evidence, Utc::now());

        info!(
            request_id = %request_id,
            confidence = decision.confidence,
            status = decision.status.as_str(),
            high_severity = decision.high_severity_count,
            "decision aggregated"
        );
        self.record(
            lifecycle,
            LifecycleState::Aggregated,
            TransitionDetail::default().with_summary(decision.summary()),
        )?;

        Ok(StageEnd::Decided(decision))
    }

    /// Send an aggregated decision down its branch.
    fn route(
        &self,
        mut lifecycle: Lifecycle,
        context: RequestContext,
        decision: AggregatedDecision,
        liveness_warning: Option<String>,
    ) -> AttestaResult<VerificationOutcome> {
        match decision.status {
            DecisionStatus::Verified => {
                let detail = TransitionDetail::default().with_summary(decision.summary());
                let settled = self.settle(&mut lifecycle, Some(context), LifecycleState::Verified, detail);
                let mut outcome = base_outcome(&lifecycle, Some(&decision), liveness_warning, &settled);
                outcome.proof = settled.proof;
                self.finish(outcome, settled.proof_error)
            }
            DecisionStatus::Rejected => Ok(self.reject(
                lifecycle,
                Some(context),
                RejectionReason::BelowThreshold,
                format!("confidence {:.3}", decision.confidence),
                Some(&decision),
                liveness_warning,
            )),
            DecisionStatus::PendingHitl => Ok(self.escalate(lifecycle, context, decision, liveness_warning)),
        }
    }

    /// Open a review case and park the request in PENDING_HITL.
    ///
    /// The registry lock is held from case opening until the request is
    /// parked, so a reviewer cannot resolve a case the orchestrator does not
    /// know about yet.
    fn escalate(
        &self,
        mut lifecycle: Lifecycle,
        context: RequestContext,
        decision: AggregatedDecision,
        liveness_warning: Option<String>,
    ) -> VerificationOutcome {
        let request_id = lifecycle.request_id().clone();
        let opened = self.registry().and_then(|registry| {
            let case = self.router.open_case(&decision, Utc::now())?;
            Ok((registry, case))
        });

        let (mut registry, case) = match opened {
            Ok(opened) => opened,
            Err(e) => {
                error!(request_id = %request_id, error = %e, "could not open review case");
                self.alerts.alert(&request_id, &e);
                return self.reject(
                    lifecycle,
                    Some(context),
                    RejectionReason::ReviewUnavailable,
                    e.to_string(),
                    Some(&decision),
                    liveness_warning,
                );
            }
        };

        if let Err(e) = self.record(
            &mut lifecycle,
            LifecycleState::PendingHitl,
            TransitionDetail::note(format!("case {}", case.case_id)).with_summary(decision.summary()),
        ) {
            error!(request_id = %request_id, error = %e, "could not enter PENDING_HITL");
        }

        if let Err(e) = self.vault.retain(context) {
            warn!(
                request_id = %request_id,
                error = %e,
                "could not retain evidence for review; context dropped"
            );
        }

        info!(
            request_id = %request_id,
            case_id = %case.case_id,
            confidence = decision.confidence,
            "request escalated to human review"
        );

        let mut outcome = base_outcome(&lifecycle, Some(&decision), liveness_warning.clone(), &Settled {
            purge: PurgeStatus::Deferred,
            proof: None,
            proof_error: None,
        });
        outcome.case_id = Some(case.case_id);

        registry.pending.insert(
            case.case_id,
            PendingReview {
                lifecycle,
                decision,
                liveness_warning,
            },
        );
        outcome
    }

    fn resolve_case(
        &self,
        case_id: CaseId,
        decision: ReviewDecision,
        reviewer_id: &str,
        now: DateTime<Utc>,
    ) -> AttestaResult<VerificationOutcome> {
        let mut registry = self.registry()?;

        let resolution = self.router.resolve_case(case_id, decision, reviewer_id, now)?;
        let request_id = resolution.case.request_id.clone();

        if !resolution.newly_resolved {
            info!(
                case_id = %case_id,
                request_id = %request_id,
                "case already resolved, returning existing resolution"
            );
            return registry.finalized.get(&request_id).cloned().ok_or_else(|| {
                AttestaError::Conflict {
                    reason: format!("case {} was resolved but request {} has no outcome", case_id, request_id),
                }
            });
        }

        let pending = registry.pending.remove(&case_id).ok_or_else(|| AttestaError::StateMachine {
            reason: format!("case {} has no pending request", case_id),
        })?;
        let (outcome, proof_error) = self.apply_resolution(pending, &resolution.case);
        registry.finalized.insert(request_id.clone(), outcome.clone());
        registry.active.remove(&request_id);
        drop(registry);

        self.finish(outcome, proof_error)
    }

    fn expire_overdue(&self, now: DateTime<Utc>) -> AttestaResult<Vec<VerificationOutcome>> {
        let mut registry = self.registry()?;

        let cutoff = now - self.config.request.outcome_retention();
        let dropped = registry.prune_finalized(cutoff);
        let forgotten = self.purger.forget_before(cutoff);
        if dropped > 0 || forgotten > 0 {
            debug!(outcomes = dropped, purge_records = forgotten, "retention window pruned");
        }

        let expired = self.router.expire_overdue(now)?;
        let mut outcomes = Vec::with_capacity(expired.len());
        for case in expired {
            let Some(pending) = registry.pending.remove(&case.case_id) else {
                warn!(case_id = %case.case_id, "expired case has no pending request");
                continue;
            };
            let (outcome, _) = self.apply_resolution(pending, &case);
            registry.active.remove(&case.request_id);
            registry.finalized.insert(case.request_id.clone(), outcome.clone());
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Drive a parked request to the terminal state its resolved case names.
    fn apply_resolution(
        &self,
        pending: PendingReview,
        case: &AuditCase,
    ) -> (VerificationOutcome, Option<AttestaError>) {
        let PendingReview {
            mut lifecycle,
            decision,
            liveness_warning,
        } = pending;
        let reviewer = case.reviewer_id.clone().unwrap_or_default();
        let summary = decision.summary();

        let (to, rejection, detail) = match case.outcome {
            ReviewOutcome::Approved => (
                LifecycleState::Verified,
                None,
                TransitionDetail::note(format!("approved by {}", reviewer)),
            ),
            ReviewOutcome::Rejected if case.resolved_by_expiry() => (
                LifecycleState::Rejected,
                Some(RejectionReason::ReviewExpired),
                TransitionDetail::rejected(RejectionReason::ReviewExpired),
            ),
            // Pending never reaches here; treat it as a rejection so the
            // request still terminates and purges.
            ReviewOutcome::Rejected | ReviewOutcome::Pending => (
                LifecycleState::Rejected,
                Some(RejectionReason::ReviewerRejected),
                TransitionDetail::rejected(RejectionReason::ReviewerRejected)
                    .with_note(format!("rejected by {}", reviewer)),
            ),
        };

        info!(
            request_id = %case.request_id,
            case_id = %case.case_id,
            reviewer = %reviewer,
            to = %to,
            "review case resolved"
        );

        let settled = self.settle(&mut lifecycle, None, to, detail.with_summary(summary));
        let mut outcome = base_outcome(&lifecycle, Some(&decision), liveness_warning, &settled);
        outcome.case_id = Some(case.case_id);
        outcome.rejection = rejection;
        outcome.proof = settled.proof;
        (outcome, settled.proof_error)
    }

    /// Terminate a request as REJECTED.
    fn reject(
        &self,
        mut lifecycle: Lifecycle,
        context: Option<RequestContext>,
        reason: RejectionReason,
        note: String,
        decision: Option<&AggregatedDecision>,
        liveness_warning: Option<String>,
    ) -> VerificationOutcome {
        warn!(
            request_id = %lifecycle.request_id(),
            from = %lifecycle.state(),
            reason = %reason,
            note = %note,
            "request rejected"
        );

        let mut detail = TransitionDetail::rejected(reason).with_note(note);
        if let Some(decision) = decision {
            detail = detail.with_summary(decision.summary());
        }
        let settled = self.settle(&mut lifecycle, context, LifecycleState::Rejected, detail);

        let mut outcome = base_outcome(&lifecycle, decision, liveness_warning, &settled);
        outcome.rejection = Some(reason);
        self.store_final(&outcome);
        outcome
    }

    /// Enter a terminal state: record it, issue the proof for VERIFIED,
    /// seal the audit trail, then purge.
    fn settle(
        &self,
        lifecycle: &mut Lifecycle,
        context: Option<RequestContext>,
        to: LifecycleState,
        detail: TransitionDetail,
    ) -> Settled {
        let request_id = lifecycle.request_id().clone();
        let entered = match self.record(lifecycle, to, detail) {
            Ok(()) => true,
            Err(e) => {
                error!(request_id = %request_id, error = %e, "terminal transition refused");
                false
            }
        };

        let mut proof = None;
        let mut proof_error = None;
        if entered && to == LifecycleState::Verified {
            match self.issuer.issue(&request_id, DecisionStatus::Verified, Utc::now()) {
                Ok(token) => {
                    info!(request_id = %request_id, token_id = %token.token_id, "compliance proof issued");
                    proof = Some(token);
                }
                Err(e) => {
                    error!(request_id = %request_id, error = %e, "compliance proof issuance failed");
                    self.alerts.alert(&request_id, &e);
                    proof_error = Some(e);
                }
            }
        }

        if let Err(e) = self.audit.finalize(&request_id) {
            error!(request_id = %request_id, error = %e, "audit finalize failed");
            self.alerts.alert(&request_id, &e);
        }

        let purge = self.purger.purge(&request_id, context);
        info!(request_id = %request_id, state = %lifecycle.state(), "request reached terminal state");

        Settled {
            purge,
            proof,
            proof_error,
        }
    }

    /// Store a terminal outcome and surface any proof failure.
    ///
    /// Must not be called with the registry lock held.
    fn finish(
        &self,
        outcome: VerificationOutcome,
        proof_error: Option<AttestaError>,
    ) -> AttestaResult<VerificationOutcome> {
        self.store_final(&outcome);
        match proof_error {
            Some(e) => Err(e),
            None => Ok(outcome),
        }
    }

    /// Advance the lifecycle, append the record to the audit trail, and
    /// publish it. Audit failures are alerted, never fatal to the request.
    fn record(
        &self,
        lifecycle: &mut Lifecycle,
        to: LifecycleState,
        detail: TransitionDetail,
    ) -> AttestaResult<()> {
        let record = lifecycle.advance(to, detail)?;
        if let Err(e) = self.audit.write(&record) {
            error!(request_id = %record.request_id, error = %e, "audit write failed");
            self.alerts.alert(&record.request_id, &e);
        }
        self.events.publish(&record);
        Ok(())
    }

    fn registry(&self) -> AttestaResult<MutexGuard<'_, Registry>> {
        self.registry.lock().map_err(|e| AttestaError::StateMachine {
            reason: format!("orchestrator registry lock poisoned: {}", e),
        })
    }

    fn register(&self, request_id: &RequestId) -> AttestaResult<()> {
        let mut registry = self.registry()?;
        if registry.finalized.contains_key(request_id) || !registry.active.insert(request_id.clone()) {
            return Err(AttestaError::Conflict {
                reason: format!("request id {} is already in use", request_id),
            });
        }
        Ok(())
    }

    fn store_final(&self, outcome: &VerificationOutcome) {
        match self.registry() {
            Ok(mut registry) => {
                registry.active.remove(&outcome.request_id);
                registry
                    .finalized
                    .insert(outcome.request_id.clone(), outcome.clone());
            }
            Err(e) => {
                error!(request_id = %outcome.request_id, error = %e, "terminal outcome not stored");
                self.alerts.alert(&outcome.request_id, &e);
            }
        }
    }
}

fn slot_from<T>(result: &Result<T, EngineError>) -> SignalSlot
where
    for<'a> SignalReading: From<&'a T>,
{
    match result {
        Ok(value) => SignalSlot::available(SignalReading::from(value)),
        Err(e @ EngineError::Malformed { .. }) => SignalSlot::excluded(e.to_string()),
        Err(e) => SignalSlot::unavailable(e.to_string()),
    }
}

fn base_outcome(
    lifecycle: &Lifecycle,
    decision: Option<&AggregatedDecision>,
    liveness_warning: Option<String>,
    settled: &Settled,
) -> VerificationOutcome {
    VerificationOutcome {
        request_id: lifecycle.request_id().clone(),
        state: lifecycle.state(),
        confidence: decision.map(|d| d.confidence).unwrap_or(0.0),
        decision: decision.cloned(),
        proof: None,
        case_id: None,
        rejection: None,
        liveness_warning,
        purge: settled.purge.clone(),
        completed_at: Utc::now(),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
