//! Orchestrator configuration.
//!
//! One immutable `OrchestratorConfig` value is built at startup (usually from
//! TOML, see `attesta_policy::config`) and handed to the orchestrator at
//! construction. Every section and field has a default, so an empty document
//! is a valid configuration.
//!
//! ```toml
//! [collector]
//! engine_timeout_ms = 5000
//! retry_budget = 2
//!
//! [aggregation.weights]
//! vision = 0.40
//! forensic = 0.35
//! logic = 0.25
//!
//! [aggregation.penalty]
//! curve = "linear"
//! per_anomaly = 0.05
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    error::{AttestaError, AttestaResult},
    evidence::SignalKind,
};

/// Top-level configuration for one orchestrator instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub collector: CollectorConfig,
    pub pools: PoolConfig,
    pub aggregation: AggregationConfig,
    pub review: ReviewConfig,
    pub proof: ProofConfig,
    pub request: RequestLimits,
}

impl OrchestratorConfig {
    /// Check every section. Returns the first problem found as a
    /// `Configuration` error.
    pub fn validate(&self) -> AttestaResult<()> {
        self.collector.validate()?;
        self.pools.validate()?;
        self.aggregation.validate()?;
        self.review.validate()?;
        self.proof.validate()?;
        self.request.validate()?;
        self.check_deadline_budget()
    }

    /// The request deadline must leave room for the slowest run the retry
    /// policy allows: the vision/forensic stage followed by the logic stage,
    /// each exhausting every attempt.
    fn check_deadline_budget(&self) -> AttestaResult<()> {
        let Some(deadline) = self.request.deadline() else {
            return Ok(());
        };
        let needed = self.collector.stage_budget().saturating_mul(2);
        if deadline < needed {
            return Err(config_error(format!(
                "request.deadline_ms ({}) is below the {} ms two collector stages may take",
                deadline.as_millis(),
                needed.as_millis()
            )));
        }
        Ok(())
    }
}

/// Upper bound applied to every TTL so conversions to `chrono::Duration`
/// cannot overflow.
const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 3600;

fn config_error(reason: impl Into<String>) -> AttestaError {
    AttestaError::Configuration { reason: reason.into() }
}

// ── Collector ─────────────────────────────────────────────────────────────────

/// Timeout and retry discipline shared by every evidence-engine call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Per-attempt timeout.
    pub engine_timeout_ms: u64,
    /// Retries allowed after the first attempt for transient failures.
    pub retry_budget: u32,
    /// Backoff before retry `n` is `backoff_base_ms * 2^n`, capped below.
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            engine_timeout_ms: 5_000,
            retry_budget: 2,
            backoff_base_ms: 200,
            backoff_max_ms: 2_000,
        }
    }
}

impl CollectorConfig {
    pub fn engine_timeout(&self) -> Duration {
        Duration::from_millis(self.engine_timeout_ms)
    }

    /// Backoff to wait before retry number `retry` (0-based).
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry.min(32)).unwrap_or(u64::MAX);
        let millis = self.backoff_base_ms.saturating_mul(factor).min(self.backoff_max_ms);
        Duration::from_millis(millis)
    }

    pub fn max_attempts(&self) -> u32 {
        self.retry_budget.saturating_add(1)
    }

    /// Longest one engine call can take: every attempt timing out plus the
    /// backoff before each retry.
    pub fn stage_budget(&self) -> Duration {
        let attempts = self.engine_timeout().saturating_mul(self.max_attempts());
        (0..self.retry_budget)
            .map(|retry| self.backoff_for(retry))
            .fold(attempts, Duration::saturating_add)
    }

    fn validate(&self) -> AttestaResult<()> {
        if self.engine_timeout_ms == 0 {
            return Err(config_error("collector.engine_timeout_ms must be positive"));
        }
        if self.backoff_base_ms > self.backoff_max_ms {
            return Err(config_error(
                "collector.backoff_base_ms must not exceed collector.backoff_max_ms",
            ));
        }
        Ok(())
    }
}

// ── Pools ─────────────────────────────────────────────────────────────────────

/// Concurrent-call limits toward each engine, sized independently so a slow
/// engine cannot starve the others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub vision: usize,
    pub forensic: usize,
    pub logic: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            vision: 8,
            forensic: 8,
            logic: 8,
        }
    }
}

impl PoolConfig {
    pub fn size_for(&self, kind: SignalKind) -> usize {
        match kind {
            SignalKind::Vision => self.vision,
            SignalKind::Forensic => self.forensic,
            SignalKind::Logic => self.logic,
        }
    }

    fn validate(&self) -> AttestaResult<()> {
        for kind in SignalKind::ALL {
            if self.size_for(kind) == 0 {
                return Err(config_error(format!("pools.{kind} must be at least 1")));
            }
        }
        Ok(())
    }
}

// ── Aggregation ───────────────────────────────────────────────────────────────

/// Scoring policy for the confidence aggregator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    pub weights: SignalWeights,
    pub thresholds: Thresholds,
    pub penalty: PenaltyCurve,
}

impl AggregationConfig {
    pub fn validate(&self) -> AttestaResult<()> {
        self.weights.validate()?;
        self.thresholds.validate()?;
        self.penalty.validate()
    }
}

/// Relative weight of each signal. Renormalized over the signals actually
/// available, so the values need not sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalWeights {
    pub vision: f64,
    pub forensic: f64,
    pub logic: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            vision: 0.40,
            forensic: 0.35,
            logic: 0.25,
        }
    }
}

impl SignalWeights {
    pub fn weight_for(&self, kind: SignalKind) -> f64 {
        match kind {
            SignalKind::Vision => self.vision,
            SignalKind::Forensic => self.forensic,
            SignalKind::Logic => self.logic,
        }
    }

    fn validate(&self) -> AttestaResult<()> {
        for kind in SignalKind::ALL {
            let w = self.weight_for(kind);
            if !w.is_finite() || w <= 0.0 {
                return Err(config_error(format!(
                    "aggregation.weights.{kind} must be a positive finite number"
                )));
            }
        }
        Ok(())
    }
}

/// Routing bands: `>= verified` → VERIFIED, `>= review` → PENDING_HITL,
/// otherwise REJECTED.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub verified: f64,
    pub review: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            verified: 0.85,
            review: 0.60,
        }
    }
}

impl Thresholds {
    fn validate(&self) -> AttestaResult<()> {
        let in_unit = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
        if !in_unit(self.verified) || !in_unit(self.review) {
            return Err(config_error("aggregation.thresholds must lie in [0, 1]"));
        }
        if self.review >= self.verified {
            return Err(config_error(
                "aggregation.thresholds.review must be below aggregation.thresholds.verified",
            ));
        }
        Ok(())
    }
}

/// How the count of high-severity descriptors reduces the weighted score.
///
/// Every curve is non-increasing in the anomaly count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "curve", rename_all = "kebab-case")]
pub enum PenaltyCurve {
    /// Subtract `per_anomaly` for each high-severity descriptor.
    Linear { per_anomaly: f64 },
    /// Multiply by `retain` once per high-severity descriptor.
    Exponential { retain: f64 },
    /// Subtract `steps[n - 1]` for `n` descriptors; counts past the end of
    /// the table use its last entry.
    Stepped { steps: Vec<f64> },
}

impl Default for PenaltyCurve {
    fn default() -> Self {
        PenaltyCurve::Linear { per_anomaly: 0.05 }
    }
}

impl PenaltyCurve {
    fn validate(&self) -> AttestaResult<()> {
        match self {
            PenaltyCurve::Linear { per_anomaly } => {
                if !per_anomaly.is_finite() || *per_anomaly < 0.0 {
                    return Err(config_error(
                        "aggregation.penalty.per_anomaly must be a non-negative finite number",
                    ));
                }
            }
            PenaltyCurve::Exponential { retain } => {
                if !retain.is_finite() || !(0.0..=1.0).contains(retain) {
                    return Err(config_error("aggregation.penalty.retain must lie in [0, 1]"));
                }
            }
            PenaltyCurve::Stepped { steps } => {
                if steps.iter().any(|s| !s.is_finite() || *s < 0.0) {
                    return Err(config_error(
                        "aggregation.penalty.steps must be non-negative finite numbers",
                    ));
                }
                if steps.windows(2).any(|w| w[1] < w[0]) {
                    return Err(config_error("aggregation.penalty.steps must be non-decreasing"));
                }
            }
        }
        Ok(())
    }
}

// ── Review ────────────────────────────────────────────────────────────────────

/// Human-review case policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Cases older than this auto-resolve to REJECTED. `None` disables expiry.
    pub case_ttl_secs: Option<u64>,
    /// How often the background sweeper looks for overdue cases.
    pub sweep_interval_secs: u64,
    /// Resolved cases older than this are dropped by the sweep.
    pub resolved_retention_secs: u64,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            case_ttl_secs: Some(72 * 3600),
            sweep_interval_secs: 60,
            resolved_retention_secs: 7 * 24 * 3600,
        }
    }
}

impl ReviewConfig {
    pub fn case_ttl(&self) -> Option<chrono::Duration> {
        self.case_ttl_secs
            .map(|secs| chrono::Duration::seconds(secs.min(MAX_TTL_SECS) as i64))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn resolved_retention(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.resolved_retention_secs.min(MAX_TTL_SECS) as i64)
    }

    fn validate(&self) -> AttestaResult<()> {
        if self.case_ttl_secs == Some(0) {
            return Err(config_error("review.case_ttl_secs must be positive when set"));
        }
        if self.sweep_interval_secs == 0 {
            return Err(config_error("review.sweep_interval_secs must be positive"));
        }
        if self.resolved_retention_secs == 0 {
            return Err(config_error("review.resolved_retention_secs must be positive"));
        }
        Ok(())
    }
}

// ── Proof ─────────────────────────────────────────────────────────────────────

/// Compliance proof token policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProofConfig {
    pub token_ttl_secs: u64,
}

impl Default for ProofConfig {
    fn default() -> Self {
        Self { token_ttl_secs: 24 * 3600 }
    }
}

impl ProofConfig {
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.token_ttl_secs.min(MAX_TTL_SECS) as i64)
    }

    fn validate(&self) -> AttestaResult<()> {
        if self.token_ttl_secs == 0 {
            return Err(config_error("proof.token_ttl_secs must be positive"));
        }
        Ok(())
    }
}

// ── Request ───────────────────────────────────────────────────────────────────

/// Ingress limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestLimits {
    pub max_payload_bytes: usize,
    /// Overall budget for one request's automated pipeline. `None` disables it.
    pub deadline_ms: Option<u64>,
    /// Terminal outcomes are kept this long for repeated lookups and
    /// resolutions, then dropped by the sweep.
    pub outcome_retention_secs: u64,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_payload_bytes: 20 * 1024 * 1024,
            deadline_ms: Some(45_000),
            outcome_retention_secs: 24 * 3600,
        }
    }
}

impl RequestLimits {
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }

    pub fn outcome_retention(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.outcome_retention_secs.min(MAX_TTL_SECS) as i64)
    }

    fn validate(&self) -> AttestaResult<()> {
        if self.max_payload_bytes == 0 {
            return Err(config_error("request.max_payload_bytes must be positive"));
        }
        if self.deadline_ms == Some(0) {
            return Err(config_error("request.deadline_ms must be positive when set"));
        }
        if self.outcome_retention_secs == 0 {
            return Err(config_error("request.outcome_retention_secs must be positive"));
        }
        Ok(())
    }
}
