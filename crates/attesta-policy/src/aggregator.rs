//! Weighted, renormalizing confidence aggregation.
//!
//! `WeightedAggregator` implements the `ConfidenceAggregator` trait from
//! attesta-core.
//!
//! Aggregation algorithm:
//!
//! 1. Screen every available signal. A reading whose confidence is not a
//!    finite number in [0, 1] is excluded, never clamped.
//! 2. Sum `weight * confidence` over the usable signals and divide by the sum
//!    of their weights. Missing signals contribute nothing, not zero.
//! 3. Apply the penalty curve to the count of high-severity descriptors and
//!    clamp the result to [0, 1].
//! 4. Map the score to a band. A score within `TIE_EPSILON` of a threshold
//!    takes the lower band.
//! 5. No usable signal at all → confidence 0, REJECTED, `NoEvidence`.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use attesta_contracts::{
    config::{AggregationConfig, PenaltyCurve, Thresholds},
    decision::{AggregatedDecision, DecisionFlag, DecisionStatus, EvidenceSet, SignalSlot},
    error::{AttestaError, AttestaResult},
    evidence::SignalKind,
    request::RequestId,
};
use attesta_core::traits::ConfidenceAggregator;

/// Scores within this distance of a threshold are treated as ties.
pub const TIE_EPSILON: f64 = 1e-9;

/// A `ConfidenceAggregator` driven by an `AggregationConfig`.
///
/// ```rust,ignore
/// use attesta_policy::WeightedAggregator;
///
/// let aggregator = WeightedAggregator::new(config.aggregation.clone())?;
/// ```
#[derive(Debug, Clone)]
pub struct WeightedAggregator {
    config: AggregationConfig,
}

impl WeightedAggregator {
    /// Build an aggregator after validating `config`.
    ///
    /// Returns `AttestaError::Configuration` for non-positive weights,
    /// misordered thresholds, or a non-monotone penalty curve.
    pub fn new(config: AggregationConfig) -> AttestaResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    /// Replace an available slot whose confidence is unusable with an
    /// excluded one.
    fn screen(&self, request_id: &RequestId, kind: SignalKind, slot: &SignalSlot) -> SignalSlot {
        match slot {
            SignalSlot::Available { reading } if !is_unit(reading.confidence) => {
                let err = AttestaError::AggregationInput {
                    signal: kind,
                    reason: format!("confidence {} outside [0, 1]", reading.confidence),
                };
                warn!(request_id = %request_id, signal = %kind, error = %err, "signal excluded");
                SignalSlot::excluded(err.to_string())
            }
            other => other.clone(),
        }
    }
}

impl Default for WeightedAggregator {
    fn default() -> Self {
        Self {
            config: AggregationConfig::default(),
        }
    }
}

impl ConfidenceAggregator for WeightedAggregator {
    fn aggregate(
        &self,
        request_id: &RequestId,
        evidence: &EvidenceSet,
        computed_at: DateTime<Utc>,
    ) -> AggregatedDecision {
        let vision = self.screen(request_id, SignalKind::Vision, &evidence.vision);
        let forensic = self.screen(request_id, SignalKind::Forensic, &evidence.forensic);
        let logic = self.screen(request_id, SignalKind::Logic, &evidence.logic);

        let mut flags = Vec::new();
        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        let mut high_severity_count = 0u32;

        for (kind, slot) in [
            (SignalKind::Vision, &vision),
            (SignalKind::Forensic, &forensic),
            (SignalKind::Logic, &logic),
        ] {
            match slot {
                SignalSlot::Available { reading } => {
                    let weight = self.config.weights.weight_for(kind);
                    weighted_sum += weight * reading.confidence;
                    weight_total += weight;
                    high_severity_count += reading.high_severity_count();
                }
                SignalSlot::Unavailable { .. } => flags.push(DecisionFlag::SignalUnavailable(kind)),
                SignalSlot::Excluded { .. } => flags.push(DecisionFlag::SignalExcluded(kind)),
            }
        }
        if !logic.is_available() {
            flags.push(DecisionFlag::ReducedConfidence);
        }

        let (confidence, status) = if weight_total > 0.0 {
            let base = weighted_sum / weight_total;
            let confidence = penalize(&self.config.penalty, base, high_severity_count).clamp(0.0, 1.0);
            (confidence, band(&self.config.thresholds, confidence))
        } else {
            warn!(request_id = %request_id, "no usable signal, rejecting");
            flags.push(DecisionFlag::NoEvidence);
            (0.0, DecisionStatus::Rejected)
        };

        debug!(
            request_id = %request_id,
            confidence,
            status = status.as_str(),
            high_severity = high_severity_count,
            "aggregation complete"
        );

        AggregatedDecision {
            request_id: request_id.clone(),
            confidence,
            status,
            vision,
            forensic,
            logic,
            flags,
            high_severity_count,
            computed_at,
        }
    }
}

fn is_unit(v: f64) -> bool {
    v.is_finite() && (0.0..=1.0).contains(&v)
}

/// Apply `curve` to `score` for `high` high-severity descriptors.
pub fn penalize(curve: &PenaltyCurve, score: f64, high: u32) -> f64 {
    if high == 0 {
        return score;
    }
    match curve {
        PenaltyCurve::Linear { per_anomaly } => score - per_anomaly * f64::from(high),
        PenaltyCurve::Exponential { retain } => score * retain.powi(high.min(i32::MAX as u32) as i32),
        PenaltyCurve::Stepped { steps } => {
            let idx = (high as usize).min(steps.len());
            match idx.checked_sub(1).and_then(|i| steps.get(i)) {
                Some(step) => score - step,
                None => score,
            }
        }
    }
}

/// Map a clamped confidence to its routing band.
pub fn band(thresholds: &Thresholds, confidence: f64) -> DecisionStatus {
    if confidence - thresholds.verified > TIE_EPSILON {
        DecisionStatus::Verified
    } else if confidence - thresholds.review > TIE_EPSILON {
        DecisionStatus::PendingHitl
    } else {
        DecisionStatus::Rejected
    }
}
