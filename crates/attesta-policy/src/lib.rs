//! # attesta-policy
//!
//! Confidence aggregation and configuration loading for the ATTESTA runtime.
//!
//! ## Overview
//!
//! This crate provides [`WeightedAggregator`], which implements the
//! [`ConfidenceAggregator`](attesta_core::traits::ConfidenceAggregator)
//! trait. Signal weights, routing thresholds, and the anomaly penalty curve
//! come from the `[aggregation]` section of an `OrchestratorConfig`, which
//! [`config::load_config_file`] reads from TOML.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use attesta_policy::{config::load_config_file, WeightedAggregator};
//!
//! let config = load_config_file(Path::new("config/attesta.toml"))?;
//! let aggregator = WeightedAggregator::new(config.aggregation.clone())?;
//! // Pass `aggregator` to `Orchestrator::builder(config).aggregator(...)`.
//! ```
//!
//! ## Partial evidence
//!
//! Weights renormalize over the signals actually present. A missing signal
//! is flagged on the decision and never stands in as a zero score.

pub mod aggregator;
pub mod config;

pub use aggregator::{band, penalize, WeightedAggregator, TIE_EPSILON};
pub use config::{load_config_file, load_config_str};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use attesta_contracts::{
        config::{AggregationConfig, PenaltyCurve},
        decision::{DecisionFlag, DecisionStatus, EvidenceSet, SignalSlot},
        error::AttestaError,
        evidence::{Descriptor, Severity, SignalKind, SignalReading},
        request::RequestId,
    };
    use attesta_core::traits::ConfidenceAggregator;

    use crate::{load_config_str, WeightedAggregator};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn reading(confidence: f64, high: usize) -> SignalSlot {
        let descriptors = (0..high)
            .map(|i| Descriptor::new(format!("field-{i}"), "tampering", Severity::High))
            .collect();
        SignalSlot::available(SignalReading::new(confidence, descriptors))
    }

    fn evidence(vision: SignalSlot, forensic: SignalSlot, logic: SignalSlot) -> EvidenceSet {
        EvidenceSet { vision, forensic, logic }
    }

    fn aggregate(aggregator: &WeightedAggregator, evidence: &EvidenceSet) -> attesta_contracts::decision::AggregatedDecision {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        aggregator.aggregate(&RequestId("req-000001".to_string()), evidence, at)
    }

    // ── 1. full evidence ──────────────────────────────────────────────────────

    /// Strong signals across the board verify.
    #[test]
    fn test_high_confidence_verifies() {
        let decision = aggregate(
            &WeightedAggregator::default(),
            &evidence(reading(0.95, 0), reading(0.92, 0), reading(0.97, 0)),
        );

        assert_eq!(decision.status, DecisionStatus::Verified);
        assert!(decision.confidence >= 0.85);
        assert!(decision.flags.is_empty());
    }

    // ── 2. borderline with an anomaly ─────────────────────────────────────────

    /// 0.40·0.70 + 0.35·0.65 + 0.25·0.72 = 0.6875, minus 0.05 for one
    /// high-severity anomaly, lands in the review band.
    #[test]
    fn test_borderline_with_anomaly_goes_to_review() {
        let decision = aggregate(
            &WeightedAggregator::default(),
            &evidence(reading(0.70, 1), reading(0.65, 0), reading(0.72, 0)),
        );

        assert_eq!(decision.status, DecisionStatus::PendingHitl);
        assert!((decision.confidence - 0.6375).abs() < 1e-9);
        assert_eq!(decision.high_severity_count, 1);
    }

    // ── 3. renormalization ────────────────────────────────────────────────────

    /// A missing forensic signal is left out of the denominator rather than
    /// counted as zero.
    #[test]
    fn test_missing_signal_renormalizes() {
        let decision = aggregate(
            &WeightedAggregator::default(),
            &evidence(reading(0.90, 0), SignalSlot::unavailable("timed out"), reading(0.90, 0)),
        );

        assert!((decision.confidence - 0.90).abs() < 1e-9);
        assert_eq!(decision.status, DecisionStatus::Verified);
        assert!(decision.has_flag(DecisionFlag::SignalUnavailable(SignalKind::Forensic)));
        assert!(!decision.has_flag(DecisionFlag::ReducedConfidence));
    }

    // ── 4. reduced confidence ─────────────────────────────────────────────────

    /// A missing logic signal marks the decision as resting on fewer checks.
    #[test]
    fn test_missing_logic_flags_reduced_confidence() {
        let decision = aggregate(
            &WeightedAggregator::default(),
            &evidence(reading(0.9, 0), reading(0.9, 0), SignalSlot::unavailable("skipped")),
        );

        assert!(decision.has_flag(DecisionFlag::SignalUnavailable(SignalKind::Logic)));
        assert!(decision.has_flag(DecisionFlag::ReducedConfidence));
    }

    // ── 5. out-of-range input ─────────────────────────────────────────────────

    /// A NaN or out-of-range confidence is excluded, never clamped.
    #[test]
    fn test_invalid_confidence_is_excluded() {
        let decision = aggregate(
            &WeightedAggregator::default(),
            &evidence(reading(f64::NAN, 0), reading(1.7, 0), reading(0.9, 0)),
        );

        assert!(decision.has_flag(DecisionFlag::SignalExcluded(SignalKind::Vision)));
        assert!(decision.has_flag(DecisionFlag::SignalExcluded(SignalKind::Forensic)));
        assert!(matches!(decision.vision, SignalSlot::Excluded { .. }));
        assert!((decision.confidence - 0.9).abs() < 1e-9);
    }

    // ── 6. no evidence ────────────────────────────────────────────────────────

    /// Nothing usable means confidence zero and rejection.
    #[test]
    fn test_no_usable_signal_rejects() {
        let decision = aggregate(
            &WeightedAggregator::default(),
            &evidence(
                SignalSlot::unavailable("down"),
                SignalSlot::excluded("malformed"),
                SignalSlot::unavailable("skipped"),
            ),
        );

        assert_eq!(decision.confidence, 0.0);
        assert_eq!(decision.status, DecisionStatus::Rejected);
        assert!(decision.has_flag(DecisionFlag::NoEvidence));
    }

    // ── 7. threshold ties ─────────────────────────────────────────────────────

    /// A score sitting on a threshold takes the lower band.
    #[test]
    fn test_threshold_tie_resolves_lower() {
        let aggregator = WeightedAggregator::default();

        let on_verified = aggregate(&aggregator, &evidence(reading(0.85, 0), reading(0.85, 0), reading(0.85, 0)));
        assert_eq!(on_verified.status, DecisionStatus::PendingHitl);

        let on_review = aggregate(&aggregator, &evidence(reading(0.60, 0), reading(0.60, 0), reading(0.60, 0)));
        assert_eq!(on_review.status, DecisionStatus::Rejected);
    }

    // ── 8. penalty curves ─────────────────────────────────────────────────────

    /// Each curve is applied as configured and the result is clamped.
    #[test]
    fn test_penalty_curves() {
        let set = evidence(reading(0.9, 2), reading(0.9, 0), reading(0.9, 0));

        let exponential = WeightedAggregator::new(AggregationConfig {
            penalty: PenaltyCurve::Exponential { retain: 0.5 },
            ..AggregationConfig::default()
        })
        .unwrap();
        assert!((aggregate(&exponential, &set).confidence - 0.225).abs() < 1e-9);

        let stepped = WeightedAggregator::new(AggregationConfig {
            penalty: PenaltyCurve::Stepped { steps: vec![0.1, 0.3] },
            ..AggregationConfig::default()
        })
        .unwrap();
        assert!((aggregate(&stepped, &set).confidence - 0.6).abs() < 1e-9);

        let harsh = WeightedAggregator::new(AggregationConfig {
            penalty: PenaltyCurve::Linear { per_anomaly: 0.8 },
            ..AggregationConfig::default()
        })
        .unwrap();
        assert_eq!(aggregate(&harsh, &set).confidence, 0.0);
    }

    // ── 9. determinism ────────────────────────────────────────────────────────

    /// Identical inputs, timestamp included, give identical decisions.
    #[test]
    fn test_aggregation_is_deterministic() {
        let aggregator = WeightedAggregator::default();
        let set = evidence(reading(0.7, 1), SignalSlot::unavailable("down"), reading(0.8, 0));
        assert_eq!(aggregate(&aggregator, &set), aggregate(&aggregator, &set));
    }

    // ── 10. configuration ─────────────────────────────────────────────────────

    /// An empty document yields the defaults.
    #[test]
    fn test_empty_config_uses_defaults() {
        let config = load_config_str("").unwrap();
        assert_eq!(config, attesta_contracts::config::OrchestratorConfig::default());
    }

    /// Sections override only the fields they name.
    #[test]
    fn test_config_sections_override_defaults() {
        let toml = r#"
            [collector]
            engine_timeout_ms = 1500
            retry_budget = 1

            [aggregation.thresholds]
            verified = 0.9
            review = 0.5

            [aggregation.penalty]
            curve = "stepped"
            steps = [0.05, 0.15, 0.4]

            [review]
            case_ttl_secs = 3600
        "#;

        let config = load_config_str(toml).unwrap();

        assert_eq!(config.collector.engine_timeout_ms, 1500);
        assert_eq!(config.collector.retry_budget, 1);
        assert_eq!(config.collector.backoff_base_ms, 200);
        assert_eq!(config.aggregation.thresholds.verified, 0.9);
        assert_eq!(
            config.aggregation.penalty,
            PenaltyCurve::Stepped { steps: vec![0.05, 0.15, 0.4] }
        );
        assert_eq!(config.review.case_ttl_secs, Some(3600));
        assert_eq!(config.pools.vision, 8);
    }

    /// Misordered thresholds are refused at load.
    #[test]
    fn test_invalid_thresholds_rejected() {
        let toml = r#"
            [aggregation.thresholds]
            verified = 0.5
            review = 0.7
        "#;

        match load_config_str(toml) {
            Err(AttestaError::Configuration { reason }) => {
                assert!(reason.contains("thresholds"), "unexpected reason: {reason}");
            }
            other => panic!("expected Configuration, got {:?}", other),
        }
    }

    /// Malformed TOML must produce a `Configuration` error.
    #[test]
    fn test_toml_parse_error() {
        match load_config_str("this is not valid toml ][[[") {
            Err(AttestaError::Configuration { reason }) => {
                assert!(reason.contains("failed to parse orchestrator TOML"), "got: {reason}");
            }
            other => panic!("expected Configuration, got {:?}", other),
        }
    }

    /// A zero weight cannot be renormalized and is refused.
    #[test]
    fn test_zero_weight_refused_by_aggregator() {
        let result = WeightedAggregator::new(AggregationConfig {
            weights: attesta_contracts::config::SignalWeights {
                vision: 0.0,
                ..Default::default()
            },
            ..AggregationConfig::default()
        });
        assert!(matches!(result, Err(AttestaError::Configuration { .. })));
    }

    /// A missing file is a configuration error, not a panic.
    #[test]
    fn test_missing_config_file() {
        let result = crate::load_config_file(std::path::Path::new("/nonexistent/attesta.toml"));
        assert!(matches!(result, Err(AttestaError::Configuration { .. })));
    }
}
