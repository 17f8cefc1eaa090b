//! Property tests for `WeightedAggregator`.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use attesta_contracts::{
    decision::{AggregatedDecision, DecisionStatus, EvidenceSet, SignalSlot},
    evidence::{Descriptor, Severity, SignalReading},
    request::RequestId,
};
use attesta_core::traits::ConfidenceAggregator;
use attesta_policy::WeightedAggregator;

fn slot(confidence: Option<f64>, high: usize) -> SignalSlot {
    match confidence {
        Some(c) => {
            let descriptors = (0..high)
                .map(|_| Descriptor::new("portrait", "splice", Severity::High))
                .collect();
            SignalSlot::available(SignalReading::new(c, descriptors))
        }
        None => SignalSlot::unavailable("no result"),
    }
}

fn run(v: Option<f64>, f: Option<f64>, l: Option<f64>, high: usize) -> AggregatedDecision {
    let evidence = EvidenceSet {
        vision: slot(v, high),
        forensic: slot(f, 0),
        logic: slot(l, 0),
    };
    let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    WeightedAggregator::default().aggregate(&RequestId("req-prop".to_string()), &evidence, at)
}

fn rank(status: DecisionStatus) -> u8 {
    match status {
        DecisionStatus::Rejected => 0,
        DecisionStatus::PendingHitl => 1,
        DecisionStatus::Verified => 2,
    }
}

proptest! {
    /// Any input, valid or not, yields a confidence in [0, 1].
    #[test]
    fn confidence_is_always_in_unit_interval(
        v in proptest::option::of(-2.0f64..3.0),
        f in proptest::option::of(-2.0f64..3.0),
        l in proptest::option::of(-2.0f64..3.0),
        high in 0usize..8,
    ) {
        let decision = run(v, f, l, high);
        prop_assert!(decision.confidence.is_finite());
        prop_assert!((0.0..=1.0).contains(&decision.confidence));
    }

    /// More high-severity anomalies never raise the score.
    #[test]
    fn anomalies_never_increase_confidence(
        v in 0.0f64..=1.0,
        f in 0.0f64..=1.0,
        l in 0.0f64..=1.0,
        high in 0usize..6,
    ) {
        let fewer = run(Some(v), Some(f), Some(l), high);
        let more = run(Some(v), Some(f), Some(l), high + 1);
        prop_assert!(more.confidence <= fewer.confidence);
        prop_assert!(rank(more.status) <= rank(fewer.status));
    }

    /// Raising one signal's confidence never lowers the score.
    #[test]
    fn aggregation_is_monotonic_in_confidence(
        v in 0.0f64..=1.0,
        bump in 0.0f64..=1.0,
        f in 0.0f64..=1.0,
        l in 0.0f64..=1.0,
    ) {
        let higher = (v + bump).min(1.0);
        let low = run(Some(v), Some(f), Some(l), 0);
        let high = run(Some(higher), Some(f), Some(l), 0);
        prop_assert!(high.confidence + 1e-12 >= low.confidence);
        prop_assert!(rank(high.status) >= rank(low.status));
    }

    /// Identical inputs give identical decisions.
    #[test]
    fn aggregation_is_deterministic(
        v in proptest::option::of(0.0f64..=1.0),
        f in proptest::option::of(0.0f64..=1.0),
        l in proptest::option::of(0.0f64..=1.0),
        high in 0usize..4,
    ) {
        prop_assert_eq!(run(v, f, l, high), run(v, f, l, high));
    }

    /// Renormalization: a single remaining signal scores as itself.
    #[test]
    fn lone_signal_scores_as_itself(c in 0.0f64..=1.0) {
        let decision = run(None, Some(c), None, 0);
        prop_assert!((decision.confidence - c).abs() < 1e-9);
    }
}
