//! Aggregation inputs and the decision they produce.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    evidence::{Descriptor, Severity, SignalKind, SignalReading},
    request::RequestId,
};

/// Routing band assigned by the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionStatus {
    Verified,
    PendingHitl,
    Rejected,
}

impl DecisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionStatus::Verified => "VERIFIED",
            DecisionStatus::PendingHitl => "PENDING_HITL",
            DecisionStatus::Rejected => "REJECTED",
        }
    }
}

/// One signal's contribution to a decision.
///
/// `Unavailable` means the engine never produced a result (retries exhausted,
/// skipped). `Excluded` means it produced one that could not be trusted
/// (out of range, unparsable). Neither is ever replaced by a default score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SignalSlot {
    Available { reading: SignalReading },
    Unavailable { reason: String },
    Excluded { reason: String },
}

impl SignalSlot {
    pub fn available(reading: SignalReading) -> Self {
        SignalSlot::Available { reading }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        SignalSlot::Unavailable { reason: reason.into() }
    }

    pub fn excluded(reason: impl Into<String>) -> Self {
        SignalSlot::Excluded { reason: reason.into() }
    }

    pub fn reading(&self) -> Option<&SignalReading> {
        match self {
            SignalSlot::Available { reading } => Some(reading),
            _ => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, SignalSlot::Available { .. })
    }
}

/// The three signal slots handed to the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSet {
    pub vision: SignalSlot,
    pub forensic: SignalSlot,
    pub logic: SignalSlot,
}

impl EvidenceSet {
    pub fn slot(&self, kind: SignalKind) -> &SignalSlot {
        match kind {
            SignalKind::Vision => &self.vision,
            SignalKind::Forensic => &self.forensic,
            SignalKind::Logic => &self.logic,
        }
    }
}

/// Coverage and quality markers attached to a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "flag", content = "signal", rename_all = "snake_case")]
pub enum DecisionFlag {
    /// The engine produced no result; the signal was left out.
    SignalUnavailable(SignalKind),
    /// The engine produced a result that failed validation; it was left out.
    SignalExcluded(SignalKind),
    /// The logic signal is missing, so the decision rests on fewer checks.
    ReducedConfidence,
    /// No signal was usable at all.
    NoEvidence,
}

/// The aggregator's verdict for one request. Immutable once computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedDecision {
    pub request_id: RequestId,
    /// Final confidence in [0, 1].
    pub confidence: f64,
    pub status: DecisionStatus,
    pub vision: SignalSlot,
    pub forensic: SignalSlot,
    pub logic: SignalSlot,
    pub flags: Vec<DecisionFlag>,
    /// High-severity descriptors counted across all available signals.
    pub high_severity_count: u32,
    pub computed_at: DateTime<Utc>,
}

impl AggregatedDecision {
    pub fn has_flag(&self, flag: DecisionFlag) -> bool {
        self.flags.contains(&flag)
    }

    pub fn slot(&self, kind: SignalKind) -> &SignalSlot {
        match kind {
            SignalKind::Vision => &self.vision,
            SignalKind::Forensic => &self.forensic,
            SignalKind::Logic => &self.logic,
        }
    }

    /// The retained, PII-free view of this decision.
    pub fn summary(&self) -> DecisionSummary {
        let descriptors = SignalKind::ALL
            .iter()
            .filter_map(|kind| self.slot(*kind).reading().map(|r| (*kind, r)))
            .flat_map(|(kind, reading)| {
                reading.descriptors.iter().map(move |d| DescriptorSummary::from_descriptor(kind, d))
            })
            .collect();

        DecisionSummary {
            status: self.status,
            confidence: self.confidence,
            high_severity_count: self.high_severity_count,
            descriptors,
            flags: self.flags.clone(),
        }
    }
}

/// A descriptor tagged with the signal that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorSummary {
    pub source: SignalKind,
    pub field: String,
    pub reason: String,
    pub severity: Severity,
}

impl DescriptorSummary {
    fn from_descriptor(source: SignalKind, d: &Descriptor) -> Self {
        Self {
            source,
            field: d.field.clone(),
            reason: d.reason.clone(),
            severity: d.severity,
        }
    }
}

/// What survives the purge: status, confidence, descriptor summary, flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionSummary {
    pub status: DecisionStatus,
    pub confidence: f64,
    pub high_severity_count: u32,
    pub descriptors: Vec<DescriptorSummary>,
    pub flags: Vec<DecisionFlag>,
}
