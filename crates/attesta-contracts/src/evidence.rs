//! Typed results produced by the attestation gate and the evidence engines.
//!
//! The orchestrator never inspects engine internals; it only consumes these
//! shapes. `ExtractedFields` is the one place engine output carries personal
//! data, and it never leaves the request context.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// Which evidence engine a signal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Vision,
    Forensic,
    Logic,
}

impl SignalKind {
    pub const ALL: [SignalKind; 3] = [SignalKind::Vision, SignalKind::Forensic, SignalKind::Logic];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Vision => "vision",
            SignalKind::Forensic => "forensic",
            SignalKind::Logic => "logic",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How serious a detected anomaly or discrepancy is.
///
/// Only `High` descriptors feed the aggregation penalty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A structured record describing one detected anomaly, editing trace, or
/// logical discrepancy.
///
/// `field` names the document field concerned; `reason` describes the
/// finding. Neither should carry the field's value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    pub field: String,
    pub reason: String,
    pub severity: Severity,
}

impl Descriptor {
    pub fn new(field: impl Into<String>, reason: impl Into<String>, severity: Severity) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
            severity,
        }
    }

    pub fn is_high(&self) -> bool {
        self.severity == Severity::High
    }
}

/// Structured fields the vision engine read off the document.
///
/// Values are zeroized on drop; `Debug` prints field names only.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedFields(BTreeMap<String, String>);

impl ExtractedFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ExtractedFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl Drop for ExtractedFields {
    fn drop(&mut self) {
        for value in self.0.values_mut() {
            value.zeroize();
        }
    }
}

impl fmt::Debug for ExtractedFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractedFields")
            .field("names", &self.0.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Outcome of the hardware-signature check on the capture device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationResult {
    pub passed: bool,
    pub device_id: String,
    /// Signature scheme the device used (e.g. "ecdsa-p256").
    pub signature_scheme: String,
    /// Why the check failed, when it did.
    pub detail: Option<String>,
}

/// Outcome of the passive-liveness check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessResult {
    pub passed: bool,
    /// A non-fatal quality signal, e.g. "glare detected".
    pub warning: Option<String>,
}

/// What the vision engine reports for a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionResult {
    pub confidence: f64,
    pub anomalies: Vec<Descriptor>,
    pub extracted_fields: ExtractedFields,
}

/// What the forensic engine reports for a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForensicResult {
    pub confidence: f64,
    pub editing_traces: Vec<Descriptor>,
}

/// What the logic engine reports for extracted fields checked against the
/// caller's context claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicResult {
    pub confidence: f64,
    pub discrepancies: Vec<Descriptor>,
}

/// The PII-free part of any engine result: a confidence and its descriptors.
///
/// This is what aggregation consumes and what decisions, audit records, and
/// reviewer views retain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalReading {
    pub confidence: f64,
    pub descriptors: Vec<Descriptor>,
}

impl SignalReading {
    pub fn new(confidence: f64, descriptors: Vec<Descriptor>) -> Self {
        Self { confidence, descriptors }
    }

    pub fn high_severity_count(&self) -> u32 {
        self.descriptors.iter().filter(|d| d.is_high()).count() as u32
    }
}

impl From<&VisionResult> for SignalReading {
    fn from(result: &VisionResult) -> Self {
        Self::new(result.confidence, result.anomalies.clone())
    }
}

impl From<&ForensicResult> for SignalReading {
    fn from(result: &ForensicResult) -> Self {
        Self::new(result.confidence, result.editing_traces.clone())
    }
}

impl From<&LogicResult> for SignalReading {
    fn from(result: &LogicResult) -> Self {
        Self::new(result.confidence, result.discrepancies.clone())
    }
}
