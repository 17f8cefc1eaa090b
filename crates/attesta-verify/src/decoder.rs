//! Decoding of raw engine responses into typed results.
//!
//! `ResponseDecoder` checks a response in two phases:
//!
//! 1. **Structural**: the body is validated against the engine's JSON
//!    Schema (see `schema::response_schema`). All violations are collected.
//! 2. **Semantic**: rules the schema cannot express: the confidence must be
//!    finite and extracted-field names must be non-blank.
//!
//! Any failure makes the response `EngineError::Malformed`, which the
//! collector never retries and the aggregator excludes. Failure messages
//! name paths and rules only; response values are never echoed, since they
//! may be personal data.
//!
//! A descriptor that repeats an extracted value keeps its place in the
//! result with the value replaced by [`REDACTED`], so descriptor text never
//! carries PII into decision summaries or the audit trail.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use attesta_contracts::{
    error::{AttestaError, AttestaResult, EngineError},
    evidence::{Descriptor, ExtractedFields, ForensicResult, LogicResult, SignalKind, VisionResult},
};

use crate::schema::response_schema;

/// Values shorter than this are too common to redact when they reappear in
/// a descriptor.
const MIN_ECHO_LEN: usize = 4;

/// Stands in for an extracted value repeated in descriptor text.
pub const REDACTED: &str = "<redacted>";

/// The wire envelope shared by all engines.
#[derive(Deserialize)]
struct Envelope {
    confidence: f64,
    descriptors: Vec<Descriptor>,
    #[serde(default)]
    extracted_fields: ExtractedFields,
}

/// Validates and decodes engine responses. Build once and share.
pub struct ResponseDecoder {
    vision: jsonschema::Validator,
    forensic: jsonschema::Validator,
    logic: jsonschema::Validator,
}

impl ResponseDecoder {
    /// Compile the response schemas.
    ///
    /// Returns `AttestaError::SchemaValidation` if a schema fails to compile.
    pub fn new() -> AttestaResult<Self> {
        Ok(Self {
            vision: compile(SignalKind::Vision)?,
            forensic: compile(SignalKind::Forensic)?,
            logic: compile(SignalKind::Logic)?,
        })
    }

    fn validator(&self, kind: SignalKind) -> &jsonschema::Validator {
        match kind {
            SignalKind::Vision => &self.vision,
            SignalKind::Forensic => &self.forensic,
            SignalKind::Logic => &self.logic,
        }
    }

    /// Run both phases against `body` and deserialize it.
    fn decode(&self, kind: SignalKind, body: Value) -> Result<Envelope, EngineError> {
        // ── Phase 1: JSON Schema structural validation ────────────────────────
        let mut failures: Vec<String> = self
            .validator(kind)
            .iter_errors(&body)
            .map(|error| format!("schema violation at '{}' (rule {})", error.instance_path, error.schema_path))
            .collect();
        if !failures.is_empty() {
            return Err(malformed(kind, failures));
        }

        let mut envelope: Envelope = serde_json::from_value(body)
            .map_err(|e| malformed(kind, vec![format!("undecodable response: {:?} error", e.classify())]))?;

        // ── Phase 2: Semantic rules ──────────────────────────────────────────
        if !envelope.confidence.is_finite() {
            failures.push("confidence is not a finite number".to_string());
        }
        if envelope.extracted_fields.names().any(|name| name.trim().is_empty()) {
            failures.push("extracted field with a blank name".to_string());
        }
        if !failures.is_empty() {
            return Err(malformed(kind, failures));
        }

        let redacted = redact_echoes(&mut envelope.descriptors, &envelope.extracted_fields);
        if redacted > 0 {
            warn!(engine = %kind, descriptors = redacted, "extracted values redacted from descriptors");
        }

        debug!(
            engine = %kind,
            confidence = envelope.confidence,
            descriptors = envelope.descriptors.len(),
            extracted = envelope.extracted_fields.len(),
            "engine response decoded"
        );
        Ok(envelope)
    }

    pub fn decode_vision(&self, body: Value) -> Result<VisionResult, EngineError> {
        let Envelope {
            confidence,
            descriptors,
            extracted_fields,
        } = self.decode(SignalKind::Vision, body)?;
        Ok(VisionResult {
            confidence,
            anomalies: descriptors,
            extracted_fields,
        })
    }

    pub fn decode_forensic(&self, body: Value) -> Result<ForensicResult, EngineError> {
        let envelope = self.decode(SignalKind::Forensic, body)?;
        Ok(ForensicResult {
            confidence: envelope.confidence,
            editing_traces: envelope.descriptors,
        })
    }

    pub fn decode_logic(&self, body: Value) -> Result<LogicResult, EngineError> {
        let envelope = self.decode(SignalKind::Logic, body)?;
        Ok(LogicResult {
            confidence: envelope.confidence,
            discrepancies: envelope.descriptors,
        })
    }
}

fn compile(kind: SignalKind) -> AttestaResult<jsonschema::Validator> {
    jsonschema::validator_for(&response_schema(kind)).map_err(|e| AttestaError::SchemaValidation {
        reason: format!("{kind} response schema does not compile: {e}"),
    })
}

/// Replace every extracted value found in descriptor text with
/// [`REDACTED`]. Returns how many descriptors changed.
fn redact_echoes(descriptors: &mut [Descriptor], fields: &ExtractedFields) -> usize {
    let mut values: Vec<&str> = fields
        .iter()
        .map(|(_, value)| value)
        .filter(|value| value.len() >= MIN_ECHO_LEN)
        .collect();
    if values.is_empty() {
        return 0;
    }
    // Longest first, so a value containing another is replaced whole.
    values.sort_by_key(|value| std::cmp::Reverse(value.len()));

    let mut changed = 0;
    for descriptor in descriptors.iter_mut() {
        let mut touched = false;
        for &value in &values {
            for text in [&mut descriptor.field, &mut descriptor.reason] {
                if text.contains(value) {
                    *text = text.replace(value, REDACTED);
                    touched = true;
                }
            }
        }
        if touched {
            changed += 1;
        }
    }
    changed
}

fn malformed(kind: SignalKind, failures: Vec<String>) -> EngineError {
    warn!(engine = %kind, failure_count = failures.len(), "engine response rejected");
    EngineError::Malformed {
        reason: failures.join("; "),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
