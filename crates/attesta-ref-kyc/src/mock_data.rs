//! Fictional identity documents and engine replies.
//!
//! The holder "Alex Specimen" of Utopia (ICAO code UTO) does not exist.
//! Document bytes are placeholders; no image decoding happens anywhere in
//! the reference runtime.

use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

use attesta_contracts::request::{
    CaptureMetadata, ContextClaims, DocumentPayload, DocumentType, VerificationSubmission,
};

// ── Submissions ───────────────────────────────────────────────────────────────

/// Placeholder bytes standing in for a captured passport image.
pub fn specimen_passport_bytes() -> Vec<u8> {
    b"SPECIMEN-PASSPORT-UTO-P0000001".to_vec()
}

/// Claims a relying party asserts about the holder.
pub fn specimen_claims() -> ContextClaims {
    [
        ("surname", "SPECIMEN"),
        ("given_names", "ALEX"),
        ("date_of_birth", "1990-12-10"),
        ("nationality", "UTO"),
    ]
    .into_iter()
    .collect()
}

/// Capture metadata from an attested handset.
pub fn specimen_capture(device_id: &str) -> CaptureMetadata {
    CaptureMetadata {
        device_id: device_id.to_string(),
        device_signature: "3045022100c0ffee".to_string(),
        liveness_stream: format!("stream://{device_id}/selfie-0001"),
        captured_at: Utc.with_ymd_and_hms(2026, 2, 18, 10, 30, 0).single().unwrap_or_else(Utc::now),
    }
}

/// A complete passport submission from `device_id`.
pub fn passport_submission(device_id: &str) -> VerificationSubmission {
    VerificationSubmission {
        payload: DocumentPayload::new(DocumentType::Passport, specimen_passport_bytes()),
        claims: specimen_claims(),
        capture: specimen_capture(device_id),
    }
}

// ── Gate replies ──────────────────────────────────────────────────────────────

pub fn device_attested(device_id: &str) -> Value {
    json!({
        "passed": true,
        "device_id": device_id,
        "signature_scheme": "ecdsa-p256",
        "detail": null
    })
}

pub fn device_rejected(device_id: &str) -> Value {
    json!({
        "passed": false,
        "device_id": device_id,
        "signature_scheme": "ecdsa-p256",
        "detail": "capture signature does not chain to a trusted root"
    })
}

pub fn liveness_passed() -> Value {
    json!({ "passed": true, "warning": null })
}

// ── Engine replies ────────────────────────────────────────────────────────────

/// Fields the vision engine reads off the specimen passport.
fn specimen_fields() -> Value {
    json!({
        "surname": "SPECIMEN",
        "given_names": "ALEX",
        "document_number": "P0000001",
        "date_of_birth": "1990-12-10",
        "nationality": "UTO",
        "expiry_date": "2031-02-17"
    })
}

pub fn vision_clean(confidence: f64) -> Value {
    json!({
        "confidence": confidence,
        "descriptors": [],
        "extracted_fields": specimen_fields()
    })
}

/// A vision reply flagging a halo around the portrait.
pub fn vision_portrait_halo(confidence: f64) -> Value {
    json!({
        "confidence": confidence,
        "descriptors": [
            { "field": "portrait", "reason": "edge halo consistent with a pasted photo", "severity": "high" }
        ],
        "extracted_fields": specimen_fields()
    })
}

pub fn forensic_clean(confidence: f64) -> Value {
    json!({ "confidence": confidence, "descriptors": [] })
}

pub fn forensic_recompressed(confidence: f64) -> Value {
    json!({
        "confidence": confidence,
        "descriptors": [
            { "field": "mrz", "reason": "double JPEG compression in the machine-readable zone", "severity": "low" }
        ]
    })
}

pub fn logic_consistent(confidence: f64) -> Value {
    json!({ "confidence": confidence, "descriptors": [] })
}

pub fn logic_minor_gap(confidence: f64) -> Value {
    json!({
        "confidence": confidence,
        "descriptors": [
            { "field": "expiry_date", "reason": "validity period longer than the issuing rules allow", "severity": "medium" }
        ]
    })
}
