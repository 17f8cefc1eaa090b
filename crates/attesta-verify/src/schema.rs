//! JSON Schema documents for evidence-engine responses.
//!
//! Every engine answers with the same envelope:
//!
//! ```json
//! { "confidence": 0.93,
//!   "descriptors": [{ "field": "mrz", "reason": "checksum mismatch", "severity": "high" }],
//!   "extracted_fields": { "surname": "..." } }
//! ```
//!
//! `extracted_fields` is required from the vision engine and refused from
//! the others, so personal data can only enter through one door.

use serde_json::{json, Value};

use attesta_contracts::evidence::SignalKind;

/// Upper bound on descriptors accepted from one response.
pub const MAX_DESCRIPTORS: usize = 256;

fn descriptor_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "field": { "type": "string", "minLength": 1, "maxLength": 128 },
            "reason": { "type": "string", "minLength": 1, "maxLength": 512 },
            "severity": { "enum": ["low", "medium", "high"] }
        },
        "required": ["field", "reason", "severity"],
        "additionalProperties": false
    })
}

/// The response schema for `kind`.
pub fn response_schema(kind: SignalKind) -> Value {
    let mut properties = json!({
        "confidence": { "type": "number", "minimum": 0.0, "maximum": 1.0 },
        "descriptors": {
            "type": "array",
            "items": descriptor_schema(),
            "maxItems": MAX_DESCRIPTORS
        }
    });
    let mut required = vec!["confidence", "descriptors"];

    if kind == SignalKind::Vision {
        properties["extracted_fields"] = json!({
            "type": "object",
            "additionalProperties": { "type": "string" }
        });
        required.push("extracted_fields");
    }

    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": format!("{kind} engine response"),
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}
