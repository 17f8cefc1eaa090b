//! Ingress types: what a caller submits and the immutable request the
//! orchestrator builds from it.
//!
//! The document bytes and the claim values are personal data. Both zeroize
//! on drop, and neither appears in `Debug` output.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
    config::RequestLimits,
    error::{AttestaError, AttestaResult},
};

/// Opaque, process-unique identifier for one verification request.
///
/// Produced by a `RequestIdGenerator`; the orchestrator never builds one
/// itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The declared type of the captured document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentType {
    Passport,
    DriverLicense,
    NationalId,
    ResidencePermit,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Passport => "passport",
            DocumentType::DriverLicense => "driver-license",
            DocumentType::NationalId => "national-id",
            DocumentType::ResidencePermit => "residence-permit",
        }
    }
}

/// Raw captured document bytes plus their declared type.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DocumentPayload {
    #[zeroize(skip)]
    doc_type: DocumentType,
    bytes: Vec<u8>,
}

impl DocumentPayload {
    pub fn new(doc_type: DocumentType, bytes: Vec<u8>) -> Self {
        Self { doc_type, bytes }
    }

    pub fn doc_type(&self) -> DocumentType {
        self.doc_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for DocumentPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentPayload")
            .field("doc_type", &self.doc_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Caller-supplied claims about the document holder (claim name → value).
///
/// Values are zeroized on drop; `Debug` prints claim names only.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextClaims(BTreeMap<String, String>);

impl ContextClaims {
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

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ContextClaims {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl Drop for ContextClaims {
    fn drop(&mut self) {
        for value in self.0.values_mut() {
            value.zeroize();
        }
    }
}

impl fmt::Debug for ContextClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextClaims")
            .field("names", &self.0.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Capture-device attestation material delivered alongside the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureMetadata {
    /// Identifier of the capture device.
    pub device_id: String,
    /// Hex-encoded hardware signature over the capture.
    pub device_signature: String,
    /// Descriptor of the passive-liveness stream recorded with the capture.
    pub liveness_stream: String,
    /// When the capture was taken (device clock).
    pub captured_at: DateTime<Utc>,
}

/// Everything a caller hands to the orchestrator for one verification.
#[derive(Debug, Clone)]
pub struct VerificationSubmission {
    pub payload: DocumentPayload,
    pub claims: ContextClaims,
    pub capture: CaptureMetadata,
}

impl VerificationSubmission {
    /// Reject structurally malformed submissions before anything is acquired.
    ///
    /// Error messages name the offending part, never its contents.
    pub fn validate(&self, limits: &RequestLimits) -> AttestaResult<()> {
        if self.payload.is_empty() {
            return Err(AttestaError::Validation {
                reason: "document payload is empty".to_string(),
            });
        }
        if self.payload.len() > limits.max_payload_bytes {
            return Err(AttestaError::Validation {
                reason: format!(
                    "document payload is {} bytes; limit is {}",
                    self.payload.len(),
                    limits.max_payload_bytes
                ),
            });
        }
        if self.capture.device_id.trim().is_empty() {
            return Err(AttestaError::Validation {
                reason: "capture metadata is missing a device id".to_string(),
            });
        }
        if self.capture.device_signature.trim().is_empty() {
            return Err(AttestaError::Validation {
                reason: "capture metadata is missing a device signature".to_string(),
            });
        }
        if self.capture.liveness_stream.trim().is_empty() {
            return Err(AttestaError::Validation {
                reason: "capture metadata is missing a liveness stream descriptor".to_string(),
            });
        }
        if self.claims.names().any(|name| name.trim().is_empty()) {
            return Err(AttestaError::Validation {
                reason: "context claims contain an entry with an empty name".to_string(),
            });
        }
        Ok(())
    }
}

/// The immutable request the orchestrator owns for a request's lifetime.
///
/// Built once at ingress from a validated submission. There are no setters.
#[derive(Debug)]
pub struct VerificationRequest {
    id: RequestId,
    payload: DocumentPayload,
    claims: ContextClaims,
    capture: CaptureMetadata,
    received_at: DateTime<Utc>,
}

impl VerificationRequest {
    pub fn new(id: RequestId, submission: VerificationSubmission, received_at: DateTime<Utc>) -> Self {
        let VerificationSubmission { payload, claims, capture } = submission;
        Self {
            id,
            payload,
            claims,
            capture,
            received_at,
        }
    }

    pub fn id(&self) -> &RequestId {
        &self.id
    }

    pub fn payload(&self) -> &DocumentPayload {
        &self.payload
    }

    pub fn claims(&self) -> &ContextClaims {
        &self.claims
    }

    pub fn capture(&self) -> &CaptureMetadata {
        &self.capture
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }
}
