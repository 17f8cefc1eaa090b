//! Compliance proof token and verification report.
//!
//! A token asserts a verification outcome and nothing else: no document
//! bytes, no claims, no extracted fields, not even the raw request id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decision::DecisionStatus;

/// An opaque, request-bound, expiring credential asserting a final status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceProofToken {
    pub token_id: String,
    /// Keyed digest of the request id; binds the token without revealing it.
    pub request_binding: String,
    /// Always `Verified` for issued tokens.
    pub status: DecisionStatus,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Hex-encoded MAC over every field above.
    pub signature: String,
}

/// What a proof consumer learns from `verify(token)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofVerification {
    pub valid: bool,
    /// The asserted status, present only when `valid`.
    pub status: Option<DecisionStatus>,
    /// Why verification failed, when it did.
    pub reason: Option<String>,
}

impl ProofVerification {
    pub fn valid(status: DecisionStatus) -> Self {
        Self {
            valid: true,
            status: Some(status),
            reason: None,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            status: None,
            reason: Some(reason.into()),
        }
    }
}
