//! Audit entry and trail types.
//!
//! `AuditEntry` wraps one lifecycle `TransitionRecord` with its position in
//! the chain and the SHA-256 hashes that make tampering detectable.
//! `AuditTrail` is the exported snapshot of a whole chain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use attesta_contracts::{lifecycle::TransitionRecord, request::RequestId};

/// A single entry in the hash chain.
///
/// One chain interleaves the transitions of every request the writer
/// serves; `record.request_id` says which request an entry belongs to.
/// Modifying any field, including those of the embedded record, invalidates
/// `this_hash` and every later `prev_hash`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position in the chain, starting at 0.
    pub sequence: u64,

    /// The chain this entry belongs to.
    pub trail_id: String,

    /// The lifecycle transition. Carries no PII.
    pub record: TransitionRecord,

    /// Hash of the previous entry, or `GENESIS_HASH` for the first.
    pub prev_hash: String,

    /// Hash over (trail_id, sequence, prev_hash, canonical JSON of record).
    pub this_hash: String,
}

impl AuditEntry {
    /// The `prev_hash` of the first entry in every chain: 64 hex zeros.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}

/// Snapshot of a chain, produced by `InMemoryAuditWriter::export_trail`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditTrail {
    pub trail_id: String,

    /// Every entry in chain order.
    pub entries: Vec<AuditEntry>,

    /// Requests whose trail has been sealed by `finalize`.
    pub sealed: Vec<RequestId>,

    pub exported_at: DateTime<Utc>,

    /// `this_hash` of the last entry; empty if the chain is empty. A compact
    /// commitment to the whole trail.
    pub head_hash: String,
}
