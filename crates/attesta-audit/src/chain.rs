//! Hash-chain primitives.
//!
//! Hash input layout (bytes, in order):
//!   1. trail_id as UTF-8 bytes
//!   2. sequence as 8-byte little-endian
//!   3. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   4. canonical JSON of the transition record

use sha2::{Digest, Sha256};

use attesta_contracts::{
    error::{AttestaError, AttestaResult},
    lifecycle::TransitionRecord,
};

use crate::event::AuditEntry;

/// Compute the SHA-256 hash of one entry as lowercase hex.
///
/// # Errors
///
/// `AuditWriteFailed` if the record cannot be serialized.
pub fn hash_entry(
    trail_id: &str,
    sequence: u64,
    record: &TransitionRecord,
    prev_hash: &str,
) -> AttestaResult<String> {
    let record_json = serde_json::to_vec(record).map_err(|e| AttestaError::AuditWriteFailed {
        reason: format!("transition record not serializable: {}", e),
    })?;

    let mut hasher = Sha256::new();
    hasher.update(trail_id.as_bytes());
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(&record_json);

    Ok(hex::encode(hasher.finalize()))
}

/// Return the sequence number of the first entry that breaks the chain.
///
/// An entry breaks the chain if its `prev_hash` is not the previous entry's
/// `this_hash` (or `GENESIS_HASH` for the first), its sequence is out of
/// place, or its stored hash differs from the recomputed one.
pub fn first_break(entries: &[AuditEntry]) -> Option<u64> {
    let mut expected_prev = AuditEntry::GENESIS_HASH;

    for (position, entry) in entries.iter().enumerate() {
        if entry.sequence != position as u64 || entry.prev_hash != expected_prev {
            return Some(entry.sequence);
        }
        match hash_entry(&entry.trail_id, entry.sequence, &entry.record, &entry.prev_hash) {
            Ok(recomputed) if recomputed == entry.this_hash => {}
            _ => return Some(entry.sequence),
        }
        expected_prev = entry.this_hash.as_str();
    }

    None
}

/// Return true if the chain is intact. An empty chain is intact.
pub fn verify_chain(entries: &[AuditEntry]) -> bool {
    first_break(entries).is_none()
}
