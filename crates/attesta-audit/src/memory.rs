//! In-memory implementation of `AuditWriter`.
//!
//! `InMemoryAuditWriter` keeps one hash chain for every request it serves,
//! protected by a `Mutex` so the orchestrator can write from any task.
//!
//! Use `export_trail()` for a snapshot of the chain, `entries_for()` for one
//! request's transitions, and `verify_integrity()` at any time to confirm the
//! chain has not been tampered with in memory.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, info, warn};

use attesta_contracts::{
    error::{AttestaError, AttestaResult},
    lifecycle::TransitionRecord,
    request::RequestId,
};
use attesta_core::traits::AuditWriter;

use crate::{
    chain::{first_break, hash_entry},
    event::{AuditEntry, AuditTrail},
};

// ── Internal mutable state ────────────────────────────────────────────────────

pub(crate) struct InMemoryState {
    /// All entries written so far, in append order.
    pub(crate) entries: Vec<AuditEntry>,

    /// The next sequence number to assign.
    pub(crate) sequence: u64,

    /// `this_hash` of the last entry, or `GENESIS_HASH`.
    pub(crate) last_hash: String,

    /// Requests whose trail is sealed. Further writes for them are refused.
    pub(crate) sealed: BTreeSet<RequestId>,
}

// ── Public writer ─────────────────────────────────────────────────────────────

/// An in-memory, append-only audit writer backed by a SHA-256 hash chain.
///
/// Cheap to clone; clones append to the same chain.
#[derive(Clone)]
pub struct InMemoryAuditWriter {
    trail_id: String,
    pub(crate) state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryAuditWriter {
    pub fn new(trail_id: impl Into<String>) -> Self {
        let state = InMemoryState {
            entries: Vec::new(),
            sequence: 0,
            last_hash: AuditEntry::GENESIS_HASH.to_string(),
            sealed: BTreeSet::new(),
        };
        Self {
            trail_id: trail_id.into(),
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn trail_id(&self) -> &str {
        &self.trail_id
    }

    /// Snapshot the whole chain.
    pub fn export_trail(&self) -> AuditTrail {
        let state = self.state.lock().expect("audit state lock poisoned");
        let head_hash = state
            .entries
            .last()
            .map(|e| e.this_hash.clone())
            .unwrap_or_default();

        AuditTrail {
            trail_id: self.trail_id.clone(),
            entries: state.entries.clone(),
            sealed: state.sealed.iter().cloned().collect(),
            exported_at: Utc::now(),
            head_hash,
        }
    }

    /// The transitions recorded for one request, in order.
    pub fn entries_for(&self, request_id: &RequestId) -> Vec<AuditEntry> {
        let state = self.state.lock().expect("audit state lock poisoned");
        state
            .entries
            .iter()
            .filter(|e| &e.record.request_id == request_id)
            .cloned()
            .collect()
    }

    pub fn is_sealed(&self, request_id: &RequestId) -> bool {
        let state = self.state.lock().expect("audit state lock poisoned");
        state.sealed.contains(request_id)
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("audit state lock poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return true if the chain is intact.
    pub fn verify_integrity(&self) -> bool {
        let state = self.state.lock().expect("audit state lock poisoned");
        match first_break(&state.entries) {
            None => true,
            Some(sequence) => {
                warn!(trail_id = %self.trail_id, sequence, "audit chain broken");
                false
            }
        }
    }
}

// ── AuditWriter impl ──────────────────────────────────────────────────────────

impl AuditWriter for InMemoryAuditWriter {
    /// Append one transition record to the chain.
    ///
    /// Returns `Err(AuditWriteFailed)` if the request's trail is already
    /// sealed or the internal mutex is poisoned.
    fn write(&self, record: &TransitionRecord) -> AttestaResult<()> {
        let mut state = self.state.lock().map_err(|e| AttestaError::AuditWriteFailed {
            reason: format!("audit state lock poisoned: {}", e),
        })?;

        if state.sealed.contains(&record.request_id) {
            return Err(AttestaError::AuditWriteFailed {
                reason: format!("trail for request {} is sealed", record.request_id),
            });
        }

        let prev_hash = state.last_hash.clone();
        let sequence = state.sequence;
        let this_hash = hash_entry(&self.trail_id, sequence, record, &prev_hash)?;

        debug!(
            request_id = %record.request_id,
            sequence,
            to = %record.to,
            "audit entry appended"
        );

        state.entries.push(AuditEntry {
            sequence,
            trail_id: self.trail_id.clone(),
            record: record.clone(),
            prev_hash,
            this_hash: this_hash.clone(),
        });
        state.sequence += 1;
        state.last_hash = this_hash;

        Ok(())
    }

    /// Seal the trail for `request_id`. Sealing twice is harmless.
    fn finalize(&self, request_id: &RequestId) -> AttestaResult<()> {
        let mut state = self.state.lock().map_err(|e| AttestaError::AuditWriteFailed {
            reason: format!("audit state lock poisoned: {}", e),
        })?;

        let entry_count = state
            .entries
            .iter()
            .filter(|e| &e.record.request_id == request_id)
            .count();
        if state.sealed.insert(request_id.clone()) {
            info!(
                request_id = %request_id,
                entry_count,
                head_hash = %state.last_hash,
                "audit trail sealed"
            );
        }

        Ok(())
    }
}
