//! PII purge: deletion of raw payload and extracted fields once a request
//! is terminal.
//!
//! The purger runs exactly once per request, strictly after the terminal
//! state is set, on every exit path. A failure never blocks the response: it
//! is logged, handed to the `AlertSink`, and reported as
//! `PurgeStatus::Failed` in the outcome.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use attesta_contracts::{
    error::{AttestaError, AttestaResult},
    outcome::PurgeStatus,
    request::RequestId,
};

use crate::{
    context::RequestContext,
    traits::{AlertSink, PiiVault},
};

// ── Purger ────────────────────────────────────────────────────────────────────

struct PurgeRecord {
    status: PurgeStatus,
    at: DateTime<Utc>,
}

pub struct PiiPurger {
    vault: Arc<dyn PiiVault>,
    alerts: Arc<dyn AlertSink>,
    purged: Mutex<HashMap<RequestId, PurgeRecord>>,
}

impl PiiPurger {
    pub fn new(vault: Arc<dyn PiiVault>, alerts: Arc<dyn AlertSink>) -> Self {
        Self {
            vault,
            alerts,
            purged: Mutex::new(HashMap::new()),
        }
    }

    /// Destroy every piece of PII held for `request_id`.
    ///
    /// `context` is the in-flight context when the request never left the
    /// automated pipeline; it is dropped (and so zeroized) here. Anything the
    /// vault retained for review is purged as well.
    pub fn purge(&self, request_id: &RequestId, context: Option<RequestContext>) -> PurgeStatus {
        drop(context);

        let mut purged = self.purged.lock().expect("purge registry lock poisoned");
        if let Some(record) = purged.get(request_id) {
            warn!(request_id = %request_id, "purge already ran for request, skipping");
            return record.status.clone();
        }

        let status = match self.vault.purge(request_id) {
            Ok(held) => {
                info!(request_id = %request_id, vault_entry = held, "request PII purged");
                PurgeStatus::Completed
            }
            Err(e) => {
                let err = AttestaError::Purge {
                    request_id: request_id.to_string(),
                    reason: e.to_string(),
                };
                error!(request_id = %request_id, error = %err, "PII purge failed");
                self.alerts.alert(request_id, &err);
                PurgeStatus::Failed { reason: e.to_string() }
            }
        };
        purged.insert(
            request_id.clone(),
            PurgeRecord {
                status: status.clone(),
                at: Utc::now(),
            },
        );
        status
    }

    /// Forget purges that ran at or before `cutoff`. Returns how many
    /// records were dropped.
    pub fn forget_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut purged = self.purged.lock().expect("purge registry lock poisoned");
        let before = purged.len();
        purged.retain(|_, record| record.at > cutoff);
        before - purged.len()
    }

    /// Return true if the purge for `request_id` has run.
    pub fn has_purged(&self, request_id: &RequestId) -> bool {
        self.purged
            .lock()
            .expect("purge registry lock poisoned")
            .contains_key(request_id)
    }

    pub fn vault(&self) -> &Arc<dyn PiiVault> {
        &self.vault
    }
}

// ── In-memory vault ───────────────────────────────────────────────────────────

/// Reference `PiiVault` keeping contexts in a map. Removing an entry drops
/// it, which zeroizes the document bytes, claims, and extracted fields.
#[derive(Default)]
pub struct InMemoryPiiVault {
    entries: Mutex<HashMap<RequestId, RequestContext>>,
}

impl InMemoryPiiVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("vault lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PiiVault for InMemoryPiiVault {
    fn retain(&self, context: RequestContext) -> AttestaResult<()> {
        let mut entries = self.entries.lock().map_err(|e| AttestaError::Purge {
            request_id: context.id().to_string(),
            reason: format!("vault lock poisoned: {}", e),
        })?;
        entries.insert(context.id().clone(), context);
        Ok(())
    }

    fn holds(&self, request_id: &RequestId) -> bool {
        self.entries
            .lock()
            .expect("vault lock poisoned")
            .contains_key(request_id)
    }

    fn purge(&self, request_id: &RequestId) -> AttestaResult<bool> {
        let removed = {
            let mut entries = self.entries.lock().map_err(|e| AttestaError::Purge {
                request_id: request_id.to_string(),
                reason: format!("vault lock poisoned: {}", e),
            })?;
            entries.remove(request_id)
        };
        Ok(removed.is_some())
    }
}

// ── Alert sink ────────────────────────────────────────────────────────────────

/// Default `AlertSink`: emits an `error`-level tracing event per alert.
#[derive(Debug, Default)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn alert(&self, request_id: &RequestId, error: &AttestaError) {
        error!(request_id = %request_id, error = %error, alert = true, "operator alert");
    }
}
