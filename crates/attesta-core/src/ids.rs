//! Request-id generators.

use std::sync::atomic::{AtomicU64, Ordering};

use attesta_contracts::request::RequestId;

use crate::traits::RequestIdGenerator;

/// Sequential ids of the form `<prefix>-000001`. Unique within the process.
#[derive(Debug)]
pub struct MonotonicIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl MonotonicIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl Default for MonotonicIdGenerator {
    fn default() -> Self {
        Self::new("req")
    }
}

impl RequestIdGenerator for MonotonicIdGenerator {
    fn next_id(&self) -> RequestId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        RequestId(format!("{}-{:06}", self.prefix, n))
    }
}

/// Random v4 UUIDs. Unique across processes.
#[derive(Debug, Default)]
pub struct UuidIdGenerator;

impl RequestIdGenerator for UuidIdGenerator {
    fn next_id(&self) -> RequestId {
        RequestId(uuid::Uuid::new_v4().to_string())
    }
}
