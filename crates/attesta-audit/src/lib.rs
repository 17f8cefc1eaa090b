//! # attesta-audit
//!
//! Append-only, SHA-256 hash-chained lifecycle audit trail for the ATTESTA
//! runtime.
//!
//! ## Overview
//!
//! Every lifecycle transition the orchestrator records is wrapped in an
//! `AuditEntry` that links to the previous entry via its SHA-256 hash.
//! Tampering with any entry breaks the chain and is detected by
//! `verify_chain`. Entries carry decision summaries, never PII, so the trail
//! outlives the purge.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use attesta_audit::InMemoryAuditWriter;
//!
//! let audit = Arc::new(InMemoryAuditWriter::new("attesta-node-1"));
//! let orchestrator = Orchestrator::builder(config).audit_writer(audit.clone()) /* ... */;
//!
//! assert!(audit.verify_integrity());
//! let trail = audit.export_trail();
//! ```

pub mod chain;
pub mod event;
pub mod memory;

pub use chain::{first_break, hash_entry, verify_chain};
pub use event::{AuditEntry, AuditTrail};
pub use memory::InMemoryAuditWriter;

// ── Tests ─────────────────────────────────────────────────────────────────────
