//! # attesta-proof
//!
//! Compliance proof tokens for VERIFIED identity checks.
//!
//! [`HmacProofIssuer`] implements the
//! [`ProofIssuer`](attesta_core::traits::ProofIssuer) trait with HMAC-SHA256.
//! A token asserts the final status of one request and nothing else: the
//! request itself appears only as a keyed binding, and no document bytes,
//! claims, or extracted fields are ever part of it.
//!
//! ```rust,ignore
//! use attesta_proof::HmacProofIssuer;
//!
//! let issuer = HmacProofIssuer::new(secret_key, &config.proof)?;
//! // Pass `Arc::new(issuer)` to `Orchestrator::builder(config).proof_issuer(...)`.
//! ```

pub mod issuer;

pub use issuer::{HmacProofIssuer, MIN_KEY_LEN};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use attesta_contracts::{
        config::ProofConfig,
        decision::DecisionStatus,
        error::AttestaError,
        request::RequestId,
    };
    use attesta_core::traits::ProofIssuer;

    use crate::HmacProofIssuer;

    // ── Helpers ───────────────────────────────────────────────────────────────

    const KEY: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn make_issuer() -> HmacProofIssuer {
        HmacProofIssuer::new(KEY, &ProofConfig { token_ttl_secs: 3600 }).unwrap()
    }

    fn req(id: &str) -> RequestId {
        RequestId(id.to_string())
    }

    fn t0() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap()
    }

    // ── 1. issuance ───────────────────────────────────────────────────────────

    /// A fresh token verifies and asserts VERIFIED.
    #[test]
    fn test_issued_token_verifies() {
        let issuer = make_issuer();
        let token = issuer.issue(&req("req-000001"), DecisionStatus::Verified, t0()).unwrap();

        assert_eq!(token.expires_at, t0() + Duration::hours(1));
        let report = issuer.verify(&token, t0() + Duration::minutes(10));
        assert!(report.valid);
        assert_eq!(report.status, Some(DecisionStatus::Verified));
        assert_eq!(report.reason, None);
    }

    /// Issuing twice for one request returns the same token.
    #[test]
    fn test_issue_is_idempotent_per_request() {
        let issuer = make_issuer();
        let first = issuer.issue(&req("req-000001"), DecisionStatus::Verified, t0()).unwrap();
        let second = issuer
            .issue(&req("req-000001"), DecisionStatus::Verified, t0() + Duration::minutes(1))
            .unwrap();
        let other = issuer.issue(&req("req-000002"), DecisionStatus::Verified, t0()).unwrap();

        assert_eq!(first, second);
        assert_ne!(first.token_id, other.token_id);
        assert_ne!(first.request_binding, other.request_binding);
        assert_eq!(issuer.issued_count(), 2);
    }

    /// Expired tokens leave the cache when the next token is issued.
    #[test]
    fn test_expired_tokens_are_evicted_on_issue() {
        let issuer = make_issuer();
        let stale = issuer.issue(&req("req-000001"), DecisionStatus::Verified, t0()).unwrap();
        issuer
            .issue(&req("req-000002"), DecisionStatus::Verified, t0() + Duration::minutes(30))
            .unwrap();
        assert_eq!(issuer.issued_count(), 2);

        issuer
            .issue(&req("req-000003"), DecisionStatus::Verified, stale.expires_at)
            .unwrap();
        assert_eq!(issuer.issued_count(), 2, "the first token expired and was dropped");

        let reissued = issuer
            .issue(&req("req-000001"), DecisionStatus::Verified, stale.expires_at)
            .unwrap();
        assert_ne!(reissued.token_id, stale.token_id);
    }

    /// Only VERIFIED requests get a token.
    #[test]
    fn test_non_verified_status_refused() {
        let issuer = make_issuer();
        for status in [DecisionStatus::PendingHitl, DecisionStatus::Rejected] {
            let result = issuer.issue(&req("req-000001"), status, t0());
            assert!(matches!(result, Err(AttestaError::Validation { .. })));
        }
        assert_eq!(issuer.issued_count(), 0);
    }

    // ── 2. privacy ────────────────────────────────────────────────────────────

    /// The serialized token never contains the request id.
    #[test]
    fn test_token_does_not_reveal_request_id() {
        let issuer = make_issuer();
        let token = issuer.issue(&req("req-secret-42"), DecisionStatus::Verified, t0()).unwrap();

        let json = serde_json::to_string(&token).unwrap();
        assert!(!json.contains("req-secret-42"));
        assert_eq!(token.request_binding, issuer.binding_for(&req("req-secret-42")));
        assert_eq!(token.request_binding.len(), 64);
    }

    // ── 3. verification failures ──────────────────────────────────────────────

    /// Any edited field breaks the signature.
    #[test]
    fn test_tampered_token_rejected() {
        let issuer = make_issuer();
        let token = issuer.issue(&req("req-000001"), DecisionStatus::Verified, t0()).unwrap();

        let mut extended = token.clone();
        extended.expires_at = token.expires_at + Duration::days(365);
        let report = issuer.verify(&extended, t0());
        assert!(!report.valid);
        assert_eq!(report.status, None);
        assert_eq!(report.reason.as_deref(), Some("signature mismatch"));

        let mut rebound = token.clone();
        rebound.request_binding = issuer.binding_for(&req("req-000002"));
        assert!(!issuer.verify(&rebound, t0()).valid);

        let mut garbled = token;
        garbled.signature = "not hex".to_string();
        assert_eq!(issuer.verify(&garbled, t0()).reason.as_deref(), Some("malformed signature"));
    }

    /// Tokens stop verifying at their expiry instant.
    #[test]
    fn test_expired_token_rejected() {
        let issuer = make_issuer();
        let token = issuer.issue(&req("req-000001"), DecisionStatus::Verified, t0()).unwrap();

        let report = issuer.verify(&token, token.expires_at);
        assert!(!report.valid);
        assert_eq!(report.reason.as_deref(), Some("token expired"));
    }

    /// A token signed under another key is refused.
    #[test]
    fn test_foreign_key_rejected() {
        let ours = make_issuer();
        let theirs =
            HmacProofIssuer::new(b"ffffffffffffffffffffffffffffffff".to_vec(), &ProofConfig::default()).unwrap();
        let token = theirs.issue(&req("req-000001"), DecisionStatus::Verified, t0()).unwrap();

        assert!(!ours.verify(&token, t0()).valid);
    }

    // ── 4. construction ───────────────────────────────────────────────────────

    /// Short keys and zero lifetimes are configuration errors.
    #[test]
    fn test_invalid_construction_refused() {
        let short = HmacProofIssuer::new(b"short".to_vec(), &ProofConfig::default());
        assert!(matches!(short, Err(AttestaError::Configuration { .. })));

        let no_ttl = HmacProofIssuer::new(KEY, &ProofConfig { token_ttl_secs: 0 });
        assert!(matches!(no_ttl, Err(AttestaError::Configuration { .. })));
    }

    /// The key never shows up in debug output.
    #[test]
    fn test_debug_redacts_key() {
        let rendered = format!("{:?}", make_issuer());
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("0123456789abcdef"));
    }
}
