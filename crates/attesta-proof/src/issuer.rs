//! HMAC-SHA256 realization of the `ProofIssuer` contract.
//!
//! A token carries a random id, a keyed binding to the request, the asserted
//! status, and its validity window. The signature is an HMAC over all of
//! them. Without the key a consumer can neither forge a token nor recover
//! the request id from its binding.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use attesta_contracts::{
    config::ProofConfig,
    decision::DecisionStatus,
    error::{AttestaError, AttestaResult},
    proof::{ComplianceProofToken, ProofVerification},
    request::RequestId,
};
use attesta_core::traits::ProofIssuer;

type HmacSha256 = Hmac<Sha256>;

/// Shortest signing key accepted.
pub const MIN_KEY_LEN: usize = 16;

const BINDING_DOMAIN: &[u8] = b"binding";
const TOKEN_DOMAIN: &[u8] = b"token";
const FIELD_SEPARATOR: u8 = 0x1f;

/// Issues and verifies compliance proof tokens.
///
/// Tokens are cached per request: issuing twice for the same request returns
/// the first token while it is unexpired. Expired tokens leave the cache on
/// the next issue.
pub struct HmacProofIssuer {
    keyed: HmacSha256,
    token_ttl: Duration,
    issued: Mutex<HashMap<RequestId, ComplianceProofToken>>,
}

impl HmacProofIssuer {
    /// Build an issuer from a secret key and the `[proof]` configuration.
    ///
    /// Returns `AttestaError::Configuration` if the key is shorter than
    /// [`MIN_KEY_LEN`] bytes.
    pub fn new(key: impl Into<Vec<u8>>, config: &ProofConfig) -> AttestaResult<Self> {
        let key = Zeroizing::new(key.into());
        if key.len() < MIN_KEY_LEN {
            return Err(AttestaError::Configuration {
                reason: format!("proof signing key must be at least {MIN_KEY_LEN} bytes"),
            });
        }
        let keyed = HmacSha256::new_from_slice(&key).map_err(|e| AttestaError::Configuration {
            reason: format!("proof signing key rejected: {e}"),
        })?;
        if config.token_ttl_secs == 0 {
            return Err(AttestaError::Configuration {
                reason: "proof.token_ttl_secs must be positive".to_string(),
            });
        }
        Ok(Self {
            keyed,
            token_ttl: config.token_ttl(),
            issued: Mutex::new(HashMap::new()),
        })
    }

    /// Number of distinct requests a token has been issued for.
    pub fn issued_count(&self) -> usize {
        self.issued.lock().expect("proof cache lock poisoned").len()
    }

    fn mac(&self) -> HmacSha256 {
        self.keyed.clone()
    }

    /// Keyed digest of the request id, hex encoded.
    pub fn binding_for(&self, request_id: &RequestId) -> String {
        let mut mac = self.mac();
        mac.update(BINDING_DOMAIN);
        mac.update(&[FIELD_SEPARATOR]);
        mac.update(request_id.0.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn signing_mac(&self, token: &ComplianceProofToken) -> HmacSha256 {
        let issued_at = token.issued_at.to_rfc3339_opts(SecondsFormat::Micros, true);
        let expires_at = token.expires_at.to_rfc3339_opts(SecondsFormat::Micros, true);
        let mut mac = self.mac();
        mac.update(TOKEN_DOMAIN);
        for part in [
            token.token_id.as_str(),
            token.request_binding.as_str(),
            token.status.as_str(),
            issued_at.as_str(),
            expires_at.as_str(),
        ] {
            mac.update(&[FIELD_SEPARATOR]);
            mac.update(part.as_bytes());
        }
        mac
    }
}

impl ProofIssuer for HmacProofIssuer {
    fn issue(
        &self,
        request_id: &RequestId,
        status: DecisionStatus,
        now: DateTime<Utc>,
    ) -> AttestaResult<ComplianceProofToken> {
        if status != DecisionStatus::Verified {
            return Err(AttestaError::Validation {
                reason: format!(
                    "proof requested for request {} in status {}, only VERIFIED requests receive one",
                    request_id,
                    status.as_str()
                ),
            });
        }

        let mut issued = self.issued.lock().map_err(|e| AttestaError::StateMachine {
            reason: format!("proof cache lock poisoned: {}", e),
        })?;
        let before = issued.len();
        issued.retain(|_, token| now < token.expires_at);
        if issued.len() < before {
            debug!(count = before - issued.len(), "expired proofs evicted");
        }
        if let Some(existing) = issued.get(request_id) {
            debug!(request_id = %request_id, token_id = %existing.token_id, "returning cached proof");
            return Ok(existing.clone());
        }

        let mut token = ComplianceProofToken {
            token_id: uuid::Uuid::new_v4().to_string(),
            request_binding: self.binding_for(request_id),
            status,
            issued_at: now,
            expires_at: now + self.token_ttl,
            signature: String::new(),
        };
        token.signature = hex::encode(self.signing_mac(&token).finalize().into_bytes());

        info!(
            request_id = %request_id,
            token_id = %token.token_id,
            expires_at = %token.expires_at,
            "proof token minted"
        );
        issued.insert(request_id.clone(), token.clone());
        Ok(token)
    }

    fn verify(&self, token: &ComplianceProofToken, now: DateTime<Utc>) -> ProofVerification {
        let Ok(signature) = hex::decode(&token.signature) else {
            warn!(token_id = %token.token_id, "proof signature is not hex");
            return ProofVerification::invalid("malformed signature");
        };
        if self.signing_mac(token).verify_slice(&signature).is_err() {
            warn!(token_id = %token.token_id, "proof signature mismatch");
            return ProofVerification::invalid("signature mismatch");
        }
        if token.status != DecisionStatus::Verified {
            return ProofVerification::invalid("token does not assert VERIFIED");
        }
        if now >= token.expires_at {
            debug!(token_id = %token.token_id, "proof token expired");
            return ProofVerification::invalid("token expired");
        }
        ProofVerification::valid(token.status)
    }
}

impl std::fmt::Debug for HmacProofIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacProofIssuer")
            .field("key", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .finish_non_exhaustive()
    }
}
