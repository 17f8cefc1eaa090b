//! Engine and gate clients built on an `EngineTransport`.
//!
//! Each client encodes its request, sends it through the transport, and
//! hands the reply to the shared `ResponseDecoder`. Document bytes travel
//! hex-encoded.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::debug;

use attesta_contracts::{
    error::{AttestaError, AttestaResult, EngineError},
    evidence::{AttestationResult, ExtractedFields, ForensicResult, LivenessResult, LogicResult, VisionResult},
    request::{CaptureMetadata, ContextClaims, DocumentPayload},
};
use attesta_core::traits::{AttestationGate, ForensicEngine, LogicEngine, VisionEngine};
use attesta_verify::ResponseDecoder;

use crate::transport::EngineTransport;

pub const VISION_ENDPOINT: &str = "vision/analyze";
pub const FORENSIC_ENDPOINT: &str = "forensic/analyze";
pub const LOGIC_ENDPOINT: &str = "logic/validate";
pub const DEVICE_ENDPOINT: &str = "attestation/device";
pub const LIVENESS_ENDPOINT: &str = "attestation/liveness";

fn document_body(payload: &DocumentPayload) -> Value {
    json!({
        "document_type": payload.doc_type().as_str(),
        "image_hex": hex::encode(payload.bytes()),
    })
}

fn string_map<'a>(pairs: impl Iterator<Item = (&'a str, &'a str)>) -> Value {
    Value::Object(
        pairs
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect::<Map<_, _>>(),
    )
}

// ── Vision ────────────────────────────────────────────────────────────────────

pub struct VisionClient {
    transport: Arc<dyn EngineTransport>,
    decoder: Arc<ResponseDecoder>,
    endpoint: String,
}

impl VisionClient {
    pub fn new(transport: Arc<dyn EngineTransport>, decoder: Arc<ResponseDecoder>) -> Self {
        Self {
            transport,
            decoder,
            endpoint: VISION_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl VisionEngine for VisionClient {
    async fn analyze(&self, payload: &DocumentPayload) -> Result<VisionResult, EngineError> {
        debug!(endpoint = %self.endpoint, payload_bytes = payload.len(), "vision request");
        let reply = self.transport.call(&self.endpoint, document_body(payload)).await?;
        self.decoder.decode_vision(reply)
    }
}

// ── Forensic ──────────────────────────────────────────────────────────────────

pub struct ForensicClient {
    transport: Arc<dyn EngineTransport>,
    decoder: Arc<ResponseDecoder>,
    endpoint: String,
}

impl ForensicClient {
    pub fn new(transport: Arc<dyn EngineTransport>, decoder: Arc<ResponseDecoder>) -> Self {
        Self {
            transport,
            decoder,
            endpoint: FORENSIC_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl ForensicEngine for ForensicClient {
    async fn analyze(&self, payload: &DocumentPayload) -> Result<ForensicResult, EngineError> {
        debug!(endpoint = %self.endpoint, payload_bytes = payload.len(), "forensic request");
        let reply = self.transport.call(&self.endpoint, document_body(payload)).await?;
        self.decoder.decode_forensic(reply)
    }
}

// ── Logic ─────────────────────────────────────────────────────────────────────

pub struct LogicClient {
    transport: Arc<dyn EngineTransport>,
    decoder: Arc<ResponseDecoder>,
    endpoint: String,
}

impl LogicClient {
    pub fn new(transport: Arc<dyn EngineTransport>, decoder: Arc<ResponseDecoder>) -> Self {
        Self {
            transport,
            decoder,
            endpoint: LOGIC_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl LogicEngine for LogicClient {
    async fn validate(
        &self,
        fields: &ExtractedFields,
        claims: &ContextClaims,
    ) -> Result<LogicResult, EngineError> {
        debug!(
            endpoint = %self.endpoint,
            fields = fields.len(),
            claims = claims.len(),
            "logic request"
        );
        let body = json!({
            "extracted_fields": string_map(fields.iter()),
            "claims": string_map(claims.iter()),
        });
        let reply = self.transport.call(&self.endpoint, body).await?;
        self.decoder.decode_logic(reply)
    }
}

// ── Attestation gate ──────────────────────────────────────────────────────────

/// `AttestationGate` backed by a remote attestation service.
///
/// Transport failures surface as `AttestaError::UpstreamEngine`; the
/// orchestrator treats them as a failed gate.
pub struct RemoteAttestationGate {
    transport: Arc<dyn EngineTransport>,
}

impl RemoteAttestationGate {
    pub fn new(transport: Arc<dyn EngineTransport>) -> Self {
        Self { transport }
    }

    async fn call<T: serde::de::DeserializeOwned>(&self, endpoint: &str, body: Value) -> AttestaResult<T> {
        let reply = self
            .transport
            .call(endpoint, body)
            .await
            .map_err(|e| AttestaError::UpstreamEngine {
                service: endpoint.to_string(),
                reason: e.to_string(),
            })?;
        serde_json::from_value(reply).map_err(|e| AttestaError::UpstreamEngine {
            service: endpoint.to_string(),
            reason: format!("unexpected reply shape: {:?} error", e.classify()),
        })
    }
}

#[async_trait]
impl AttestationGate for RemoteAttestationGate {
    async fn verify_device(&self, capture: &CaptureMetadata) -> AttestaResult<AttestationResult> {
        let body = json!({
            "device_id": capture.device_id,
            "device_signature": capture.device_signature,
            "captured_at": capture.captured_at,
        });
        self.call(DEVICE_ENDPOINT, body).await
    }

    async fn check_liveness(&self, capture: &CaptureMetadata) -> AttestaResult<LivenessResult> {
        let body = json!({
            "device_id": capture.device_id,
            "liveness_stream": capture.liveness_stream,
        });
        self.call(LIVENESS_ENDPOINT, body).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use chrono::Utc;

    use attesta_contracts::request::DocumentType;

    use super::*;

    /// Replays scripted replies and records every request.
    #[derive(Default)]
    struct ScriptedTransport {
        replies: Mutex<VecDeque<Result<Value, EngineError>>>,
        calls: Arc<Mutex<Vec<(String, Value)>>>,
    }

    impl ScriptedTransport {
        fn replying(replies: Vec<Result<Value, EngineError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: Arc::new(Mutex::new(Vec::new())),
            })
        }
    }

    #[async_trait]
    impl EngineTransport for ScriptedTransport {
        async fn call(&self, endpoint: &str, body: Value) -> Result<Value, EngineError> {
            self.calls.lock().unwrap().push((endpoint.to_string(), body));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(EngineError::Unavailable {
                    reason: "script exhausted".to_string(),
                }))
        }
    }

    fn decoder() -> Arc<ResponseDecoder> {
        Arc::new(ResponseDecoder::new().unwrap())
    }

    #[tokio::test]
    async fn vision_client_sends_hex_document_and_decodes() {
        let transport = ScriptedTransport::replying(vec![Ok(json!({
            "confidence": 0.91,
            "descriptors": [],
            "extracted_fields": { "surname": "Lovelace" }
        }))]);
        let client = VisionClient::new(transport.clone(), decoder());

        let payload = DocumentPayload::new(DocumentType::Passport, vec![0xde, 0xad]);
        let result = client.analyze(&payload).await.unwrap();

        assert_eq!(result.confidence, 0.91);
        let calls = transport.calls.lock().unwrap();
        assert_eq!(calls[0].0, VISION_ENDPOINT);
        assert_eq!(calls[0].1["image_hex"], "dead");
        assert_eq!(calls[0].1["document_type"], "passport");
    }

    #[tokio::test]
    async fn malformed_reply_becomes_malformed_error() {
        let transport = ScriptedTransport::replying(vec![Ok(json!({ "score": "high" }))]);
        let client = ForensicClient::new(transport, decoder());

        let payload = DocumentPayload::new(DocumentType::NationalId, vec![1, 2, 3]);
        let result = client.analyze(&payload).await;

        assert!(matches!(result, Err(EngineError::Malformed { .. })));
    }

    #[tokio::test]
    async fn transport_errors_pass_through() {
        let transport = ScriptedTransport::replying(vec![Err(EngineError::Unauthorized {
            reason: "HTTP 401".to_string(),
        })]);
        let client = ForensicClient::new(transport, decoder()).with_endpoint("v2/forensic");

        let payload = DocumentPayload::new(DocumentType::Passport, vec![9]);
        let result = client.analyze(&payload).await;

        assert!(matches!(result, Err(EngineError::Unauthorized { .. })));
    }

    #[tokio::test]
    async fn logic_client_sends_fields_and_claims() {
        let transport = ScriptedTransport::replying(vec![Ok(json!({
            "confidence": 0.4,
            "descriptors": [{ "field": "date_of_birth", "reason": "does not match claim", "severity": "high" }]
        }))]);
        let client = LogicClient::new(transport.clone(), decoder());

        let fields: ExtractedFields = [("date_of_birth", "1990-12-10")].into_iter().collect();
        let claims: ContextClaims = [("date_of_birth", "1991-01-01")].into_iter().collect();
        let result = client.validate(&fields, &claims).await.unwrap();

        assert_eq!(result.discrepancies.len(), 1);
        let calls = transport.calls.lock().unwrap();
        assert_eq!(calls[0].1["claims"]["date_of_birth"], "1991-01-01");
        assert_eq!(calls[0].1["extracted_fields"]["date_of_birth"], "1990-12-10");
    }

    #[tokio::test]
    async fn remote_gate_decodes_verdicts() {
        let transport = ScriptedTransport::replying(vec![
            Ok(json!({
                "passed": true,
                "device_id": "device-1",
                "signature_scheme": "ecdsa-p256",
                "detail": null
            })),
            Ok(json!({ "passed": true, "warning": "glare detected" })),
        ]);
        let gate = RemoteAttestationGate::new(transport);
        let capture = CaptureMetadata {
            device_id: "device-1".to_string(),
            device_signature: "3045".to_string(),
            liveness_stream: "stream://1".to_string(),
            captured_at: Utc::now(),
        };

        assert!(gate.verify_device(&capture).await.unwrap().passed);
        let liveness = gate.check_liveness(&capture).await.unwrap();
        assert_eq!(liveness.warning.as_deref(), Some("glare detected"));
    }

    #[tokio::test]
    async fn remote_gate_failure_is_upstream_error() {
        let transport = ScriptedTransport::replying(vec![]);
        let gate = RemoteAttestationGate::new(transport);
        let capture = CaptureMetadata {
            device_id: "device-1".to_string(),
            device_signature: "3045".to_string(),
            liveness_stream: "stream://1".to_string(),
            captured_at: Utc::now(),
        };

        let result = gate.verify_device(&capture).await;
        assert!(matches!(result, Err(AttestaError::UpstreamEngine { .. })));
    }
}
