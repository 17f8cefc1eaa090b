//! The seam between engine clients and the wire.

use async_trait::async_trait;
use serde_json::Value;

use attesta_contracts::error::EngineError;

/// Sends one JSON request to an engine endpoint and returns its JSON reply.
///
/// Implementations map their own failures onto `EngineError`: rejected
/// credentials are `Unauthorized`, anything worth retrying is `Unavailable`
/// or `Timeout`, and a reply that is not JSON is `Malformed`.
#[async_trait]
pub trait EngineTransport: Send + Sync {
    async fn call(&self, endpoint: &str, body: Value) -> Result<Value, EngineError>;
}
