//! A scripted stand-in for the remote engine services.
//!
//! `MockEngineService` implements `EngineTransport`, so the real engine
//! clients and response decoder sit between it and the orchestrator. Each
//! endpoint replays its own queue of replies; an exhausted queue answers
//! "unavailable".

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use attesta_contracts::error::EngineError;
use attesta_engines::EngineTransport;

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Fail(EngineError),
    /// Never answer; the collector's per-attempt timeout fires.
    Hang,
}

impl Reply {
    pub fn unavailable(reason: &str) -> Self {
        Reply::Fail(EngineError::Unavailable {
            reason: reason.to_string(),
        })
    }
}

#[derive(Default)]
pub struct MockEngineService {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<String>>,
}

impl MockEngineService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `replies` for `endpoint`, after anything already queued.
    pub fn script(&self, endpoint: &str, replies: impl IntoIterator<Item = Reply>) {
        self.scripts
            .lock()
            .expect("script lock poisoned")
            .entry(endpoint.to_string())
            .or_default()
            .extend(replies);
    }

    /// Number of calls made to `endpoint` so far.
    pub fn calls_to(&self, endpoint: &str) -> usize {
        self.calls
            .lock()
            .expect("call log lock poisoned")
            .iter()
            .filter(|e| e.as_str() == endpoint)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().expect("call log lock poisoned").len()
    }
}

#[async_trait]
impl EngineTransport for MockEngineService {
    async fn call(&self, endpoint: &str, _body: Value) -> Result<Value, EngineError> {
        self.calls
            .lock()
            .expect("call log lock poisoned")
            .push(endpoint.to_string());
        let next = self
            .scripts
            .lock()
            .expect("script lock poisoned")
            .get_mut(endpoint)
            .and_then(VecDeque::pop_front);

        debug!(endpoint, reply = ?next.as_ref().map(reply_kind), "mock engine call");
        match next {
            Some(Reply::Json(value)) => Ok(value),
            Some(Reply::Fail(err)) => Err(err),
            Some(Reply::Hang) => std::future::pending::<Result<Value, EngineError>>().await,
            None => Err(EngineError::Unavailable {
                reason: format!("no scripted reply for {endpoint}"),
            }),
        }
    }
}

fn reply_kind(reply: &Reply) -> &'static str {
    match reply {
        Reply::Json(_) => "json",
        Reply::Fail(_) => "fail",
        Reply::Hang => "hang",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_replies_replay_in_order_per_endpoint() {
        let service = MockEngineService::new();
        service.script("a", [Reply::Json(json!(1)), Reply::unavailable("down")]);
        service.script("b", [Reply::Json(json!(2))]);

        assert_eq!(service.call("a", json!({})).await.unwrap(), json!(1));
        assert_eq!(service.call("b", json!({})).await.unwrap(), json!(2));
        assert!(matches!(service.call("a", json!({})).await, Err(EngineError::Unavailable { .. })));
        assert!(service.call("a", json!({})).await.is_err());

        assert_eq!(service.calls_to("a"), 3);
        assert_eq!(service.total_calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hang_never_answers() {
        let service = MockEngineService::new();
        service.script("slow", [Reply::Hang]);

        let result = tokio::time::timeout(std::time::Duration::from_secs(5), service.call("slow", json!({}))).await;
        assert!(result.is_err());
    }
}
