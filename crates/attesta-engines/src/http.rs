//! `EngineTransport` over HTTP with `reqwest`.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

use attesta_contracts::error::{AttestaError, AttestaResult, EngineError};

use crate::transport::EngineTransport;

/// JSON-over-HTTP transport with an optional bearer credential.
///
/// Each call is a `POST {base_url}/{endpoint}`. The orchestrator's collector
/// owns timeouts and retries; `connect_timeout` only bounds connection setup.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    credential: Option<String>,
}

impl HttpTransport {
    /// Build a transport for the engine service at `base_url`.
    ///
    /// Returns `AttestaError::Configuration` for an empty URL or if the HTTP
    /// client cannot be constructed.
    pub fn new(
        base_url: impl Into<String>,
        credential: Option<String>,
        connect_timeout: Duration,
    ) -> AttestaResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(AttestaError::Configuration {
                reason: "engine base URL is empty".to_string(),
            });
        }
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| AttestaError::Configuration {
                reason: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            base_url,
            credential,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Map a non-success HTTP status to the engine error it stands for.
///
/// Returns `None` for success statuses.
pub fn classify_status(status: StatusCode) -> Option<EngineError> {
    if status.is_success() {
        return None;
    }
    let error = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => EngineError::Unauthorized {
            reason: format!("HTTP {}", status.as_u16()),
        },
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => EngineError::Unavailable {
            reason: format!("HTTP {}", status.as_u16()),
        },
        s if s.is_server_error() => EngineError::Unavailable {
            reason: format!("HTTP {}", s.as_u16()),
        },
        s => EngineError::Malformed {
            reason: format!("engine refused request: HTTP {}", s.as_u16()),
        },
    };
    Some(error)
}

fn classify_transport_error(error: &reqwest::Error) -> EngineError {
    // Request bodies carry document bytes; report the kind, never the body.
    let kind = if error.is_connect() {
        "connection failed"
    } else if error.is_timeout() {
        "transport timeout"
    } else if error.is_request() {
        "request failed"
    } else {
        "transport error"
    };
    EngineError::Unavailable {
        reason: kind.to_string(),
    }
}

#[async_trait]
impl EngineTransport for HttpTransport {
    async fn call(&self, endpoint: &str, body: Value) -> Result<Value, EngineError> {
        let url = self.url_for(endpoint);
        debug!(url = %url, "engine call");

        let mut request = self.client.post(&url).json(&body);
        if let Some(token) = &self.credential {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            let err = classify_transport_error(&e);
            warn!(url = %url, error = %err, "engine call failed");
            err
        })?;

        if let Some(err) = classify_status(response.status()) {
            warn!(url = %url, status = response.status().as_u16(), "engine returned error status");
            return Err(err);
        }

        response.json::<Value>().await.map_err(|_| EngineError::Malformed {
            reason: "engine reply is not JSON".to_string(),
        })
    }
}
