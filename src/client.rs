//! HTTP transport for the chat endpoint

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Duration;
use tracing::{debug, warn};

use crate::exchange::ExchangeError;

pub const GENERIC_SERVER_ERROR: &str = "Could not get a reply";

/// Request body posted to the endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Successful response body. Extra fields (e.g. `request_id`) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

/// Error response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatErrorBody {
    pub error: String,
}

/// Something that can carry one message to the assistant and bring back its reply
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, message: &str) -> Result<String, ExchangeError>;
}

/// Classify a completed HTTP response into a reply or a server error
pub fn interpret_response(status: u16, body: &[u8]) -> Result<String, ExchangeError> {
    if (200..300).contains(&status) {
        return match serde_json::from_slice::<ChatReply>(body) {
            Ok(parsed) => Ok(parsed.reply),
            Err(e) => {
                warn!(status, error = %e, "success response without a reply field");
                Err(ExchangeError::Server {
                    status: Some(status),
                    message: GENERIC_SERVER_ERROR.to_string(),
                })
            }
        };
    }

    let message = serde_json::from_slice::<ChatErrorBody>(body)
        .ok()
        .map(|b| b.error)
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| GENERIC_SERVER_ERROR.to_string());

    Err(ExchangeError::Server {
        status: Some(status),
        message,
    })
}

/// reqwest-backed transport posting JSON to a fixed URL
#[derive(Clone)]
pub struct HttpTransport {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, message: &str) -> Result<String, ExchangeError> {
        let payload = ChatRequest {
            message: message.to_string(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| ExchangeError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| ExchangeError::Network(e.to_string()))?;

        debug!(status, bytes = body.len(), endpoint = %self.endpoint, "chat endpoint responded");
        interpret_response(status, &body)
    }
}
