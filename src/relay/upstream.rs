//! OpenAI-compatible chat completion backend for the relay

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Duration;
use tracing::debug;

use crate::config::RelayConfig;
use crate::relay::error::RelayError;

const NO_RESPONSE: &str = "No response";

/// Message in a completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<CompletionMessage>,
    max_tokens: u32,
    temperature: f32,
}

/// Turns one user message into one assistant reply
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, user_message: &str) -> Result<String, RelayError>;
}

/// reqwest client for a `/chat/completions`-style upstream
#[derive(Clone)]
pub struct OpenAiBackend {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
    system_prompt: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiBackend {
    pub fn new(config: &RelayConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            url: config.upstream_url.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    fn request<'a>(&'a self, user_message: &str) -> CompletionRequest<'a> {
        CompletionRequest {
            model: &self.model,
            messages: vec![
                CompletionMessage {
                    role: "system".to_string(),
                    content: self.system_prompt.clone(),
                },
                CompletionMessage {
                    role: "user".to_string(),
                    content: user_message.to_string(),
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

/// Pull `choices[0].message.content` out of a completion response
pub fn extract_reply(body: &serde_json::Value) -> String {
    body.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .unwrap_or(NO_RESPONSE)
        .to_string()
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete(&self, user_message: &str) -> Result<String, RelayError> {
        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&self.request(user_message));

        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        if status != 200 {
            return Err(RelayError::Upstream(status));
        }

        let body: serde_json::Value = response.json().await?;
        debug!(model = %self.model, "upstream completion received");
        Ok(extract_reply(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::HeaderMap, http::StatusCode, routing::post};
    use serde_json::{Value, json};

    async fn spawn_upstream(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/v1/chat/completions", addr)
    }

    fn config(url: String, api_key: Option<&str>) -> RelayConfig {
        RelayConfig {
            upstream_url: url,
            api_key: api_key.map(str::to_string),
            ..RelayConfig::default()
        }
    }

    #[test]
    fn test_extract_reply() {
        let body = json!({"choices": [{"message": {"role": "assistant", "content": "hey"}}]});
        assert_eq!(extract_reply(&body), "hey");
        assert_eq!(extract_reply(&json!({"choices": []})), NO_RESPONSE);
        assert_eq!(extract_reply(&json!({})), NO_RESPONSE);
    }

    #[tokio::test]
    async fn test_sends_prompt_and_auth() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                let content = format!(
                    "{}|{}|{}|{}",
                    auth,
                    body["model"].as_str().unwrap_or(""),
                    body["messages"][0]["role"].as_str().unwrap_or(""),
                    body["messages"][1]["content"].as_str().unwrap_or(""),
                );
                Json(json!({"choices": [{"message": {"content": content}}]}))
            }),
        );
        let url = spawn_upstream(app).await;

        let backend = OpenAiBackend::new(&config(url, Some("sk-1"))).unwrap();
        let reply = backend.complete("hello").await.unwrap();
        assert_eq!(reply, "Bearer sk-1|gpt-3.5-turbo|system|hello");
    }

    #[tokio::test]
    async fn test_no_key_means_no_auth_header() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|headers: HeaderMap| async move {
                let has_auth = headers.contains_key("authorization");
                Json(json!({"choices": [{"message": {"content": has_auth.to_string()}}]}))
            }),
        );
        let url = spawn_upstream(app).await;

        let backend = OpenAiBackend::new(&config(url, Some(""))).unwrap();
        assert_eq!(backend.complete("hello").await.unwrap(), "false");
    }

    #[tokio::test]
    async fn test_upstream_status_is_reported() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::UNAUTHORIZED, "nope") }),
        );
        let url = spawn_upstream(app).await;

        let backend = OpenAiBackend::new(&config(url, None)).unwrap();
        let err = backend.complete("hello").await.unwrap_err();
        assert!(matches!(err, RelayError::Upstream(401)));
    }
}
