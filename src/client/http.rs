//! HTTP transport to the chat endpoint.

use crate::error::ChatError;
use crate::protocol::ChatRequest;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

/// Something that can answer a chat request.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one request and return the reply body as parsed JSON.
    async fn send(&self, request: &ChatRequest) -> Result<Value, ChatError>;
}

/// Posts chat requests to a fixed endpoint.
pub struct HttpBackend {
    endpoint: String,
    client: Client,
}

impl HttpBackend {
    /// Create a backend for `endpoint`.
    ///
    /// No timeout is set: a request waits until the transport settles.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn send(&self, request: &ChatRequest) -> Result<Value, ChatError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        // The status code is not checked; error bodies are JSON too.
        let status = response.status();
        let body = response.bytes().await?;
        debug!("Endpoint answered {} ({} bytes)", status, body.len());

        Ok(serde_json::from_slice(&body)?)
    }
}
