// src/llm_client.rs
//
// Async HTTP client for the external text-generation service. The
// enrichment stage hands it a prompt string and expects a JSON-bearing
// completion back; everything about transport, auth, and timeouts lives
// here so the enrichment logic stays testable with a fake client.

use crate::error::IntelligenceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// The one seam the enrichment stage depends on. Production uses
/// `HttpTextClient`; tests swap in deterministic fakes.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, IntelligenceError>;
}

// ============================================================================
// WIRE TYPES (chat-completions style)
// ============================================================================

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

// ============================================================================
// CLIENT
// ============================================================================

pub struct HttpTextClient {
    endpoint: String,
    credential: String,
    model: String,
    http_client: reqwest::Client,
}

impl HttpTextClient {
    /// Build a client with a hard per-request timeout. An empty credential
    /// is a configuration error the caller cannot work around, so it fails
    /// here instead of on the first request.
    pub fn new(
        endpoint: &str,
        credential: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, IntelligenceError> {
        if credential.trim().is_empty() {
            return Err(IntelligenceError::MissingCredentials);
        }

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(IntelligenceError::Network)?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            credential: credential.to_string(),
            model: model.to_string(),
            http_client,
        })
    }
}

#[async_trait]
impl TextCompletion for HttpTextClient {
    async fn complete(&self, prompt: &str) -> Result<String, IntelligenceError> {
        let request = CompletionRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            temperature: 0.2,
        };

        debug!(endpoint = %self.endpoint, "sending intelligence request");

        let resp = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.credential)
            .json(&request)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            warn!(status, "intelligence service returned an error");
            return Err(IntelligenceError::Service { status, body });
        }

        let completion: CompletionResponse = resp
            .json()
            .await
            .map_err(|e| IntelligenceError::MalformedResponse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                IntelligenceError::MalformedResponse("completion had no choices".to_string())
            })
    }
}
