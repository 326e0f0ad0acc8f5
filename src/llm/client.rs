//! LLM client trait and the Ollama implementation.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use crate::error::{Error, Result};

use super::types::{
    CompletionRequest, CompletionResponse, EmbeddingRequest, EmbeddingResponse, TokenUsage,
};

/// LLM client trait for making completions and embeddings.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Complete a prompt.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Create embeddings for texts.
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse>;
}

/// Configuration for the completion service client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the model server
    pub base_url: String,
    /// Default model
    pub default_model: Option<String>,
    /// Default embedding model
    pub embedding_model: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: OllamaClient::DEFAULT_BASE_URL.to_string(),
            default_model: None,
            embedding_model: None,
            timeout_secs: 120,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create configuration from environment variables.
    ///
    /// `OLLAMA_HOST` may omit the scheme, as the Ollama CLI allows. A
    /// `COVE_TIMEOUT_SECS` that is not a positive integer is a config error.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let timeout_secs = parse_timeout_secs(std::env::var("COVE_TIMEOUT_SECS").ok().as_deref())?
            .unwrap_or(defaults.timeout_secs);
        Ok(Self {
            base_url: std::env::var("OLLAMA_HOST")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|s| normalize_base_url(&s))
                .unwrap_or(defaults.base_url),
            default_model: std::env::var("COVE_MODEL").ok(),
            embedding_model: std::env::var("COVE_EMBEDDING_MODEL").ok(),
            timeout_secs,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = normalize_base_url(&url.into());
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = Some(model.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

fn parse_timeout_secs(raw: Option<&str>) -> Result<Option<u64>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Some(secs)),
        _ => Err(Error::Config(format!(
            "COVE_TIMEOUT_SECS must be a positive number of seconds, got {:?}",
            raw
        ))),
    }
}

fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

pub(crate) fn build_http_client(timeout_secs: u64) -> Client {
    let timeout = Duration::from_secs(timeout_secs);

    // Some sandboxed macOS environments can panic during proxy auto-detection
    // in reqwest's default client builder. Fall back to no-proxy in that case.
    match catch_unwind(AssertUnwindSafe(|| {
        Client::builder().timeout(timeout).build()
    })) {
        Ok(Ok(client)) => client,
        Ok(Err(_)) | Err(_) => Client::builder()
            .no_proxy()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new()),
    }
}

/// Map a transport failure, keeping timeouts distinct from other failures.
fn transport_error(error: reqwest::Error, timeout_secs: u64) -> Error {
    if error.is_timeout() {
        Error::timeout(timeout_secs.saturating_mul(1000))
    } else {
        Error::completion_service(None, format!("HTTP request failed: {}", error))
    }
}

/// Client for a local Ollama server.
pub struct OllamaClient {
    config: ClientConfig,
    http: Client,
}

impl OllamaClient {
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:11434";
    const DEFAULT_MODEL: &'static str = "llama2";
    const DEFAULT_EMBEDDING_MODEL: &'static str = "all-minilm";

    pub fn new(config: ClientConfig) -> Self {
        let http = build_http_client(config.timeout_secs);

        Self { config, http }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Names of the models installed on the server.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .http
            .get(self.url("/api/tags"))
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.timeout_secs))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e, self.config.timeout_secs))?;

        if !status.is_success() {
            return Err(Error::completion_service(Some(status.as_u16()), body));
        }

        let tags: OllamaTagsResponse = serde_json::from_str(&body)?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn post_json<T: Serialize>(&self, path: &str, payload: &T) -> Result<String> {
        let response = self
            .http
            .post(self.url(path))
            .header("content-type", "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.timeout_secs))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e, self.config.timeout_secs))?;

        if !status.is_success() {
            return Err(Error::completion_service(Some(status.as_u16()), body));
        }

        Ok(body)
    }
}

// Ollama API types
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    model: String,
    message: OllamaMessage,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

#[derive(Debug, Serialize)]
struct OllamaEmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    model: String,
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModelTag>,
}

#[derive(Debug, Deserialize)]
struct OllamaModelTag {
    name: String,
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let model = request
            .model
            .or(self.config.default_model.clone())
            .unwrap_or_else(|| Self::DEFAULT_MODEL.to_string());

        let api_request = OllamaChatRequest {
            model,
            messages: request
                .messages
                .iter()
                .map(|m| OllamaMessage {
                    role: m.role.as_str().to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            stream: false,
            options: request
                .temperature
                .map(|temperature| OllamaOptions { temperature }),
        };

        let body = self.post_json("/api/chat", &api_request).await?;

        let api_response: OllamaChatResponse = serde_json::from_str(&body).map_err(|e| {
            Error::completion_service(None, format!("Failed to parse response: {}: {}", e, body))
        })?;

        Ok(CompletionResponse {
            model: api_response.model,
            content: api_response.message.content,
            usage: TokenUsage {
                input_tokens: api_response.prompt_eval_count.unwrap_or(0),
                output_tokens: api_response.eval_count.unwrap_or(0),
            },
            timestamp: Utc::now(),
        })
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let model = request
            .model
            .or(self.config.embedding_model.clone())
            .unwrap_or_else(|| Self::DEFAULT_EMBEDDING_MODEL.to_string());

        let api_request = OllamaEmbedRequest {
            model,
            input: request.texts,
        };

        let body = self
            .post_json("/api/embed", &api_request)
            .await
            .map_err(|e| Error::Embedding(e.to_string()))?;

        let api_response: OllamaEmbedResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Embedding(format!("Failed to parse response: {}", e)))?;

        Ok(EmbeddingResponse {
            model: api_response.model,
            embeddings: api_response.embeddings,
        })
    }
}
