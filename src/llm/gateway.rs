//! Single request/response exchange with the completion service.
//!
//! The gateway consults the [`CompletionCache`] before calling out and
//! populates it on success. It never retries: one failure is returned to the
//! caller as-is.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, instrument, warn};

use crate::error::{Error, Result};

use super::cache::{CacheKey, CompletionCache};
use super::client::LLMClient;
use super::types::{ChatMessage, CompletionRequest};

/// Sampling temperature used for every verification call.
pub const DEFAULT_TEMPERATURE: f64 = 0.9;

/// Cached, time-bounded access to a completion service.
pub struct CompletionGateway {
    client: Arc<dyn LLMClient>,
    cache: CompletionCache,
    model: Option<String>,
    temperature: f64,
    timeout: Option<Duration>,
    requests: AtomicU64,
}

impl CompletionGateway {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self {
            client,
            cache: CompletionCache::new(),
            model: None,
            temperature: DEFAULT_TEMPERATURE,
            timeout: None,
            requests: AtomicU64::new(0),
        }
    }

    /// Use a specific model instead of the client's default.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Bound each external call; an elapsed bound yields `CompletionTimeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cache(mut self, cache: CompletionCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &CompletionCache {
        &self.cache
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Number of requests actually sent to the completion service.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Complete a single-message prompt.
    ///
    /// With a cache key that is already bound, returns the cached text
    /// without contacting the service.
    #[instrument(skip(self, prompt, cache_key), fields(key = %cache_key.map(|k| k.to_string()).unwrap_or_default()))]
    pub async fn complete(&self, prompt: &str, cache_key: Option<&CacheKey>) -> Result<String> {
        if let Some(key) = cache_key {
            if let Some(cached) = self.cache.get(key).await {
                debug!("completion cache hit");
                return Ok(cached);
            }
        }

        let mut request = CompletionRequest::new()
            .with_message(ChatMessage::user(prompt))
            .with_temperature(self.temperature);
        if let Some(model) = &self.model {
            request = request.with_model(model.clone());
        }

        self.requests.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();

        let outcome = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.client.complete(request))
                .await
                .unwrap_or_else(|_| Err(Error::timeout(limit.as_millis() as u64))),
            None => self.client.complete(request).await,
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                warn!(elapsed_ms, error = %e, "completion failed");
                return Err(e);
            }
        };

        debug!(
            elapsed_ms,
            output_tokens = response.usage.output_tokens,
            "completion received"
        );

        if let Some(key) = cache_key {
            self.cache.insert(key.clone(), response.content.clone()).await;
        }

        Ok(response.content)
    }
}
