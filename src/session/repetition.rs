//! Detection of repeated or paraphrased questions.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::llm::{EmbeddingRequest, LLMClient};

/// Decides whether a question repeats the previous one.
#[async_trait]
pub trait RepetitionDetector: Send + Sync {
    async fn is_repeat(&self, previous: &str, current: &str) -> Result<bool>;
}

/// Case-insensitive equality after trimming.
pub fn is_exact_repeat(previous: &str, current: &str) -> bool {
    previous.trim().to_lowercase() == current.trim().to_lowercase()
}

/// Cosine similarity of two vectors; 0 for zero-norm or mismatched input.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Configuration for embedding-based repetition detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepetitionConfig {
    /// Similarity at or above which two questions are the same
    pub threshold: f32,
    /// Embedding model (client default when unset)
    pub embedding_model: Option<String>,
}

impl Default for RepetitionConfig {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            embedding_model: None,
        }
    }
}

impl RepetitionConfig {
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold.clamp(-1.0, 1.0);
        self
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = Some(model.into());
        self
    }
}

/// Repetition detector backed by sentence embeddings.
///
/// Exact repeats are caught without an embedding call.
pub struct EmbeddingRepetitionDetector {
    client: Arc<dyn LLMClient>,
    config: RepetitionConfig,
}

impl EmbeddingRepetitionDetector {
    pub fn new(client: Arc<dyn LLMClient>, config: RepetitionConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &RepetitionConfig {
        &self.config
    }

    /// Embed both texts in one request and compare them.
    pub async fn similarity(&self, a: &str, b: &str) -> Result<f32> {
        let mut request = EmbeddingRequest::new(vec![a.to_string(), b.to_string()]);
        if let Some(model) = &self.config.embedding_model {
            request = request.with_model(model.clone());
        }

        let response = self.client.embed(request).await?;
        match response.embeddings.as_slice() {
            [first, second, ..] => Ok(cosine_similarity(first, second)),
            other => Err(Error::Embedding(format!(
                "expected 2 embeddings, got {}",
                other.len()
            ))),
        }
    }
}

#[async_trait]
impl RepetitionDetector for EmbeddingRepetitionDetector {
    async fn is_repeat(&self, previous: &str, current: &str) -> Result<bool> {
        if is_exact_repeat(previous, current) {
            return Ok(true);
        }
        let similarity = self.similarity(previous, current).await?;
        debug!(similarity, threshold = self.config.threshold, "question similarity");
        Ok(similarity >= self.config.threshold)
    }
}
