//! Completion service access.
//!
//! This module provides the client abstraction over a local model server,
//! the process-lifetime completion cache, and the gateway that combines the
//! two into a single cached request/response exchange.
//!
//! ## Example
//!
//! ```rust,ignore
//! use cove_core::llm::{
//!     CacheKey, CachePurpose, ClientConfig, CompletionGateway, OllamaClient,
//! };
//! use std::sync::Arc;
//!
//! let client = OllamaClient::new(ClientConfig::from_env()?.with_default_model("llama3"));
//! let gateway = CompletionGateway::new(Arc::new(client));
//!
//! let key = CacheKey::new(CachePurpose::Combined, "Qui a fondé Microsoft ?");
//! let text = gateway.complete("Question: Qui a fondé Microsoft ?", Some(&key)).await?;
//! ```

mod cache;
mod client;
mod gateway;
mod types;

pub use cache::{CacheEntry, CacheKey, CachePurpose, CacheStats, CompletionCache};
pub use client::{ClientConfig, LLMClient, OllamaClient};
pub(crate) use client::build_http_client;
pub use gateway::{CompletionGateway, DEFAULT_TEMPERATURE};
pub use types::{
    ChatMessage, ChatRole, CompletionRequest, CompletionResponse, EmbeddingRequest,
    EmbeddingResponse, TokenUsage,
};
