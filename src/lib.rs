//! # cove-core
//!
//! Chain-of-verification for answers from a local language model.
//!
//! ## Core Components
//!
//! - **LLM**: Completion service client, completion cache, and gateway
//! - **Verification**: The four-phase verify-then-correct pipeline
//! - **Session**: Hallucination tracking and repeated-question detection
//! - **Trajectory**: Observable pipeline events
//! - **Filter / Word list**: Banned-word censorship and its server-side list
//!
//! ## Example
//!
//! ```rust,ignore
//! use cove_core::{ChatSession, ClientConfig, OllamaClient, PipelineConfig, TrackerConfig,
//!     VerificationPipeline};
//! use std::sync::Arc;
//!
//! let client = Arc::new(OllamaClient::new(ClientConfig::from_env()?));
//! let pipeline = VerificationPipeline::new(client, PipelineConfig::default());
//! let mut session = ChatSession::new(pipeline, TrackerConfig::default());
//!
//! let outcome = session.ask("Qui a fondé Microsoft ?").await?;
//! println!("{}", outcome.display_answer);
//! if outcome.decision.is_terminal() {
//!     println!("Session ended after repeated low-confidence answers.");
//! }
//! ```

pub mod error;
pub mod filter;
pub mod llm;
pub mod session;
pub mod trajectory;
pub mod verification;
pub mod wordlist;

// Re-exports for convenience
pub use error::{Error, Result};
pub use filter::BannedWordFilter;
pub use llm::{
    CacheKey, CachePurpose, CacheStats, ClientConfig, CompletionCache, CompletionGateway,
    CompletionRequest, CompletionResponse, EmbeddingRequest, EmbeddingResponse, LLMClient,
    OllamaClient,
};
pub use session::{
    ChatSession, EmbeddingRepetitionDetector, HallucinationRule, HallucinationTracker,
    RepetitionConfig, RepetitionDetector, SessionState, TrackerConfig, TrackerDecision,
    TurnOutcome,
};
pub use trajectory::{PipelineEvent, PipelineEventType};
pub use verification::{
    AnswerSource, Judgment, LanguagePack, PipelineConfig, PipelineResult, VerificationPipeline,
    VerificationStatus, VerificationStep,
};
pub use wordlist::WordListClient;
