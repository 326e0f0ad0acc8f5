//! Session-level tracking across repeated questions.
//!
//! - [`HallucinationTracker`]: terminates a session after sustained
//!   low-confidence output
//! - [`RepetitionDetector`]: flags exact or paraphrased repeat questions
//! - [`ChatSession`]: drives both around a [`VerificationPipeline`]
//!
//! [`VerificationPipeline`]: crate::verification::VerificationPipeline

pub mod chat;
pub mod repetition;
pub mod tracker;

pub use chat::{ChatSession, TurnOutcome};
pub use repetition::{
    cosine_similarity, is_exact_repeat, EmbeddingRepetitionDetector, RepetitionConfig,
    RepetitionDetector,
};
pub use tracker::{
    HallucinationRule, HallucinationTracker, SessionState, TrackerConfig, TrackerDecision,
};
