//! Chain-of-verification for single factual questions.
//!
//! A run asks the model for a one-sentence answer plus three verification
//! questions, has the model judge each question, and only keeps the answer
//! when enough of them verify and the answer expressed no doubt. Otherwise
//! the answer is corrected or replaced by a fixed refusal sentence.
//!
//! ## Phases
//!
//! | Phase | Calls | Output |
//! |-------|-------|--------|
//! | 0. Elicitation | 1 | initial answer, sub-questions, uncertainty flag |
//! | 1. Verification | 1 | one judgment per sub-question |
//! | 2. Aggregation | 0 | ratio and status |
//! | 3. Resolution | 0 or 1 | final answer |
//!
//! ## Example
//!
//! ```rust,ignore
//! use cove_core::llm::{ClientConfig, OllamaClient};
//! use cove_core::verification::{PipelineConfig, VerificationPipeline};
//! use std::sync::Arc;
//!
//! let client = Arc::new(OllamaClient::new(ClientConfig::from_env()?));
//! let pipeline = VerificationPipeline::new(client, PipelineConfig::default());
//!
//! let result = pipeline.verify("Qui a fondé Microsoft ?").await?;
//! println!("{} ({:.0}% verified)", result.final_answer, result.ratio);
//! ```
//!
//! Model output is never trusted to be well formed: absent markers and
//! missing judgments degrade toward "not verified", never the other way.

pub mod language;
pub mod parser;
pub mod pipeline;
pub mod prompts;
pub mod scoring;
pub mod types;

#[cfg(test)]
mod proptest;

pub use language::LanguagePack;
pub use parser::{
    build_steps, classify_judgment_line, contains_language_leak, format_transcript,
    parse_elicitation, parse_judgments, QuestionLimits,
};
pub use pipeline::{PipelineConfig, VerificationPipeline};
pub use prompts::{correction_prompt, elicitation_prompt, verification_prompt};
pub use scoring::{status_for, verification_ratio, DEFAULT_VERIFIED_THRESHOLD};
pub use types::{
    AnswerSource, Elicitation, Judgment, PipelineResult, VerificationStatus, VerificationStep,
};
