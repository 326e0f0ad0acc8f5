//! Core types for chain-of-verification runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Judgment on a single verification sub-question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Judgment {
    Verified,
    NotVerified,
}

impl Judgment {
    pub fn is_verified(self) -> bool {
        matches!(self, Self::Verified)
    }
}

impl std::fmt::Display for Judgment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Verified => write!(f, "verified"),
            Self::NotVerified => write!(f, "not_verified"),
        }
    }
}

/// One (sub-question, judgment) pair. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationStep {
    question: String,
    judgment: Judgment,
}

impl VerificationStep {
    pub fn new(question: impl Into<String>, judgment: Judgment) -> Self {
        Self {
            question: question.into(),
            judgment,
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn judgment(&self) -> Judgment {
        self.judgment
    }
}

/// Overall verdict of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Verified,
    Unverified,
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Verified => write!(f, "verified"),
            Self::Unverified => write!(f, "unverified"),
        }
    }
}

/// Where the final answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    /// The initial answer, kept because it verified
    Initial,
    /// The fixed refusal sentence
    Refusal,
    /// The model's correction
    Correction,
}

/// Parsed output of the combined answer/questions request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Elicitation {
    /// The single-sentence answer
    pub answer: String,
    /// Retained sub-questions, in generation order
    pub questions: Vec<String>,
    /// How many questions came from the fallback triplet
    pub fallback_count: usize,
    /// Whether the questions marker was found
    pub marker_found: bool,
}

/// Aggregate output of one verification run.
///
/// Built completely by a single pipeline invocation and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Run identifier
    pub id: Uuid,
    /// The question as asked
    pub question: String,
    /// Answer produced before verification
    pub initial_answer: String,
    /// Steps in generation order
    pub steps: Vec<VerificationStep>,
    /// Percentage of steps judged verified, in [0, 100]
    pub ratio: f64,
    /// Whether the initial answer itself expressed doubt
    pub uncertain: bool,
    /// Overall verdict
    pub status: VerificationStatus,
    /// Answer to show the user
    pub final_answer: String,
    /// Origin of the final answer
    pub answer_source: AnswerSource,
    /// Raw correction text, when a correction was requested
    pub correction: Option<String>,
    /// Formatted per-step transcript for display
    pub transcript: String,
    /// Wall-clock duration of the run
    pub latency_ms: u64,
    /// When the run finished
    pub completed_at: DateTime<Utc>,
}

impl PipelineResult {
    pub fn is_verified(&self) -> bool {
        self.status == VerificationStatus::Verified
    }

    /// Number of steps judged verified.
    pub fn verified_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.judgment().is_verified())
            .count()
    }
}
