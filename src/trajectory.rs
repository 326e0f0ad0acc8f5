//! Observable events emitted while a verification run progresses.
//!
//! Events are collected in memory by the pipeline and can be rendered or
//! exported by the caller. They carry no decision weight.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Types of events emitted during a verification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineEventType {
    /// Run started
    VerifyStart,
    /// Initial answer parsed
    AnswerElicited,
    /// Verification questions retained
    QuestionsDerived,
    /// Judgments parsed and aligned
    JudgmentsParsed,
    /// Ratio and status computed
    Aggregated,
    /// Correction requested from the model
    CorrectionRequested,
    /// Correction discarded for containing another language
    LanguageLeak,
    /// Final answer resolved
    FinalAnswer,
    /// A phase failed
    Error,
}

impl std::fmt::Display for PipelineEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::VerifyStart => "VERIFY_START",
            Self::AnswerElicited => "ANSWER_ELICITED",
            Self::QuestionsDerived => "QUESTIONS_DERIVED",
            Self::JudgmentsParsed => "JUDGMENTS_PARSED",
            Self::Aggregated => "AGGREGATED",
            Self::CorrectionRequested => "CORRECTION_REQUESTED",
            Self::LanguageLeak => "LANGUAGE_LEAK",
            Self::FinalAnswer => "FINAL_ANSWER",
            Self::Error => "ERROR",
        };
        write!(f, "{}", s)
    }
}

/// An event emitted during a verification run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// Type of the event
    pub event_type: PipelineEventType,
    /// Human-readable content describing the event
    pub content: String,
    /// Event-specific metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, Value>>,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
}

impl PipelineEvent {
    /// Create a new event.
    pub fn new(event_type: PipelineEventType, content: impl Into<String>) -> Self {
        Self {
            event_type,
            content: content.into(),
            metadata: None,
            timestamp: Utc::now(),
        }
    }

    /// Add metadata to the event.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Create an error event.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(PipelineEventType::Error, message)
    }

    /// Look up a metadata value.
    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.metadata.as_ref().and_then(|m| m.get(key))
    }

    /// Render as a single log line.
    pub fn log_line(&self) -> String {
        format!(
            "[{}] {} {}",
            self.timestamp.format("%H:%M:%S%.3f"),
            self.event_type,
            self.content
        )
    }
}
