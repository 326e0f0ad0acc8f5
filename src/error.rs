//! Error types for cove-core.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using cove-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while verifying answers.
///
/// Parsing ambiguities in model output are never reported here; they are
/// resolved locally with conservative defaults.
#[derive(Error, Debug)]
pub enum Error {
    /// Completion service returned a non-success status or could not be reached
    #[error("Completion service error{}: {body}", status_suffix(*.status))]
    CompletionService { status: Option<u16>, body: String },

    /// Completion call exceeded its time bound
    #[error("Completion timed out after {duration_ms}ms")]
    CompletionTimeout { duration_ms: u64 },

    /// Embedding backend failure (repetition detection)
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Word-list service returned a non-success status or could not be reached
    #[error("Word-list service error{}: {body}", status_suffix(*.status))]
    WordList { status: Option<u16>, body: String },

    /// Word-list file does not exist
    #[error("Word-list path does not exist: {}", path.display())]
    PathInvalid { path: PathBuf },

    /// The session stopped accepting questions
    #[error("Session terminated after {consecutive} consecutive hallucinations")]
    SessionTerminated { consecutive: u32 },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

fn status_suffix(status: Option<u16>) -> String {
    status.map(|s| format!(" ({})", s)).unwrap_or_default()
}

impl Error {
    /// Create a completion service error from an HTTP status and raw body.
    pub fn completion_service(status: Option<u16>, body: impl Into<String>) -> Self {
        Self::CompletionService {
            status,
            body: body.into(),
        }
    }

    /// Create a completion timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::CompletionTimeout { duration_ms }
    }

    /// Create a word-list service error.
    pub fn word_list(status: Option<u16>, body: impl Into<String>) -> Self {
        Self::WordList {
            status,
            body: body.into(),
        }
    }

    /// Whether the error came from the completion service (including timeouts).
    pub fn is_completion_failure(&self) -> bool {
        matches!(
            self,
            Self::CompletionService { .. } | Self::CompletionTimeout { .. }
        )
    }
}
