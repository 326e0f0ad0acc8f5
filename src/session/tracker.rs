//! Session-level hallucination tracking.
//!
//! The tracker counts consecutive results judged hallucinatory and
//! terminates the session once the count reaches the configured limit. Any
//! result judged non-hallucinatory resets the count.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::verification::{LanguagePack, PipelineResult, VerificationStatus};

/// Predicate deciding whether a pipeline result counts as a hallucination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HallucinationRule {
    /// Unverified status, an answer other than the refusal sentence, and a
    /// ratio above the floor.
    #[default]
    UnverifiedAnswer,
    /// Ratio above the floor, whatever the status.
    SourceCompatible,
}

/// Configuration for the hallucination tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Consecutive hallucinations that terminate the session
    pub limit: u32,
    /// Results at or below this ratio never count
    pub ratio_floor: f64,
    /// Hallucination predicate
    pub rule: HallucinationRule,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            limit: 3,
            ratio_floor: 50.0,
            rule: HallucinationRule::default(),
        }
    }
}

impl TrackerConfig {
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn with_rule(mut self, rule: HallucinationRule) -> Self {
        self.rule = rule;
        self
    }
}

/// Mutable per-session state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Last question asked, if any
    pub previous_question: Option<String>,
    /// Consecutive results judged hallucinatory
    pub consecutive_hallucinations: u32,
    /// Terminal: no further questions accepted
    pub terminated: bool,
}

/// Outcome of observing one result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum TrackerDecision {
    Continue { consecutive: u32 },
    Terminate { consecutive: u32 },
}

impl TrackerDecision {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminate { .. })
    }

    pub fn consecutive(&self) -> u32 {
        match self {
            Self::Continue { consecutive } | Self::Terminate { consecutive } => *consecutive,
        }
    }
}

/// Per-session state machine over [`SessionState`].
#[derive(Debug, Clone, Default)]
pub struct HallucinationTracker {
    config: TrackerConfig,
    state: SessionState,
}

impl HallucinationTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            state: SessionState::default(),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state.terminated
    }

    pub fn previous_question(&self) -> Option<&str> {
        self.state.previous_question.as_deref()
    }

    /// Remember the question just answered.
    pub fn record_question(&mut self, question: &str) {
        self.state.previous_question = Some(question.trim().to_string());
    }

    /// Evaluate the configured predicate for one result.
    pub fn is_hallucination(&self, result: &PipelineResult, pack: &LanguagePack) -> bool {
        let above_floor = result.ratio > self.config.ratio_floor;
        match self.config.rule {
            HallucinationRule::SourceCompatible => above_floor,
            HallucinationRule::UnverifiedAnswer => {
                above_floor
                    && result.status == VerificationStatus::Unverified
                    && !pack.is_refusal(&result.final_answer)
            }
        }
    }

    /// Feed a hallucination verdict into the state machine.
    ///
    /// A terminated tracker stays terminated.
    pub fn record(&mut self, hallucination: bool) -> TrackerDecision {
        if self.state.terminated {
            return TrackerDecision::Terminate {
                consecutive: self.state.consecutive_hallucinations,
            };
        }

        if hallucination {
            self.state.consecutive_hallucinations += 1;
        } else {
            self.state.consecutive_hallucinations = 0;
        }
        let consecutive = self.state.consecutive_hallucinations;

        if consecutive >= self.config.limit {
            warn!(consecutive, "hallucination limit reached; terminating session");
            self.state.terminated = true;
            TrackerDecision::Terminate { consecutive }
        } else {
            debug!(consecutive, hallucination, "tracker updated");
            TrackerDecision::Continue { consecutive }
        }
    }

    /// Evaluate and record one result.
    pub fn observe(&mut self, result: &PipelineResult, pack: &LanguagePack) -> TrackerDecision {
        let hallucination = self.is_hallucination(result, pack);
        self.record(hallucination)
    }

    /// Clear all state, reopening a terminated session.
    pub fn reset(&mut self) {
        self.state = SessionState::default();
    }
}
