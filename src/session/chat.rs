//! Interactive session driver.
//!
//! A [`ChatSession`] runs each question through the verification pipeline,
//! flags repeated questions, and feeds the result to the hallucination
//! tracker. Once the tracker terminates, the session rejects further
//! questions until reset.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::filter::BannedWordFilter;
use crate::verification::{PipelineResult, VerificationPipeline};

use super::repetition::{is_exact_repeat, RepetitionDetector};
use super::tracker::{HallucinationTracker, TrackerConfig, TrackerDecision};

/// Everything produced by one question.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    /// Whether the question repeats the previous one
    pub repeated: bool,
    /// Full pipeline output
    pub result: PipelineResult,
    /// Whether the result counted as a hallucination
    pub hallucination: bool,
    /// Tracker decision after this result
    pub decision: TrackerDecision,
    /// Final answer after censorship, for display
    pub display_answer: String,
}

/// One user's question/answer loop.
pub struct ChatSession {
    id: Uuid,
    pipeline: VerificationPipeline,
    tracker: HallucinationTracker,
    detector: Option<Arc<dyn RepetitionDetector>>,
    filter: Option<BannedWordFilter>,
}

impl ChatSession {
    pub fn new(pipeline: VerificationPipeline, tracker_config: TrackerConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            pipeline,
            tracker: HallucinationTracker::new(tracker_config),
            detector: None,
            filter: None,
        }
    }

    /// Detect paraphrased repeats in addition to exact ones.
    pub fn with_repetition_detector(mut self, detector: Arc<dyn RepetitionDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Censor displayed answers.
    pub fn with_filter(mut self, filter: BannedWordFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn pipeline(&self) -> &VerificationPipeline {
        &self.pipeline
    }

    pub fn tracker(&self) -> &HallucinationTracker {
        &self.tracker
    }

    pub fn is_terminated(&self) -> bool {
        self.tracker.is_terminated()
    }

    /// Reopen the session with fresh state.
    pub fn reset(&mut self) {
        self.tracker.reset();
    }

    /// Ask one question.
    ///
    /// On a pipeline failure the session state is left unchanged.
    #[instrument(skip(self), fields(session = %self.id))]
    pub async fn ask(&mut self, question: &str) -> Result<TurnOutcome> {
        if self.tracker.is_terminated() {
            return Err(Error::SessionTerminated {
                consecutive: self.tracker.state().consecutive_hallucinations,
            });
        }

        let repeated = self.check_repeat(question).await;
        if repeated {
            info!("question repeats the previous one");
        }

        let result = self.pipeline.verify(question).await?;

        let hallucination = self
            .tracker
            .is_hallucination(&result, self.pipeline.language());
        let decision = self.tracker.record(hallucination);
        self.tracker.record_question(question);

        let display_answer = match &self.filter {
            Some(filter) => filter.apply(&result.final_answer),
            None => result.final_answer.clone(),
        };

        Ok(TurnOutcome {
            repeated,
            result,
            hallucination,
            decision,
            display_answer,
        })
    }

    async fn check_repeat(&self, question: &str) -> bool {
        let Some(previous) = self.tracker.previous_question() else {
            return false;
        };
        if is_exact_repeat(previous, question) {
            return true;
        }
        match &self.detector {
            Some(detector) => match detector.is_repeat(previous, question).await {
                Ok(repeated) => repeated,
                Err(e) => {
                    warn!(error = %e, "repetition check failed; treating as new question");
                    false
                }
            },
            None => false,
        }
    }
}
