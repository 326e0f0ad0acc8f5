//! The four-phase chain-of-verification pipeline.
//!
//! Each run makes at most three completion calls, in order:
//!
//! 1. **Elicitation**: one prompt yields the answer and its sub-questions.
//! 2. **Verification**: one batched prompt judges every sub-question.
//! 3. **Aggregation**: no call; ratio and status are computed locally.
//! 4. **Resolution**: a correction call only when the answer is unverified
//!    and carries no strong doubt marker.
//!
//! Every call is a suspension point with its own cache key. Any completion
//! failure ends the run with no result.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::llm::{CacheKey, CachePurpose, CompletionCache, CompletionGateway, LLMClient};
use crate::trajectory::{PipelineEvent, PipelineEventType};

use super::language::LanguagePack;
use super::parser::{
    build_steps, contains_language_leak, format_transcript, parse_elicitation, parse_judgments,
    QuestionLimits,
};
use super::prompts::{correction_prompt, elicitation_prompt, verification_prompt};
use super::scoring::{status_for, verification_ratio, DEFAULT_VERIFIED_THRESHOLD};
use super::types::{
    AnswerSource, Elicitation, PipelineResult, VerificationStatus, VerificationStep,
};

/// Configuration for a verification pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Target language vocabulary
    pub language: LanguagePack,
    /// Model override (client default when unset)
    pub model: Option<String>,
    /// Sampling temperature for every call
    pub temperature: f64,
    /// Minimum ratio (percent) for a verified status
    pub verified_threshold: f64,
    /// Question extraction limits
    pub question_limits: QuestionLimits,
    /// Completion cache capacity; `None` keeps every entry for the process lifetime
    pub cache_capacity: Option<usize>,
    /// Bound on each completion call
    pub completion_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            language: LanguagePack::french(),
            model: None,
            temperature: crate::llm::DEFAULT_TEMPERATURE,
            verified_threshold: DEFAULT_VERIFIED_THRESHOLD,
            question_limits: QuestionLimits::default(),
            cache_capacity: None,
            completion_timeout: Some(Duration::from_secs(120)),
        }
    }
}

impl PipelineConfig {
    pub fn with_language(mut self, language: LanguagePack) -> Self {
        self.language = language;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_verified_threshold(mut self, threshold: f64) -> Self {
        self.verified_threshold = threshold.clamp(0.0, 100.0);
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = Some(capacity);
        self
    }

    pub fn with_completion_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.completion_timeout = timeout;
        self
    }
}

/// Chain-of-verification pipeline bound to one model selection.
pub struct VerificationPipeline {
    gateway: CompletionGateway,
    config: PipelineConfig,
    events: Arc<RwLock<Vec<PipelineEvent>>>,
}

impl VerificationPipeline {
    /// Create a pipeline with its own private completion cache.
    pub fn new(client: Arc<dyn LLMClient>, config: PipelineConfig) -> Self {
        let cache = match config.cache_capacity {
            Some(capacity) => CompletionCache::with_capacity(capacity),
            None => CompletionCache::new(),
        };

        let mut gateway = CompletionGateway::new(client)
            .with_temperature(config.temperature)
            .with_cache(cache);
        if let Some(model) = &config.model {
            gateway = gateway.with_model(model.clone());
        }
        if let Some(timeout) = config.completion_timeout {
            gateway = gateway.with_timeout(timeout);
        }

        Self {
            gateway,
            config,
            events: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Create with default configuration.
    pub fn with_defaults(client: Arc<dyn LLMClient>) -> Self {
        Self::new(client, PipelineConfig::default())
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn language(&self) -> &LanguagePack {
        &self.config.language
    }

    pub fn gateway(&self) -> &CompletionGateway {
        &self.gateway
    }

    /// Events of the most recent run.
    pub async fn events(&self) -> Vec<PipelineEvent> {
        self.events.read().await.clone()
    }

    pub async fn clear_events(&self) {
        self.events.write().await.clear();
    }

    async fn emit_event(&self, event: PipelineEvent) {
        self.events.write().await.push(event);
    }

    async fn fail<T>(&self, phase: &str, error: Error) -> Result<T> {
        warn!(phase, error = %error, "verification phase failed");
        self.emit_event(
            PipelineEvent::error(format!("{} failed: {}", phase, error)).with_metadata("phase", phase),
        )
        .await;
        Err(error)
    }

    /// Run the full pipeline for one question.
    #[instrument(skip(self), fields(run_id = tracing::field::Empty))]
    pub async fn verify(&self, question: &str) -> Result<PipelineResult> {
        let start = Instant::now();
        let id = Uuid::new_v4();
        tracing::Span::current().record("run_id", tracing::field::display(id));

        // The log holds one run only.
        self.clear_events().await;
        self.emit_event(
            PipelineEvent::new(PipelineEventType::VerifyStart, "Starting verification")
                .with_metadata("question", question),
        )
        .await;

        let elicitation = match self.elicit(question).await {
            Ok(e) => e,
            Err(e) => return self.fail("elicitation", e).await,
        };
        let uncertain = self.config.language.has_uncertainty(&elicitation.answer);

        let steps = match self.judge(question, &elicitation.questions).await {
            Ok(steps) => steps,
            Err(e) => return self.fail("verification", e).await,
        };

        let ratio = verification_ratio(&steps);
        let status = status_for(ratio, uncertain, self.config.verified_threshold);
        info!(ratio, %status, uncertain, "verification aggregated");
        self.emit_event(
            PipelineEvent::new(
                PipelineEventType::Aggregated,
                format!("{:.2}% verified, status {}", ratio, status),
            )
            .with_metadata("ratio", ratio)
            .with_metadata("status", status.to_string())
            .with_metadata("uncertain", uncertain),
        )
        .await;

        let transcript = format_transcript(&steps, &self.config.language);

        let (final_answer, answer_source, correction) = match self
            .resolve(question, &elicitation.answer, &transcript, ratio, status)
            .await
        {
            Ok(resolved) => resolved,
            Err(e) => return self.fail("correction", e).await,
        };

        let latency_ms = start.elapsed().as_millis() as u64;
        self.emit_event(
            PipelineEvent::new(
                PipelineEventType::FinalAnswer,
                format!("Final answer from {:?} after {}ms", answer_source, latency_ms),
            )
            .with_metadata("latency_ms", latency_ms),
        )
        .await;

        Ok(PipelineResult {
            id,
            question: question.to_string(),
            initial_answer: elicitation.answer,
            steps,
            ratio,
            uncertain,
            status,
            final_answer,
            answer_source,
            correction,
            transcript,
            latency_ms,
            completed_at: Utc::now(),
        })
    }

    /// Phase 0: ask for the answer and its verification questions at once.
    async fn elicit(&self, question: &str) -> Result<Elicitation> {
        let pack = &self.config.language;
        let prompt = elicitation_prompt(question, pack);
        let key = CacheKey::new(CachePurpose::Combined, question);
        let response = self.gateway.complete(&prompt, Some(&key)).await?;

        let elicitation = parse_elicitation(&response, pack, self.config.question_limits);
        debug!(
            questions = elicitation.questions.len(),
            fallback = elicitation.fallback_count,
            "answer elicited"
        );

        self.emit_event(
            PipelineEvent::new(PipelineEventType::AnswerElicited, elicitation.answer.clone())
                .with_metadata("marker_found", elicitation.marker_found),
        )
        .await;
        self.emit_event(
            PipelineEvent::new(
                PipelineEventType::QuestionsDerived,
                elicitation.questions.join(" | "),
            )
            .with_metadata("count", elicitation.questions.len())
            .with_metadata("fallback_count", elicitation.fallback_count),
        )
        .await;

        Ok(elicitation)
    }

    /// Phase 1: judge every sub-question in one batched request.
    async fn judge(&self, question: &str, questions: &[String]) -> Result<Vec<VerificationStep>> {
        if questions.is_empty() {
            return Ok(Vec::new());
        }

        let pack = &self.config.language;
        let prompt = verification_prompt(questions, pack);
        let key = CacheKey::new(CachePurpose::Verification, question);
        let response = self.gateway.complete(&prompt, Some(&key)).await?;

        let judgments = parse_judgments(&response, pack, questions.len());
        let steps = build_steps(questions, &judgments);

        let verified = steps.iter().filter(|s| s.judgment().is_verified()).count();
        self.emit_event(
            PipelineEvent::new(
                PipelineEventType::JudgmentsParsed,
                format!("{}/{} sub-questions verified", verified, steps.len()),
            )
            .with_metadata("verified", verified),
        )
        .await;

        Ok(steps)
    }

    /// Phase 3: decide the final answer.
    async fn resolve(
        &self,
        question: &str,
        initial_answer: &str,
        transcript: &str,
        ratio: f64,
        status: VerificationStatus,
    ) -> Result<(String, AnswerSource, Option<String>)> {
        let pack = &self.config.language;

        if status == VerificationStatus::Verified {
            return Ok((initial_answer.to_string(), AnswerSource::Initial, None));
        }

        if pack.has_refusal_marker(initial_answer) {
            debug!("initial answer already expresses doubt; refusing without correction");
            return Ok((pack.refusal_sentence.clone(), AnswerSource::Refusal, None));
        }

        self.emit_event(PipelineEvent::new(
            PipelineEventType::CorrectionRequested,
            "Requesting correction of unverified answer",
        ))
        .await;

        let prompt = correction_prompt(question, initial_answer, transcript, pack);
        let key = CacheKey::new(CachePurpose::Correction, question);
        let correction = self.gateway.complete(&prompt, Some(&key)).await?.trim().to_string();

        let mut answer = correction.clone();
        let mut source = AnswerSource::Correction;

        if answer.is_empty() {
            answer = pack.refusal_sentence.clone();
            source = AnswerSource::Refusal;
        } else if contains_language_leak(&answer, pack) {
            warn!("correction contains foreign-language words; discarding");
            self.emit_event(
                PipelineEvent::new(PipelineEventType::LanguageLeak, correction.clone())
                    .with_metadata("language", pack.name.clone()),
            )
            .await;
            answer = pack.refusal_sentence.clone();
            source = AnswerSource::Refusal;
        }

        // Below the threshold the correction is advisory only.
        if ratio < self.config.verified_threshold {
            info!(ratio, "ratio below threshold; forcing refusal");
            answer = pack.refusal_sentence.clone();
            source = AnswerSource::Refusal;
        }

        if pack.is_refusal(&answer) {
            source = AnswerSource::Refusal;
        }

        Ok((answer, source, Some(correction)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{
        CompletionRequest, CompletionResponse, EmbeddingRequest, EmbeddingResponse, TokenUsage,
    };
    use crate::verification::types::Judgment;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    const MICROSOFT: &str = "Qui a fondé Microsoft ?";
    const MICROSOFT_ANSWER: &str = "Microsoft a été fondée par Bill Gates et Paul Allen.";

    fn combined(answer: &str) -> String {
        format!(
            "RÉPONSE: {}\nQUESTIONS:\n\
             Qui sont les cofondateurs de Microsoft ?\n\
             En quelle année Microsoft a-t-elle été fondée ?\n\
             Dans quelle ville Microsoft a-t-elle été créée ?",
            answer
        )
    }

    /// Mock client answering each phase with a scripted reply.
    struct ScriptedClient {
        combined: String,
        judgments: String,
        correction: String,
        fail_judgments: bool,
        calls: Mutex<Vec<&'static str>>,
    }

    impl ScriptedClient {
        fn new(combined: impl Into<String>, judgments: impl Into<String>) -> Self {
            Self {
                combined: combined.into(),
                judgments: judgments.into(),
                correction: MICROSOFT_ANSWER.to_string(),
                fail_judgments: false,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn with_correction(mut self, correction: impl Into<String>) -> Self {
            self.correction = correction.into();
            self
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LLMClient for ScriptedClient {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
            let prompt = request.prompt().unwrap_or_default().to_string();
            let (kind, content) = if prompt.contains("Résultats de vérification") {
                ("correction", self.correction.clone())
            } else if prompt.contains("Réponses (une par ligne):") {
                if self.fail_judgments {
                    return Err(Error::completion_service(Some(503), "model unavailable"));
                }
                ("judgments", self.judgments.clone())
            } else {
                ("combined", self.combined.clone())
            };
            self.calls.lock().unwrap().push(kind);

            Ok(CompletionResponse {
                model: "mock".to_string(),
                content,
                usage: TokenUsage::default(),
                timestamp: Utc::now(),
            })
        }

        async fn embed(&self, _request: EmbeddingRequest) -> Result<EmbeddingResponse> {
            Err(Error::Embedding("Not implemented".to_string()))
        }
    }

    fn pipeline(client: Arc<ScriptedClient>) -> VerificationPipeline {
        VerificationPipeline::with_defaults(client)
    }

    #[tokio::test]
    async fn test_all_verified_keeps_initial_answer() {
        let client = Arc::new(ScriptedClient::new(
            combined(MICROSOFT_ANSWER),
            "Vérifié\nVérifié\nVérifié",
        ));
        let result = pipeline(client.clone()).verify(MICROSOFT).await.unwrap();

        assert_eq!(result.initial_answer, MICROSOFT_ANSWER);
        assert_eq!(result.steps.len(), 3);
        assert_eq!(result.ratio, 100.0);
        assert_eq!(result.status, VerificationStatus::Verified);
        assert!(!result.uncertain);
        assert_eq!(result.final_answer, MICROSOFT_ANSWER);
        assert_eq!(result.answer_source, AnswerSource::Initial);
        assert_eq!(result.correction, None);
        assert_eq!(client.calls(), vec!["combined", "judgments"]);
    }

    #[tokio::test]
    async fn test_nothing_verified_forces_refusal_after_correction() {
        let client = Arc::new(
            ScriptedClient::new(
                combined(MICROSOFT_ANSWER),
                "Non vérifié\nNon vérifié\nNon vérifié",
            )
            .with_correction("Microsoft a été fondée par Bill Gates."),
        );
        let p = pipeline(client.clone());
        let result = p.verify(MICROSOFT).await.unwrap();

        assert_eq!(result.ratio, 0.0);
        assert_eq!(result.status, VerificationStatus::Unverified);
        assert!(!result.uncertain);
        assert_eq!(client.calls(), vec!["combined", "judgments", "correction"]);
        assert_eq!(
            result.correction.as_deref(),
            Some("Microsoft a été fondée par Bill Gates.")
        );
        assert_eq!(result.final_answer, p.language().refusal_sentence);
        assert_eq!(result.answer_source, AnswerSource::Refusal);
    }

    #[tokio::test]
    async fn test_doubtful_answer_refuses_without_correction() {
        let client = Arc::new(ScriptedClient::new(
            combined("Je ne suis pas certain de cette information."),
            "Vérifié\nVérifié\nVérifié",
        ));
        let p = pipeline(client.clone());
        let result = p.verify(MICROSOFT).await.unwrap();

        assert_eq!(result.ratio, 100.0);
        assert!(result.uncertain);
        assert_eq!(result.status, VerificationStatus::Unverified);
        assert_eq!(result.final_answer, p.language().refusal_sentence);
        assert_eq!(client.calls(), vec!["combined", "judgments"]);
    }

    #[tokio::test]
    async fn test_hedged_answer_with_high_ratio_uses_correction() {
        let client = Arc::new(
            ScriptedClient::new(
                combined("Microsoft a probablement été fondée en 1975."),
                "Vérifié\nVérifié\nNon vérifié",
            )
            .with_correction("Microsoft a été fondée en 1975."),
        );
        let result = pipeline(client.clone()).verify(MICROSOFT).await.unwrap();

        assert!(result.uncertain);
        assert_eq!(result.status, VerificationStatus::Unverified);
        assert_eq!(result.final_answer, "Microsoft a été fondée en 1975.");
        assert_eq!(result.answer_source, AnswerSource::Correction);
    }

    #[tokio::test]
    async fn test_language_leak_in_correction_is_discarded() {
        let client = Arc::new(
            ScriptedClient::new(
                combined("Microsoft a peut-être été fondée en 1975."),
                "Vérifié\nVérifié\nVérifié",
            )
            .with_correction("The company was founded in 1975."),
        );
        let p = pipeline(client.clone());
        let result = p.verify(MICROSOFT).await.unwrap();

        assert_eq!(result.final_answer, p.language().refusal_sentence);
        assert_eq!(result.answer_source, AnswerSource::Refusal);

        let events = p.events().await;
        assert!(events
            .iter()
            .any(|e| e.event_type == PipelineEventType::LanguageLeak));
    }

    #[tokio::test]
    async fn test_missing_questions_marker_uses_fallback() {
        let client = Arc::new(ScriptedClient::new(
            "Microsoft a été fondée en 1975 par Bill Gates.",
            "Vérifié\nVérifié",
        ));
        let p = pipeline(client);
        let result = p.verify(MICROSOFT).await.unwrap();

        let questions: Vec<_> = result.steps.iter().map(|s| s.question().to_string()).collect();
        assert_eq!(questions, p.language().fallback_questions.to_vec());
        assert_eq!(result.initial_answer, "Microsoft a été fondée en 1975 par Bill Gates.");
        // Third judgment padded as not verified: 2/3 still verifies
        assert_eq!(result.steps[2].judgment(), Judgment::NotVerified);
        assert_eq!(result.status, VerificationStatus::Verified);
    }

    #[tokio::test]
    async fn test_phase_failure_propagates_and_is_recorded() {
        let client = Arc::new(ScriptedClient {
            fail_judgments: true,
            ..ScriptedClient::new(combined(MICROSOFT_ANSWER), "")
        });
        let p = pipeline(client);
        let err = p.verify(MICROSOFT).await.unwrap_err();

        assert!(err.is_completion_failure());
        let events = p.events().await;
        let last = events.last().unwrap();
        assert_eq!(last.event_type, PipelineEventType::Error);
        assert_eq!(
            last.meta("phase"),
            Some(&serde_json::Value::from("verification"))
        );
    }

    #[tokio::test]
    async fn test_repeated_question_is_served_from_cache() {
        let client = Arc::new(ScriptedClient::new(
            combined(MICROSOFT_ANSWER),
            "Vérifié\nVérifié\nVérifié",
        ));
        let p = pipeline(client.clone());

        let first = p.verify(MICROSOFT).await.unwrap();
        let second = p.verify(MICROSOFT).await.unwrap();

        assert_eq!(first.final_answer, second.final_answer);
        assert_eq!(first.steps, second.steps);
        assert_ne!(first.id, second.id);
        assert_eq!(client.calls().len(), 2);
        assert_eq!(p.gateway().request_count(), 2);
    }

    #[tokio::test]
    async fn test_event_sequence_for_verified_run() {
        let client = Arc::new(ScriptedClient::new(
            combined(MICROSOFT_ANSWER),
            "1. Vérifié\n2. Vérifié\n3. Vérifié",
        ));
        let p = pipeline(client);
        p.verify(MICROSOFT).await.unwrap();

        let types: Vec<_> = p.events().await.iter().map(|e| e.event_type).collect();
        assert_eq!(
            types,
            vec![
                PipelineEventType::VerifyStart,
                PipelineEventType::AnswerElicited,
                PipelineEventType::QuestionsDerived,
                PipelineEventType::JudgmentsParsed,
                PipelineEventType::Aggregated,
                PipelineEventType::FinalAnswer,
            ]
        );

        p.clear_events().await;
        assert!(p.events().await.is_empty());
    }

    #[tokio::test]
    async fn test_events_cover_latest_run_only() {
        let client = Arc::new(ScriptedClient::new(
            combined(MICROSOFT_ANSWER),
            "Vérifié\nVérifié\nVérifié",
        ));
        let p = pipeline(client);

        p.verify(MICROSOFT).await.unwrap();
        let first_run = p.events().await.len();
        p.verify("Qui a fondé Apple ?").await.unwrap();
        p.verify(MICROSOFT).await.unwrap();

        let events = p.events().await;
        assert_eq!(events.len(), first_run);
        assert_eq!(events[0].event_type, PipelineEventType::VerifyStart);
        assert_eq!(
            events
                .iter()
                .filter(|e| e.event_type == PipelineEventType::VerifyStart)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_transcript_lists_each_step() {
        let client = Arc::new(ScriptedClient::new(
            combined(MICROSOFT_ANSWER),
            "Vérifié\nNon vérifié\nVérifié",
        ));
        let result = pipeline(client).verify(MICROSOFT).await.unwrap();

        assert!(result
            .transcript
            .starts_with("Question 1: Qui sont les cofondateurs de Microsoft ?\nRéponse: Vérifié\n"));
        assert!(result.transcript.contains("Question 2: En quelle année"));
        assert!(result.transcript.contains("Réponse: Non vérifié"));
    }
}
