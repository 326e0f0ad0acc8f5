//! Language-specific constants for prompts, markers, and fixed sentences.
//!
//! Every string the pipeline writes into a prompt or looks for in a
//! response lives here, so the target language is a single swappable value.

use serde::{Deserialize, Serialize};

/// Prompt and parsing vocabulary for one target language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguagePack {
    /// Human-readable language name
    pub name: String,
    /// Prefixes introducing the answer line (first match wins)
    pub answer_markers: Vec<String>,
    /// Marker introducing the verification questions section
    pub questions_marker: String,
    /// Label the model must use for a confirmed sub-question
    pub verified_label: String,
    /// Label the model must use for an unconfirmed sub-question
    pub not_verified_label: String,
    /// Lowercase spellings recognised as the verified token
    pub verified_tokens: Vec<String>,
    /// Lowercase markers that turn a verified token into a negative judgment
    pub negation_markers: Vec<String>,
    /// Lowercase phrases showing the model doubted its own answer
    pub uncertainty_markers: Vec<String>,
    /// Lowercase subset of strong doubt phrases that short-circuit correction
    pub refusal_markers: Vec<String>,
    /// Fixed sentence returned when no certain answer can be given
    pub refusal_sentence: String,
    /// Generic questions used when the model supplies too few
    pub fallback_questions: [String; 3],
    /// Common words of another language that signal an off-language correction
    pub leak_stopwords: Vec<String>,
    /// Instruction lines for the combined answer/questions prompt
    pub answer_instructions: Vec<String>,
    /// Request for verification questions appended after the instructions
    pub questions_request: String,
    /// Output template header line
    pub output_format_header: String,
    /// Instruction lines for the batched verification prompt
    pub verification_instructions: Vec<String>,
    /// Header placed before the numbered sub-questions
    pub verification_questions_header: String,
    /// Trailing line asking for one judgment per line
    pub verification_answers_header: String,
    /// Instruction lines for the correction prompt
    pub correction_instructions: Vec<String>,
    /// Label for the original question in prompts
    pub question_label: String,
    /// Label for the initial answer in the correction prompt
    pub initial_answer_label: String,
    /// Label for the verification transcript in the correction prompt
    pub results_label: String,
    /// Label for the answer half of a transcript entry
    pub transcript_answer_label: String,
    /// Replacement label for censored words
    pub censored_label: String,
}

impl Default for LanguagePack {
    fn default() -> Self {
        Self::french()
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl LanguagePack {
    /// French vocabulary (default target language).
    pub fn french() -> Self {
        let refusal = "Je ne peux pas donner une réponse certaine à cette question.";
        Self {
            name: "français".to_string(),
            answer_markers: owned(&["RÉPONSE:", "REPONSE:"]),
            questions_marker: "QUESTIONS:".to_string(),
            verified_label: "Vérifié".to_string(),
            not_verified_label: "Non vérifié".to_string(),
            verified_tokens: owned(&["vérifié", "verifie"]),
            negation_markers: owned(&["non"]),
            uncertainty_markers: owned(&[
                "je ne suis pas certain",
                "je ne peux pas confirmer",
                "je ne sais pas",
                "incertain",
                "probablement",
                "peut-être",
            ]),
            refusal_markers: owned(&[
                "je ne suis pas certain",
                "je ne peux pas confirmer",
                "je ne sais pas",
                "incertain",
            ]),
            refusal_sentence: refusal.to_string(),
            fallback_questions: [
                "Cette information est-elle vérifiable ?".to_string(),
                "Cette information est-elle cohérente avec les faits connus ?".to_string(),
                "Cette information est-elle précise et détaillée ?".to_string(),
            ],
            leak_stopwords: owned(&["is", "the", "and", "while", "therefore"]),
            answer_instructions: owned(&[
                "IMPORTANT: Réponds uniquement en français.",
                "IMPORTANT: Réponds à cette question de manière précise et factuelle.",
                "IMPORTANT: Si tu n'es pas ABSOLUMENT CERTAIN de la réponse, dis \"Je ne suis pas certain de cette information.\"",
                "IMPORTANT: Ne fais JAMAIS d'hypothèses sur des informations historiques ou factuelles.",
                "IMPORTANT: Ne pas inventer d'informations.",
                "IMPORTANT: Si tu n'as pas de source fiable, dis \"Je ne peux pas confirmer cette information avec certitude.\"",
                "IMPORTANT: Format: Une seule phrase simple.",
                "IMPORTANT: Ne pas utiliser d'anglais.",
            ]),
            questions_request: "Ensuite, génère exactement 3 questions de vérification qui permettraient de confirmer ou infirmer ta réponse.\nLes questions doivent être spécifiques, vérifiables, et ne pas commencer par \"Est-ce que\" ou des numéros.".to_string(),
            output_format_header: "Format de sortie:".to_string(),
            verification_instructions: owned(&[
                "IMPORTANT: Réponds uniquement en français.",
                "IMPORTANT: Pour chaque question, réponds uniquement par 'Vérifié' ou 'Non vérifié', sans explication supplémentaire.",
                "IMPORTANT: Format: Une réponse par ligne, dans l'ordre des questions.",
                "IMPORTANT: Ne pas utiliser d'anglais.",
                "IMPORTANT: Réponds 'Vérifié' si l'information est généralement acceptée comme vraie et vérifiable.",
                "IMPORTANT: Réponds 'Non vérifié' uniquement si l'information est clairement fausse ou si tu n'en sais vraiment rien.",
                "IMPORTANT: Pour les informations de connaissances générales, sois plus indulgent.",
                "IMPORTANT: Pour les questions sur les fondateurs d'entreprises, les dates historiques, ou les faits vérifiables, réponds 'Vérifié' si tu es certain.",
            ]),
            verification_questions_header: "Questions:".to_string(),
            verification_answers_header: "Réponses (une par ligne):".to_string(),
            correction_instructions: vec![
                "IMPORTANT: Réponds uniquement en français.".to_string(),
                format!("IMPORTANT: Si la réponse n'est pas vérifiée ou si tu n'es pas certain, réponds \"{}\"", refusal),
                "IMPORTANT: Ne donne une réponse spécifique QUE si tu es ABSOLUMENT CERTAIN de la réponse.".to_string(),
                format!("IMPORTANT: Si tu as le moindre doute, réponds \"{}\"", refusal),
                "IMPORTANT: Format: Une seule phrase simple.".to_string(),
                "IMPORTANT: Ne pas utiliser d'anglais.".to_string(),
            ],
            question_label: "Question".to_string(),
            initial_answer_label: "Réponse initiale".to_string(),
            results_label: "Résultats de vérification".to_string(),
            transcript_answer_label: "Réponse".to_string(),
            censored_label: "censuré".to_string(),
        }
    }

    /// English vocabulary.
    pub fn english() -> Self {
        let refusal = "I cannot give a certain answer to this question.";
        Self {
            name: "english".to_string(),
            answer_markers: owned(&["ANSWER:"]),
            questions_marker: "QUESTIONS:".to_string(),
            verified_label: "Verified".to_string(),
            not_verified_label: "Not verified".to_string(),
            verified_tokens: owned(&["verified"]),
            negation_markers: owned(&["not", "unverified"]),
            uncertainty_markers: owned(&[
                "i am not certain",
                "i cannot confirm",
                "i don't know",
                "uncertain",
                "probably",
                "maybe",
            ]),
            refusal_markers: owned(&[
                "i am not certain",
                "i cannot confirm",
                "i don't know",
                "uncertain",
            ]),
            refusal_sentence: refusal.to_string(),
            fallback_questions: [
                "Can this information be verified?".to_string(),
                "Is this information consistent with known facts?".to_string(),
                "Is this information precise and detailed?".to_string(),
            ],
            leak_stopwords: owned(&["le", "la", "est", "et", "donc"]),
            answer_instructions: owned(&[
                "IMPORTANT: Answer only in English.",
                "IMPORTANT: Answer this question precisely and factually.",
                "IMPORTANT: If you are not ABSOLUTELY CERTAIN of the answer, say \"I am not certain of this information.\"",
                "IMPORTANT: NEVER make assumptions about historical or factual information.",
                "IMPORTANT: Do not invent information.",
                "IMPORTANT: If you have no reliable source, say \"I cannot confirm this information with certainty.\"",
                "IMPORTANT: Format: One simple sentence.",
            ]),
            questions_request: "Then generate exactly 3 verification questions that would confirm or refute your answer.\nThe questions must be specific, checkable, and must not start with numbers.".to_string(),
            output_format_header: "Output format:".to_string(),
            verification_instructions: owned(&[
                "IMPORTANT: Answer only in English.",
                "IMPORTANT: For each question, answer only 'Verified' or 'Not verified', with no explanation.",
                "IMPORTANT: Format: One answer per line, in question order.",
                "IMPORTANT: Answer 'Verified' if the information is generally accepted as true and checkable.",
                "IMPORTANT: Answer 'Not verified' only if the information is clearly false or you truly do not know.",
                "IMPORTANT: Be lenient with general-knowledge and well-established facts.",
            ]),
            verification_questions_header: "Questions:".to_string(),
            verification_answers_header: "Answers (one per line):".to_string(),
            correction_instructions: vec![
                "IMPORTANT: Answer only in English.".to_string(),
                format!("IMPORTANT: If the answer is not verified or you are not certain, answer \"{}\"", refusal),
                "IMPORTANT: Only give a specific answer if you are ABSOLUTELY CERTAIN of it.".to_string(),
                format!("IMPORTANT: If you have the slightest doubt, answer \"{}\"", refusal),
                "IMPORTANT: Format: One simple sentence.".to_string(),
            ],
            question_label: "Question".to_string(),
            initial_answer_label: "Initial answer".to_string(),
            results_label: "Verification results".to_string(),
            transcript_answer_label: "Answer".to_string(),
            censored_label: "censored".to_string(),
        }
    }

    /// Canonical answer marker written into the output template.
    pub fn answer_marker(&self) -> &str {
        self.answer_markers
            .first()
            .map(String::as_str)
            .unwrap_or("ANSWER:")
    }

    /// Whether the text contains any uncertainty marker.
    pub fn has_uncertainty(&self, text: &str) -> bool {
        contains_any(text, &self.uncertainty_markers)
    }

    /// Whether the text contains a strong doubt phrase.
    pub fn has_refusal_marker(&self, text: &str) -> bool {
        contains_any(text, &self.refusal_markers)
    }

    /// Whether the text is the fixed refusal sentence.
    pub fn is_refusal(&self, text: &str) -> bool {
        text.trim() == self.refusal_sentence
    }
}

fn contains_any(text: &str, markers: &[String]) -> bool {
    let lower = text.to_lowercase();
    markers.iter().any(|m| lower.contains(m.as_str()))
}
