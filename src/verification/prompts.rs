//! Prompt construction for the three completion calls of a run.

use super::language::LanguagePack;

/// Prompt asking for a one-sentence answer and exactly three checkable
/// verification questions, in a fixed output template.
pub fn elicitation_prompt(question: &str, pack: &LanguagePack) -> String {
    let mut prompt = format!("{}: {}\n", pack.question_label, question.trim());
    prompt.push_str(&pack.answer_instructions.join("\n"));
    prompt.push_str("\n\n");
    prompt.push_str(&pack.questions_request);
    prompt.push_str("\n\n");
    prompt.push_str(&pack.output_format_header);
    prompt.push('\n');
    prompt.push_str(&format!("{} [...]\n", pack.answer_marker()));
    prompt.push_str(&pack.questions_marker);
    prompt.push_str("\n[1]\n[2]\n[3]");
    prompt
}

/// Prompt asking for one verified/not-verified token per numbered question.
///
/// The answer lines must follow question order: judgments are matched to
/// questions by position unless the model echoes the numbers.
pub fn verification_prompt(questions: &[String], pack: &LanguagePack) -> String {
    let numbered = questions
        .iter()
        .enumerate()
        .map(|(i, q)| format!("{}. {}", i + 1, q))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{}\n\n{}\n{}\n\n{}",
        pack.verification_instructions.join("\n"),
        pack.verification_questions_header,
        numbered,
        pack.verification_answers_header
    )
}

/// Prompt asking the model to restate an unverified answer, defaulting to
/// the refusal sentence unless it is certain.
pub fn correction_prompt(
    question: &str,
    initial_answer: &str,
    transcript: &str,
    pack: &LanguagePack,
) -> String {
    format!(
        "{}: {}\n{}: {}\n{}:\n{}\n\n{}",
        pack.question_label,
        question.trim(),
        pack.initial_answer_label,
        initial_answer,
        pack.results_label,
        transcript,
        pack.correction_instructions.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elicitation_prompt_template() {
        let pack = LanguagePack::french();
        let prompt = elicitation_prompt("  Qui a fondé Microsoft ?\n", &pack);

        assert!(prompt.starts_with("Question: Qui a fondé Microsoft ?\n"));
        assert!(prompt.contains("exactement 3 questions"));
        assert!(prompt.contains("RÉPONSE: [...]"));
        assert!(prompt.contains("QUESTIONS:\n[1]\n[2]\n[3]"));
        assert!(prompt.contains("Je ne suis pas certain de cette information."));
    }

    #[test]
    fn test_verification_prompt_numbers_questions() {
        let pack = LanguagePack::french();
        let questions = vec![
            "Qui sont les fondateurs de Microsoft ?".to_string(),
            "En quelle année Microsoft a-t-elle été fondée ?".to_string(),
        ];
        let prompt = verification_prompt(&questions, &pack);

        assert!(prompt.contains("1. Qui sont les fondateurs de Microsoft ?\n2. En quelle année"));
        assert!(prompt.contains("'Vérifié' ou 'Non vérifié'"));
        assert!(prompt.ends_with("Réponses (une par ligne):"));
    }

    #[test]
    fn test_correction_prompt_contains_inputs() {
        let pack = LanguagePack::english();
        let prompt = correction_prompt(
            "Who founded Microsoft?",
            "Steve Jobs founded Microsoft.",
            "Question 1: Who founded Microsoft?\nAnswer: Not verified\n",
            &pack,
        );

        assert!(prompt.contains("Question: Who founded Microsoft?"));
        assert!(prompt.contains("Initial answer: Steve Jobs founded Microsoft."));
        assert!(prompt.contains("Verification results:\nQuestion 1"));
        assert!(prompt.contains(&pack.refusal_sentence));
    }
}
