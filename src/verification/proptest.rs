//! Property-based tests for verification parsing and scoring.
//!
//! These check the invariants that hold for any model output:
//!
//! - The ratio always lies in [0, 100]
//! - Exactly the configured number of questions and judgments come out
//! - Parsing never turns a missing judgment into a verified one
//! - Retained questions keep generation order

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::verification::language::LanguagePack;
    use crate::verification::parser::{
        build_steps, parse_elicitation, parse_judgments, QuestionLimits,
    };
    use crate::verification::scoring::{status_for, verification_ratio};
    use crate::verification::types::{Judgment, VerificationStatus};

    fn judgment() -> impl Strategy<Value = Judgment> {
        prop_oneof![Just(Judgment::Verified), Just(Judgment::NotVerified)]
    }

    // Lines that may or may not survive question filtering
    fn question_line() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-zA-Zéè ]{0,8}",
            "[a-zA-Zéè ]{11,40}\\?",
            "[0-9]\\. [a-zA-Zéè ]{11,40}\\?",
        ]
    }

    // Free-form noise that carries neither a verified token nor a marker
    fn noise_line() -> impl Strategy<Value = String> {
        "[a-z ]{0,30}".prop_filter("no verified token", |s| {
            !s.contains("verifie") && !s.contains("questions")
        })
    }

    // =========================================================================
    // Scoring
    // =========================================================================

    proptest! {
        /// The ratio is a percentage whatever the judgments.
        #[test]
        fn ratio_is_bounded(judgments in prop::collection::vec(judgment(), 0..12)) {
            let questions: Vec<String> =
                (0..judgments.len()).map(|i| format!("question {}", i)).collect();
            let steps = build_steps(&questions, &judgments);
            let ratio = verification_ratio(&steps);
            prop_assert!((0.0..=100.0).contains(&ratio), "ratio {} out of range", ratio);
        }

        /// Verified requires both the threshold and the absence of doubt.
        #[test]
        fn status_requires_threshold_and_certainty(
            ratio in 0.0f64..=100.0,
            uncertain in any::<bool>(),
            threshold in 0.0f64..=100.0
        ) {
            let status = status_for(ratio, uncertain, threshold);
            let expected = ratio >= threshold && !uncertain;
            prop_assert_eq!(status == VerificationStatus::Verified, expected);
        }

        /// Flipping one judgment to verified never lowers the ratio.
        #[test]
        fn ratio_is_monotone(
            judgments in prop::collection::vec(judgment(), 1..8),
            flip in any::<prop::sample::Index>()
        ) {
            let questions: Vec<String> =
                (0..judgments.len()).map(|i| format!("question {}", i)).collect();
            let before = verification_ratio(&build_steps(&questions, &judgments));

            let mut improved = judgments.clone();
            improved[flip.index(judgments.len())] = Judgment::Verified;
            let after = verification_ratio(&build_steps(&questions, &improved));

            prop_assert!(after >= before);
        }
    }

    // =========================================================================
    // Parsing
    // =========================================================================

    proptest! {
        /// Elicitation always yields exactly `count` questions.
        #[test]
        fn elicitation_yields_exact_question_count(
            answer in "[a-zA-Z ]{1,40}",
            lines in prop::collection::vec(question_line(), 0..8),
            with_marker in any::<bool>()
        ) {
            let pack = LanguagePack::french();
            let response = if with_marker {
                format!("RÉPONSE: {}\nQUESTIONS:\n{}", answer, lines.join("\n"))
            } else {
                answer.clone()
            };
            let limits = QuestionLimits::default();
            let e = parse_elicitation(&response, &pack, limits);

            prop_assert_eq!(e.questions.len(), limits.count);
            prop_assert!(e.fallback_count <= limits.count);
            prop_assert!(!e.answer.is_empty() || response.trim().is_empty());
        }

        /// Without the marker, the answer is the whole response and all
        /// questions are the fallback triplet.
        #[test]
        fn missing_marker_falls_back_entirely(response in "[a-zA-Z .,]{1,80}") {
            let pack = LanguagePack::french();
            let e = parse_elicitation(&response, &pack, QuestionLimits::default());

            prop_assert!(!e.marker_found);
            prop_assert_eq!(e.answer, response.trim().to_string());
            prop_assert_eq!(e.questions, pack.fallback_questions.to_vec());
        }

        /// Parsed questions are a prefix of the long lines, in order.
        #[test]
        fn questions_preserve_generation_order(
            questions in prop::collection::vec("[a-zA-Z ]{11,30}\\?", 1..6)
        ) {
            let pack = LanguagePack::french();
            let response = format!("RÉPONSE: oui\nQUESTIONS:\n{}", questions.join("\n"));
            let e = parse_elicitation(&response, &pack, QuestionLimits::default());

            let parsed = e.questions.len() - e.fallback_count;
            let expected: Vec<String> = questions
                .iter()
                .map(|q| q.trim().to_string())
                .filter(|q| q.chars().count() > 10)
                .take(parsed)
                .collect();
            prop_assert_eq!(&e.questions[..parsed], &expected[..]);
        }

        /// Judgment parsing always returns `expected` entries.
        #[test]
        fn judgments_match_expected_length(
            lines in prop::collection::vec(
                prop_oneof![
                    Just("Vérifié".to_string()),
                    Just("Non vérifié".to_string()),
                    noise_line(),
                ],
                0..10
            ),
            expected in 0usize..6
        ) {
            let pack = LanguagePack::french();
            let parsed = parse_judgments(&lines.join("\n"), &pack, expected);
            prop_assert_eq!(parsed.len(), expected);
        }

        /// Short judgment sequences are padded with exactly the missing
        /// number of not-verified entries, and more padding never raises
        /// the ratio.
        #[test]
        fn padding_appends_not_verified_and_never_raises_ratio(
            prefix in prop::collection::vec(judgment(), 0..6),
            missing in 0usize..6,
            more in 0usize..6
        ) {
            let pack = LanguagePack::french();
            let response = prefix
                .iter()
                .map(|j| match j {
                    Judgment::Verified => pack.verified_label.clone(),
                    Judgment::NotVerified => pack.not_verified_label.clone(),
                })
                .collect::<Vec<_>>()
                .join("\n");

            let expected = prefix.len() + missing;
            let parsed = parse_judgments(&response, &pack, expected);

            let mut padded = prefix.clone();
            padded.extend(std::iter::repeat(Judgment::NotVerified).take(missing));
            prop_assert_eq!(&parsed, &padded);

            let ratio_for = |n: usize| {
                let questions: Vec<String> = (0..n).map(|i| format!("question {}", i)).collect();
                verification_ratio(&build_steps(&questions, &parse_judgments(&response, &pack, n)))
            };
            let ratio = ratio_for(expected);
            let more_padded = ratio_for(expected + more);
            prop_assert!(
                more_padded <= ratio,
                "ratio rose from {} to {} with {} more padding",
                ratio,
                more_padded,
                more
            );
        }

        /// Noise alone never produces a verified judgment.
        #[test]
        fn noise_never_verifies(
            lines in prop::collection::vec(noise_line(), 0..6),
            expected in 1usize..5
        ) {
            let pack = LanguagePack::french();
            let parsed = parse_judgments(&lines.join("\n"), &pack, expected);
            prop_assert!(parsed.iter().all(|j| *j == Judgment::NotVerified));
        }
    }
}
