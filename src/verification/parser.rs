//! Parsing of model output for each verification phase.
//!
//! Model output is free text, so every branch here has an explicit fallback
//! and no branch can raise confidence: missing questions are replaced by the
//! generic fallback triplet and missing judgments count as not verified.

use regex::Regex;
use tracing::debug;

use super::language::LanguagePack;
use super::types::{Elicitation, Judgment, VerificationStep};

/// Limits applied when extracting verification questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionLimits {
    /// Number of questions kept (and padded up to)
    pub count: usize,
    /// Lines must be strictly longer than this many characters
    pub min_chars: usize,
}

impl Default for QuestionLimits {
    fn default() -> Self {
        Self {
            count: 3,
            min_chars: 10,
        }
    }
}

/// Find `marker` case-insensitively, returning its byte range.
fn find_marker(text: &str, marker: &str) -> Option<(usize, usize)> {
    let re = Regex::new(&format!("(?i){}", regex::escape(marker))).ok()?;
    re.find(text).map(|m| (m.start(), m.end()))
}

/// Find a section `marker` that opens a line, returning its byte range.
///
/// The same word inside a sentence ("toutes les questions: ...") is prose,
/// not a section header.
fn find_section_marker(text: &str, marker: &str) -> Option<(usize, usize)> {
    let re = Regex::new(&format!(r"(?im)^[ \t]*{}", regex::escape(marker))).ok()?;
    re.find(text).map(|m| (m.start(), m.end()))
}

/// Strip list numbering or bullets from a question line.
fn strip_list_prefix(line: &str) -> &str {
    let trimmed = line.trim();
    let without_bullet = trimmed
        .strip_prefix(['-', '*', '•'])
        .map(str::trim_start)
        .unwrap_or(trimmed);

    let digits = without_bullet
        .char_indices()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, c)| i + c.len_utf8());

    match digits {
        Some(end) => {
            let rest = &without_bullet[end..];
            match rest.strip_prefix(['.', ')']) {
                Some(after) => after.trim_start(),
                None => without_bullet,
            }
        }
        None => without_bullet,
    }
}

/// Parse the combined answer/questions response.
///
/// Without the questions marker the whole response is the answer and every
/// question comes from the fallback triplet. With fewer than `limits.count`
/// usable questions the list is padded from the triplet, in order.
pub fn parse_elicitation(
    response: &str,
    pack: &LanguagePack,
    limits: QuestionLimits,
) -> Elicitation {
    let (answer_part, questions_part, marker_found) =
        match find_section_marker(response, &pack.questions_marker) {
            Some((start, end)) => (&response[..start], Some(&response[end..]), true),
            None => (response, None, false),
        };

    let mut answer = if marker_found {
        let first_marker = pack
            .answer_markers
            .iter()
            .find_map(|m| find_marker(answer_part, m));
        match first_marker {
            Some((_, end)) => answer_part[end..].trim().to_string(),
            None => answer_part.trim().to_string(),
        }
    } else {
        String::new()
    };
    if answer.is_empty() {
        answer = response.trim().to_string();
    }

    let mut questions: Vec<String> = questions_part
        .map(|part| {
            part.lines()
                .map(strip_list_prefix)
                .filter(|q| q.chars().count() > limits.min_chars)
                .take(limits.count)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let parsed = questions.len();
    let mut fallback = pack.fallback_questions.iter().cycle();
    while questions.len() < limits.count {
        match fallback.next() {
            Some(q) => questions.push(q.clone()),
            None => break,
        }
    }
    let fallback_count = questions.len() - parsed;

    if fallback_count > 0 {
        debug!(parsed, fallback_count, marker_found, "padded verification questions");
    }

    Elicitation {
        answer,
        questions,
        fallback_count,
        marker_found,
    }
}

/// Classify one response line.
///
/// A line with a verified token and a negation marker (as a whole word) is
/// a negative judgment; a line with only the token is positive; anything else is not a
/// judgment.
pub fn classify_judgment_line(line: &str, pack: &LanguagePack) -> Option<Judgment> {
    let lower = line.trim().to_lowercase();
    if !pack.verified_tokens.iter().any(|t| lower.contains(t.as_str())) {
        return None;
    }
    if contains_whole_word(&lower, &pack.negation_markers) {
        Some(Judgment::NotVerified)
    } else {
        Some(Judgment::Verified)
    }
}

/// Split an optional leading "N." / "N)" index from a judgment line.
fn split_index(line: &str) -> (Option<usize>, &str) {
    let trimmed = line.trim();
    let end = trimmed
        .char_indices()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, c)| i + c.len_utf8());

    if let Some(end) = end {
        if let Some(rest) = trimmed[end..].strip_prefix(['.', ')', ':', '-']) {
            if let Ok(index) = trimmed[..end].parse::<usize>() {
                return (Some(index), rest.trim_start());
            }
        }
    }
    (None, trimmed)
}

/// Parse the batched verification response into exactly `expected` judgments.
///
/// Judgments align with questions by position. When every recognised line
/// carries a distinct 1-based index within range, the indices are used
/// instead. Missing judgments are filled with [`Judgment::NotVerified`];
/// surplus lines are dropped.
pub fn parse_judgments(response: &str, pack: &LanguagePack, expected: usize) -> Vec<Judgment> {
    let recognised: Vec<(Option<usize>, Judgment)> = response
        .lines()
        .filter_map(|line| {
            let (index, rest) = split_index(line);
            classify_judgment_line(rest, pack).map(|j| (index, j))
        })
        .collect();

    let indexed = !recognised.is_empty() && {
        let mut seen = vec![false; expected];
        recognised.iter().all(|(index, _)| match index {
            Some(i) if (1..=expected).contains(i) && !seen[i - 1] => {
                seen[i - 1] = true;
                true
            }
            _ => false,
        })
    };

    if indexed {
        let mut slots = vec![Judgment::NotVerified; expected];
        for (index, judgment) in &recognised {
            if let Some(i) = index {
                slots[i - 1] = *judgment;
            }
        }
        slots
    } else {
        let mut positional: Vec<Judgment> = recognised.into_iter().map(|(_, j)| j).collect();
        if positional.len() < expected {
            debug!(
                parsed = positional.len(),
                expected, "padding missing judgments as not verified"
            );
        }
        positional.resize(expected, Judgment::NotVerified);
        positional
    }
}

/// Zip questions and judgments by position into verification steps.
pub fn build_steps(questions: &[String], judgments: &[Judgment]) -> Vec<VerificationStep> {
    questions
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let judgment = judgments.get(i).copied().unwrap_or(Judgment::NotVerified);
            VerificationStep::new(q.clone(), judgment)
        })
        .collect()
}

/// Render the per-step transcript shown to the user and fed to correction.
pub fn format_transcript(steps: &[VerificationStep], pack: &LanguagePack) -> String {
    steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let label = match step.judgment() {
                Judgment::Verified => &pack.verified_label,
                Judgment::NotVerified => &pack.not_verified_label,
            };
            format!(
                "{} {}: {}\n{}: {}\n",
                pack.question_label,
                i + 1,
                step.question(),
                pack.transcript_answer_label,
                label
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Whether the text contains a stopword of another language as a whole word.
pub fn contains_language_leak(text: &str, pack: &LanguagePack) -> bool {
    contains_whole_word(text, &pack.leak_stopwords)
}

/// Case-insensitive whole-word match against any of `words`.
fn contains_whole_word(text: &str, words: &[String]) -> bool {
    if words.is_empty() {
        return false;
    }
    let alternatives = words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives))
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}
