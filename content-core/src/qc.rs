//! Per-section quality control scoring.
//!
//! [`score`] is a pure function of the question and the answer markup: it strips
//! the markup, computes clarity, snippet readiness and a generic-language penalty,
//! and derives the pass/fail verdict.

use crate::models::{FailureReason, QcScores, QcStatus};
use crate::text::{count_matches, first_sentence, keywords, sentences, strip_markup, word_count};

pub const CLARITY_MIN: u8 = 80;
pub const SNIPPET_READINESS_MIN: u8 = 75;
pub const GENERIC_PENALTY_MAX: u8 = 20;

/// Stock phrases that add words without adding an answer.
const FILLER_PHRASES: &[&str] = &[
    "sangat penting",
    "tidak dapat dipungkiri",
    "seperti yang kita ketahui",
    "pada dasarnya",
    "secara umum",
    "dan lain-lain",
    "dan sebagainya",
    "berbagai macam",
    "di era modern",
    "it is important to note",
    "in today's world",
    "as we all know",
    "plays a crucial role",
    "a wide range of",
    "in conclusion",
];

/// Transitions that should never open an answer.
const FILLER_OPENERS: &[&str] = &[
    "pada dasarnya",
    "secara umum",
    "seperti yang kita ketahui",
    "tidak dapat dipungkiri",
    "di era",
    "nah,",
    "jadi,",
    "basically",
    "generally speaking",
    "as we all know",
    "in today's",
    "in conclusion",
];

/// Scores and verdict for one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QcReport {
    pub scores: QcScores,
    pub status: QcStatus,
    pub failure_reason: Option<FailureReason>,
}

/// Score one answer against its question.
pub fn score(question: &str, answer_html: &str) -> QcReport {
    let plain = strip_markup(answer_html);
    let keywords = keywords(question);

    let scores = QcScores {
        clarity: clarity(question, &keywords, &plain),
        snippet_readiness: snippet_readiness(&keywords, &plain),
        generic_penalty: generic_penalty(&keywords, &plain),
    };
    let (status, failure_reason) = verdict(&scores);

    QcReport {
        scores,
        status,
        failure_reason,
    }
}

/// Pass iff every threshold holds; otherwise the first failing check in order
/// clarity, snippet readiness, generic penalty.
pub fn verdict(scores: &QcScores) -> (QcStatus, Option<FailureReason>) {
    let failure = if scores.clarity < CLARITY_MIN {
        Some(FailureReason::Clarity)
    } else if scores.snippet_readiness < SNIPPET_READINESS_MIN {
        Some(FailureReason::SnippetReadiness)
    } else if scores.generic_penalty > GENERIC_PENALTY_MAX {
        Some(FailureReason::Generic)
    } else {
        None
    };

    match failure {
        Some(reason) => (QcStatus::Fail, Some(reason)),
        None => (QcStatus::Pass, None),
    }
}

fn clarity(question: &str, keywords: &[String], plain: &str) -> u8 {
    let first = first_sentence(plain);
    if first.is_empty() || keywords.is_empty() || echoes_question(question, &first) {
        return 0;
    }

    let matched = count_matches(keywords, &first);
    let mut score = matched * 100 / keywords.len();
    if word_count(&first) <= 30 {
        score += 10;
    }
    score.min(100) as u8
}

/// An opening sentence that only repeats the question earns no clarity.
fn echoes_question(question: &str, first_sentence: &str) -> bool {
    let question = normalize_words(question);
    !question.is_empty() && normalize_words(first_sentence).contains(&question)
}

fn normalize_words(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn snippet_readiness(keywords: &[String], plain: &str) -> u8 {
    let mut score = 0u32;

    let complete = sentences(plain)
        .iter()
        .filter(|s| s.chars().count() >= 10)
        .count();
    if complete >= 2 {
        score += 40;
    }

    score += match plain.chars().count() {
        50..=500 => 30,
        0..=49 => 10,
        _ => 20,
    };

    let has_number = plain.chars().any(|c| c.is_ascii_digit());
    if has_number || word_count(plain) > 20 || count_matches(keywords, plain) >= 2 {
        score += 30;
    }

    score.min(100) as u8
}

fn generic_penalty(keywords: &[String], plain: &str) -> u8 {
    let lower = plain.to_lowercase();

    let fillers: usize = FILLER_PHRASES
        .iter()
        .map(|phrase| lower.matches(phrase).count())
        .sum();
    let mut penalty = fillers * 10;

    if fillers >= 2 && count_matches(keywords, plain) < 2 {
        penalty += 30;
    }

    let opening = lower.trim_start();
    if FILLER_OPENERS.iter().any(|opener| opening.starts_with(opener)) {
        penalty += 20;
    }

    penalty.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const QUESTION: &str = "Bagaimana cara memilih pupuk NPK untuk cabai?";

    #[test]
    fn test_direct_answer_passes() {
        let answer = "<p>Memilih pupuk NPK untuk cabai dimulai dari membaca rasio 16-16-16 pada kemasan. \
                      Gunakan dosis 5 gram per tanaman setiap dua minggu agar pertumbuhan merata.</p>";
        let report = score(QUESTION, answer);

        assert_eq!(report.scores.clarity, 100);
        assert_eq!(report.scores.snippet_readiness, 100);
        assert_eq!(report.scores.generic_penalty, 0);
        assert_eq!(report.status, QcStatus::Pass);
        assert_eq!(report.failure_reason, None);
    }

    #[test]
    fn test_placeholder_answer_fails_clarity() {
        let report = score("Apa manfaatnya?", "<p>Jawaban untuk: Apa manfaatnya?</p>");
        assert!(report.scores.clarity < CLARITY_MIN);
        assert_eq!(report.status, QcStatus::Fail);
        assert_eq!(report.failure_reason, Some(FailureReason::Clarity));
    }

    #[test]
    fn test_clarity_partial_overlap() {
        // one of three keywords in a short first sentence: 33 + 10
        let report = score(QUESTION, "<p>Pilih yang rasionya seimbang untuk pupuk. Lainnya menyusul.</p>");
        assert_eq!(report.scores.clarity, 43);
    }

    #[test]
    fn test_snippet_single_short_sentence() {
        let report = score(QUESTION, "<p>Pupuk cabai.</p>");
        // one sentence, under 50 chars, two keyword matches
        assert_eq!(report.scores.snippet_readiness, 10 + 30);
    }

    #[test]
    fn test_snippet_long_text_band() {
        let long = format!("<p>{}</p>", "Pupuk cabai harus seimbang. ".repeat(25));
        let report = score(QUESTION, &long);
        assert_eq!(report.scores.snippet_readiness, 40 + 20 + 30);
    }

    #[test]
    fn test_generic_penalty() {
        let answer = "<p>Pada dasarnya, pupuk sangat penting. Secara umum, tanaman butuh nutrisi dan lain-lain.</p>";
        let report = score("Apa manfaat pupuk organik?", answer);
        // four fillers, too generic, filler opener
        assert_eq!(report.scores.generic_penalty, 40 + 30 + 20);
    }

    #[test]
    fn test_generic_penalty_caps_at_100() {
        let answer = "Pada dasarnya sangat penting. ".repeat(10);
        let report = score("Apa manfaat pupuk organik?", &answer);
        assert_eq!(report.scores.generic_penalty, 100);
    }

    #[test]
    fn test_failure_reason_order() {
        let scores = QcScores {
            clarity: 50,
            snippet_readiness: 10,
            generic_penalty: 90,
        };
        assert_eq!(verdict(&scores), (QcStatus::Fail, Some(FailureReason::Clarity)));

        let scores = QcScores {
            clarity: 90,
            snippet_readiness: 10,
            generic_penalty: 90,
        };
        assert_eq!(
            verdict(&scores),
            (QcStatus::Fail, Some(FailureReason::SnippetReadiness))
        );

        let scores = QcScores {
            clarity: 90,
            snippet_readiness: 90,
            generic_penalty: 90,
        };
        assert_eq!(verdict(&scores), (QcStatus::Fail, Some(FailureReason::Generic)));
    }

    #[test]
    fn test_threshold_boundaries() {
        let at = |clarity, snippet_readiness, generic_penalty| {
            verdict(&QcScores {
                clarity,
                snippet_readiness,
                generic_penalty,
            })
            .0
        };
        assert_eq!(at(80, 75, 20), QcStatus::Pass);
        assert_eq!(at(79, 75, 20), QcStatus::Fail);
        assert_eq!(at(80, 74, 20), QcStatus::Fail);
        assert_eq!(at(80, 75, 21), QcStatus::Fail);
    }

    #[test]
    fn test_score_is_deterministic() {
        let answer = "<p>Pupuk NPK 16-16-16 cocok untuk cabai. Taburkan 5 gram.</p>";
        assert_eq!(score(QUESTION, answer), score(QUESTION, answer));
    }

    proptest! {
        #[test]
        fn prop_pass_iff_all_thresholds_hold(
            clarity in 0u8..=100,
            snippet_readiness in 0u8..=100,
            generic_penalty in 0u8..=100,
        ) {
            let scores = QcScores { clarity, snippet_readiness, generic_penalty };
            let (status, reason) = verdict(&scores);
            let expected = clarity >= 80 && snippet_readiness >= 75 && generic_penalty <= 20;

            prop_assert_eq!(status == QcStatus::Pass, expected);
            prop_assert_eq!(reason.is_none(), expected);
        }

        #[test]
        fn prop_boundary_neighbourhood(
            clarity in 78u8..=82,
            snippet_readiness in 73u8..=77,
            generic_penalty in 18u8..=22,
        ) {
            let (status, _) = verdict(&QcScores { clarity, snippet_readiness, generic_penalty });
            let expected = clarity >= 80 && snippet_readiness >= 75 && generic_penalty <= 20;
            prop_assert_eq!(status == QcStatus::Pass, expected);
        }

        #[test]
        fn prop_scores_stay_in_range(answer in "[a-zA-Z0-9 .,!?<>/]{0,600}") {
            let report = score(QUESTION, &answer);
            prop_assert!(report.scores.clarity <= 100);
            prop_assert!(report.scores.snippet_readiness <= 100);
            prop_assert!(report.scores.generic_penalty <= 100);
            prop_assert_eq!(verdict(&report.scores), (report.status, report.failure_reason));
        }
    }
}
