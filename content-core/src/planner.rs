//! Search intent detection and question planning.
//!
//! The planner never fails: when the content engine cannot suggest enough usable
//! questions, it falls back to deterministic per-intent templates and records why.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::engine::{EngineClient, QuestionSuggestionRequest};
use crate::models::{CategoryRef, SearchIntent};

pub const MIN_QUESTIONS: usize = 3;
pub const MAX_QUESTIONS: usize = 7;
const MIN_QUESTION_CHARS: usize = 10;

static HOW_TO_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(how|step|steps|guide|tutorial|cara|langkah|panduan|tips)\b").unwrap()
});
static COMPARISON_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(vs|versus|compare|comparison|difference|perbandingan|bandingkan|perbedaan|beda)\b")
        .unwrap()
});
static COMMERCIAL_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(price|best|buy|review|harga|terbaik|beli|rekomendasi|ulasan|murah)\b")
        .unwrap()
});
static INTERROGATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\?|\b(apa|apakah|bagaimana|mengapa|kenapa|kapan|dimana|di mana|siapa|berapa|mana|what|how|why|when|where|which|who)\b",
    )
    .unwrap()
});
static GENERIC_QUESTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\S+|apa itu|what is it|why not|kenapa tidak)\s*\??\s*$").unwrap()
});

/// Where the planned questions came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionSource {
    Engine,
    Template,
}

/// Output of question planning.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionPlan {
    pub intent: SearchIntent,
    pub questions: Vec<String>,
    pub source: QuestionSource,
    /// Why planning fell back to templates, if it did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
}

/// Derives the intent and the questions a piece of content must answer.
#[derive(Debug, Clone)]
pub struct QuestionPlanner {
    engine: Option<EngineClient>,
}

impl QuestionPlanner {
    /// Create a planner; `None` plans from templates only.
    pub fn new(engine: Option<EngineClient>) -> Self {
        Self { engine }
    }

    pub async fn plan(
        &self,
        topic: &str,
        category: &CategoryRef,
        language: &str,
        intent_hint: Option<SearchIntent>,
    ) -> QuestionPlan {
        let intent = intent_hint.unwrap_or_else(|| detect_intent(topic));
        debug!(intent = intent.as_str(), "search intent resolved");

        let degraded = match &self.engine {
            Some(engine) => {
                let request = QuestionSuggestionRequest {
                    topic: topic.to_string(),
                    category_name: category.name.clone(),
                    keyword_cluster: category.keyword_cluster(),
                    intent,
                    language: language.to_string(),
                    max_questions: MAX_QUESTIONS,
                };
                match engine.suggest_questions(&request).await {
                    Ok(raw) => {
                        let questions = filter_questions(raw);
                        if questions.len() >= MIN_QUESTIONS {
                            info!(count = questions.len(), "questions planned by content engine");
                            return QuestionPlan {
                                intent,
                                questions,
                                source: QuestionSource::Engine,
                                degraded: None,
                            };
                        }
                        format!(
                            "Content engine suggested only {} usable questions; using question templates",
                            questions.len()
                        )
                    }
                    Err(e) => format!("Question planning fell back to templates: {}", e),
                }
            }
            None => "Content engine unavailable; using question templates".to_string(),
        };

        warn!(reason = %degraded, "question planning degraded");
        QuestionPlan {
            intent,
            questions: template_questions(topic, intent, language),
            source: QuestionSource::Template,
            degraded: Some(degraded),
        }
    }
}

/// Heuristic intent from topic markers, checked how-to, comparison, commercial.
pub fn detect_intent(topic: &str) -> SearchIntent {
    if HOW_TO_MARKERS.is_match(topic) {
        SearchIntent::HowTo
    } else if COMPARISON_MARKERS.is_match(topic) {
        SearchIntent::Comparison
    } else if COMMERCIAL_MARKERS.is_match(topic) {
        SearchIntent::Commercial
    } else {
        SearchIntent::Informational
    }
}

pub fn is_valid_question(question: &str) -> bool {
    let question = question.trim();
    question.chars().count() >= MIN_QUESTION_CHARS
        && INTERROGATIVE.is_match(question)
        && !GENERIC_QUESTION.is_match(question)
}

/// Drop invalid and duplicate questions, keeping at most [`MAX_QUESTIONS`].
pub fn filter_questions<I>(questions: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen: Vec<String> = Vec::new();
    let mut out = Vec::new();

    for question in questions {
        let question = question.trim().to_string();
        if !is_valid_question(&question) {
            debug!(question = %question, "question rejected");
            continue;
        }
        let key = dedup_key(&question);
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        out.push(question);
        if out.len() == MAX_QUESTIONS {
            break;
        }
    }
    out
}

fn dedup_key(question: &str) -> String {
    question
        .trim_end_matches(|c: char| c == '?' || c.is_whitespace())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Deterministic fallback questions for an intent.
pub fn template_questions(topic: &str, intent: SearchIntent, language: &str) -> Vec<String> {
    let subject = embed_topic(topic);
    let templates: &[&str] = if language.to_lowercase().starts_with("en") {
        match intent {
            SearchIntent::Informational => &[
                "What is {t}?",
                "Why does {t} matter?",
                "What are the main benefits of {t}?",
                "How does {t} work in practice?",
                "What should you watch out for with {t}?",
            ],
            SearchIntent::HowTo => &[
                "What do you need to prepare before {t}?",
                "What are the steps for {t}?",
                "Which mistakes are common in {t}?",
                "How long does {t} usually take?",
                "How do you know {t} was done right?",
            ],
            SearchIntent::Commercial => &[
                "What are the best options for {t}?",
                "How much does {t} cost?",
                "What should you check before buying {t}?",
                "Where can you buy {t} from a trusted seller?",
                "What do reviews say about {t}?",
            ],
            SearchIntent::Comparison => &[
                "What are the main differences in {t}?",
                "Which option wins in {t}?",
                "What are the pros and cons of each option in {t}?",
                "When should you pick one option over the other in {t}?",
                "How do prices differ in {t}?",
            ],
        }
    } else {
        match intent {
            SearchIntent::Informational => &[
                "Apa itu {t}?",
                "Mengapa {t} penting?",
                "Apa saja manfaat utama {t}?",
                "Bagaimana {t} bekerja dalam praktik?",
                "Apa saja yang perlu diperhatikan tentang {t}?",
            ],
            SearchIntent::HowTo => &[
                "Apa saja yang perlu disiapkan sebelum {t}?",
                "Bagaimana langkah-langkah {t}?",
                "Kesalahan apa yang sering terjadi dalam {t}?",
                "Berapa lama waktu yang dibutuhkan untuk {t}?",
                "Bagaimana mengetahui {t} sudah berhasil?",
            ],
            SearchIntent::Commercial => &[
                "Apa saja pilihan terbaik untuk {t}?",
                "Berapa kisaran harga {t}?",
                "Apa yang harus diperhatikan sebelum membeli {t}?",
                "Di mana bisa membeli {t} yang terpercaya?",
                "Bagaimana ulasan pengguna tentang {t}?",
            ],
            SearchIntent::Comparison => &[
                "Apa perbedaan utama dalam {t}?",
                "Mana yang lebih unggul dalam {t}?",
                "Apa kelebihan dan kekurangan masing-masing pilihan dalam {t}?",
                "Kapan sebaiknya memilih salah satu opsi dalam {t}?",
                "Berapa selisih harga dalam {t}?",
            ],
        }
    };

    filter_questions(templates.iter().map(|t| t.replace("{t}", &subject)))
}

/// Topic text suitable for the middle of a sentence.
fn embed_topic(topic: &str) -> String {
    let topic = topic.trim().trim_end_matches(['?', '.', '!']).trim();
    let mut chars = topic.chars();
    match (chars.next(), chars.next()) {
        // keep acronyms such as "NPK"
        (Some(first), Some(second)) if first.is_uppercase() && !second.is_uppercase() => {
            first.to_lowercase().chain(topic.chars().skip(1)).collect()
        }
        _ => topic.to_string(),
    }
}
