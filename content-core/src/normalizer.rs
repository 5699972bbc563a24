//! Turns an engine response into one answer per planned question.
//!
//! The response shape is resolved once into [`NormalizedResponse`]. Flat content is
//! carved into sections by keyword overlap, then position, then loose paragraphs,
//! and finally a placeholder answer that is meant to fail QC.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::engine::{EngineResponse, RawImage, RawSection};
use crate::text::{count_matches, escape_html, keywords, strip_markup};
use crate::{Error, Result};

/// Blocks at or below this many characters are too thin to answer a question.
const MIN_BLOCK_CHARS: usize = 50;
/// Most paragraphs gathered for one answer in the paragraph fallback.
const MAX_FALLBACK_PARAGRAPHS: usize = 3;

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h([1-6])[^>]*>(.*?)</h[1-6]\s*>").unwrap());
static PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<p[^>]*>.*?</p\s*>").unwrap());
static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());

/// Shape of an engine response, resolved once.
#[derive(Debug)]
pub enum NormalizedResponse<'a> {
    SectionsNative(&'a [RawSection]),
    FlatContent(&'a str),
}

impl<'a> NormalizedResponse<'a> {
    pub fn resolve(response: &'a EngineResponse) -> Result<Self> {
        if let Some(sections) = response.sections.as_deref() {
            if sections.iter().any(|s| !s.answer_html.trim().is_empty()) {
                return Ok(NormalizedResponse::SectionsNative(sections));
            }
        }
        match response.flat_content() {
            Some(content) => Ok(NormalizedResponse::FlatContent(content)),
            None => Err(Error::ValidationFailure(
                "content engine returned neither sections nor long-form content".to_string(),
            )),
        }
    }
}

/// How an answer was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Native,
    Heading,
    Position,
    Paragraphs,
    Placeholder,
}

/// An answer paired with its planned question, before QC.
#[derive(Debug, Clone)]
pub struct NormalizedSection {
    pub question: String,
    pub answer_html: String,
    pub image: Option<RawImage>,
    pub matched_by: MatchKind,
}

/// One answer per planned question, in planned order.
pub fn normalize(
    response: &EngineResponse,
    questions: &[String],
    language: &str,
) -> Result<Vec<NormalizedSection>> {
    let sections = match NormalizedResponse::resolve(response)? {
        NormalizedResponse::SectionsNative(raw) => map_native(raw, questions, language),
        NormalizedResponse::FlatContent(html) => carve_flat(html, questions, language),
    };

    for section in &sections {
        debug!(
            question = %section.question,
            matched_by = ?section.matched_by,
            "section normalized"
        );
    }
    Ok(sections)
}

/// Placeholder answer naming the unanswered question.
pub fn placeholder_answer(question: &str, language: &str) -> String {
    let prefix = if language.to_lowercase().starts_with("en") {
        "Answer for"
    } else {
        "Jawaban untuk"
    };
    format!("<p>{}: {}</p>", prefix, escape_html(question.trim()))
}

fn same_question(a: &str, b: &str) -> bool {
    let norm = |s: &str| {
        s.trim()
            .trim_end_matches('?')
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    };
    norm(a) == norm(b)
}

fn map_native(raw: &[RawSection], questions: &[String], language: &str) -> Vec<NormalizedSection> {
    let mut claimed = vec![false; raw.len()];

    questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let usable = |i: usize| !claimed[i] && !raw[i].answer_html.trim().is_empty();
            let found = (0..raw.len())
                .find(|&i| usable(i) && same_question(&raw[i].question, question))
                .or_else(|| (index < raw.len() && usable(index)).then_some(index));

            match found {
                Some(i) => {
                    claimed[i] = true;
                    NormalizedSection {
                        question: question.clone(),
                        answer_html: raw[i].answer_html.trim().to_string(),
                        image: raw[i].image.clone().map(|img| img.into_raw()),
                        matched_by: MatchKind::Native,
                    }
                }
                None => placeholder_section(question, language),
            }
        })
        .collect()
}

fn placeholder_section(question: &str, language: &str) -> NormalizedSection {
    NormalizedSection {
        question: question.to_string(),
        answer_html: placeholder_answer(question, language),
        image: None,
        matched_by: MatchKind::Placeholder,
    }
}

/// A heading and the markup up to the next heading.
#[derive(Debug)]
struct Block {
    heading: String,
    body_html: String,
    body_text: String,
}

fn split_blocks(html: &str) -> Vec<Block> {
    let headings: Vec<_> = HEADING.captures_iter(html).collect();
    let mut blocks = Vec::with_capacity(headings.len());

    for (i, caps) in headings.iter().enumerate() {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let body_end = headings
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(html.len(), |m| m.start());
        let body_html = html[whole.end()..body_end].trim().to_string();
        blocks.push(Block {
            heading: strip_markup(&caps[2]),
            body_text: strip_markup(&body_html),
            body_html,
        });
    }
    blocks
}

fn split_paragraphs(html: &str) -> Vec<String> {
    let tagged: Vec<String> = PARAGRAPH
        .find_iter(html)
        .map(|m| m.as_str().trim().to_string())
        .collect();
    if !tagged.is_empty() {
        return tagged;
    }
    BLANK_LINES
        .split(html)
        .map(str::trim)
        .filter(|p| !p.is_empty() && !HEADING.is_match(p))
        .map(|p| format!("<p>{}</p>", p))
        .collect()
}

fn carve_flat(html: &str, questions: &[String], language: &str) -> Vec<NormalizedSection> {
    let blocks = split_blocks(html);
    let paragraphs = split_paragraphs(html);
    let mut used = vec![false; blocks.len()];

    questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let kw = keywords(question);

            // 1. best keyword overlap
            let best = blocks
                .iter()
                .enumerate()
                .filter(|(i, _)| !used[*i])
                .map(|(i, b)| (i, count_matches(&kw, &format!("{} {}", b.heading, b.body_text))))
                .filter(|(_, score)| *score > 0)
                .fold(None, |best: Option<(usize, usize)>, (i, score)| match best {
                    Some((_, top)) if top >= score => best,
                    _ => Some((i, score)),
                });
            if let Some((i, _)) = best {
                if blocks[i].body_text.chars().count() > MIN_BLOCK_CHARS {
                    used[i] = true;
                    return section(question, &blocks[i].body_html, MatchKind::Heading);
                }
            }

            // 2. same position
            if index < blocks.len() && !used[index] && !blocks[index].body_text.is_empty() {
                used[index] = true;
                return section(question, &blocks[index].body_html, MatchKind::Position);
            }

            // 3. loose paragraphs mentioning the question
            let gathered: Vec<&str> = paragraphs
                .iter()
                .filter(|p| count_matches(&kw, &strip_markup(p)) > 0)
                .take(MAX_FALLBACK_PARAGRAPHS)
                .map(String::as_str)
                .collect();
            if !gathered.is_empty() {
                return section(question, &gathered.join("\n"), MatchKind::Paragraphs);
            }

            // 4. surface the gap
            placeholder_section(question, language)
        })
        .collect()
}

fn section(question: &str, answer_html: &str, matched_by: MatchKind) -> NormalizedSection {
    NormalizedSection {
        question: question.to_string(),
        answer_html: answer_html.to_string(),
        image: None,
        matched_by,
    }
}
