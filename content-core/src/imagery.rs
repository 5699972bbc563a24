//! Image relevance, alt text derivation and image placement.

use std::collections::VecDeque;
use std::sync::LazyLock;

use regex::Regex;

use crate::engine::RawImage;
use crate::models::{is_placeholder_url, ImageAsset, ImageRole, Section, ALT_TEXT_MAX_CHARS};
use crate::text::{first_sentence, strip_markup, truncate_with_ellipsis};

/// Below this length the first sentence is too thin to describe an image.
const MIN_ALT_SENTENCE_CHARS: usize = 20;

static TUTORIAL_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(cara|langkah|tahap|tahapan|panduan|tutorial|step|steps|how to|guide)\b",
    )
    .unwrap()
});

static COMPARISON_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(vs|versus|perbandingan|bandingkan|perbedaan|dibandingkan|compare|comparison|difference)\b",
    )
    .unwrap()
});

static DEFINITION_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(apa itu|apa yang dimaksud|definisi|pengertian|arti|what is|what are|definition of|meaning of)\b",
    )
    .unwrap()
});

/// Whether a section benefits from a supporting image.
///
/// Requires a tutorial or comparison marker in the question or the answer, and
/// never applies to pure-definition questions.
pub fn needs_image(question: &str, answer_html: &str) -> bool {
    if is_definition_question(question) {
        return false;
    }
    let answer = strip_markup(answer_html);
    [question, answer.as_str()].iter().any(|text| {
        TUTORIAL_MARKERS.is_match(text) || COMPARISON_MARKERS.is_match(text)
    })
}

/// A question asking what something is, without asking how or which.
pub fn is_definition_question(question: &str) -> bool {
    DEFINITION_MARKERS.is_match(question)
        && !TUTORIAL_MARKERS.is_match(question)
        && !COMPARISON_MARKERS.is_match(question)
}

/// Alt text: the answer's first sentence, or the question when that sentence is thin.
pub fn alt_text(question: &str, answer_html: &str) -> String {
    let sentence = first_sentence(&strip_markup(answer_html));
    let source = if sentence.chars().count() < MIN_ALT_SENTENCE_CHARS {
        question.trim()
    } else {
        sentence.as_str()
    };
    truncate_with_ellipsis(source, ALT_TEXT_MAX_CHARS)
}

/// Result of placing engine images on a draft.
#[derive(Debug, Default)]
pub struct ImagePlacement {
    pub hero: Option<ImageAsset>,
    /// Candidates dropped for empty or placeholder URLs
    pub dropped_placeholders: usize,
    /// Candidates offered for sections that do not warrant an image
    pub skipped_irrelevant: usize,
}

/// Attach images to sections that warrant one and pick the hero image.
///
/// `section_candidates[i]` is an image the engine bound to section `i` directly.
/// Engine images with a `section_index` or matching `question` are bound the same
/// way; the rest fill image-worthy sections in order, and the first leftover
/// becomes the hero when the engine named none.
pub fn place_images(
    sections: &mut [Section],
    section_candidates: Vec<Option<RawImage>>,
    engine_images: &[RawImage],
    hero_alt: &str,
) -> ImagePlacement {
    let mut placement = ImagePlacement::default();
    let mut bound: Vec<Option<RawImage>> = vec![None; sections.len()];
    let mut loose: VecDeque<RawImage> = VecDeque::new();
    let mut hero: Option<RawImage> = None;

    let mut offer = |raw: RawImage, slot: Option<usize>, placement: &mut ImagePlacement| {
        if is_placeholder_url(&raw.url) {
            placement.dropped_placeholders += 1;
            return;
        }
        match slot {
            Some(i) if i < bound.len() && bound[i].is_none() => bound[i] = Some(raw),
            _ => loose.push_back(raw),
        }
    };

    for (i, candidate) in section_candidates.into_iter().enumerate() {
        if let Some(raw) = candidate {
            offer(raw, Some(i), &mut placement);
        }
    }
    for raw in engine_images {
        if raw.is_hero() {
            if is_placeholder_url(&raw.url) {
                placement.dropped_placeholders += 1;
            } else if hero.is_none() {
                hero = Some(raw.clone());
            }
            continue;
        }
        let slot = raw.section_index.or_else(|| {
            raw.question.as_deref().and_then(|q| {
                sections
                    .iter()
                    .position(|s| s.question.trim().eq_ignore_ascii_case(q.trim()))
            })
        });
        offer(raw.clone(), slot, &mut placement);
    }

    for (section, candidate) in sections.iter_mut().zip(bound) {
        if !needs_image(&section.question, &section.answer_html) {
            if candidate.is_some() {
                placement.skipped_irrelevant += 1;
            }
            continue;
        }
        if let Some(raw) = candidate.or_else(|| loose.pop_front()) {
            let alt = alt_text(&section.question, &section.answer_html);
            section.image = ImageAsset::new(raw.url, &alt, ImageRole::Section);
        }
    }

    let hero = hero.or_else(|| loose.pop_front());
    placement.hero = hero.and_then(|raw| {
        let alt = raw
            .alt
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(hero_alt)
            .to_string();
        ImageAsset::new(raw.url, &alt, ImageRole::Hero)
    });
    placement
}
