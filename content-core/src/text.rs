//! Plain-text helpers shared by the normalizer, QC scorer and image advisor.

use std::sync::LazyLock;

use regex::Regex;

static SCRIPT_BLOCKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").unwrap());
static BLOCK_BREAKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(p|div|li|h[1-6]|tr|blockquote|figcaption)>").unwrap()
});
static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Words ignored when extracting question keywords.
const STOP_WORDS: &[&str] = &[
    // Indonesian
    "cara", "yang", "untuk", "dengan", "dari", "pada", "adalah", "atau", "dalam", "akan", "bisa",
    "saja", "apakah", "bagaimana", "mengapa", "kenapa", "berapa", "kapan", "dimana",
    "siapa", "agar", "supaya", "tersebut", "lebih", "harus", "perlu", "juga", "sudah",
    "belum", "tidak", "para", "oleh", "sebelum", "sesudah", "setelah", "saat", "ketika",
    // English
    "what", "when", "where", "which", "while", "with", "from", "does", "have", "your",
    "about", "this", "that", "these", "those", "there", "their", "they", "should",
    "would", "could", "into", "than", "then", "them", "will",
];

/// Strip markup to whitespace-normalized plain text.
pub fn strip_markup(html: &str) -> String {
    let text = SCRIPT_BLOCKS.replace_all(html, " ");
    let text = BLOCK_BREAKS.replace_all(&text, " ");
    let text = TAGS.replace_all(&text, "");
    let text = decode_entities(&text);
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#039;", "'")
        .replace("&amp;", "&")
}

/// Escape text for inclusion in HTML.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Split plain text into sentences on `.`, `!` or `?` followed by whitespace or the end.
pub fn sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        let boundary = matches!(c, '.' | '!' | '?')
            && chars.peek().map_or(true, |next| next.is_whitespace());
        if boundary {
            let sentence = current.trim();
            if !sentence.is_empty() {
                out.push(sentence.to_string());
            }
            current.clear();
        }
    }

    let rest = current.trim();
    if !rest.is_empty() {
        out.push(rest.to_string());
    }
    out
}

/// First sentence of plain text, or an empty string.
pub fn first_sentence(text: &str) -> String {
    sentences(text).into_iter().next().unwrap_or_default()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Question keywords: lowercase words longer than three characters, minus stop words.
pub fn keywords(question: &str) -> Vec<String> {
    let lower = question.to_lowercase();
    let mut out: Vec<String> = Vec::new();
    for word in lower.split(|c: char| !c.is_alphanumeric()) {
        if word.chars().count() <= 3 || STOP_WORDS.contains(&word) {
            continue;
        }
        if !out.iter().any(|w| w == word) {
            out.push(word.to_string());
        }
    }
    out
}

/// Number of keywords that occur in `text`.
pub fn count_matches(keywords: &[String], text: &str) -> usize {
    let lower = text.to_lowercase();
    keywords.iter().filter(|k| lower.contains(k.as_str())).count()
}

/// Truncate to `max_chars`, ending with an ellipsis when shortened.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", kept.trim_end())
}

/// URL slug: ASCII lowercase alphanumerics joined by single hyphens.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(c.to_ascii_lowercase());
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }
    slug
}
