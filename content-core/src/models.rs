//! Shared data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::text::truncate_with_ellipsis;
use crate::{Error, Result};

/// Maximum alt text length in characters.
pub const ALT_TEXT_MAX_CHARS: usize = 125;

/// Step labels used in draft warnings and step outcomes.
pub mod steps {
    pub const PLANNING: &str = "planning";
    pub const GENERATION: &str = "generation";
    pub const NORMALIZATION: &str = "normalization";
    pub const QC: &str = "qc";
    pub const IMAGE: &str = "image";
    pub const ASSEMBLY: &str = "assembly";
}

/// Kind of content being generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Blog,
    Product,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Blog => "blog",
            ContentType::Product => "product",
        }
    }
}

/// Keyword structure attached to a category or product context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordTree {
    #[serde(default)]
    pub primary: String,
    #[serde(default)]
    pub secondary: Vec<String>,
    #[serde(default)]
    pub long_tail: Vec<String>,
}

/// Category the content is generated for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRef {
    /// Opaque category id
    pub id: String,
    /// Display name
    pub name: String,
    /// Ancestor names, nearest parent first
    #[serde(default)]
    pub ancestors: Vec<String>,
    /// Content types this category is tagged for
    #[serde(default)]
    pub content_types: Vec<ContentType>,
    /// Depth in the category tree, 1 for top-level
    pub level: u32,
    /// Structural categories only group other categories
    #[serde(default)]
    pub is_structural: bool,
    #[serde(default)]
    pub keyword_tree: Option<KeywordTree>,
}

impl CategoryRef {
    /// Category name followed by ancestor names, deduplicated.
    pub fn keyword_cluster(&self) -> Vec<String> {
        let mut cluster: Vec<String> = Vec::with_capacity(self.ancestors.len() + 1);
        for name in std::iter::once(&self.name).chain(self.ancestors.iter()) {
            let name = name.trim();
            if name.is_empty() || cluster.iter().any(|c| c.eq_ignore_ascii_case(name)) {
                continue;
            }
            cluster.push(name.to_string());
        }
        cluster
    }

    pub fn is_top_level(&self) -> bool {
        self.level <= 1 || self.is_structural
    }

    pub fn supports(&self, content_type: ContentType) -> bool {
        self.content_types.contains(&content_type)
    }
}

/// A product mentioned in product-aware mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductContext {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub short_description: String,
}

/// SEO fields supplied by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeoInput {
    #[serde(default)]
    pub primary_keyword: Option<String>,
    #[serde(default)]
    pub secondary_keywords: Vec<String>,
}

/// Search intent derived once per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchIntent {
    Informational,
    HowTo,
    Commercial,
    Comparison,
}

impl SearchIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchIntent::Informational => "informational",
            SearchIntent::HowTo => "how_to",
            SearchIntent::Commercial => "commercial",
            SearchIntent::Comparison => "comparison",
        }
    }
}

/// One content generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub topic: String,
    pub category: CategoryRef,
    pub content_type: ContentType,
    pub language: String,
    pub audience: Option<String>,
    pub brand_voice: Option<String>,
    pub intent_hint: Option<SearchIntent>,
    /// Products for product-aware mode; empty disables it
    pub products: Vec<ProductContext>,
    pub seo: SeoInput,
}

impl GenerationRequest {
    pub fn is_product_aware(&self) -> bool {
        !self.products.is_empty()
    }

    /// Re-check the caller's preconditions before any generation happens.
    pub fn validate(&self, product_limit_max: usize) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(Error::InvalidRequest("topic must not be empty".to_string()));
        }
        if self.language.trim().is_empty() {
            return Err(Error::InvalidRequest("language must not be empty".to_string()));
        }
        if !self.category.supports(self.content_type) {
            return Err(Error::InvalidRequest(format!(
                "category '{}' is not tagged for {} content",
                self.category.name,
                self.content_type.as_str()
            )));
        }
        if self.category.is_top_level() {
            return Err(Error::InvalidRequest(format!(
                "category '{}' is a top-level category; pick a more specific one for AI generation",
                self.category.name
            )));
        }
        if self.products.len() > product_limit_max {
            return Err(Error::InvalidRequest(format!(
                "at most {} products can be used, got {}",
                product_limit_max,
                self.products.len()
            )));
        }
        Ok(())
    }
}

/// Per-section QC verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QcStatus {
    Pass,
    Fail,
}

/// Three independent 0-100 scores for one section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QcScores {
    pub clarity: u8,
    pub snippet_readiness: u8,
    /// Lower is better
    pub generic_penalty: u8,
}

/// First threshold a section failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Clarity,
    SnippetReadiness,
    Generic,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::Clarity => "clarity",
            FailureReason::SnippetReadiness => "snippet_readiness",
            FailureReason::Generic => "generic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageRole {
    Hero,
    Section,
}

/// A validated image reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAsset {
    pub url: String,
    pub alt_text: String,
    pub role: ImageRole,
}

/// Substrings that mark a URL as a stand-in rather than a real image.
const PLACEHOLDER_MARKERS: &[&str] = &[
    "placeholder",
    "placehold.",
    "dummyimage",
    "example.com",
    "{{",
    "lorem",
];

/// True when the URL is empty or carries a placeholder marker.
pub fn is_placeholder_url(url: &str) -> bool {
    let url = url.trim().to_lowercase();
    url.is_empty() || PLACEHOLDER_MARKERS.iter().any(|m| url.contains(m))
}

impl ImageAsset {
    /// Build an asset, or `None` when the URL is empty or a placeholder.
    pub fn new(url: impl Into<String>, alt_text: &str, role: ImageRole) -> Option<Self> {
        let url = url.into();
        if is_placeholder_url(&url) {
            return None;
        }
        Some(Self {
            url: url.trim().to_string(),
            alt_text: truncate_with_ellipsis(alt_text.trim(), ALT_TEXT_MAX_CHARS),
            role,
        })
    }
}

/// One answered question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub question: String,
    pub answer_html: String,
    pub qc_status: QcStatus,
    pub qc_scores: QcScores,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<FailureReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageAsset>,
}

/// SEO block of a draft.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeoBlock {
    pub title: String,
    pub description: String,
    pub primary_keyword: String,
    pub secondary_keywords: Vec<String>,
    #[serde(default)]
    pub long_tail_keywords: Vec<String>,
}

/// Entry of the draft's image map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMapEntry {
    pub role: ImageRole,
    pub url: String,
    pub alt_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
}

/// Outcome of one pipeline step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepOutcome {
    pub fn ok(step: &str) -> Self {
        Self {
            step: step.to_string(),
            ok: true,
            error: None,
        }
    }

    pub fn failed(step: &str, error: impl Into<String>) -> Self {
        Self {
            step: step.to_string(),
            ok: false,
            error: Some(error.into()),
        }
    }
}

/// Non-fatal problem surfaced to the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub step: String,
    pub message: String,
}

impl Warning {
    pub fn new(step: &str, message: impl Into<String>) -> Self {
        Self {
            step: step.to_string(),
            message: message.into(),
        }
    }
}

/// The assembled output of one generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub content_html: String,
    pub content_type: ContentType,
    pub intent: SearchIntent,
    pub product_aware: bool,
    /// Products the content was biased toward
    pub product_names: Vec<String>,
    pub seo: SeoBlock,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hero_image: Option<ImageAsset>,
    pub sections: Vec<Section>,
    pub image_map: Vec<ImageMapEntry>,
    pub qc_status: QcStatus,
    pub qc_failed_sections: usize,
    pub steps: Vec<StepOutcome>,
    pub warnings: Vec<Warning>,
    pub generated_at: DateTime<Utc>,
}

impl Draft {
    /// Number of valid images carried by the draft.
    pub fn image_count(&self) -> usize {
        self.image_map.len()
    }

    pub fn warnings_for(&self, step: &str) -> impl Iterator<Item = &Warning> {
        let step = step.to_string();
        self.warnings.iter().filter(move |w| w.step == step)
    }
}
