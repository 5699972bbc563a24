//! HTTP client for the external content engine.
//!
//! [`EngineClient`] makes exactly one call per operation under a hard deadline and
//! classifies every failure into an [`EngineError`]. It never retries; dropping the
//! returned future cancels the in-flight request.

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_GENERATE_TIMEOUT_SECS, DEFAULT_PLAN_TIMEOUT_SECS};
use crate::models::{GenerationRequest, KeywordTree, ProductContext, SearchIntent};
use crate::{Error, Result};

/// Upstream error bodies are kept up to this many characters.
const ERROR_BODY_MAX_CHARS: usize = 500;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Content engine timed out after {}", format_deadline(.0))]
    Timeout(Duration),
    #[error("Content engine refused the connection: {0}")]
    ConnectionRefused(String),
    /// The request failed for a reason other than reachability, such as a bad URL.
    #[error("Content engine request failed: {0}")]
    RequestFailed(String),
    #[error("Content engine returned HTTP {status}: {body}")]
    ServiceError { status: u16, body: String },
    #[error("Content engine returned an unexpected body: {0}")]
    InvalidResponse(String),
}

/// Request for question suggestions.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionSuggestionRequest {
    pub topic: String,
    pub category_name: String,
    pub keyword_cluster: Vec<String>,
    pub intent: SearchIntent,
    pub language: String,
    pub max_questions: usize,
}

#[derive(Debug, Deserialize)]
struct QuestionSuggestionResponse {
    #[serde(default)]
    questions: Vec<String>,
}

/// Outbound generation payload.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationPayload {
    pub content_type: String,
    pub topic: String,
    pub questions: Vec<String>,
    pub intent: SearchIntent,
    pub category_name: String,
    pub keyword_cluster: Vec<String>,
    /// Keeps generated content inside the keyword cluster
    pub niche_lock: bool,
    pub product_aware: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<ProductContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_tree: Option<KeywordTree>,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_voice: Option<String>,
}

impl GenerationPayload {
    pub fn new(request: &GenerationRequest, intent: SearchIntent, questions: &[String]) -> Self {
        let product_aware = request.is_product_aware();
        Self {
            content_type: request.content_type.as_str().to_string(),
            topic: request.topic.trim().to_string(),
            questions: questions.to_vec(),
            intent,
            category_name: request.category.name.clone(),
            keyword_cluster: request.category.keyword_cluster(),
            niche_lock: true,
            product_aware,
            products: request.products.clone(),
            keyword_tree: request.category.keyword_tree.clone(),
            language: request.language.clone(),
            audience: request.audience.clone(),
            brand_voice: request.brand_voice.clone(),
        }
    }
}

/// Engine response; either `sections` or one of the flat content fields is set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineResponse {
    #[serde(default)]
    pub sections: Option<Vec<RawSection>>,
    #[serde(default)]
    pub content_html: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub images: Vec<RawImage>,
    #[serde(default)]
    pub seo: Option<RawSeo>,
}

impl EngineResponse {
    /// First non-blank flat content field, in `content_html`, `content`, `body` order.
    pub fn flat_content(&self) -> Option<&str> {
        [&self.content_html, &self.content, &self.body]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|c| !c.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSection {
    #[serde(default)]
    pub question: String,
    #[serde(default, alias = "answer")]
    pub answer_html: String,
    /// Engine-side verdict; informational only, QC is always recomputed
    #[serde(default)]
    pub qc_status: Option<String>,
    #[serde(default)]
    pub image: Option<ImageRef>,
}

/// Image given either as a bare URL or as an object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ImageRef {
    Url(String),
    Asset(RawImage),
}

impl ImageRef {
    pub fn into_raw(self) -> RawImage {
        match self {
            ImageRef::Url(url) => RawImage {
                url,
                ..RawImage::default()
            },
            ImageRef::Asset(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawImage {
    #[serde(default)]
    pub url: String,
    #[serde(default, alias = "alt_text")]
    pub alt: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub section_index: Option<usize>,
    #[serde(default)]
    pub question: Option<String>,
}

impl RawImage {
    pub fn is_hero(&self) -> bool {
        self.role
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case("hero"))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSeo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "meta_description")]
    pub description: Option<String>,
    #[serde(default)]
    pub primary_keyword: Option<String>,
    #[serde(default)]
    pub secondary_keywords: Vec<String>,
}

/// Client for the content engine.
#[derive(Debug, Clone)]
pub struct EngineClient {
    client: reqwest::Client,
    base_url: String,
    plan_timeout: Duration,
    generate_timeout: Duration,
}

impl EngineClient {
    /// Create a new engine client.
    pub fn new(base_url: String, api_key: Option<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            let value = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|e| Error::Config(format!("invalid engine API key: {}", e)))?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            plan_timeout: Duration::from_secs(DEFAULT_PLAN_TIMEOUT_SECS),
            generate_timeout: Duration::from_secs(DEFAULT_GENERATE_TIMEOUT_SECS),
        })
    }

    pub fn with_timeouts(mut self, plan_timeout: Duration, generate_timeout: Duration) -> Self {
        self.plan_timeout = plan_timeout;
        self.generate_timeout = generate_timeout;
        self
    }

    #[cfg(test)]
    pub(crate) fn for_tests(base_url: &str) -> Self {
        Self::new(base_url.to_string(), None).unwrap()
    }

    /// Ask the engine for candidate questions.
    pub async fn suggest_questions(
        &self,
        request: &QuestionSuggestionRequest,
    ) -> std::result::Result<Vec<String>, EngineError> {
        let response: QuestionSuggestionResponse =
            self.post_json("questions", request, self.plan_timeout).await?;
        Ok(response.questions)
    }

    /// Generate content for the planned questions.
    pub async fn generate(
        &self,
        payload: &GenerationPayload,
    ) -> std::result::Result<EngineResponse, EngineError> {
        let started = Instant::now();
        let response: EngineResponse = self
            .post_json("generate", payload, self.generate_timeout)
            .await?;
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            sections = response.sections.as_ref().map_or(0, Vec::len),
            images = response.images.len(),
            "content engine generation finished"
        );
        Ok(response)
    }

    async fn post_json<B, R>(
        &self,
        path: &str,
        body: &B,
        timeout: Duration,
    ) -> std::result::Result<R, EngineError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path);

        let call = async {
            let response = self
                .client
                .post(&url)
                .json(body)
                .send()
                .await
                .map_err(|e| classify_transport_error(e, timeout))?;

            let status = response.status();
            debug!(status = %status, path, "content engine response received");

            let text = response
                .text()
                .await
                .map_err(|e| classify_transport_error(e, timeout))?;

            if !status.is_success() {
                warn!(status = %status, path, "content engine returned an error status");
                return Err(EngineError::ServiceError {
                    status: status.as_u16(),
                    body: text.chars().take(ERROR_BODY_MAX_CHARS).collect(),
                });
            }

            serde_json::from_str::<R>(&text).map_err(|e| EngineError::InvalidResponse(e.to_string()))
        };

        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    path,
                    timeout_ms = timeout.as_millis() as u64,
                    "content engine call hit its deadline"
                );
                Err(EngineError::Timeout(timeout))
            }
        }
    }
}

fn classify_transport_error(err: reqwest::Error, timeout: Duration) -> EngineError {
    if err.is_timeout() {
        EngineError::Timeout(timeout)
    } else if err.is_connect() {
        EngineError::ConnectionRefused(err.to_string())
    } else if err.is_decode() || err.is_body() {
        EngineError::InvalidResponse(err.to_string())
    } else {
        EngineError::RequestFailed(err.to_string())
    }
}

/// Whole seconds when the deadline has no fractional part, milliseconds otherwise.
pub fn format_deadline(deadline: &Duration) -> String {
    match deadline.as_secs() {
        secs if deadline.subsec_nanos() == 0 && secs == 1 => "1 second".to_string(),
        secs if deadline.subsec_nanos() == 0 => format!("{} seconds", secs),
        _ => format!("{} ms", deadline.as_millis()),
    }
}
