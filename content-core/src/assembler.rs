//! Draft assembly.
//!
//! Merges scored sections, images and SEO fields into a [`Draft`]. Secondary
//! keywords are only ever passed through from the caller, the category keyword
//! tree or the engine.

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use uuid::Uuid;

use crate::engine::EngineResponse;
use crate::models::{
    steps, Draft, GenerationRequest, ImageAsset, ImageMapEntry, ImageRole, QcStatus, SearchIntent,
    Section, SeoBlock, StepOutcome, Warning,
};
use crate::text::{escape_html, slugify, strip_markup, truncate_with_ellipsis};
use crate::{Error, Result};

const EXCERPT_MAX_CHARS: usize = 160;

static TOP_HEADINGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(/?)h[12](\s|>)").unwrap());

/// Everything the assembler needs for one draft.
#[derive(Debug)]
pub struct DraftParts<'a> {
    pub request: &'a GenerationRequest,
    pub intent: SearchIntent,
    /// Scored sections in planned question order
    pub sections: Vec<Section>,
    pub hero_image: Option<ImageAsset>,
    pub engine: &'a EngineResponse,
    pub steps: Vec<StepOutcome>,
    pub warnings: Vec<Warning>,
}

pub fn assemble(parts: DraftParts<'_>) -> Result<Draft> {
    let DraftParts {
        request,
        intent,
        sections,
        hero_image,
        engine,
        steps: mut outcomes,
        mut warnings,
    } = parts;

    if sections.is_empty() {
        return Err(Error::ValidationFailure(
            "draft has no answer sections".to_string(),
        ));
    }

    let title = non_blank(engine.title.as_deref())
        .unwrap_or_else(|| request.topic.trim())
        .to_string();
    let content_html = render_content(&sections);
    if title.is_empty() || strip_markup(&content_html).is_empty() {
        return Err(Error::ValidationFailure(
            "draft is missing a title or content".to_string(),
        ));
    }

    let id = Uuid::new_v4();
    let slug = match slugify(&title) {
        s if s.is_empty() => format!("draft-{}", id.simple()),
        s => s,
    };
    let excerpt = excerpt(engine, &sections);
    let seo = seo_block(request, engine, &title, &excerpt);
    let image_map = image_map(hero_image.as_ref(), &sections);

    let failed: Vec<(usize, &Section)> = sections
        .iter()
        .enumerate()
        .filter(|(_, s)| s.qc_status == QcStatus::Fail)
        .collect();
    for (i, section) in &failed {
        let reason = section.failure_reason.map_or("qc", |r| r.as_str());
        warnings.push(Warning::new(
            steps::QC,
            format!(
                "Section {} (\"{}\") failed QC on {}",
                i + 1,
                section.question,
                reason
            ),
        ));
    }
    outcomes.push(if failed.is_empty() {
        StepOutcome::ok(steps::QC)
    } else {
        StepOutcome::failed(
            steps::QC,
            format!("{} of {} sections failed QC", failed.len(), sections.len()),
        )
    });
    let qc_failed_sections = failed.len();

    if image_map.is_empty() {
        warnings.push(Warning::new(
            steps::IMAGE,
            "No usable images were generated; upload images manually before publishing",
        ));
        outcomes.push(StepOutcome::failed(steps::IMAGE, "no usable images"));
    } else {
        outcomes.push(StepOutcome::ok(steps::IMAGE));
    }
    outcomes.push(StepOutcome::ok(steps::ASSEMBLY));

    Ok(Draft {
        id,
        title,
        slug,
        excerpt,
        content_html,
        content_type: request.content_type,
        intent,
        product_aware: request.is_product_aware(),
        product_names: request.products.iter().map(|p| p.name.clone()).collect(),
        seo,
        hero_image,
        qc_status: if qc_failed_sections == 0 {
            QcStatus::Pass
        } else {
            QcStatus::Fail
        },
        qc_failed_sections,
        sections,
        image_map,
        steps: outcomes,
        warnings,
        generated_at: Utc::now(),
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Heading, optional image, then the answer, for every section in order.
fn render_content(sections: &[Section]) -> String {
    let mut html = String::new();
    for section in sections {
        html.push_str(&format!("<h2>{}</h2>\n", escape_html(section.question.trim())));
        if let Some(image) = &section.image {
            html.push_str(&format!(
                "<figure><img src=\"{}\" alt=\"{}\" loading=\"lazy\"></figure>\n",
                escape_html(&image.url),
                escape_html(&image.alt_text)
            ));
        }
        html.push_str(&demote_headings(section.answer_html.trim()));
        html.push('\n');
    }
    html
}

/// Answers may not open headings at section level.
fn demote_headings(answer_html: &str) -> String {
    TOP_HEADINGS
        .replace_all(answer_html, "<${1}h3${2}")
        .into_owned()
}

fn excerpt(engine: &EngineResponse, sections: &[Section]) -> String {
    if let Some(excerpt) = non_blank(engine.excerpt.as_deref()) {
        return truncate_with_ellipsis(excerpt, EXCERPT_MAX_CHARS);
    }
    let first_answer = sections
        .iter()
        .map(|s| strip_markup(&s.answer_html))
        .find(|text| !text.is_empty())
        .unwrap_or_default();
    truncate_with_ellipsis(&first_answer, EXCERPT_MAX_CHARS)
}

fn seo_block(
    request: &GenerationRequest,
    engine: &EngineResponse,
    title: &str,
    excerpt: &str,
) -> SeoBlock {
    let engine_seo = engine.seo.as_ref();
    let tree = request.category.keyword_tree.as_ref();

    let primary_keyword = non_blank(request.seo.primary_keyword.as_deref())
        .or_else(|| engine_seo.and_then(|s| non_blank(s.primary_keyword.as_deref())))
        .or_else(|| tree.and_then(|t| non_blank(Some(t.primary.as_str()))))
        .map(String::from)
        .unwrap_or_else(|| request.topic.trim().to_lowercase());

    let secondary_keywords = merge_keywords(
        request
            .seo
            .secondary_keywords
            .iter()
            .chain(tree.into_iter().flat_map(|t| t.secondary.iter()))
            .chain(engine_seo.into_iter().flat_map(|s| s.secondary_keywords.iter())),
        &primary_keyword,
    );

    SeoBlock {
        title: engine_seo
            .and_then(|s| non_blank(s.title.as_deref()))
            .unwrap_or(title)
            .to_string(),
        description: engine_seo
            .and_then(|s| non_blank(s.description.as_deref()))
            .unwrap_or(excerpt)
            .to_string(),
        primary_keyword,
        secondary_keywords,
        long_tail_keywords: tree.map(|t| t.long_tail.clone()).unwrap_or_default(),
    }
}

/// Verbatim keywords, first spelling wins, without the primary keyword.
fn merge_keywords<'a>(keywords: impl Iterator<Item = &'a String>, primary: &str) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for keyword in keywords {
        let keyword = keyword.trim();
        if keyword.is_empty()
            || keyword.eq_ignore_ascii_case(primary)
            || merged.iter().any(|k| k.eq_ignore_ascii_case(keyword))
        {
            continue;
        }
        merged.push(keyword.to_string());
    }
    merged
}

fn image_map(hero: Option<&ImageAsset>, sections: &[Section]) -> Vec<ImageMapEntry> {
    let hero_entry = hero.map(|image| ImageMapEntry {
        role: ImageRole::Hero,
        url: image.url.clone(),
        alt_text: image.alt_text.clone(),
        section_index: None,
        question: None,
    });
    let section_entries = sections.iter().enumerate().filter_map(|(i, section)| {
        section.image.as_ref().map(|image| ImageMapEntry {
            role: ImageRole::Section,
            url: image.url.clone(),
            alt_text: image.alt_text.clone(),
            section_index: Some(i),
            question: Some(section.question.clone()),
        })
    });
    hero_entry.into_iter().chain(section_entries).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RawSeo;
    use crate::models::{FailureReason, KeywordTree, QcScores};
    use crate::testing::request;

    fn section(question: &str, status: QcStatus) -> Section {
        Section {
            question: question.to_string(),
            answer_html: format!("<p>Jawaban lengkap untuk {}.</p>", question),
            qc_status: status,
            qc_scores: QcScores::default(),
            failure_reason: (status == QcStatus::Fail).then_some(FailureReason::Clarity),
            image: None,
        }
    }

    fn parts<'a>(
        request: &'a GenerationRequest,
        engine: &'a EngineResponse,
        sections: Vec<Section>,
    ) -> DraftParts<'a> {
        DraftParts {
            request,
            intent: SearchIntent::HowTo,
            sections,
            hero_image: None,
            engine,
            steps: vec![StepOutcome::ok(steps::GENERATION)],
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_content_has_one_heading_per_section_in_order() {
        let request = request();
        let engine = EngineResponse::default();
        let mut sections = vec![
            section("Apa saja yang perlu disiapkan?", QcStatus::Pass),
            section("Bagaimana langkah-langkahnya?", QcStatus::Pass),
            section("Berapa lama waktunya?", QcStatus::Pass),
        ];
        sections[1].answer_html = "<h2>Sub judul</h2><p>Isi.</p>".to_string();

        let draft = assemble(parts(&request, &engine, sections)).unwrap();

        assert_eq!(draft.content_html.matches("<h2>").count(), 3);
        let first = draft.content_html.find("perlu disiapkan").unwrap();
        let second = draft.content_html.find("langkah-langkahnya").unwrap();
        let third = draft.content_html.find("lama waktunya").unwrap();
        assert!(first < second && second < third);
        assert!(draft.content_html.contains("<h3>Sub judul</h3>"));
    }

    #[test]
    fn test_qc_status_and_warnings() {
        let request = request();
        let engine = EngineResponse::default();
        let sections = vec![
            section("Apa saja yang perlu disiapkan?", QcStatus::Pass),
            section("Bagaimana langkah-langkahnya?", QcStatus::Fail),
        ];
        let draft = assemble(parts(&request, &engine, sections)).unwrap();

        assert_eq!(draft.qc_status, QcStatus::Fail);
        assert_eq!(draft.qc_failed_sections, 1);
        let qc: Vec<_> = draft.warnings_for(steps::QC).collect();
        assert_eq!(qc.len(), 1);
        assert!(qc[0].message.contains("clarity"));
        assert!(draft
            .steps
            .iter()
            .any(|s| s.step == steps::QC && !s.ok));
    }

    #[test]
    fn test_image_map_is_always_present() {
        let request = request();
        let engine = EngineResponse::default();
        let draft = assemble(parts(
            &request,
            &engine,
            vec![section("Berapa lama waktunya?", QcStatus::Pass)],
        ))
        .unwrap();

        assert!(draft.image_map.is_empty());
        assert_eq!(draft.warnings_for(steps::IMAGE).count(), 1);
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["image_map"], serde_json::json!([]));
    }

    #[test]
    fn test_image_map_lists_hero_then_sections() {
        let request = request();
        let engine = EngineResponse::default();
        let mut sections = vec![section("Bagaimana langkah-langkahnya?", QcStatus::Pass)];
        sections[0].image = ImageAsset::new("https://cdn.toko.id/a.jpg", "Langkah", ImageRole::Section);
        let mut parts = parts(&request, &engine, sections);
        parts.hero_image = ImageAsset::new("https://cdn.toko.id/hero.jpg", "Sampul", ImageRole::Hero);

        let draft = assemble(parts).unwrap();
        assert_eq!(draft.image_map.len(), 2);
        assert_eq!(draft.image_map[0].role, ImageRole::Hero);
        assert_eq!(draft.image_map[1].section_index, Some(0));
        assert!(draft.content_html.contains("<img src=\"https://cdn.toko.id/a.jpg\""));
        assert!(draft.warnings_for(steps::IMAGE).next().is_none());
    }

    #[test]
    fn test_secondary_keywords_are_passed_through_only() {
        let mut request = request();
        request.seo.primary_keyword = Some("pupuk npk".to_string());
        request.seo.secondary_keywords = vec!["pupuk cabai".to_string(), "Pupuk NPK".to_string()];
        request.category.keyword_tree = Some(KeywordTree {
            primary: "pupuk".to_string(),
            secondary: vec!["PUPUK CABAI".to_string(), "npk mutiara".to_string()],
            long_tail: vec!["pupuk npk untuk cabai rawit".to_string()],
        });
        let engine = EngineResponse {
            seo: Some(RawSeo {
                secondary_keywords: vec!["dosis npk".to_string()],
                ..RawSeo::default()
            }),
            ..EngineResponse::default()
        };

        let draft = assemble(parts(
            &request,
            &engine,
            vec![section("Berapa lama waktunya?", QcStatus::Pass)],
        ))
        .unwrap();

        assert_eq!(draft.seo.primary_keyword, "pupuk npk");
        assert_eq!(
            draft.seo.secondary_keywords,
            vec!["pupuk cabai", "npk mutiara", "dosis npk"]
        );
        assert_eq!(draft.seo.long_tail_keywords, vec!["pupuk npk untuk cabai rawit"]);
    }

    #[test]
    fn test_no_secondary_keywords_when_none_supplied() {
        let request = request();
        let engine = EngineResponse::default();
        let draft = assemble(parts(
            &request,
            &engine,
            vec![section("Berapa lama waktunya?", QcStatus::Pass)],
        ))
        .unwrap();
        assert!(draft.seo.secondary_keywords.is_empty());
        assert_eq!(draft.seo.primary_keyword, "cara memilih pupuk npk untuk cabai");
    }

    #[test]
    fn test_title_slug_and_excerpt() {
        let request = request();
        let engine = EngineResponse {
            title: Some("Panduan Memilih Pupuk NPK".to_string()),
            ..EngineResponse::default()
        };
        let draft = assemble(parts(
            &request,
            &engine,
            vec![section("Berapa lama waktunya?", QcStatus::Pass)],
        ))
        .unwrap();

        assert_eq!(draft.title, "Panduan Memilih Pupuk NPK");
        assert_eq!(draft.slug, "panduan-memilih-pupuk-npk");
        assert_eq!(draft.excerpt, "Jawaban lengkap untuk Berapa lama waktunya?.");
        assert_eq!(draft.seo.description, draft.excerpt);
    }

    #[test]
    fn test_empty_sections_fail_validation() {
        let request = request();
        let engine = EngineResponse::default();
        assert!(matches!(
            assemble(parts(&request, &engine, Vec::new())),
            Err(Error::ValidationFailure(_))
        ));
    }
}
