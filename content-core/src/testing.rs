//! Fixtures shared by unit tests.

use crate::models::{CategoryRef, ContentType, GenerationRequest, SeoInput};

pub(crate) fn category() -> CategoryRef {
    CategoryRef {
        id: "cat-pupuk".to_string(),
        name: "Pupuk".to_string(),
        ancestors: vec!["Pertanian".to_string()],
        content_types: vec![ContentType::Blog],
        level: 2,
        is_structural: false,
        keyword_tree: None,
    }
}

pub(crate) fn request() -> GenerationRequest {
    GenerationRequest {
        topic: "Cara memilih pupuk NPK untuk cabai".to_string(),
        category: category(),
        content_type: ContentType::Blog,
        language: "id".to_string(),
        audience: None,
        brand_voice: None,
        intent_hint: None,
        products: Vec::new(),
        seo: SeoInput::default(),
    }
}
