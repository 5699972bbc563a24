//! Content Generation Lambda - Turns a topic into a quality-checked draft.
//!
//! Endpoints:
//! - POST /v1/content/generate - Generate a draft for a topic and category
//! - POST /v1/content/questions - Preview the question plan without generating

use content_core::catalog::{create_pool, fetch_category, fetch_products};
use content_core::http::{error_response, json_response, pipeline_error_response, ApiResponse};
use content_core::models::{ContentType, Draft, GenerationRequest, SearchIntent, SeoInput};
use content_core::{
    get_database_credentials, get_engine_api_key, parse_body, Config, ContentPipeline,
    EditorSession, EngineClient, GenerationState, ImageState,
};
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use validator::Validate;

/// Generate content request
#[derive(Debug, Deserialize, Validate)]
struct GenerateContentRequest {
    #[validate(length(min = 1, max = 200))]
    topic: String,
    #[validate(length(min = 1))]
    category_id: String,
    #[serde(default = "default_content_type")]
    content_type: ContentType,
    #[serde(default = "default_language")]
    #[validate(length(min = 2, max = 5))]
    language: String,
    audience: Option<String>,
    brand_voice: Option<String>,
    intent: Option<SearchIntent>,
    #[validate(range(min = 1))]
    product_limit: Option<usize>,
    #[serde(default)]
    product_aware: bool,
    primary_keyword: Option<String>,
    #[serde(default)]
    secondary_keywords: Vec<String>,
}

fn default_content_type() -> ContentType {
    ContentType::Blog
}

fn default_language() -> String {
    "id".to_string()
}

impl GenerateContentRequest {
    fn wants_products(&self) -> bool {
        self.content_type == ContentType::Product || self.product_aware
    }

    fn product_limit(&self, max: usize) -> usize {
        self.product_limit.unwrap_or(max).min(max)
    }

    fn seo_input(&self) -> SeoInput {
        SeoInput {
            primary_keyword: self
                .primary_keyword
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(String::from),
            secondary_keywords: self.secondary_keywords.clone(),
        }
    }
}

/// Generate content response
#[derive(Debug, Serialize)]
struct GenerateContentResponse<'a> {
    draft: &'a Draft,
    generation_state: &'a GenerationState,
    image_state: &'a ImageState,
    can_publish: bool,
}

/// Session state returned alongside a failure
#[derive(Debug, Serialize)]
struct SessionStateResponse<'a> {
    generation_state: &'a GenerationState,
    image_state: &'a ImageState,
    can_publish: bool,
}

/// Application state
struct AppState {
    db_pool: PgPool,
    pipeline: ContentPipeline,
    product_limit_max: usize,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env().map_err(|e| format!("Missing configuration: {}", e))?;
        let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let secrets_client = aws_sdk_secretsmanager::Client::new(&aws);

        let credentials = get_database_credentials(&secrets_client, &config.db_secret_arn).await?;
        let db_pool = create_pool(&config, &credentials).await?;

        let availability = config.engine_availability();
        let engine = match (&config.engine_url, availability.is_available()) {
            (Some(url), true) => {
                let api_key = match &config.engine_secret_arn {
                    Some(arn) => Some(get_engine_api_key(&secrets_client, arn).await?),
                    None => None,
                };
                Some(
                    EngineClient::new(url.clone(), api_key)?
                        .with_timeouts(config.plan_timeout(), config.generate_timeout()),
                )
            }
            _ => None,
        };
        if let content_core::EngineAvailability::Disabled(reason) = &availability {
            warn!(reason = %reason, "AI generation disabled");
        }

        Ok(Self {
            db_pool,
            pipeline: ContentPipeline::new(engine, availability, config.product_limit_max),
            product_limit_max: config.product_limit_max,
        })
    }

    /// Resolve catalog references into a pipeline request.
    async fn build_request(
        &self,
        request: &GenerateContentRequest,
    ) -> content_core::Result<GenerationRequest> {
        let category = fetch_category(&self.db_pool, request.category_id.trim()).await?;
        let products = if request.wants_products() {
            fetch_products(
                &self.db_pool,
                &category.id,
                request.product_limit(self.product_limit_max),
            )
            .await?
        } else {
            Vec::new()
        };

        Ok(GenerationRequest {
            topic: request.topic.trim().to_string(),
            category,
            content_type: request.content_type,
            language: request.language.trim().to_lowercase(),
            audience: request.audience.clone(),
            brand_voice: request.brand_voice.clone(),
            intent_hint: request.intent,
            products,
            seo: request.seo_input(),
        })
    }
}

fn validation_response(
    request: &GenerateContentRequest,
    product_limit_max: usize,
) -> Result<Option<Response<Body>>, Error> {
    if let Err(e) = request.validate() {
        return Ok(Some(error_response(400, "request", format!("Invalid request: {}", e))?));
    }
    if request.product_limit.is_some_and(|limit| limit > product_limit_max) {
        return Ok(Some(error_response(
            400,
            "request",
            format!("product_limit must be at most {}", product_limit_max),
        )?));
    }
    Ok(None)
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let method = event.method().as_str();
    let path = event.uri().path();
    let call_id = Uuid::new_v4();

    info!(%call_id, "Content request: {} {}", method, path);

    match (method, path) {
        ("POST", "/v1/content/generate") => {
            let request: GenerateContentRequest = parse_body!(event.body());
            if let Some(response) = validation_response(&request, state.product_limit_max)? {
                return Ok(response);
            }

            let generation_request = match state.build_request(&request).await {
                Ok(r) => r,
                Err(e) => return pipeline_error_response(&e),
            };

            let mut session = EditorSession::new();
            let result = session
                .generate(&state.pipeline, &generation_request)
                .await
                .map(|_| ());

            match result {
                Ok(()) => {
                    let Some(draft) = session.draft() else {
                        return error_response(500, "assembly", "Draft missing after generation");
                    };
                    json_response(
                        200,
                        &ApiResponse::success(GenerateContentResponse {
                            draft,
                            generation_state: session.text_state(),
                            image_state: session.image_state(),
                            can_publish: session.can_publish(),
                        }),
                    )
                }
                Err(e) => {
                    warn!(%call_id, step = e.step(), error = %e, "Content generation failed");
                    json_response(
                        e.status_code(),
                        &ApiResponse::failure(
                            e.step(),
                            e.to_string(),
                            Some(SessionStateResponse {
                                generation_state: session.text_state(),
                                image_state: session.image_state(),
                                can_publish: session.can_publish(),
                            }),
                        ),
                    )
                }
            }
        }

        ("POST", "/v1/content/questions") => {
            let request: GenerateContentRequest = parse_body!(event.body());
            if let Some(response) = validation_response(&request, state.product_limit_max)? {
                return Ok(response);
            }

            let plan = match state.build_request(&request).await {
                Ok(r) => state.pipeline.plan(&r).await,
                Err(e) => Err(e),
            };
            match plan {
                Ok(plan) => json_response(200, &ApiResponse::success(plan)),
                Err(e) => pipeline_error_response(&e),
            }
        }

        _ => error_response(404, "request", "Not found"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new().await?);
    let state_clone = state.clone();

    run(service_fn(move |event| {
        let state = state_clone.clone();
        async move { handler(state, event).await }
    }))
    .await
}
