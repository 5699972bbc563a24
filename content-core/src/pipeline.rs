//! One generation request, from question planning to the assembled draft.

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::assembler::{assemble, DraftParts};
use crate::config::EngineAvailability;
use crate::engine::{EngineClient, GenerationPayload};
use crate::imagery::place_images;
use crate::models::{steps, Draft, GenerationRequest, Section, StepOutcome, Warning};
use crate::normalizer::{normalize, MatchKind};
use crate::planner::{QuestionPlan, QuestionPlanner};
use crate::{qc, Error, Result};

/// Runs generation requests against the content engine.
///
/// Holds no per-request state; one instance serves concurrent requests.
#[derive(Debug, Clone)]
pub struct ContentPipeline {
    planner: QuestionPlanner,
    engine: Option<EngineClient>,
    availability: EngineAvailability,
    product_limit_max: usize,
}

impl ContentPipeline {
    pub fn new(
        engine: Option<EngineClient>,
        availability: EngineAvailability,
        product_limit_max: usize,
    ) -> Self {
        let engine = engine.filter(|_| availability.is_available());
        Self {
            planner: QuestionPlanner::new(engine.clone()),
            engine,
            availability,
            product_limit_max,
        }
    }

    /// Plan questions without generating anything.
    pub async fn plan(&self, request: &GenerationRequest) -> Result<QuestionPlan> {
        request.validate(self.product_limit_max)?;
        Ok(self
            .planner
            .plan(
                &request.topic,
                &request.category,
                &request.language,
                request.intent_hint,
            )
            .await)
    }

    /// Generate a draft. Text-path failures are returned as errors, never as
    /// an empty draft.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<Draft> {
        let request_id = Uuid::new_v4();
        info!(
            %request_id,
            topic = %request.topic,
            category = %request.category.name,
            content_type = request.content_type.as_str(),
            products = request.products.len(),
            "Content generation requested"
        );

        request.validate(self.product_limit_max)?;
        let engine = self.engine()?;

        let mut outcomes = Vec::new();
        let mut warnings = Vec::new();

        let plan = self.plan(request).await?;
        match &plan.degraded {
            Some(reason) => {
                warnings.push(Warning::new(steps::PLANNING, reason.clone()));
                outcomes.push(StepOutcome::failed(steps::PLANNING, reason.clone()));
            }
            None => outcomes.push(StepOutcome::ok(steps::PLANNING)),
        }

        let payload = GenerationPayload::new(request, plan.intent, &plan.questions);
        let response = engine.generate(&payload).await.map_err(|e| {
            let err = Error::from(e);
            error!(%request_id, step = err.step(), error = %err, "Content generation failed");
            err
        })?;
        outcomes.push(StepOutcome::ok(steps::GENERATION));

        let normalized = normalize(&response, &plan.questions, &request.language)?;
        let unanswered: Vec<&str> = normalized
            .iter()
            .filter(|s| s.matched_by == MatchKind::Placeholder)
            .map(|s| s.question.as_str())
            .collect();
        for question in &unanswered {
            warnings.push(Warning::new(
                steps::NORMALIZATION,
                format!("The generated content does not answer \"{}\"", question),
            ));
        }
        outcomes.push(if unanswered.is_empty() {
            StepOutcome::ok(steps::NORMALIZATION)
        } else {
            StepOutcome::failed(
                steps::NORMALIZATION,
                format!("{} questions left unanswered", unanswered.len()),
            )
        });

        let mut candidates = Vec::with_capacity(normalized.len());
        let mut sections: Vec<Section> = normalized
            .into_iter()
            .map(|n| {
                let report = qc::score(&n.question, &n.answer_html);
                candidates.push(n.image);
                Section {
                    question: n.question,
                    answer_html: n.answer_html,
                    qc_status: report.status,
                    qc_scores: report.scores,
                    failure_reason: report.failure_reason,
                    image: None,
                }
            })
            .collect();

        let hero_alt = response
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| request.topic.trim())
            .to_string();
        let placement = place_images(&mut sections, candidates, &response.images, &hero_alt);
        if placement.dropped_placeholders > 0 {
            warn!(
                %request_id,
                dropped = placement.dropped_placeholders,
                "Placeholder images dropped"
            );
            warnings.push(Warning::new(
                steps::IMAGE,
                format!(
                    "Dropped {} image(s) with an empty or placeholder URL",
                    placement.dropped_placeholders
                ),
            ));
        }

        let draft = assemble(DraftParts {
            request,
            intent: plan.intent,
            sections,
            hero_image: placement.hero,
            engine: &response,
            steps: outcomes,
            warnings,
        })?;

        info!(
            %request_id,
            draft_id = %draft.id,
            sections = draft.sections.len(),
            images = draft.image_count(),
            qc_status = ?draft.qc_status,
            warnings = draft.warnings.len(),
            "Draft assembled"
        );
        Ok(draft)
    }

    fn engine(&self) -> Result<&EngineClient> {
        match (&self.availability, &self.engine) {
            (EngineAvailability::Disabled(reason), _) => {
                Err(Error::EngineUnavailable(reason.clone()))
            }
            (EngineAvailability::Available, Some(engine)) => Ok(engine),
            (EngineAvailability::Available, None) => Err(Error::EngineUnavailable(
                "no content engine client was configured".to_string(),
            )),
        }
    }
}
