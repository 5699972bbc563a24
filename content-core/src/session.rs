//! Per-editor coordination of one draft's text and image lifecycles.

use tracing::{info, warn};

use crate::models::{steps, Draft, GenerationRequest, ImageAsset, ImageRole};
use crate::pipeline::ContentPipeline;
use crate::state::{can_publish, GenerationState, GenerationStateMachine, ImageState, ImageStateMachine};
use crate::{Error, Result};

const TEXT_FAILED_IMAGE_REASON: &str = "Images were not generated because text generation failed";
const CANCELLED_REASON: &str = "Generation was cancelled before the content engine answered";

/// One editor working on one draft. Not shared between users.
#[derive(Debug, Default)]
pub struct EditorSession {
    text: GenerationStateMachine,
    image: ImageStateMachine,
    draft: Option<Draft>,
    manual_image: Option<ImageAsset>,
}

impl EditorSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text_state(&self) -> &GenerationState {
        self.text.state()
    }

    pub fn image_state(&self) -> &ImageState {
        self.image.state()
    }

    pub fn draft(&self) -> Option<&Draft> {
        self.draft.as_ref()
    }

    pub fn manual_image(&self) -> Option<&ImageAsset> {
        self.manual_image.as_ref()
    }

    /// Fail a run whose `generate` future was dropped. No-op otherwise.
    pub fn cancel(&mut self) -> Result<()> {
        if *self.text.state() == GenerationState::Generating {
            warn!("Abandoned generation marked as cancelled");
            self.text.fail(CANCELLED_REASON)?;
        }
        if *self.image.state() == ImageState::Generating {
            self.image.fail(CANCELLED_REASON)?;
        }
        Ok(())
    }

    /// Run the pipeline once. Called again only on an explicit regenerate.
    pub async fn generate(
        &mut self,
        pipeline: &ContentPipeline,
        request: &GenerationRequest,
    ) -> Result<&Draft> {
        // `&mut self` rules out a live run, so GENERATING here is an abandoned one
        self.cancel()?;
        self.text.start(&request.topic)?;
        if let Err(e) = self.image.start(&[
            ("topic", request.topic.as_str()),
            ("category", request.category.id.as_str()),
        ]) {
            self.text.fail(e.to_string())?;
            return Err(e.into());
        }
        self.draft = None;

        let draft = match pipeline.generate(request).await {
            Ok(draft) => draft,
            Err(err) => {
                warn!(step = err.step(), error = %err, "Generation failed for editor session");
                self.text.fail(err.to_string())?;
                self.image.fail(TEXT_FAILED_IMAGE_REASON)?;
                return Err(err);
            }
        };

        if let Err(e) = self.text.complete(&draft) {
            self.text.fail(e.to_string())?;
            self.image.fail(TEXT_FAILED_IMAGE_REASON)?;
            return Err(Error::ValidationFailure(e.to_string()));
        }

        if let Err(e) = self
            .image
            .complete(draft.image_map.iter().map(|entry| entry.url.as_str()))
        {
            let reason = draft
                .warnings_for(steps::IMAGE)
                .last()
                .map(|w| w.message.clone())
                .unwrap_or_else(|| e.to_string());
            self.image.fail(reason)?;
        }

        info!(
            draft_id = %draft.id,
            text_state = self.text.state().name(),
            image_state = self.image.state().name(),
            "Editor session updated"
        );
        Ok(self.draft.insert(draft))
    }

    /// Record an image the editor uploaded by hand.
    pub fn upload_image(&mut self, url: &str, alt_text: &str) -> Result<&ImageAsset> {
        let asset = ImageAsset::new(url, alt_text, ImageRole::Hero).ok_or_else(|| {
            Error::InvalidRequest("image URL is empty or a placeholder".to_string())
        })?;
        Ok(self.manual_image.insert(asset))
    }

    pub fn can_publish(&self) -> bool {
        can_publish(
            self.text.state(),
            self.image.state(),
            self.manual_image.is_some(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::config::EngineAvailability;
    use crate::engine::EngineClient;
    use crate::testing::request;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn pipeline(server: &MockServer) -> ContentPipeline {
        let engine = EngineClient::for_tests(&server.uri())
            .with_timeouts(Duration::from_secs(1), Duration::from_secs(1));
        ContentPipeline::new(Some(engine), EngineAvailability::Available, 10)
    }

    async fn mount_text_only(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "title": "Cara Memilih Pupuk NPK untuk Cabai",
                "sections": [
                    {"question": "a", "answer_html": "<p>Pilih pupuk NPK dengan rasio seimbang untuk fase vegetatif cabai.</p>"},
                    {"question": "b", "answer_html": "<p>Langkah pertama adalah menguji pH tanah sebelum memupuk cabai.</p>"},
                    {"question": "c", "answer_html": "<p>Pupuk diberikan setiap dua minggu sekali selama masa tanam.</p>"}
                ],
                "images": [{"url": "https://via.placeholder.com/600x400"}]
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_timeout_fails_text_with_verbatim_reason() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let mut session = EditorSession::new();
        let err = session
            .generate(&pipeline(&server), &request())
            .await
            .unwrap_err();

        assert_eq!(err.step(), "engine_timeout");
        assert_eq!(
            session.text_state(),
            &GenerationState::Failed {
                reason: err.to_string()
            }
        );
        assert_eq!(
            session.text_state().failure_reason(),
            Some("Content engine did not respond within 1 second")
        );
        assert!(session.draft().is_none());
        assert!(!session.can_publish());
    }

    #[tokio::test]
    async fn test_text_ready_image_failed_until_manual_upload() {
        let server = MockServer::start().await;
        mount_text_only(&server).await;

        let mut session = EditorSession::new();
        let draft = session.generate(&pipeline(&server), &request()).await.unwrap();
        assert!(draft.image_map.is_empty());

        assert_eq!(session.text_state(), &GenerationState::Ready);
        assert_eq!(session.image_state().name(), "FAILED");
        assert!(!session.can_publish());

        assert!(session.upload_image("https://placehold.co/600x400", "Cabai").is_err());
        assert!(!session.can_publish());

        session
            .upload_image("https://cdn.toko.id/cabai-merah.jpg", "Tanaman cabai merah")
            .unwrap();
        assert!(session.can_publish());
        assert_eq!(session.text_state(), &GenerationState::Ready);
    }

    #[tokio::test]
    async fn test_zero_images_leaves_one_image_warning() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content_html": "<h2>Bagaimana memilih pupuk?</h2><p>Pilih pupuk NPK seimbang untuk cabai yang baru ditanam di kebun.</p>"
            })))
            .mount(&server)
            .await;

        let mut session = EditorSession::new();
        let draft = session.generate(&pipeline(&server), &request()).await.unwrap();

        assert_eq!(draft.warnings_for(steps::IMAGE).count(), 1);
        assert_eq!(session.text_state(), &GenerationState::Ready);
        assert_eq!(
            session.image_state().failure_reason(),
            Some("No usable images were generated; upload images manually before publishing")
        );
    }

    #[tokio::test]
    async fn test_abandoned_run_can_be_cancelled_and_regenerated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;
        let pipeline = pipeline(&server);
        let mut session = EditorSession::new();

        let abandoned = tokio::time::timeout(
            Duration::from_millis(100),
            session.generate(&pipeline, &request()),
        )
        .await
        .is_err();
        assert!(abandoned);
        assert_eq!(session.text_state(), &GenerationState::Generating);

        session.cancel().unwrap();
        assert_eq!(session.text_state().failure_reason(), Some(CANCELLED_REASON));
        assert_eq!(session.image_state().failure_reason(), Some(CANCELLED_REASON));
        assert!(!session.can_publish());

        server.reset().await;
        mount_text_only(&server).await;
        session.generate(&pipeline, &request()).await.unwrap();
        assert_eq!(session.text_state(), &GenerationState::Ready);
    }

    #[tokio::test]
    async fn test_regenerate_directly_after_abandoned_run() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;
        let pipeline = pipeline(&server);
        let mut session = EditorSession::new();

        let abandoned = tokio::time::timeout(
            Duration::from_millis(100),
            session.generate(&pipeline, &request()),
        )
        .await
        .is_err();
        assert!(abandoned);

        server.reset().await;
        mount_text_only(&server).await;
        session.generate(&pipeline, &request()).await.unwrap();
        assert_eq!(session.text_state(), &GenerationState::Ready);
    }

    #[tokio::test]
    async fn test_cancel_without_run_is_a_no_op() {
        let mut session = EditorSession::new();
        session.cancel().unwrap();
        assert_eq!(session.text_state(), &GenerationState::Idle);
        assert_eq!(session.image_state(), &ImageState::Idle);
    }

    #[tokio::test]
    async fn test_regenerate_after_failure() {
        let server = MockServer::start().await;
        let mut session = EditorSession::new();

        // nothing mounted yet: the engine answers 404
        assert!(session.generate(&pipeline(&server), &request()).await.is_err());
        assert_eq!(session.text_state().name(), "FAILED");

        mount_text_only(&server).await;
        session.generate(&pipeline(&server), &request()).await.unwrap();
        assert_eq!(session.text_state(), &GenerationState::Ready);
    }
}
