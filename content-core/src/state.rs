//! Editor-side lifecycle of the text draft and of its images.
//!
//! The two machines never drive each other. Whether an editor may publish is
//! answered only by [`can_publish`].

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::models::{is_placeholder_url, Draft};
use crate::text::strip_markup;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("A failure reason is required")]
    MissingReason,

    #[error("Draft has no title or content")]
    EmptyDraft,

    #[error("No usable image URL")]
    NoUsableImage,
}

/// Lifecycle of the generated text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationState {
    #[default]
    Idle,
    Generating,
    Ready,
    Failed { reason: String },
}

/// Lifecycle of the draft's images.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImageState {
    #[default]
    Idle,
    Generating,
    Ready,
    Failed { reason: String },
}

macro_rules! state_name {
    ($state:ty) => {
        impl $state {
            pub fn name(&self) -> &'static str {
                match self {
                    Self::Idle => "IDLE",
                    Self::Generating => "GENERATING",
                    Self::Ready => "READY",
                    Self::Failed { .. } => "FAILED",
                }
            }

            /// Reason of a failed state, verbatim.
            pub fn failure_reason(&self) -> Option<&str> {
                match self {
                    Self::Failed { reason } => Some(reason),
                    _ => None,
                }
            }
        }
    };
}

state_name!(GenerationState);
state_name!(ImageState);

fn checked_reason(reason: impl Into<String>) -> Result<String, TransitionError> {
    let reason = reason.into();
    if reason.trim().is_empty() {
        return Err(TransitionError::MissingReason);
    }
    Ok(reason)
}

#[derive(Debug, Default)]
pub struct GenerationStateMachine {
    state: GenerationState,
}

impl GenerationStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &GenerationState {
        &self.state
    }

    /// Begin a generation run. Also the only way out of FAILED.
    pub fn start(&mut self, topic: &str) -> Result<(), TransitionError> {
        if self.state == GenerationState::Generating {
            return Err(TransitionError::InvalidTransition {
                action: "start generation",
                state: self.state.name(),
            });
        }
        if topic.trim().is_empty() {
            return Err(TransitionError::MissingField("topic"));
        }
        self.transition(GenerationState::Generating);
        Ok(())
    }

    pub fn complete(&mut self, draft: &Draft) -> Result<(), TransitionError> {
        self.require_generating("complete generation")?;
        if draft.title.trim().is_empty() || strip_markup(&draft.content_html).is_empty() {
            return Err(TransitionError::EmptyDraft);
        }
        self.transition(GenerationState::Ready);
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), TransitionError> {
        self.require_generating("fail generation")?;
        let reason = checked_reason(reason)?;
        self.transition(GenerationState::Failed { reason });
        Ok(())
    }

    fn require_generating(&self, action: &'static str) -> Result<(), TransitionError> {
        match self.state {
            GenerationState::Generating => Ok(()),
            _ => Err(TransitionError::InvalidTransition {
                action,
                state: self.state.name(),
            }),
        }
    }

    fn transition(&mut self, next: GenerationState) {
        debug!(from = self.state.name(), to = next.name(), "Generation state transition");
        self.state = next;
    }
}

#[derive(Debug, Default)]
pub struct ImageStateMachine {
    state: ImageState,
}

impl ImageStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ImageState {
        &self.state
    }

    /// Begin image generation once every mandatory field has a value.
    pub fn start(&mut self, mandatory: &[(&'static str, &str)]) -> Result<(), TransitionError> {
        if self.state == ImageState::Generating {
            return Err(TransitionError::InvalidTransition {
                action: "start image generation",
                state: self.state.name(),
            });
        }
        if let Some((field, _)) = mandatory.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(TransitionError::MissingField(*field));
        }
        self.transition(ImageState::Generating);
        Ok(())
    }

    /// READY needs at least one URL that is neither empty nor a placeholder.
    pub fn complete<'a, I>(&mut self, urls: I) -> Result<(), TransitionError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.require_generating("complete image generation")?;
        if !urls.into_iter().any(|url| !is_placeholder_url(url)) {
            return Err(TransitionError::NoUsableImage);
        }
        self.transition(ImageState::Ready);
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), TransitionError> {
        self.require_generating("fail image generation")?;
        let reason = checked_reason(reason)?;
        self.transition(ImageState::Failed { reason });
        Ok(())
    }

    fn require_generating(&self, action: &'static str) -> Result<(), TransitionError> {
        match self.state {
            ImageState::Generating => Ok(()),
            _ => Err(TransitionError::InvalidTransition {
                action,
                state: self.state.name(),
            }),
        }
    }

    fn transition(&mut self, next: ImageState) {
        debug!(from = self.state.name(), to = next.name(), "Image state transition");
        self.state = next;
    }
}

/// Text must be READY; images must be READY or replaced by a manual upload.
pub fn can_publish(text: &GenerationState, image: &ImageState, manual_image_provided: bool) -> bool {
    *text == GenerationState::Ready && (*image == ImageState::Ready || manual_image_provided)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_generation_keeps_reason_verbatim() {
        let mut machine = GenerationStateMachine::new();
        assert_eq!(machine.state(), &GenerationState::Idle);
        machine.start("Cara memilih pupuk NPK").unwrap();
        assert_eq!(machine.state(), &GenerationState::Generating);
        machine.fail("Content engine did not respond within 300 seconds").unwrap();
        assert_eq!(
            machine.state().failure_reason(),
            Some("Content engine did not respond within 300 seconds")
        );
    }

    #[test]
    fn test_start_requires_topic() {
        let mut machine = GenerationStateMachine::new();
        assert_eq!(machine.start("  "), Err(TransitionError::MissingField("topic")));
        assert_eq!(machine.state(), &GenerationState::Idle);
    }

    #[test]
    fn test_cannot_start_twice() {
        let mut machine = GenerationStateMachine::new();
        machine.start("Pupuk").unwrap();
        assert!(matches!(
            machine.start("Pupuk"),
            Err(TransitionError::InvalidTransition { state: "GENERATING", .. })
        ));
    }

    #[test]
    fn test_failed_only_leaves_through_explicit_start() {
        let mut machine = GenerationStateMachine::new();
        machine.start("Pupuk").unwrap();
        machine.fail("engine down").unwrap();
        assert!(machine.fail("again").is_err());
        machine.start("Pupuk").unwrap();
        assert_eq!(machine.state(), &GenerationState::Generating);
    }

    #[test]
    fn test_fail_requires_reason() {
        let mut machine = GenerationStateMachine::new();
        machine.start("Pupuk").unwrap();
        assert_eq!(machine.fail(""), Err(TransitionError::MissingReason));
        assert_eq!(machine.state(), &GenerationState::Generating);
    }

    #[test]
    fn test_complete_from_idle_is_rejected() {
        let mut image = ImageStateMachine::new();
        assert!(matches!(
            image.complete(["https://cdn.toko.id/a.jpg"]),
            Err(TransitionError::InvalidTransition { state: "IDLE", .. })
        ));
    }

    #[test]
    fn test_image_start_checks_mandatory_fields() {
        let mut image = ImageStateMachine::new();
        assert_eq!(
            image.start(&[("topic", "Pupuk"), ("title", "")]),
            Err(TransitionError::MissingField("title"))
        );
        image.start(&[("topic", "Pupuk"), ("title", "Panduan")]).unwrap();
        assert_eq!(image.state(), &ImageState::Generating);
    }

    #[test]
    fn test_image_ready_needs_real_url() {
        let mut image = ImageStateMachine::new();
        image.start(&[("topic", "Pupuk")]).unwrap();
        assert_eq!(
            image.complete(["", "https://via.placeholder.com/300"]),
            Err(TransitionError::NoUsableImage)
        );
        image.complete(["https://cdn.toko.id/a.jpg"]).unwrap();
        assert_eq!(image.state(), &ImageState::Ready);
    }

    #[test]
    fn test_can_publish() {
        let failed = ImageState::Failed {
            reason: "no usable images".to_string(),
        };
        assert!(can_publish(&GenerationState::Ready, &ImageState::Ready, false));
        assert!(!can_publish(&GenerationState::Ready, &failed, false));
        assert!(can_publish(&GenerationState::Ready, &failed, true));
        assert!(!can_publish(&GenerationState::Generating, &ImageState::Ready, true));
        assert!(!can_publish(
            &GenerationState::Failed { reason: "x".to_string() },
            &ImageState::Ready,
            true
        ));
    }

    #[test]
    fn test_state_serializes_with_reason() {
        let state = GenerationState::Failed {
            reason: "Content engine is unreachable".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            serde_json::json!({"status": "FAILED", "reason": "Content engine is unreachable"})
        );
        assert_eq!(
            serde_json::to_value(ImageState::Ready).unwrap(),
            serde_json::json!({"status": "READY"})
        );
    }
}
