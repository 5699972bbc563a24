//! Answer-driven content generation for the editorial CMS.
//!
//! A topic and category go in; a quality-checked draft comes out. The draft is
//! never published from here. Questions are planned first, the content engine
//! answers them, and every answer is scored before assembly.

pub mod assembler;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod imagery;
pub mod models;
pub mod normalizer;
pub mod pipeline;
pub mod planner;
pub mod qc;
pub mod secrets;
pub mod session;
pub mod state;
pub mod text;

#[cfg(test)]
mod testing;

pub use config::{Config, EngineAvailability};
pub use engine::{EngineClient, EngineError};
pub use error::{Error, Result};
pub use models::{
    CategoryRef, ContentType, Draft, GenerationRequest, ProductContext, SearchIntent, SeoInput,
};
pub use pipeline::ContentPipeline;
pub use planner::{QuestionPlan, QuestionPlanner};
pub use secrets::{get_database_credentials, get_engine_api_key, get_secret, DatabaseCredentials};
pub use session::EditorSession;
pub use state::{can_publish, GenerationState, ImageState};
