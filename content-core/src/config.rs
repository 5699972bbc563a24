//! Configuration management for the content pipeline.

use std::env;
use std::time::Duration;

/// Default deadline for question planning.
pub const DEFAULT_PLAN_TIMEOUT_SECS: u64 = 30;
/// Default deadline for full content generation.
pub const DEFAULT_GENERATE_TIMEOUT_SECS: u64 = 300;
/// Default ceiling on products sent in product-aware mode.
pub const DEFAULT_PRODUCT_LIMIT_MAX: usize = 10;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Content engine base URL
    pub engine_url: Option<String>,
    /// Explicit kill switch for AI generation
    pub engine_enabled: bool,
    /// ARN of the secret holding the engine API key
    pub engine_secret_arn: Option<String>,
    /// Question planning deadline in seconds
    pub plan_timeout_secs: u64,
    /// Content generation deadline in seconds
    pub generate_timeout_secs: u64,
    /// Upper bound for `product_limit` on inbound requests
    pub product_limit_max: usize,
    /// Database host
    pub db_host: String,
    /// Database name
    pub db_name: String,
    /// ARN of the secret containing database credentials
    pub db_secret_arn: String,
    /// AWS region
    pub aws_region: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            engine_url: env::var("CONTENT_ENGINE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            engine_enabled: env::var("CONTENT_ENGINE_ENABLED")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
            engine_secret_arn: env::var("CONTENT_ENGINE_SECRET_ARN").ok(),
            plan_timeout_secs: parse_or("ENGINE_PLAN_TIMEOUT_SECS", DEFAULT_PLAN_TIMEOUT_SECS),
            generate_timeout_secs: parse_or(
                "ENGINE_GENERATE_TIMEOUT_SECS",
                DEFAULT_GENERATE_TIMEOUT_SECS,
            ),
            product_limit_max: parse_or("PRODUCT_LIMIT_MAX", DEFAULT_PRODUCT_LIMIT_MAX),
            db_host: env::var("DATABASE_HOST")?,
            db_name: env::var("DATABASE_NAME").unwrap_or_else(|_| "content".to_string()),
            db_secret_arn: env::var("DATABASE_URL_SECRET_ARN")?,
            aws_region: env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
        })
    }

    /// Resolve whether AI generation may run at all.
    ///
    /// Computed once at startup and handed to the pipeline.
    pub fn engine_availability(&self) -> EngineAvailability {
        if !self.engine_enabled {
            return EngineAvailability::Disabled(
                "AI generation is switched off for this deployment".to_string(),
            );
        }
        match &self.engine_url {
            Some(_) => EngineAvailability::Available,
            None => EngineAvailability::Disabled("CONTENT_ENGINE_URL is not configured".to_string()),
        }
    }

    pub fn plan_timeout(&self) -> Duration {
        Duration::from_secs(self.plan_timeout_secs)
    }

    pub fn generate_timeout(&self) -> Duration {
        Duration::from_secs(self.generate_timeout_secs)
    }
}

/// Whether the content engine may be called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineAvailability {
    Available,
    /// Disabled, with the reason shown to the editor.
    Disabled(String),
}

impl EngineAvailability {
    pub fn is_available(&self) -> bool {
        matches!(self, EngineAvailability::Available)
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
