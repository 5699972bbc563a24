//! AWS Secrets Manager access for database credentials and the engine API key.

use aws_sdk_secretsmanager::Client as SecretsClient;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;
use tokio::sync::RwLock;

use crate::{Error, Result};

/// Secret strings by ARN, kept for the lifetime of the Lambda container.
static SECRETS_CACHE: OnceLock<RwLock<HashMap<String, String>>> = OnceLock::new();

fn cache() -> &'static RwLock<HashMap<String, String>> {
    SECRETS_CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Database credentials from Secrets Manager.
#[derive(Debug, Deserialize)]
pub struct DatabaseCredentials {
    pub username: String,
    pub password: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub dbname: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EngineSecret {
    #[serde(alias = "apiKey", alias = "key")]
    api_key: String,
}

pub async fn get_secret(client: &SecretsClient, secret_arn: &str) -> Result<String> {
    if let Some(value) = cache().read().await.get(secret_arn) {
        return Ok(value.clone());
    }

    let response = client
        .get_secret_value()
        .secret_id(secret_arn)
        .send()
        .await
        .map_err(|e| Error::Aws(format!("Failed to get secret: {}", e)))?;

    let secret_string = response
        .secret_string()
        .ok_or_else(|| Error::Aws("Secret has no string value".to_string()))?
        .to_string();

    cache()
        .write()
        .await
        .insert(secret_arn.to_string(), secret_string.clone());

    Ok(secret_string)
}

pub async fn get_database_credentials(
    client: &SecretsClient,
    secret_arn: &str,
) -> Result<DatabaseCredentials> {
    let secret_string = get_secret(client, secret_arn).await?;
    parse_database_credentials(&secret_string)
}

/// Engine API key; the secret is either `{"api_key": "..."}` or the bare key.
pub async fn get_engine_api_key(client: &SecretsClient, secret_arn: &str) -> Result<String> {
    let secret_string = get_secret(client, secret_arn).await?;
    parse_engine_api_key(&secret_string)
}

fn parse_database_credentials(secret: &str) -> Result<DatabaseCredentials> {
    serde_json::from_str(secret)
        .map_err(|e| Error::Aws(format!("Failed to parse database credentials: {}", e)))
}

fn parse_engine_api_key(secret: &str) -> Result<String> {
    let secret = secret.trim();
    let key = if secret.starts_with('{') {
        serde_json::from_str::<EngineSecret>(secret)
            .map_err(|e| Error::Aws(format!("Failed to parse engine API key secret: {}", e)))?
            .api_key
    } else {
        secret.to_string()
    };
    if key.trim().is_empty() {
        return Err(Error::Config("content engine API key is empty".to_string()));
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_credentials() {
        let json = r#"{"username":"content","password":"s3cret","host":"db.internal","port":5432,"dbname":"content"}"#;
        let creds = parse_database_credentials(json).unwrap();
        assert_eq!(creds.username, "content");
        assert_eq!(creds.password, "s3cret");
        assert_eq!(creds.dbname.as_deref(), Some("content"));
    }

    #[test]
    fn test_engine_key_shapes() {
        assert_eq!(parse_engine_api_key(r#"{"api_key":"abc"}"#).unwrap(), "abc");
        assert_eq!(parse_engine_api_key(r#"{"apiKey":"def"}"#).unwrap(), "def");
        assert_eq!(parse_engine_api_key("  raw-key\n").unwrap(), "raw-key");
        assert!(parse_engine_api_key("   ").is_err());
        assert!(parse_engine_api_key(r#"{"token":"x"}"#).is_err());
    }
}
