//! Category and product lookups backing inbound generation requests.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::debug;

use crate::models::{CategoryRef, ContentType, KeywordTree, ProductContext};
use crate::secrets::DatabaseCredentials;
use crate::{Config, Error, Result};

/// Create a database connection pool from Secrets Manager credentials.
pub async fn create_pool(config: &Config, credentials: &DatabaseCredentials) -> Result<PgPool> {
    let host = credentials.host.as_deref().unwrap_or(&config.db_host);
    let port = credentials.port.unwrap_or(5432);
    let dbname = credentials.dbname.as_deref().unwrap_or(&config.db_name);
    let database_url = format!(
        "postgres://{}:{}@{}:{}/{}",
        credentials.username, credentials.password, host, port, dbname
    );

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&database_url)
        .await
        .map_err(Error::Database)?;

    Ok(pool)
}

type CategoryRow = (String, String, Vec<String>, bool, Option<serde_json::Value>);

/// Load a category with its ancestor chain, nearest parent first.
pub async fn fetch_category(pool: &PgPool, category_id: &str) -> Result<CategoryRef> {
    let row: Option<CategoryRow> = sqlx::query_as(
        r#"
        SELECT id::text, name, content_types, is_structural, keyword_tree
        FROM categories
        WHERE id::text = $1
        "#,
    )
    .bind(category_id)
    .fetch_optional(pool)
    .await?;

    let (id, name, content_types, is_structural, keyword_tree) =
        row.ok_or_else(|| Error::NotFound(format!("category '{}' does not exist", category_id)))?;

    let ancestors: Vec<String> = sqlx::query_scalar(
        r#"
        WITH RECURSIVE lineage AS (
            SELECT id, parent_id, name, 0 AS depth
            FROM categories
            WHERE id::text = $1
            UNION ALL
            SELECT c.id, c.parent_id, c.name, l.depth + 1
            FROM categories c
            JOIN lineage l ON c.id = l.parent_id
            WHERE l.depth < 16
        )
        SELECT name FROM lineage WHERE depth > 0 ORDER BY depth
        "#,
    )
    .bind(category_id)
    .fetch_all(pool)
    .await?;

    debug!(category_id, ancestors = ancestors.len(), "category loaded");

    Ok(CategoryRef {
        id,
        name,
        level: ancestors.len() as u32 + 1,
        ancestors,
        content_types: parse_content_types(&content_types),
        is_structural,
        keyword_tree: keyword_tree.and_then(parse_keyword_tree),
    })
}

/// Active products of a category, most recently updated first.
pub async fn fetch_products(
    pool: &PgPool,
    category_id: &str,
    limit: usize,
) -> Result<Vec<ProductContext>> {
    let rows: Vec<(String, Option<String>, Option<String>)> = sqlx::query_as(
        r#"
        SELECT name, description, short_description
        FROM products
        WHERE category_id::text = $1 AND is_active = true
        ORDER BY updated_at DESC
        LIMIT $2
        "#,
    )
    .bind(category_id)
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(name, description, short_description)| ProductContext {
            name,
            description: description.unwrap_or_default(),
            short_description: short_description.unwrap_or_default(),
        })
        .collect())
}

fn parse_content_types(tags: &[String]) -> Vec<ContentType> {
    tags.iter()
        .filter_map(|tag| match tag.trim().to_ascii_lowercase().as_str() {
            "blog" | "article" => Some(ContentType::Blog),
            "product" => Some(ContentType::Product),
            _ => None,
        })
        .collect()
}

/// Keyword trees with nothing in them are treated as absent.
fn parse_keyword_tree(value: serde_json::Value) -> Option<KeywordTree> {
    serde_json::from_value::<KeywordTree>(value)
        .ok()
        .filter(|tree| *tree != KeywordTree::default())
}
