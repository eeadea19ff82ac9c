//! Subcategories: named, optionally imaged children of a category. Deleting
//! the category deletes them; products pointing at one are detached.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const SUBCATEGORY_COLUMNS: &str = "id, name, image, category_id, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct SubcategoryRow {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub category_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_subcategory(pool: &PgPool, id: Uuid) -> Result<Option<SubcategoryRow>, DbError> {
    let row = sqlx::query_as::<_, SubcategoryRow>(&format!(
        "SELECT {SUBCATEGORY_COLUMNS} FROM subcategories WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if the parent category does not exist, or
/// [`DbError::Sqlx`] if the insert fails; a duplicate name is a unique
/// violation.
pub async fn create_subcategory(
    pool: &PgPool,
    category_id: Uuid,
    name: &str,
    image: Option<&str>,
) -> Result<SubcategoryRow, DbError> {
    let row = sqlx::query_as::<_, SubcategoryRow>(&format!(
        "INSERT INTO subcategories (name, image, category_id) VALUES ($1, $2, $3) \
         RETURNING {SUBCATEGORY_COLUMNS}"
    ))
    .bind(name)
    .bind(image)
    .bind(category_id)
    .fetch_one(pool)
    .await
    .map_err(DbError::from)
    .map_err(|e| {
        if e.is_foreign_key_violation() {
            DbError::NotFound
        } else {
            e
        }
    })?;

    tracing::info!(
        subcategory_id = %row.id,
        category_id = %category_id,
        name = %row.name,
        "subcategory created"
    );
    Ok(row)
}

/// Rename and/or re-image a subcategory; its parent is fixed at creation.
/// Returns `None` if it does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_subcategory(
    pool: &PgPool,
    id: Uuid,
    name: Option<&str>,
    image: Option<&str>,
) -> Result<Option<SubcategoryRow>, DbError> {
    let row = sqlx::query_as::<_, SubcategoryRow>(&format!(
        "UPDATE subcategories SET \
             name = COALESCE($2, name), \
             image = COALESCE($3, image), \
             updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {SUBCATEGORY_COLUMNS}"
    ))
    .bind(id)
    .bind(name)
    .bind(image)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Returns `false` if no subcategory had this id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_subcategory(pool: &PgPool, id: Uuid) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM subcategories WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
