//! Categories and brands share one shape: a unique name and an optional image.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{Collection, DbError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Taxonomy {
    Category,
    Brand,
}

impl Taxonomy {
    fn table(self) -> &'static str {
        self.collection().name()
    }

    /// The list collection backed by the same table.
    #[must_use]
    pub fn collection(self) -> Collection {
        match self {
            Self::Category => Collection::Categories,
            Self::Brand => Collection::Brands,
        }
    }
}

/// A row from `categories` or `brands`.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct TaxonomyRow {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_taxonomy(
    pool: &PgPool,
    kind: Taxonomy,
    id: Uuid,
) -> Result<Option<TaxonomyRow>, DbError> {
    let row = sqlx::query_as::<_, TaxonomyRow>(&format!(
        "SELECT id, name, image, created_at, updated_at FROM {} WHERE id = $1",
        kind.table()
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails; a duplicate name is a
/// unique violation.
pub async fn create_taxonomy(
    pool: &PgPool,
    kind: Taxonomy,
    name: &str,
    image: Option<&str>,
) -> Result<TaxonomyRow, DbError> {
    let row = sqlx::query_as::<_, TaxonomyRow>(&format!(
        "INSERT INTO {} (name, image) VALUES ($1, $2) \
         RETURNING id, name, image, created_at, updated_at",
        kind.table()
    ))
    .bind(name)
    .bind(image)
    .fetch_one(pool)
    .await?;

    tracing::info!(table = kind.table(), id = %row.id, name = %row.name, "created");
    Ok(row)
}

/// Rename and/or re-image a row. Returns `None` if it does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_taxonomy(
    pool: &PgPool,
    kind: Taxonomy,
    id: Uuid,
    name: Option<&str>,
    image: Option<&str>,
) -> Result<Option<TaxonomyRow>, DbError> {
    let row = sqlx::query_as::<_, TaxonomyRow>(&format!(
        "UPDATE {} SET \
             name = COALESCE($2, name), \
             image = COALESCE($3, image), \
             updated_at = NOW() \
         WHERE id = $1 \
         RETURNING id, name, image, created_at, updated_at",
        kind.table()
    ))
    .bind(id)
    .bind(name)
    .bind(image)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Returns `false` if no row had this id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails. Deleting a category that
/// still has products is a foreign key violation; deleting a brand detaches
/// its products.
pub async fn delete_taxonomy(pool: &PgPool, kind: Taxonomy, id: Uuid) -> Result<bool, DbError> {
    let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", kind.table()))
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
