//! Product reviews. Each write recomputes the product's rating aggregate in
//! the same transaction.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::DbError;

const REVIEW_COLUMNS: &str = "id, title, rating, user_id, product_id, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ReviewRow {
    pub id: Uuid,
    pub title: Option<String>,
    pub rating: i32,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_review(pool: &PgPool, id: Uuid) -> Result<Option<ReviewRow>, DbError> {
    let row = sqlx::query_as::<_, ReviewRow>(&format!(
        "SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Create the user's review of a product.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the product does not exist, or
/// [`DbError::Sqlx`] if a query fails; a second review of the same product by
/// the same user is a unique violation.
pub async fn create_review(
    pool: &PgPool,
    user_id: Uuid,
    product_id: Uuid,
    title: Option<&str>,
    rating: i32,
) -> Result<ReviewRow, DbError> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, ReviewRow>(&format!(
        "INSERT INTO reviews (title, rating, user_id, product_id) VALUES ($1, $2, $3, $4) \
         RETURNING {REVIEW_COLUMNS}"
    ))
    .bind(title)
    .bind(rating)
    .bind(user_id)
    .bind(product_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(DbError::from)
    .map_err(|e| {
        if e.is_foreign_key_violation() {
            DbError::NotFound
        } else {
            e
        }
    })?;

    recompute_product_ratings(&mut tx, product_id).await?;
    tx.commit().await?;

    tracing::info!(review_id = %row.id, product_id = %product_id, rating, "review created");
    Ok(row)
}

/// Update a review owned by `user_id`. Returns `None` if the review does not
/// exist or belongs to someone else.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn update_review(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
    title: Option<&str>,
    rating: Option<i32>,
) -> Result<Option<ReviewRow>, DbError> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, ReviewRow>(&format!(
        "UPDATE reviews SET \
             title = COALESCE($3, title), \
             rating = COALESCE($4, rating), \
             updated_at = NOW() \
         WHERE id = $1 AND user_id = $2 \
         RETURNING {REVIEW_COLUMNS}"
    ))
    .bind(id)
    .bind(user_id)
    .bind(title)
    .bind(rating)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    recompute_product_ratings(&mut tx, row.product_id).await?;
    tx.commit().await?;
    Ok(Some(row))
}

/// Delete a review owned by `user_id`. Returns `false` if there was none.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn delete_review(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, DbError> {
    let mut tx = pool.begin().await?;

    let product_id: Option<Uuid> = sqlx::query_scalar(
        "DELETE FROM reviews WHERE id = $1 AND user_id = $2 RETURNING product_id",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(product_id) = product_id else {
        return Ok(false);
    };

    recompute_product_ratings(&mut tx, product_id).await?;
    tx.commit().await?;
    Ok(true)
}

/// Rewrite `ratings_average` (two decimals, 0 with no reviews) and
/// `ratings_quantity` from the product's reviews.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn recompute_product_ratings(
    conn: &mut PgConnection,
    product_id: Uuid,
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE products p SET \
             ratings_average = COALESCE(s.average, 0), \
             ratings_quantity = s.quantity, \
             updated_at = NOW() \
         FROM ( \
             SELECT ROUND(AVG(rating)::numeric, 2) AS average, COUNT(*)::int AS quantity \
             FROM reviews WHERE product_id = $1 \
         ) s \
         WHERE p.id = $1",
    )
    .bind(product_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
