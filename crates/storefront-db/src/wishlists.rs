//! Per-user wishlists: at most one entry per (user, product).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct WishlistRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A wishlist entry joined with the product's display fields.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct WishlistItemRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_price: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WishlistView {
    pub count: usize,
    pub items: Vec<WishlistItemRow>,
}

/// Add a product to the user's wishlist.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the product does not exist, or
/// [`DbError::Sqlx`] if the insert fails; adding the same product twice is a
/// unique violation.
pub async fn add_to_wishlist(
    pool: &PgPool,
    user_id: Uuid,
    product_id: Uuid,
) -> Result<WishlistRow, DbError> {
    let row = sqlx::query_as::<_, WishlistRow>(
        "INSERT INTO wishlists (user_id, product_id) VALUES ($1, $2) \
         RETURNING id, user_id, product_id, created_at",
    )
    .bind(user_id)
    .bind(product_id)
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

    tracing::debug!(user_id = %user_id, product_id = %product_id, "wishlist entry added");
    Ok(row)
}

/// Returns `false` if the product was not on the user's wishlist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn remove_from_wishlist(
    pool: &PgPool,
    user_id: Uuid,
    product_id: Uuid,
) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM wishlists WHERE user_id = $1 AND product_id = $2")
        .bind(user_id)
        .bind(product_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// The user's wishlist, newest entry first. Empty if they have none.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_wishlist(pool: &PgPool, user_id: Uuid) -> Result<WishlistView, DbError> {
    let items = sqlx::query_as::<_, WishlistItemRow>(
        "SELECT w.id, w.product_id, p.name AS product_name, p.price AS product_price, \
                w.created_at \
         FROM wishlists w \
         JOIN products p ON p.id = w.product_id \
         WHERE w.user_id = $1 \
         ORDER BY w.created_at DESC, w.id ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(WishlistView {
        count: items.len(),
        items,
    })
}
