//! Database operations for `products`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    carts::{carts_holding_product, recompute_carts},
    DbError,
};

const PRODUCT_COLUMNS: &str = "id, name, description, quantity, sold, price, \
     price_after_discount, colors, image_cover, images, ratings_average, \
     ratings_quantity, category_id, brand_id, subcategory_id, created_at, updated_at";

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub quantity: i32,
    pub sold: i32,
    pub price: Decimal,
    pub price_after_discount: Option<Decimal>,
    /// Upper-snake color names, e.g. `SPACE_GRAY`.
    pub colors: Vec<String>,
    pub image_cover: String,
    pub images: Vec<String>,
    /// Mean review rating, maintained by [`crate::recompute_product_ratings`].
    pub ratings_average: Decimal,
    pub ratings_quantity: i32,
    pub category_id: Uuid,
    pub brand_id: Option<Uuid>,
    pub subcategory_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub quantity: i32,
    pub price: Decimal,
    pub price_after_discount: Option<Decimal>,
    pub colors: Vec<String>,
    pub image_cover: String,
    pub images: Vec<String>,
    pub category_id: Uuid,
    pub brand_id: Option<Uuid>,
    pub subcategory_id: Option<Uuid>,
}

/// Partial product update; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<i32>,
    pub sold: Option<i32>,
    pub price: Option<Decimal>,
    pub price_after_discount: Option<Decimal>,
    pub colors: Option<Vec<String>>,
    pub image_cover: Option<String>,
    pub images: Option<Vec<String>>,
    pub subcategory_id: Option<Uuid>,
}

/// Fetch a single product by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_product(pool: &PgPool, id: Uuid) -> Result<Option<ProductRow>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Insert a product and return the stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails; a missing category, brand,
/// or subcategory surfaces as a foreign key violation.
pub async fn create_product(pool: &PgPool, product: &NewProduct) -> Result<ProductRow, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "INSERT INTO products \
             (name, description, quantity, price, price_after_discount, colors, \
              image_cover, images, category_id, brand_id, subcategory_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.quantity)
    .bind(product.price)
    .bind(product.price_after_discount)
    .bind(&product.colors)
    .bind(&product.image_cover)
    .bind(&product.images)
    .bind(product.category_id)
    .bind(product.brand_id)
    .bind(product.subcategory_id)
    .fetch_one(pool)
    .await?;

    tracing::info!(product_id = %row.id, name = %row.name, "product created");
    Ok(row)
}

/// Apply a partial update. Returns `None` if the product does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_product(
    pool: &PgPool,
    id: Uuid,
    patch: &ProductPatch,
) -> Result<Option<ProductRow>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "UPDATE products SET \
             name                 = COALESCE($2, name), \
             description          = COALESCE($3, description), \
             quantity             = COALESCE($4, quantity), \
             sold                 = COALESCE($5, sold), \
             price                = COALESCE($6, price), \
             price_after_discount = COALESCE($7, price_after_discount), \
             colors               = COALESCE($8, colors), \
             image_cover          = COALESCE($9, image_cover), \
             images               = COALESCE($10, images), \
             subcategory_id       = COALESCE($11, subcategory_id), \
             updated_at           = NOW() \
         WHERE id = $1 \
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(id)
    .bind(patch.name.as_deref())
    .bind(patch.description.as_deref())
    .bind(patch.quantity)
    .bind(patch.sold)
    .bind(patch.price)
    .bind(patch.price_after_discount)
    .bind(patch.colors.as_deref())
    .bind(patch.image_cover.as_deref())
    .bind(patch.images.as_deref())
    .bind(patch.subcategory_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Delete a product. Its cart lines and reviews go with it, and every cart
/// that held it is recomputed in the same transaction.
///
/// Returns `false` if no product had this id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn delete_product(pool: &PgPool, id: Uuid) -> Result<bool, DbError> {
    let mut tx = pool.begin().await?;

    // Row lock blocks concurrent add-to-cart inserts until the delete commits.
    let locked: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM products WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
    if locked.is_none() {
        return Ok(false);
    }

    let cart_ids = carts_holding_product(&mut tx, id).await?;

    sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    recompute_carts(&mut tx, &cart_ids).await?;
    tx.commit().await?;

    tracing::info!(product_id = %id, carts_recomputed = cart_ids.len(), "product deleted");
    Ok(true)
}
