use std::collections::HashMap;

use serde::Serialize;
use sqlx::PgPool;
use storefront_core::CatalogFile;
use uuid::Uuid;

use crate::{carts::recompute_carts, DbError};

/// Rows touched per table by a seed or purge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub categories: u64,
    pub brands: u64,
    pub products: u64,
    pub coupons: u64,
}

/// Upsert a catalog file into the database.
///
/// Categories, brands, and coupons are matched by their unique name; products
/// by name. Seeding the same file twice leaves one copy of everything. All
/// writes run inside a single transaction; if any fails the batch is rolled
/// back.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_catalog(pool: &PgPool, catalog: &CatalogFile) -> Result<SeedSummary, DbError> {
    let mut tx = pool.begin().await?;
    let mut summary = SeedSummary::default();

    let mut category_ids = HashMap::new();
    for category in &catalog.categories {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO categories (name, image) VALUES ($1, $2) \
             ON CONFLICT (name) DO UPDATE SET image = EXCLUDED.image, updated_at = NOW() \
             RETURNING id",
        )
        .bind(&category.name)
        .bind(&category.image)
        .fetch_one(&mut *tx)
        .await?;
        category_ids.insert(category.name.to_lowercase(), id);
        summary.categories += 1;
    }

    let mut brand_ids = HashMap::new();
    for brand in &catalog.brands {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO brands (name, image) VALUES ($1, $2) \
             ON CONFLICT (name) DO UPDATE SET image = EXCLUDED.image, updated_at = NOW() \
             RETURNING id",
        )
        .bind(&brand.name)
        .bind(&brand.image)
        .fetch_one(&mut *tx)
        .await?;
        brand_ids.insert(brand.name.to_lowercase(), id);
        summary.brands += 1;
    }

    for product in &catalog.products {
        // Catalog validation guarantees the category exists.
        let category_id = *category_ids
            .get(&product.category.to_lowercase())
            .ok_or(DbError::NotFound)?;
        let brand_id = product
            .brand
            .as_ref()
            .and_then(|b| brand_ids.get(&b.to_lowercase()).copied());
        let colors: Vec<&str> = product.colors.iter().map(|c| c.as_str()).collect();

        let updated = sqlx::query(
            "UPDATE products SET \
                 description = $2, quantity = $3, price = $4, price_after_discount = $5, \
                 colors = $6, image_cover = $7, images = $8, category_id = $9, \
                 brand_id = $10, updated_at = NOW() \
             WHERE name = $1",
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.quantity)
        .bind(product.price)
        .bind(product.price_after_discount)
        .bind(&colors)
        .bind(&product.image_cover)
        .bind(&product.images)
        .bind(category_id)
        .bind(brand_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            sqlx::query(
                "INSERT INTO products \
                     (name, description, quantity, price, price_after_discount, colors, \
                      image_cover, images, category_id, brand_id) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            )
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.quantity)
            .bind(product.price)
            .bind(product.price_after_discount)
            .bind(&colors)
            .bind(&product.image_cover)
            .bind(&product.images)
            .bind(category_id)
            .bind(brand_id)
            .execute(&mut *tx)
            .await?;
        }
        summary.products += 1;
    }

    for coupon in &catalog.coupons {
        sqlx::query(
            "INSERT INTO coupons (name, discount, expire) VALUES ($1, $2, $3) \
             ON CONFLICT (name) DO UPDATE SET \
                 discount = EXCLUDED.discount, \
                 expire = EXCLUDED.expire, \
                 active = TRUE, \
                 updated_at = NOW()",
        )
        .bind(&coupon.name)
        .bind(coupon.discount)
        .bind(coupon.expire)
        .execute(&mut *tx)
        .await?;
        summary.coupons += 1;
    }

    tx.commit().await?;
    Ok(summary)
}

/// Delete every product, brand, and category. Cart lines and reviews of the
/// deleted products cascade; coupons and carts are kept, and every cart that
/// lost lines is recomputed before commit.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any delete fails.
pub async fn purge_catalog(pool: &PgPool) -> Result<SeedSummary, DbError> {
    let mut tx = pool.begin().await?;

    // Lock products so no cart line is added between the cart scan and the delete.
    sqlx::query("SELECT id FROM products FOR UPDATE")
        .execute(&mut *tx)
        .await?;
    let cart_ids: Vec<Uuid> = sqlx::query_scalar("SELECT DISTINCT cart_id FROM cart_items")
        .fetch_all(&mut *tx)
        .await?;

    let products = sqlx::query("DELETE FROM products")
        .execute(&mut *tx)
        .await?
        .rows_affected();
    let brands = sqlx::query("DELETE FROM brands")
        .execute(&mut *tx)
        .await?
        .rows_affected();
    let categories = sqlx::query("DELETE FROM categories")
        .execute(&mut *tx)
        .await?
        .rows_affected();

    recompute_carts(&mut tx, &cart_ids).await?;
    tx.commit().await?;
    Ok(SeedSummary {
        categories,
        brands,
        products,
        coupons: 0,
    })
}
