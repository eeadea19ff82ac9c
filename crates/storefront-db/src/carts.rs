//! Carts and cart line items.
//!
//! Every mutation runs in one transaction together with
//! [`recompute_cart_totals`], which rewrites the cart's stored totals from
//! the full set of live line items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use storefront_core::{cart_totals, Color, PricedLine};
use uuid::Uuid;

use crate::{coupons::find_valid_coupon, DbError};

const CART_COLUMNS: &str =
    "id, user_id, total_cart_price, total_price_after_discount, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct CartRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_cart_price: Decimal,
    /// `None` unless the last recomputation applied a coupon.
    pub total_price_after_discount: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A cart line joined with the product's display fields.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct CartItemRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_image_cover: String,
    pub color: String,
    pub quantity: i32,
    /// Unit price snapshotted when the line was first added.
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    #[serde(flatten)]
    pub cart: CartRow,
    pub num_of_cart_items: usize,
    pub items: Vec<CartItemRow>,
}

#[derive(Debug, Clone, Copy)]
pub struct NewCartItem {
    pub product_id: Uuid,
    pub color: Color,
    pub quantity: i32,
}

/// Recompute and persist a cart's totals from its current line items.
///
/// With `discount_percent`, `total_price_after_discount` is set to the
/// discounted total; without it the column is cleared.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the cart no longer exists, or
/// [`DbError::Sqlx`] if a query fails.
pub async fn recompute_cart_totals(
    conn: &mut PgConnection,
    cart_id: Uuid,
    discount_percent: Option<Decimal>,
) -> Result<CartView, DbError> {
    let items = list_cart_items(conn, cart_id).await?;
    let lines: Vec<PricedLine> = items
        .iter()
        .map(|item| PricedLine {
            unit_price: item.price,
            quantity: item.quantity,
        })
        .collect();
    let totals = cart_totals(&lines, discount_percent);

    let cart = sqlx::query_as::<_, CartRow>(&format!(
        "UPDATE carts SET \
             total_cart_price = $2, \
             total_price_after_discount = $3, \
             updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {CART_COLUMNS}"
    ))
    .bind(cart_id)
    .bind(totals.total_cart_price)
    .bind(totals.total_price_after_discount)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(DbError::NotFound)?;

    tracing::debug!(
        cart_id = %cart_id,
        items = items.len(),
        total = %totals.total_cart_price,
        discounted = ?totals.total_price_after_discount,
        "cart totals recomputed"
    );

    Ok(CartView {
        cart,
        num_of_cart_items: items.len(),
        items,
    })
}

/// Carts holding at least one line of `product_id`.
pub(crate) async fn carts_holding_product(
    conn: &mut PgConnection,
    product_id: Uuid,
) -> Result<Vec<Uuid>, DbError> {
    let ids = sqlx::query_scalar("SELECT DISTINCT cart_id FROM cart_items WHERE product_id = $1")
        .bind(product_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(ids)
}

/// Recompute each cart without a discount. Used after product deletes
/// cascade lines out of carts.
pub(crate) async fn recompute_carts(
    conn: &mut PgConnection,
    cart_ids: &[Uuid],
) -> Result<(), DbError> {
    for &cart_id in cart_ids {
        recompute_cart_totals(&mut *conn, cart_id, None).await?;
    }
    Ok(())
}

/// Fetch the user's cart with its items.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the user has no cart, or [`DbError::Sqlx`]
/// if a query fails.
pub async fn get_cart(pool: &PgPool, user_id: Uuid) -> Result<CartView, DbError> {
    let mut conn = pool.acquire().await?;
    let cart = sqlx::query_as::<_, CartRow>(&format!(
        "SELECT {CART_COLUMNS} FROM carts WHERE user_id = $1"
    ))
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(DbError::NotFound)?;

    let items = list_cart_items(&mut conn, cart.id).await?;
    Ok(CartView {
        cart,
        num_of_cart_items: items.len(),
        items,
    })
}

/// Add a product/color line to the user's cart, creating the cart on first use.
///
/// Adding a product/color pair already in the cart increments its quantity
/// and keeps the originally snapshotted price.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the product does not exist, or
/// [`DbError::Sqlx`] if a query fails.
pub async fn add_to_cart(
    pool: &PgPool,
    user_id: Uuid,
    item: NewCartItem,
) -> Result<CartView, DbError> {
    let mut tx = pool.begin().await?;

    let cart_id: Uuid = sqlx::query_scalar(
        "INSERT INTO carts (user_id) VALUES ($1) \
         ON CONFLICT (user_id) DO UPDATE SET updated_at = NOW() \
         RETURNING id",
    )
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await?;

    let price: Decimal = sqlx::query_scalar("SELECT price FROM products WHERE id = $1")
        .bind(item.product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::NotFound)?;

    sqlx::query(
        "INSERT INTO cart_items (cart_id, product_id, color, quantity, price) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (cart_id, product_id, color) DO UPDATE SET \
             quantity = cart_items.quantity + EXCLUDED.quantity, \
             updated_at = NOW()",
    )
    .bind(cart_id)
    .bind(item.product_id)
    .bind(item.color.as_str())
    .bind(item.quantity)
    .bind(price)
    .execute(&mut *tx)
    .await?;

    let view = recompute_cart_totals(&mut tx, cart_id, None).await?;
    tx.commit().await?;

    tracing::info!(
        user_id = %user_id,
        product_id = %item.product_id,
        color = item.color.as_str(),
        quantity = item.quantity,
        "item added to cart"
    );
    Ok(view)
}

/// Set the quantity of one line in the user's cart.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the user has no cart or the item is not
/// in it, or [`DbError::Sqlx`] if a query fails.
pub async fn update_cart_item_quantity(
    pool: &PgPool,
    user_id: Uuid,
    item_id: Uuid,
    quantity: i32,
) -> Result<CartView, DbError> {
    let mut tx = pool.begin().await?;
    let cart_id = cart_id_for_user(&mut tx, user_id).await?;

    let result = sqlx::query(
        "UPDATE cart_items SET quantity = $3, updated_at = NOW() \
         WHERE id = $1 AND cart_id = $2",
    )
    .bind(item_id)
    .bind(cart_id)
    .bind(quantity)
    .execute(&mut *tx)
    .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    let view = recompute_cart_totals(&mut tx, cart_id, None).await?;
    tx.commit().await?;
    Ok(view)
}

/// Remove one line from the user's cart.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the user has no cart or the item is not
/// in it, or [`DbError::Sqlx`] if a query fails.
pub async fn remove_cart_item(
    pool: &PgPool,
    user_id: Uuid,
    item_id: Uuid,
) -> Result<CartView, DbError> {
    let mut tx = pool.begin().await?;
    let cart_id = cart_id_for_user(&mut tx, user_id).await?;

    let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND cart_id = $2")
        .bind(item_id)
        .bind(cart_id)
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    let view = recompute_cart_totals(&mut tx, cart_id, None).await?;
    tx.commit().await?;
    Ok(view)
}

/// Recompute the user's cart with a coupon's discount applied.
///
/// The coupon itself is not modified and no association is stored; the
/// next item mutation recomputes without a discount.
///
/// # Errors
///
/// Returns [`DbError::InvalidOrExpiredCoupon`] if no active, unexpired coupon
/// has this code, [`DbError::NotFound`] if the user has no cart, or
/// [`DbError::Sqlx`] if a query fails.
pub async fn apply_coupon(pool: &PgPool, user_id: Uuid, code: &str) -> Result<CartView, DbError> {
    let mut tx = pool.begin().await?;

    let coupon = find_valid_coupon(&mut tx, code)
        .await?
        .ok_or(DbError::InvalidOrExpiredCoupon)?;
    let cart_id = cart_id_for_user(&mut tx, user_id).await?;

    let discount = Decimal::from(coupon.discount);
    let view = recompute_cart_totals(&mut tx, cart_id, Some(discount)).await?;
    tx.commit().await?;

    tracing::info!(
        user_id = %user_id,
        coupon = %coupon.name,
        discount = coupon.discount,
        "coupon applied to cart"
    );
    Ok(view)
}

/// Delete the user's cart and all of its items.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the user has no cart, or [`DbError::Sqlx`]
/// if the delete fails.
pub async fn clear_cart(pool: &PgPool, user_id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM carts WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    tracing::info!(user_id = %user_id, "cart cleared");
    Ok(())
}

async fn cart_id_for_user(conn: &mut PgConnection, user_id: Uuid) -> Result<Uuid, DbError> {
    sqlx::query_scalar("SELECT id FROM carts WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(DbError::NotFound)
}

async fn list_cart_items(
    conn: &mut PgConnection,
    cart_id: Uuid,
) -> Result<Vec<CartItemRow>, DbError> {
    let items = sqlx::query_as::<_, CartItemRow>(
        "SELECT ci.id, ci.product_id, p.name AS product_name, \
                p.image_cover AS product_image_cover, ci.color, ci.quantity, \
                ci.price, ci.created_at, ci.updated_at \
         FROM cart_items ci \
         JOIN products p ON p.id = ci.product_id \
         WHERE ci.cart_id = $1 \
         ORDER BY ci.created_at DESC, ci.id",
    )
    .bind(cart_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(items)
}
