//! Database operations for `coupons`. Deleting a coupon deactivates it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::DbError;

const COUPON_COLUMNS: &str = "id, name, discount, expire, active, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct CouponRow {
    pub id: Uuid,
    pub name: String,
    /// Whole percent, 1 to 100.
    pub discount: i32,
    pub expire: DateTime<Utc>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCoupon {
    pub name: String,
    pub discount: i32,
    pub expire: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct CouponPatch {
    pub name: Option<String>,
    pub discount: Option<i32>,
    pub expire: Option<DateTime<Utc>>,
}

/// Fetch an active coupon by id. Deactivated coupons read as missing.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_coupon(pool: &PgPool, id: Uuid) -> Result<Option<CouponRow>, DbError> {
    let row = sqlx::query_as::<_, CouponRow>(&format!(
        "SELECT {COUPON_COLUMNS} FROM coupons WHERE id = $1 AND active = TRUE"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails; a duplicate code is a
/// unique violation.
pub async fn create_coupon(pool: &PgPool, coupon: &NewCoupon) -> Result<CouponRow, DbError> {
    let row = sqlx::query_as::<_, CouponRow>(&format!(
        "INSERT INTO coupons (name, discount, expire) VALUES ($1, $2, $3) \
         RETURNING {COUPON_COLUMNS}"
    ))
    .bind(&coupon.name)
    .bind(coupon.discount)
    .bind(coupon.expire)
    .fetch_one(pool)
    .await?;

    tracing::info!(
        coupon_id = %row.id,
        name = %row.name,
        discount = row.discount,
        "coupon created"
    );
    Ok(row)
}

/// Returns `None` if the coupon does not exist or was deactivated.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_coupon(
    pool: &PgPool,
    id: Uuid,
    patch: &CouponPatch,
) -> Result<Option<CouponRow>, DbError> {
    let row = sqlx::query_as::<_, CouponRow>(&format!(
        "UPDATE coupons SET \
             name = COALESCE($2, name), \
             discount = COALESCE($3, discount), \
             expire = COALESCE($4, expire), \
             updated_at = NOW() \
         WHERE id = $1 AND active = TRUE \
         RETURNING {COUPON_COLUMNS}"
    ))
    .bind(id)
    .bind(patch.name.as_deref())
    .bind(patch.discount)
    .bind(patch.expire)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Soft-delete a coupon. Returns `false` if it was missing or already inactive.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn deactivate_coupon(pool: &PgPool, id: Uuid) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE coupons SET active = FALSE, updated_at = NOW() \
         WHERE id = $1 AND active = TRUE",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        tracing::info!(coupon_id = %id, "coupon deactivated");
    }
    Ok(result.rows_affected() > 0)
}

/// Look up a coupon by code that is active and expires strictly after now.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_valid_coupon(
    conn: &mut PgConnection,
    code: &str,
) -> Result<Option<CouponRow>, DbError> {
    let row = sqlx::query_as::<_, CouponRow>(&format!(
        "SELECT {COUPON_COLUMNS} FROM coupons \
         WHERE name = $1 AND active = TRUE AND expire > NOW()"
    ))
    .bind(code)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}
