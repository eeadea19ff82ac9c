//! Saved shipping addresses, owned by the user who created them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const ADDRESS_COLUMNS: &str =
    "id, user_id, alias, details, phone, city, postal_code, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct AddressRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub alias: String,
    pub details: String,
    pub phone: String,
    pub city: String,
    pub postal_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAddress {
    pub alias: String,
    pub details: String,
    pub phone: String,
    pub city: String,
    pub postal_code: Option<String>,
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_address(
    pool: &PgPool,
    user_id: Uuid,
    address: &NewAddress,
) -> Result<AddressRow, DbError> {
    let row = sqlx::query_as::<_, AddressRow>(&format!(
        "INSERT INTO addresses (user_id, alias, details, phone, city, postal_code) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {ADDRESS_COLUMNS}"
    ))
    .bind(user_id)
    .bind(&address.alias)
    .bind(&address.details)
    .bind(&address.phone)
    .bind(&address.city)
    .bind(address.postal_code.as_deref())
    .fetch_one(pool)
    .await?;

    tracing::debug!(address_id = %row.id, user_id = %user_id, "address added");
    Ok(row)
}

/// The user's addresses, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_addresses(pool: &PgPool, user_id: Uuid) -> Result<Vec<AddressRow>, DbError> {
    let rows = sqlx::query_as::<_, AddressRow>(&format!(
        "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE user_id = $1 \
         ORDER BY created_at DESC, id ASC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Delete an address owned by `user_id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no address has this id,
/// [`DbError::Forbidden`] if it belongs to another user, or [`DbError::Sqlx`]
/// if a query fails.
pub async fn delete_address(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    let owner: Uuid =
        sqlx::query_scalar("SELECT user_id FROM addresses WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(DbError::NotFound)?;
    if owner != user_id {
        return Err(DbError::Forbidden);
    }

    sqlx::query("DELETE FROM addresses WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::debug!(address_id = %id, user_id = %user_id, "address removed");
    Ok(())
}
