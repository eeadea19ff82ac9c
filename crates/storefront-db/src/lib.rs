use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use storefront_core::{AppConfig, QueryError};
use thiserror::Error;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

// Path relative to crates/storefront-db/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,
    #[error("record belongs to another user")]
    Forbidden,
    #[error("coupon is invalid or expired")]
    InvalidOrExpiredCoupon,
    #[error("unsupported query target '{0}'")]
    InvalidTarget(String),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl DbError {
    /// Postgres SQLSTATE of the underlying database error, if any.
    #[must_use]
    pub fn sql_state(&self) -> Option<String> {
        match self {
            Self::Sqlx(sqlx::Error::Database(db_err)) => db_err.code().map(|c| c.into_owned()),
            _ => None,
        }
    }

    /// `23505`: a unique constraint rejected the write.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        self.sql_state().as_deref() == Some("23505")
    }

    /// `23503`: a foreign key is missing or still referenced.
    #[must_use]
    pub fn is_foreign_key_violation(&self) -> bool {
        self.sql_state().as_deref() == Some("23503")
    }

    /// Client-supplied input Postgres refused to cast or accept: malformed
    /// literals (`22P02`, `22007`, `22008`), numeric overflow (`22003`), and
    /// check constraints (`23514`).
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self.sql_state().as_deref(),
            Some("22P02" | "22007" | "22008" | "22003" | "23514")
        )
    }
}

/// Connect to a Postgres pool using explicit URL and config.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Run all pending migrations against the pool.
///
/// Returns the number of migrations that were applied.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails or the
/// applied-migration count cannot be read.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::migrate::MigrateError> {
    let applied_before = count_applied_migrations(pool).await?;
    MIGRATOR.run(pool).await?;
    let applied_after = count_applied_migrations(pool).await?;

    let delta = (applied_after - applied_before).max(0);
    Ok(usize::try_from(delta).unwrap_or(0))
}

/// Successful rows in `_sqlx_migrations`; zero before the table exists.
async fn count_applied_migrations(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let table_exists: bool =
        sqlx::query_scalar("SELECT to_regclass('_sqlx_migrations') IS NOT NULL")
            .fetch_one(pool)
            .await?;
    if !table_exists {
        return Ok(0);
    }

    sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
        .fetch_one(pool)
        .await
}

/// Send a `SELECT 1` to verify the pool has a live connection.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}

/// Run a full health check: ping the pool and return a typed error on failure.
///
/// # Errors
///
/// Returns [`DbError`] if the ping fails.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    ping(pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_config_has_sane_defaults() {
        let config = PoolConfig::default();

        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.min_connections, DEFAULT_MIN_CONNECTIONS);
        assert_eq!(config.acquire_timeout_secs, DEFAULT_ACQUIRE_TIMEOUT_SECS);
    }

    #[test]
    fn non_database_errors_have_no_sql_state() {
        assert!(DbError::NotFound.sql_state().is_none());
        assert!(!DbError::NotFound.is_unique_violation());
        assert!(!DbError::InvalidOrExpiredCoupon.is_invalid_input());
        assert!(!DbError::Forbidden.is_foreign_key_violation());
        assert!(!DbError::InvalidTarget("orders".to_string()).is_foreign_key_violation());
    }
}

pub mod addresses;
pub mod carts;
pub mod collections;
pub mod coupons;
pub mod products;
pub mod reviews;
pub mod seed;
pub mod subcategories;
pub mod taxonomy;
pub mod wishlists;

pub use addresses::{create_address, delete_address, list_addresses, AddressRow, NewAddress};
pub use carts::{
    add_to_cart, apply_coupon, clear_cart, get_cart, recompute_cart_totals, remove_cart_item,
    update_cart_item_quantity, CartItemRow, CartRow, CartView, NewCartItem,
};
pub use collections::{find_page, Collection, Column, ColumnType, Page};
pub use coupons::{
    create_coupon, deactivate_coupon, find_valid_coupon, get_coupon, update_coupon, CouponPatch,
    CouponRow, NewCoupon,
};
pub use products::{
    create_product, delete_product, get_product, update_product, NewProduct, ProductPatch,
    ProductRow,
};
pub use reviews::{
    create_review, delete_review, get_review, recompute_product_ratings, update_review,
    ReviewRow,
};
pub use seed::{purge_catalog, seed_catalog, SeedSummary};
pub use subcategories::{
    create_subcategory, delete_subcategory, get_subcategory, update_subcategory, SubcategoryRow,
};
pub use taxonomy::{
    create_taxonomy, delete_taxonomy, get_taxonomy, update_taxonomy, Taxonomy, TaxonomyRow,
};
pub use wishlists::{
    add_to_wishlist, get_wishlist, remove_from_wishlist, WishlistItemRow, WishlistRow,
    WishlistView,
};
