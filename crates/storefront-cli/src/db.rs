//! `db` subcommand handlers. All but [`preview_seed`] run once the pool is connected.

use std::path::Path;

/// # Errors
///
/// Returns an error if the database cannot be reached.
pub(crate) async fn run_ping(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    storefront_db::health_check(pool).await?;
    println!("database ok");
    Ok(())
}

/// # Errors
///
/// Returns an error if any migration fails.
pub(crate) async fn run_migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let applied = storefront_db::run_migrations(pool).await?;
    tracing::info!(applied, "migrations complete");
    println!("applied {applied} migration(s)");
    Ok(())
}

/// Load and validate the catalog and describe what a seed would write.
/// Touches no database.
///
/// # Errors
///
/// Returns an error if the catalog cannot be read or fails validation.
pub(crate) fn preview_seed(path: &Path) -> anyhow::Result<String> {
    let catalog = storefront_core::load_catalog(path)?;
    Ok(format!(
        "[dry-run] {}: {} categories, {} brands, {} products, {} coupons",
        path.display(),
        catalog.categories.len(),
        catalog.brands.len(),
        catalog.products.len(),
        catalog.coupons.len()
    ))
}

/// Load and validate the catalog, then upsert it.
///
/// # Errors
///
/// Returns an error if the catalog is invalid or the seed transaction fails.
pub(crate) async fn run_seed(pool: &sqlx::PgPool, path: &Path) -> anyhow::Result<()> {
    let catalog = storefront_core::load_catalog(path)?;

    let summary = storefront_db::seed_catalog(pool, &catalog).await?;
    tracing::info!(
        path = %path.display(),
        categories = summary.categories,
        brands = summary.brands,
        products = summary.products,
        coupons = summary.coupons,
        "catalog seeded"
    );
    println!(
        "seeded {} categories, {} brands, {} products, {} coupons",
        summary.categories, summary.brands, summary.products, summary.coupons
    );
    Ok(())
}

/// # Errors
///
/// Returns an error without `--yes`, or if the purge transaction fails.
pub(crate) async fn run_purge(pool: &sqlx::PgPool, confirmed: bool) -> anyhow::Result<()> {
    if !confirmed {
        anyhow::bail!("refusing to purge the catalog without --yes");
    }

    let summary = storefront_db::purge_catalog(pool).await?;
    tracing::warn!(
        products = summary.products,
        brands = summary.brands,
        categories = summary.categories,
        "catalog purged"
    );
    println!(
        "deleted {} products, {} brands, {} categories",
        summary.products, summary.brands, summary.categories
    );
    Ok(())
}
