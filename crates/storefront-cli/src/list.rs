use storefront_core::QueryFeatures;
use storefront_db::Collection;

/// Run a list query against a named collection and print the page as JSON.
///
/// # Errors
///
/// Returns an error if the collection is not registered, a field is
/// unknown, or the query fails.
pub(crate) async fn run_list(
    pool: &sqlx::PgPool,
    collection: &str,
    params: &[(String, String)],
    default_limit: u32,
) -> anyhow::Result<()> {
    let collection: Collection = collection.parse()?;
    let features = QueryFeatures::parse(
        params.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        default_limit,
    );

    let page = storefront_db::find_page(pool, collection, &features).await?;
    println!("{}", serde_json::to_string_pretty(&page)?);
    Ok(())
}
