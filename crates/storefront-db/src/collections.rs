//! Registry of listable collections and the generic filtered/sorted/paged
//! query builder that runs [`QueryFeatures`] against any of them.
//!
//! Every column name that reaches SQL text comes from a static allow-list
//! below; client values are always bound parameters.

use std::str::FromStr;

use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use storefront_core::{FilterCondition, FilterOp, Pagination, QueryError, QueryFeatures};

use crate::DbError;

/// How a column's bound text value is cast and how it is rendered in projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Uuid,
    Text,
    Numeric,
    Integer,
    Boolean,
    Timestamp,
    TextArray,
}

impl ColumnType {
    fn sql_type(self) -> &'static str {
        match self {
            Self::Uuid => "uuid",
            Self::Text => "text",
            Self::Numeric => "numeric",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamptz",
            Self::TextArray => "text[]",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
}

const fn col(name: &'static str, ty: ColumnType) -> Column {
    Column { name, ty }
}

const PRODUCT_COLUMNS: &[Column] = &[
    col("id", ColumnType::Uuid),
    col("name", ColumnType::Text),
    col("description", ColumnType::Text),
    col("quantity", ColumnType::Integer),
    col("sold", ColumnType::Integer),
    col("price", ColumnType::Numeric),
    col("price_after_discount", ColumnType::Numeric),
    col("colors", ColumnType::TextArray),
    col("image_cover", ColumnType::Text),
    col("images", ColumnType::TextArray),
    col("ratings_average", ColumnType::Numeric),
    col("ratings_quantity", ColumnType::Integer),
    col("category_id", ColumnType::Uuid),
    col("brand_id", ColumnType::Uuid),
    col("subcategory_id", ColumnType::Uuid),
    col("created_at", ColumnType::Timestamp),
    col("updated_at", ColumnType::Timestamp),
];

const TAXONOMY_COLUMNS: &[Column] = &[
    col("id", ColumnType::Uuid),
    col("name", ColumnType::Text),
    col("image", ColumnType::Text),
    col("created_at", ColumnType::Timestamp),
    col("updated_at", ColumnType::Timestamp),
];

const SUBCATEGORY_COLUMNS: &[Column] = &[
    col("id", ColumnType::Uuid),
    col("name", ColumnType::Text),
    col("image", ColumnType::Text),
    col("category_id", ColumnType::Uuid),
    col("created_at", ColumnType::Timestamp),
    col("updated_at", ColumnType::Timestamp),
];

const COUPON_COLUMNS: &[Column] = &[
    col("id", ColumnType::Uuid),
    col("name", ColumnType::Text),
    col("discount", ColumnType::Integer),
    col("expire", ColumnType::Timestamp),
    col("active", ColumnType::Boolean),
    col("created_at", ColumnType::Timestamp),
    col("updated_at", ColumnType::Timestamp),
];

const REVIEW_COLUMNS: &[Column] = &[
    col("id", ColumnType::Uuid),
    col("title", ColumnType::Text),
    col("rating", ColumnType::Integer),
    col("user_id", ColumnType::Uuid),
    col("product_id", ColumnType::Uuid),
    col("created_at", ColumnType::Timestamp),
    col("updated_at", ColumnType::Timestamp),
];

/// A table the list endpoints may query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Products,
    Categories,
    Subcategories,
    Brands,
    Coupons,
    Reviews,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Products,
        Collection::Categories,
        Collection::Subcategories,
        Collection::Brands,
        Collection::Coupons,
        Collection::Reviews,
    ];

    /// Table name; also the name accepted by [`FromStr`].
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::Categories => "categories",
            Self::Subcategories => "subcategories",
            Self::Brands => "brands",
            Self::Coupons => "coupons",
            Self::Reviews => "reviews",
        }
    }

    #[must_use]
    pub fn columns(self) -> &'static [Column] {
        match self {
            Self::Products => PRODUCT_COLUMNS,
            Self::Categories | Self::Brands => TAXONOMY_COLUMNS,
            Self::Subcategories => SUBCATEGORY_COLUMNS,
            Self::Coupons => COUPON_COLUMNS,
            Self::Reviews => REVIEW_COLUMNS,
        }
    }

    /// Text columns matched by `keyword`.
    #[must_use]
    pub fn search_columns(self) -> &'static [&'static str] {
        match self {
            Self::Products => &["name", "description"],
            Self::Categories | Self::Subcategories | Self::Brands | Self::Coupons => &["name"],
            Self::Reviews => &["title"],
        }
    }

    #[must_use]
    pub fn column(self, name: &str) -> Option<Column> {
        self.columns().iter().copied().find(|c| c.name == name)
    }

    /// Rows no query may see. Deactivated coupons are soft-deleted.
    fn base_predicate(self) -> Option<&'static str> {
        match self {
            Self::Coupons => Some("active = TRUE"),
            _ => None,
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Collection {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| DbError::InvalidTarget(s.to_string()))
    }
}

/// One page of projected rows plus its pagination summary.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub results: Vec<serde_json::Value>,
    pub total: u64,
    pub pagination: Pagination,
}

/// Count the rows matching `features`, then fetch the requested page.
///
/// Rows are returned as JSON objects holding the projected columns
/// (every column when `features.fields` is `None`). Numeric columns are
/// rendered as strings to keep cents exact.
///
/// # Errors
///
/// Returns [`DbError::Query`] if any filter, sort, or projection field is not
/// a column of `collection`, or [`DbError::Sqlx`] if either query fails
/// (including values Postgres cannot cast to the column type).
pub async fn find_page(
    pool: &PgPool,
    collection: Collection,
    features: &QueryFeatures,
) -> Result<Page, DbError> {
    features.check_fields(|name| collection.column(name).is_some())?;

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM ");
    count.push(collection.name());
    push_predicate(&mut count, collection, features)?;
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;
    let total = u64::try_from(total).unwrap_or(0);

    let mut select = QueryBuilder::<Postgres>::new("SELECT ");
    push_projection(&mut select, collection, features.fields.as_deref());
    select.push(" FROM ").push(collection.name());
    push_predicate(&mut select, collection, features)?;
    push_order(&mut select, collection, features)?;
    select
        .push(" LIMIT ")
        .push_bind(i64::from(features.limit))
        .push(" OFFSET ")
        .push_bind(i64::try_from(features.skip()).unwrap_or(i64::MAX));

    let results: Vec<serde_json::Value> = select.build_query_scalar().fetch_all(pool).await?;

    tracing::debug!(
        collection = collection.name(),
        total,
        returned = results.len(),
        page = features.page,
        "list query completed"
    );

    Ok(Page {
        results,
        total,
        pagination: features.pagination(total),
    })
}

fn resolve(collection: Collection, name: &str) -> Result<Column, DbError> {
    collection
        .column(name)
        .ok_or_else(|| QueryError::UnknownField(name.to_string()).into())
}

fn push_projection(
    qb: &mut QueryBuilder<'_, Postgres>,
    collection: Collection,
    fields: Option<&[String]>,
) {
    let columns: Vec<Column> = match fields {
        Some(names) => collection
            .columns()
            .iter()
            .copied()
            .filter(|c| names.iter().any(|n| n == c.name))
            .collect(),
        None => collection.columns().to_vec(),
    };

    qb.push("jsonb_build_object(");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push("'").push(column.name).push("', ").push(column.name);
        if column.ty == ColumnType::Numeric {
            qb.push("::text");
        }
    }
    qb.push(")");
}

fn push_predicate(
    qb: &mut QueryBuilder<'_, Postgres>,
    collection: Collection,
    features: &QueryFeatures,
) -> Result<(), DbError> {
    qb.push(" WHERE TRUE");
    if let Some(base) = collection.base_predicate() {
        qb.push(" AND ").push(base);
    }

    for condition in &features.filters {
        let column = resolve(collection, &condition.field)?;
        qb.push(" AND ");
        push_condition(qb, column, condition);
    }

    if let Some(keyword) = &features.keyword {
        let pattern = format!("%{}%", escape_like(keyword));
        qb.push(" AND (");
        for (i, name) in collection.search_columns().iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            qb.push(*name).push(" ILIKE ").push_bind(pattern.clone());
        }
        qb.push(")");
    }
    Ok(())
}

fn push_condition(qb: &mut QueryBuilder<'_, Postgres>, column: Column, condition: &FilterCondition) {
    let values: Vec<String> = condition.values().into_iter().map(ToOwned::to_owned).collect();

    match (condition.op, column.ty) {
        // Array columns: equality means membership, `in` means overlap.
        (FilterOp::Eq, ColumnType::TextArray) => {
            qb.push_bind(condition.value.clone())
                .push("::text = ANY(")
                .push(column.name)
                .push(")");
        }
        (FilterOp::Ne, ColumnType::TextArray) => {
            qb.push("NOT (")
                .push_bind(condition.value.clone())
                .push("::text = ANY(")
                .push(column.name)
                .push("))");
        }
        (FilterOp::In, ColumnType::TextArray) => {
            qb.push(column.name).push(" && ").push_bind(values).push("::text[]");
        }
        (FilterOp::In, ty) => {
            qb.push(column.name)
                .push(" = ANY(")
                .push_bind(values)
                .push("::text[]::")
                .push(ty.sql_type())
                .push("[])");
        }
        (op, ty) => {
            qb.push(column.name)
                .push(" ")
                .push(op.sql())
                .push(" ")
                .push_bind(condition.value.clone())
                .push("::text::")
                .push(ty.sql_type());
        }
    }
}

fn push_order(
    qb: &mut QueryBuilder<'_, Postgres>,
    collection: Collection,
    features: &QueryFeatures,
) -> Result<(), DbError> {
    qb.push(" ORDER BY ");
    for key in &features.sort {
        let column = resolve(collection, &key.field)?;
        qb.push(column.name).push(" ").push(key.direction.sql()).push(", ");
    }
    // Stable paging across equal sort keys.
    qb.push("id ASC");
    Ok(())
}

/// Escape `LIKE` metacharacters so the keyword matches literally.
fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
