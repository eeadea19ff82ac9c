//! Parsing of list-endpoint query strings into filter/sort/projection/paging
//! features, plus the pagination summary returned next to each page.
//!
//! The parser knows nothing about tables. Field names are checked against a
//! collection's column allow-list by the caller via [`QueryFeatures::check_fields`].

use serde::Serialize;
use thiserror::Error;

/// Upper bound applied to any requested page size.
pub const MAX_PAGE_LIMIT: u32 = 200;

const DEFAULT_SORT_FIELD: &str = "created_at";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("unknown field '{0}'")]
    UnknownField(String),
}

/// Comparison operator of a filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

impl FilterOp {
    /// Maps the bracketed operator of `field[op]=value` to a [`FilterOp`].
    #[must_use]
    pub fn from_operator(op: &str) -> Option<Self> {
        match op {
            "equals" => Some(Self::Eq),
            "not" => Some(Self::Ne),
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            "in" => Some(Self::In),
            _ => None,
        }
    }

    /// SQL comparison token. `In` is rendered as `= ANY(...)` by the query builder.
    #[must_use]
    pub fn sql(self) -> &'static str {
        match self {
            Self::Eq | Self::In => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCondition {
    pub field: String,
    pub op: FilterOp,
    pub value: String,
}

impl FilterCondition {
    /// Comma-separated members for [`FilterOp::In`]; a single value otherwise.
    #[must_use]
    pub fn values(&self) -> Vec<&str> {
        match self.op {
            FilterOp::In => self
                .value
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .collect(),
            _ => vec![self.value.as_str()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    #[must_use]
    pub fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

/// Everything a list request asked for, independent of the target collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFeatures {
    pub filters: Vec<FilterCondition>,
    /// Never empty; defaults to newest first.
    pub sort: Vec<SortKey>,
    /// `None` returns every column.
    pub fields: Option<Vec<String>>,
    pub keyword: Option<String>,
    pub page: u32,
    pub limit: u32,
}

impl QueryFeatures {
    /// Parse raw `(key, value)` query pairs.
    ///
    /// `default_limit` is used when `limit` is absent or not a positive
    /// integer. Repeated reserved keys keep the last value.
    pub fn parse<'a, I>(params: I, default_limit: u32) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut filters = Vec::new();
        let mut page = None;
        let mut limit = None;
        let mut sort = None;
        let mut fields = None;
        let mut keyword = None;

        for (key, value) in params {
            match key {
                "page" => page = Some(value),
                "limit" => limit = Some(value),
                "sort" => sort = Some(value),
                "fields" => fields = Some(value),
                "keyword" => keyword = Some(value),
                _ => {
                    if let Some(condition) = parse_filter(key, value) {
                        filters.push(condition);
                    }
                }
            }
        }

        let default_limit = default_limit.clamp(1, MAX_PAGE_LIMIT);

        Self {
            filters,
            sort: sort.map(parse_sort).filter(|s| !s.is_empty()).unwrap_or_else(|| {
                vec![SortKey {
                    field: DEFAULT_SORT_FIELD.to_string(),
                    direction: SortDirection::Desc,
                }]
            }),
            fields: fields.map(split_list).filter(|f| !f.is_empty()),
            keyword: keyword
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(ToOwned::to_owned),
            page: parse_positive(page).unwrap_or(1),
            limit: parse_positive(limit)
                .unwrap_or(default_limit)
                .min(MAX_PAGE_LIMIT),
        }
    }

    /// Number of rows to skip before the current page.
    #[must_use]
    pub fn skip(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    /// Add an equality filter the caller controls, e.g. scoping reviews to a product.
    #[must_use]
    pub fn with_filter(mut self, field: &str, value: impl Into<String>) -> Self {
        self.filters.retain(|f| f.field != field);
        self.filters.push(FilterCondition {
            field: field.to_string(),
            op: FilterOp::Eq,
            value: value.into(),
        });
        self
    }

    /// Check every filter, sort, and projection field against `is_known`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownField`] for the first field `is_known` rejects.
    pub fn check_fields(&self, is_known: impl Fn(&str) -> bool) -> Result<(), QueryError> {
        let names = self
            .filters
            .iter()
            .map(|f| f.field.as_str())
            .chain(self.sort.iter().map(|s| s.field.as_str()))
            .chain(self.fields.iter().flatten().map(String::as_str));

        for name in names {
            if !is_known(name) {
                return Err(QueryError::UnknownField(name.to_string()));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn pagination(&self, total: u64) -> Pagination {
        Pagination::summarize(self.page, self.limit, total)
    }
}

/// Page descriptor returned next to a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current_page: u32,
    pub limit: u32,
    pub number_of_pages: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<u32>,
}

impl Pagination {
    #[must_use]
    pub fn summarize(page: u32, limit: u32, total: u64) -> Self {
        let limit = limit.max(1);
        let end = u64::from(page) * u64::from(limit);
        Self {
            current_page: page,
            limit,
            number_of_pages: total.div_ceil(u64::from(limit)),
            next: (end < total).then(|| page + 1),
            prev: (page > 1).then(|| page - 1),
        }
    }
}

fn parse_filter(key: &str, value: &str) -> Option<FilterCondition> {
    let Some((field, rest)) = key.split_once('[') else {
        return Some(FilterCondition {
            field: key.to_string(),
            op: FilterOp::Eq,
            value: value.to_string(),
        });
    };

    let operator = rest.strip_suffix(']').unwrap_or(rest);
    if let Some(op) = FilterOp::from_operator(operator) {
        Some(FilterCondition {
            field: field.to_string(),
            op,
            value: value.to_string(),
        })
    } else {
        tracing::debug!(field, operator, "dropping unrecognized filter operator");
        None
    }
}

fn parse_sort(raw: &str) -> Vec<SortKey> {
    split_list(raw)
        .into_iter()
        .map(|field| match field.strip_prefix('-') {
            Some(name) => SortKey {
                field: name.to_string(),
                direction: SortDirection::Desc,
            },
            None => SortKey {
                field,
                direction: SortDirection::Asc,
            },
        })
        .filter(|key| !key.field.is_empty())
        .collect()
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn parse_positive(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|v| *v >= 1)
}

#[cfg(test)]
#[path = "query_test.rs"]
mod tests;
