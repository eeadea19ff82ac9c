//! Pure storefront logic: configuration, money math, and query parsing.
//!
//! Nothing in this crate performs I/O beyond reading config files, so every
//! rule here is testable without a database.

pub mod app_config;
pub mod catalog;
pub mod config;
pub mod pricing;
pub mod query;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use catalog::{load_catalog, CatalogFile};
pub use config::{load_app_config, load_app_config_from_env};
pub use pricing::{apply_discount, cart_totals, round_money, CartTotals, PricedLine};
pub use query::{
    FilterCondition, FilterOp, Pagination, QueryError, QueryFeatures, SortDirection, SortKey,
    MAX_PAGE_LIMIT,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("failed to read catalog file {path}: {source}")]
    CatalogFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog file: {0}")]
    CatalogFileParse(#[from] serde_yaml::Error),
    #[error("catalog validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid color: {0}")]
    InvalidColor(String),
}

/// Product color variants a cart line can be keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Color {
    Blue,
    Green,
    Silver,
    SpaceGray,
    Black,
    White,
    Gold,
}

impl Color {
    pub const ALL: [Color; 7] = [
        Color::Blue,
        Color::Green,
        Color::Silver,
        Color::SpaceGray,
        Color::Black,
        Color::White,
        Color::Gold,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Color::Blue => "BLUE",
            Color::Green => "GREEN",
            Color::Silver => "SILVER",
            Color::SpaceGray => "SPACE_GRAY",
            Color::Black => "BLACK",
            Color::White => "WHITE",
            Color::Gold => "GOLD",
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Color {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CoreError::InvalidColor(s.to_string()))
    }
}
