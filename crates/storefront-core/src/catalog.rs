//! Seed catalog file: categories, brands, products, and coupons in YAML.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Color, ConfigError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySeed {
    pub name: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandSeed {
    pub name: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSeed {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub price_after_discount: Option<Decimal>,
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub colors: Vec<Color>,
    pub image_cover: String,
    #[serde(default)]
    pub images: Vec<String>,
    /// Name of a category declared in the same file.
    pub category: String,
    /// Name of a brand declared in the same file.
    pub brand: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponSeed {
    pub name: String,
    pub discount: i32,
    pub expire: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub categories: Vec<CategorySeed>,
    #[serde(default)]
    pub brands: Vec<BrandSeed>,
    #[serde(default)]
    pub products: Vec<ProductSeed>,
    #[serde(default)]
    pub coupons: Vec<CouponSeed>,
}

/// Load and validate a catalog from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_catalog(path: &Path) -> Result<CatalogFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CatalogFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let catalog: CatalogFile = serde_yaml::from_str(&content)?;
    validate_catalog(&catalog)?;

    Ok(catalog)
}

fn validate_catalog(catalog: &CatalogFile) -> Result<(), ConfigError> {
    let categories = unique_names("category", catalog.categories.iter().map(|c| &c.name))?;
    let brands = unique_names("brand", catalog.brands.iter().map(|b| &b.name))?;
    unique_names("product", catalog.products.iter().map(|p| &p.name))?;
    unique_names("coupon", catalog.coupons.iter().map(|c| &c.name))?;

    for product in &catalog.products {
        if !categories.contains(&product.category.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "product '{}' references unknown category '{}'",
                product.name, product.category
            )));
        }
        if let Some(ref brand) = product.brand {
            if !brands.contains(&brand.to_lowercase()) {
                return Err(ConfigError::Validation(format!(
                    "product '{}' references unknown brand '{brand}'",
                    product.name
                )));
            }
        }
        if product.price.is_sign_negative() {
            return Err(ConfigError::Validation(format!(
                "product '{}' has negative price {}",
                product.name, product.price
            )));
        }
        if product.quantity < 0 {
            return Err(ConfigError::Validation(format!(
                "product '{}' has negative quantity {}",
                product.name, product.quantity
            )));
        }
    }

    for coupon in &catalog.coupons {
        if !(1..=100).contains(&coupon.discount) {
            return Err(ConfigError::Validation(format!(
                "coupon '{}' has invalid discount {}; must be 1-100",
                coupon.name, coupon.discount
            )));
        }
    }

    Ok(())
}

/// Reject blank and case-insensitively duplicated names; returns the lowercased set.
fn unique_names<'a>(
    kind: &str,
    names: impl Iterator<Item = &'a String>,
) -> Result<HashSet<String>, ConfigError> {
    let mut seen = HashSet::new();
    for name in names {
        if name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{kind} name must be non-empty"
            )));
        }
        if !seen.insert(name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate {kind} name: '{name}'"
            )));
        }
    }
    Ok(seen)
}
