use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use storefront_core::{Color, QueryFeatures};
use storefront_db::{Collection, DbError, NewProduct, ProductPatch, ProductRow};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{
    list_collection, map_db_error, parse_id, validate_length, ApiError, ApiResponse, AppState,
    PaginatedResponse, ResponseMeta,
};

#[derive(Debug, Deserialize)]
pub(super) struct CreateProductRequest {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub quantity: i32,
    pub price: Decimal,
    pub price_after_discount: Option<Decimal>,
    #[serde(default)]
    pub colors: Vec<Color>,
    pub image_cover: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub category_id: Uuid,
    pub brand_id: Option<Uuid>,
    pub subcategory_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<i32>,
    pub sold: Option<i32>,
    pub price: Option<Decimal>,
    pub price_after_discount: Option<Decimal>,
    pub colors: Option<Vec<Color>>,
    pub image_cover: Option<String>,
    pub images: Option<Vec<String>>,
    pub subcategory_id: Option<Uuid>,
}

fn validate_name(rid: &str, name: &str) -> Result<(), ApiError> {
    validate_length(rid, "name", name, 2, 64)
}

fn validate_description(rid: &str, description: &str) -> Result<(), ApiError> {
    validate_length(rid, "description", description, 10, 1000)
}

fn validate_non_negative(rid: &str, field: &str, value: Decimal) -> Result<(), ApiError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ApiError::validation(rid, format!("{field} must not be negative")));
    }
    Ok(())
}

fn validate_count(rid: &str, field: &str, value: i32) -> Result<(), ApiError> {
    if value < 0 {
        return Err(ApiError::validation(rid, format!("{field} must not be negative")));
    }
    Ok(())
}

fn color_names(colors: &[Color]) -> Vec<String> {
    colors.iter().map(|c| c.as_str().to_owned()).collect()
}

/// GET /api/v1/products
pub(super) async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<PaginatedResponse<Vec<serde_json::Value>>>, ApiError> {
    let features = QueryFeatures::parse(
        params.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        state.default_page_limit,
    );
    list_collection(&state.pool, req_id, Collection::Products, &features).await
}

/// GET /api/v1/products/{id}
pub(super) async fn get_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ProductRow>>, ApiError> {
    let rid = &req_id.0;
    let id = parse_id(rid, &id)?;

    let row = storefront_db::get_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| map_db_error(rid.clone(), &DbError::NotFound))?;

    Ok(Json(ApiResponse {
        data: row,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/products
pub(super) async fn create_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProductRow>>), ApiError> {
    let rid = &req_id.0;

    let name = body.name.trim().to_owned();
    validate_name(rid, &name)?;
    validate_description(rid, body.description.trim())?;
    validate_non_negative(rid, "price", body.price)?;
    if let Some(discounted) = body.price_after_discount {
        validate_non_negative(rid, "price_after_discount", discounted)?;
    }
    validate_count(rid, "quantity", body.quantity)?;
    if body.image_cover.trim().is_empty() {
        return Err(ApiError::validation(rid, "image_cover is required"));
    }

    let product = NewProduct {
        name,
        description: body.description.trim().to_owned(),
        quantity: body.quantity,
        price: body.price,
        price_after_discount: body.price_after_discount,
        colors: color_names(&body.colors),
        image_cover: body.image_cover,
        images: body.images,
        category_id: body.category_id,
        brand_id: body.brand_id,
        subcategory_id: body.subcategory_id,
    };

    let row = storefront_db::create_product(&state.pool, &product)
        .await
        .map_err(|e| {
            if e.is_foreign_key_violation() {
                ApiError::validation(
                    rid,
                    "category_id, brand_id, or subcategory_id does not exist",
                )
            } else {
                map_db_error(rid.clone(), &e)
            }
        })?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: row,
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// PATCH /api/v1/products/{id}
pub(super) async fn update_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
    Json(body): Json<UpdateProductRequest>,
) -> Result<Json<ApiResponse<ProductRow>>, ApiError> {
    let rid = &req_id.0;
    let id = parse_id(rid, &id)?;

    let name = body.name.as_ref().map(|n| n.trim().to_owned());
    if let Some(ref name) = name {
        validate_name(rid, name)?;
    }
    let description = body.description.as_ref().map(|d| d.trim().to_owned());
    if let Some(ref description) = description {
        validate_description(rid, description)?;
    }
    if let Some(price) = body.price {
        validate_non_negative(rid, "price", price)?;
    }
    if let Some(discounted) = body.price_after_discount {
        validate_non_negative(rid, "price_after_discount", discounted)?;
    }
    if let Some(quantity) = body.quantity {
        validate_count(rid, "quantity", quantity)?;
    }
    if let Some(sold) = body.sold {
        validate_count(rid, "sold", sold)?;
    }

    let patch = ProductPatch {
        name,
        description,
        quantity: body.quantity,
        sold: body.sold,
        price: body.price,
        price_after_discount: body.price_after_discount,
        colors: body.colors.as_deref().map(color_names),
        image_cover: body.image_cover,
        images: body.images,
        subcategory_id: body.subcategory_id,
    };

    let row = storefront_db::update_product(&state.pool, id, &patch)
        .await
        .map_err(|e| {
            if e.is_foreign_key_violation() {
                ApiError::validation(rid, "subcategory_id does not exist")
            } else {
                map_db_error(rid.clone(), &e)
            }
        })?
        .ok_or_else(|| map_db_error(rid.clone(), &DbError::NotFound))?;

    Ok(Json(ApiResponse {
        data: row,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/v1/products/{id}
pub(super) async fn delete_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let rid = &req_id.0;
    let id = parse_id(rid, &id)?;

    let deleted = storefront_db::delete_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    if !deleted {
        return Err(map_db_error(rid.clone(), &DbError::NotFound));
    }

    Ok(Json(ApiResponse {
        data: serde_json::json!({ "deleted": true }),
        meta: ResponseMeta::new(req_id.0),
    }))
}
