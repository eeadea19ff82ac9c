//! The caller's shopping cart. Every route here needs `x-user-id`.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use storefront_core::Color;
use storefront_db::{CartView, NewCartItem};
use uuid::Uuid;

use crate::middleware::{CurrentUser, RequestId};

use super::{map_db_error, parse_id, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct AddToCartRequest {
    pub product_id: Uuid,
    pub color: Color,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateQuantityRequest {
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub(super) struct ApplyCouponRequest {
    pub coupon: String,
}

fn validate_quantity(rid: &str, quantity: i32) -> Result<(), ApiError> {
    if quantity < 1 {
        return Err(ApiError::validation(
            rid,
            format!("quantity must be at least 1, got {quantity}"),
        ));
    }
    Ok(())
}

fn respond(req_id: RequestId, view: CartView) -> Json<ApiResponse<CartView>> {
    Json(ApiResponse {
        data: view,
        meta: ResponseMeta::new(req_id.0),
    })
}

/// GET /api/v1/cart
pub(super) async fn get_cart(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<ApiResponse<CartView>>, ApiError> {
    let view = storefront_db::get_cart(&state.pool, user_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(respond(req_id, view))
}

/// POST /api/v1/cart
pub(super) async fn add_to_cart(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    CurrentUser(user_id): CurrentUser,
    Json(body): Json<AddToCartRequest>,
) -> Result<Json<ApiResponse<CartView>>, ApiError> {
    validate_quantity(&req_id.0, body.quantity)?;

    let item = NewCartItem {
        product_id: body.product_id,
        color: body.color,
        quantity: body.quantity,
    };
    let view = storefront_db::add_to_cart(&state.pool, user_id, item)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(respond(req_id, view))
}

/// DELETE /api/v1/cart
pub(super) async fn clear_cart(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    storefront_db::clear_cart(&state.pool, user_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: serde_json::json!({ "cleared": true }),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// PATCH /api/v1/cart/items/{item_id}
pub(super) async fn update_item_quantity(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    CurrentUser(user_id): CurrentUser,
    Path(item_id): Path<String>,
    Json(body): Json<UpdateQuantityRequest>,
) -> Result<Json<ApiResponse<CartView>>, ApiError> {
    let item_id = parse_id(&req_id.0, &item_id)?;
    validate_quantity(&req_id.0, body.quantity)?;

    let view =
        storefront_db::update_cart_item_quantity(&state.pool, user_id, item_id, body.quantity)
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(respond(req_id, view))
}

/// DELETE /api/v1/cart/items/{item_id}
pub(super) async fn remove_item(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    CurrentUser(user_id): CurrentUser,
    Path(item_id): Path<String>,
) -> Result<Json<ApiResponse<CartView>>, ApiError> {
    let item_id = parse_id(&req_id.0, &item_id)?;

    let view = storefront_db::remove_cart_item(&state.pool, user_id, item_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(respond(req_id, view))
}

/// POST /api/v1/cart/apply-coupon
pub(super) async fn apply_coupon(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    CurrentUser(user_id): CurrentUser,
    Json(body): Json<ApplyCouponRequest>,
) -> Result<Json<ApiResponse<CartView>>, ApiError> {
    let code = body.coupon.trim();
    if code.is_empty() {
        return Err(ApiError::validation(&req_id.0, "coupon is required"));
    }

    let view = storefront_db::apply_coupon(&state.pool, user_id, code)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(respond(req_id, view))
}
