//! The caller's wishlist, keyed by `x-user-id`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use storefront_db::{DbError, WishlistRow, WishlistView};
use uuid::Uuid;

use crate::middleware::{CurrentUser, RequestId};

use super::{map_db_error, parse_id, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct AddToWishlistRequest {
    pub product_id: Uuid,
}

/// GET /api/v1/wishlist
pub(super) async fn get_wishlist(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<ApiResponse<WishlistView>>, ApiError> {
    let view = storefront_db::get_wishlist(&state.pool, user_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: view,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/wishlist
pub(super) async fn add_to_wishlist(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    CurrentUser(user_id): CurrentUser,
    Json(body): Json<AddToWishlistRequest>,
) -> Result<(StatusCode, Json<ApiResponse<WishlistRow>>), ApiError> {
    let rid = &req_id.0;

    let row = storefront_db::add_to_wishlist(&state.pool, user_id, body.product_id)
        .await
        .map_err(|e| {
            if e.is_unique_violation() {
                ApiError::new(rid, "conflict", "product is already on your wishlist")
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

/// DELETE /api/v1/wishlist/{product_id}
pub(super) async fn remove_from_wishlist(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    CurrentUser(user_id): CurrentUser,
    Path(product_id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let rid = &req_id.0;
    let product_id = parse_id(rid, &product_id)?;

    let removed = storefront_db::remove_from_wishlist(&state.pool, user_id, product_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    if !removed {
        return Err(map_db_error(rid.clone(), &DbError::NotFound));
    }

    Ok(Json(ApiResponse {
        data: serde_json::json!({ "deleted": true }),
        meta: ResponseMeta::new(req_id.0),
    }))
}
