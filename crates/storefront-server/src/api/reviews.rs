use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use storefront_core::QueryFeatures;
use storefront_db::{Collection, DbError, ReviewRow};

use crate::middleware::{CurrentUser, RequestId};

use super::{
    list_collection, map_db_error, parse_id, ApiError, ApiResponse, AppState, PaginatedResponse,
    ResponseMeta,
};

#[derive(Debug, Deserialize)]
pub(super) struct CreateReviewRequest {
    pub title: Option<String>,
    pub rating: i32,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateReviewRequest {
    pub title: Option<String>,
    pub rating: Option<i32>,
}

fn validate_rating(rid: &str, rating: i32) -> Result<(), ApiError> {
    if (1..=5).contains(&rating) {
        Ok(())
    } else {
        Err(ApiError::validation(
            rid,
            format!("rating must be 1-5, got {rating}"),
        ))
    }
}

/// GET /api/v1/products/{id}/reviews
pub(super) async fn list_product_reviews(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(product_id): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<PaginatedResponse<Vec<serde_json::Value>>>, ApiError> {
    let product_id = parse_id(&req_id.0, &product_id)?;
    let features = QueryFeatures::parse(
        params.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        state.default_page_limit,
    )
    .with_filter("product_id", product_id.to_string());

    list_collection(&state.pool, req_id, Collection::Reviews, &features).await
}

/// GET /api/v1/reviews/{id}
pub(super) async fn get_review(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ReviewRow>>, ApiError> {
    let rid = &req_id.0;
    let id = parse_id(rid, &id)?;

    let row = storefront_db::get_review(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| map_db_error(rid.clone(), &DbError::NotFound))?;

    Ok(Json(ApiResponse {
        data: row,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/products/{id}/reviews
pub(super) async fn create_review(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    CurrentUser(user_id): CurrentUser,
    Path(product_id): Path<String>,
    Json(body): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReviewRow>>), ApiError> {
    let rid = &req_id.0;
    let product_id = parse_id(rid, &product_id)?;
    validate_rating(rid, body.rating)?;
    let title = body.title.as_deref().map(str::trim).filter(|t| !t.is_empty());

    let row = storefront_db::create_review(&state.pool, user_id, product_id, title, body.rating)
        .await
        .map_err(|e| {
            if e.is_unique_violation() {
                ApiError::new(rid, "conflict", "you have already reviewed this product")
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

/// PATCH /api/v1/reviews/{id}: only the author may update.
pub(super) async fn update_review(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<UpdateReviewRequest>,
) -> Result<Json<ApiResponse<ReviewRow>>, ApiError> {
    let rid = &req_id.0;
    let id = parse_id(rid, &id)?;
    if let Some(rating) = body.rating {
        validate_rating(rid, rating)?;
    }

    let row = storefront_db::update_review(
        &state.pool,
        id,
        user_id,
        body.title.as_deref().map(str::trim),
        body.rating,
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?
    .ok_or_else(|| map_db_error(rid.clone(), &DbError::NotFound))?;

    Ok(Json(ApiResponse {
        data: row,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/v1/reviews/{id}: only the author may delete.
pub(super) async fn delete_review(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let rid = &req_id.0;
    let id = parse_id(rid, &id)?;

    let deleted = storefront_db::delete_review(&state.pool, id, user_id)
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
