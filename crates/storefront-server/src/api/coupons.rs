use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use storefront_core::QueryFeatures;
use storefront_db::{Collection, CouponPatch, CouponRow, DbError, NewCoupon};

use crate::middleware::RequestId;

use super::{
    list_collection, map_db_error, parse_id, ApiError, ApiResponse, AppState, PaginatedResponse,
    ResponseMeta,
};

/// Coupons page through in smaller batches than catalog lists.
const COUPON_PAGE_LIMIT: u32 = 10;

#[derive(Debug, Deserialize)]
pub(super) struct CreateCouponRequest {
    pub name: String,
    pub discount: i32,
    pub expire: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateCouponRequest {
    pub name: Option<String>,
    pub discount: Option<i32>,
    pub expire: Option<DateTime<Utc>>,
}

fn validate_code(rid: &str, name: &str) -> Result<(), ApiError> {
    if name.chars().count() < 3 {
        return Err(ApiError::validation(rid, "name must be at least 3 characters"));
    }
    Ok(())
}

fn validate_discount(rid: &str, discount: i32) -> Result<(), ApiError> {
    if (1..=100).contains(&discount) {
        Ok(())
    } else {
        Err(ApiError::validation(
            rid,
            format!("discount must be 1-100, got {discount}"),
        ))
    }
}

/// GET /api/v1/coupons
pub(super) async fn list_coupons(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<PaginatedResponse<Vec<serde_json::Value>>>, ApiError> {
    let features = QueryFeatures::parse(
        params.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        COUPON_PAGE_LIMIT,
    );
    list_collection(&state.pool, req_id, Collection::Coupons, &features).await
}

/// GET /api/v1/coupons/{id}
pub(super) async fn get_coupon(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<CouponRow>>, ApiError> {
    let rid = &req_id.0;
    let id = parse_id(rid, &id)?;

    let row = storefront_db::get_coupon(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| map_db_error(rid.clone(), &DbError::NotFound))?;

    Ok(Json(ApiResponse {
        data: row,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/coupons
pub(super) async fn create_coupon(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateCouponRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CouponRow>>), ApiError> {
    let rid = &req_id.0;
    let name = body.name.trim().to_owned();
    validate_code(rid, &name)?;
    validate_discount(rid, body.discount)?;

    let row = storefront_db::create_coupon(
        &state.pool,
        &NewCoupon {
            name,
            discount: body.discount,
            expire: body.expire,
        },
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: row,
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// PATCH /api/v1/coupons/{id}
pub(super) async fn update_coupon(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
    Json(body): Json<UpdateCouponRequest>,
) -> Result<Json<ApiResponse<CouponRow>>, ApiError> {
    let rid = &req_id.0;
    let id = parse_id(rid, &id)?;

    let name = body.name.as_ref().map(|n| n.trim().to_owned());
    if let Some(ref name) = name {
        validate_code(rid, name)?;
    }
    if let Some(discount) = body.discount {
        validate_discount(rid, discount)?;
    }

    let patch = CouponPatch {
        name,
        discount: body.discount,
        expire: body.expire,
    };
    let row = storefront_db::update_coupon(&state.pool, id, &patch)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| map_db_error(rid.clone(), &DbError::NotFound))?;

    Ok(Json(ApiResponse {
        data: row,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/v1/coupons/{id}: deactivates the coupon.
pub(super) async fn delete_coupon(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let rid = &req_id.0;
    let id = parse_id(rid, &id)?;

    let deactivated = storefront_db::deactivate_coupon(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    if !deactivated {
        return Err(map_db_error(rid.clone(), &DbError::NotFound));
    }

    Ok(Json(ApiResponse {
        data: serde_json::json!({ "deactivated": true }),
        meta: ResponseMeta::new(req_id.0),
    }))
}
