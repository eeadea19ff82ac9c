use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use storefront_core::QueryFeatures;
use storefront_db::{Collection, DbError, SubcategoryRow};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{
    list_collection, map_db_error, parse_id, validate_length, ApiError, ApiResponse, AppState,
    PaginatedResponse, ResponseMeta,
};

#[derive(Debug, Deserialize)]
pub(super) struct CreateSubcategoryRequest {
    pub name: String,
    pub image: Option<String>,
    pub category_id: Uuid,
}

/// The parent category cannot be changed after creation.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct UpdateSubcategoryRequest {
    pub name: Option<String>,
    pub image: Option<String>,
}

fn validate_name(rid: &str, name: &str) -> Result<(), ApiError> {
    validate_length(rid, "name", name, 2, 32)
}

/// GET /api/v1/subcategories
pub(super) async fn list_subcategories(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<PaginatedResponse<Vec<serde_json::Value>>>, ApiError> {
    let features = QueryFeatures::parse(
        params.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        state.default_page_limit,
    );
    list_collection(&state.pool, req_id, Collection::Subcategories, &features).await
}

/// GET /api/v1/subcategories/{id}
pub(super) async fn get_subcategory(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<SubcategoryRow>>, ApiError> {
    let rid = &req_id.0;
    let id = parse_id(rid, &id)?;

    let row = storefront_db::get_subcategory(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| map_db_error(rid.clone(), &DbError::NotFound))?;

    Ok(Json(ApiResponse {
        data: row,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/subcategories
pub(super) async fn create_subcategory(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateSubcategoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SubcategoryRow>>), ApiError> {
    let rid = &req_id.0;
    let name = body.name.trim();
    validate_name(rid, name)?;

    let row = storefront_db::create_subcategory(
        &state.pool,
        body.category_id,
        name,
        body.image.as_deref(),
    )
    .await
    .map_err(|e| match e {
        DbError::NotFound => ApiError::validation(rid, "category_id does not exist"),
        e => map_db_error(rid.clone(), &e),
    })?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: row,
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// PATCH /api/v1/subcategories/{id}
pub(super) async fn update_subcategory(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
    Json(body): Json<UpdateSubcategoryRequest>,
) -> Result<Json<ApiResponse<SubcategoryRow>>, ApiError> {
    let rid = &req_id.0;
    let id = parse_id(rid, &id)?;
    let name = body.name.as_deref().map(str::trim);
    if let Some(name) = name {
        validate_name(rid, name)?;
    }

    let row = storefront_db::update_subcategory(&state.pool, id, name, body.image.as_deref())
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| map_db_error(rid.clone(), &DbError::NotFound))?;

    Ok(Json(ApiResponse {
        data: row,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/v1/subcategories/{id}
pub(super) async fn delete_subcategory(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let rid = &req_id.0;
    let id = parse_id(rid, &id)?;

    let deleted = storefront_db::delete_subcategory(&state.pool, id)
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
