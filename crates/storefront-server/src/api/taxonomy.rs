//! Categories and brands: one set of handlers, parameterized by the
//! [`Taxonomy`] extension each route group carries.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;
use storefront_core::QueryFeatures;
use storefront_db::{DbError, Taxonomy, TaxonomyRow};

use crate::middleware::RequestId;

use super::{
    list_collection, map_db_error, parse_id, validate_length, ApiError, ApiResponse, AppState,
    PaginatedResponse, ResponseMeta,
};

#[derive(Debug, Deserialize)]
pub(super) struct CreateTaxonomyRequest {
    pub name: String,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateTaxonomyRequest {
    pub name: Option<String>,
    pub image: Option<String>,
}

/// `/api/v1/categories` or `/api/v1/brands` with their `/{id}` routes.
pub(super) fn routes(kind: Taxonomy) -> Router<AppState> {
    let base = format!("/api/v1/{}", kind.collection().name());
    Router::new()
        .route(&base, get(list).post(create))
        .route(&format!("{base}/{{id}}"), get(get_one).patch(update).delete(delete))
        .layer(Extension(kind))
}

fn validate_name(rid: &str, name: &str) -> Result<(), ApiError> {
    validate_length(rid, "name", name, 3, 32)
}

async fn list(
    State(state): State<AppState>,
    Extension(kind): Extension<Taxonomy>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<PaginatedResponse<Vec<serde_json::Value>>>, ApiError> {
    let features = QueryFeatures::parse(
        params.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        state.default_page_limit,
    );
    list_collection(&state.pool, req_id, kind.collection(), &features).await
}

async fn get_one(
    State(state): State<AppState>,
    Extension(kind): Extension<Taxonomy>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<TaxonomyRow>>, ApiError> {
    let rid = &req_id.0;
    let id = parse_id(rid, &id)?;

    let row = storefront_db::get_taxonomy(&state.pool, kind, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| map_db_error(rid.clone(), &DbError::NotFound))?;

    Ok(Json(ApiResponse {
        data: row,
        meta: ResponseMeta::new(req_id.0),
    }))
}

async fn create(
    State(state): State<AppState>,
    Extension(kind): Extension<Taxonomy>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateTaxonomyRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TaxonomyRow>>), ApiError> {
    let rid = &req_id.0;
    let name = body.name.trim();
    validate_name(rid, name)?;

    let row = storefront_db::create_taxonomy(&state.pool, kind, name, body.image.as_deref())
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

async fn update(
    State(state): State<AppState>,
    Extension(kind): Extension<Taxonomy>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
    Json(body): Json<UpdateTaxonomyRequest>,
) -> Result<Json<ApiResponse<TaxonomyRow>>, ApiError> {
    let rid = &req_id.0;
    let id = parse_id(rid, &id)?;
    let name = body.name.as_deref().map(str::trim);
    if let Some(name) = name {
        validate_name(rid, name)?;
    }

    let row = storefront_db::update_taxonomy(&state.pool, kind, id, name, body.image.as_deref())
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| map_db_error(rid.clone(), &DbError::NotFound))?;

    Ok(Json(ApiResponse {
        data: row,
        meta: ResponseMeta::new(req_id.0),
    }))
}

async fn delete(
    State(state): State<AppState>,
    Extension(kind): Extension<Taxonomy>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let rid = &req_id.0;
    let id = parse_id(rid, &id)?;

    let deleted = storefront_db::delete_taxonomy(&state.pool, kind, id)
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
