//! The caller's saved addresses. Deleting someone else's is forbidden.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use storefront_db::{AddressRow, NewAddress};

use crate::middleware::{CurrentUser, RequestId};

use super::{
    map_db_error, parse_id, validate_length, ApiError, ApiResponse, AppState, ResponseMeta,
};

#[derive(Debug, Deserialize)]
pub(super) struct CreateAddressRequest {
    pub alias: String,
    pub details: String,
    pub phone: String,
    pub city: String,
    pub postal_code: Option<String>,
}

impl CreateAddressRequest {
    fn validate(self, rid: &str) -> Result<NewAddress, ApiError> {
        let address = NewAddress {
            alias: self.alias.trim().to_owned(),
            details: self.details.trim().to_owned(),
            phone: self.phone.trim().to_owned(),
            city: self.city.trim().to_owned(),
            postal_code: self
                .postal_code
                .map(|p| p.trim().to_owned())
                .filter(|p| !p.is_empty()),
        };
        validate_length(rid, "alias", &address.alias, 2, 50)?;
        validate_length(rid, "details", &address.details, 5, 500)?;
        validate_length(rid, "phone", &address.phone, 11, 20)?;
        validate_length(rid, "city", &address.city, 2, 100)?;
        Ok(address)
    }
}

/// GET /api/v1/addresses
pub(super) async fn list_addresses(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<ApiResponse<Vec<AddressRow>>>, ApiError> {
    let rows = storefront_db::list_addresses(&state.pool, user_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/addresses
pub(super) async fn create_address(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    CurrentUser(user_id): CurrentUser,
    Json(body): Json<CreateAddressRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AddressRow>>), ApiError> {
    let rid = &req_id.0;
    let address = body.validate(rid)?;

    let row = storefront_db::create_address(&state.pool, user_id, &address)
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

/// DELETE /api/v1/addresses/{id}
pub(super) async fn delete_address(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let rid = &req_id.0;
    let id = parse_id(rid, &id)?;

    storefront_db::delete_address(&state.pool, user_id, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: serde_json::json!({ "deleted": true }),
        meta: ResponseMeta::new(req_id.0),
    }))
}
