mod addresses;
mod cart;
mod coupons;
mod products;
mod reviews;
mod subcategories;
mod taxonomy;
mod wishlist;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, patch, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::time::Duration;
use storefront_core::{Pagination, QueryError, QueryFeatures};
use storefront_db::{Collection, DbError, Taxonomy};
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
    USER_ID_HEADER,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// Page size for list endpoints whose request omits `limit`.
    pub default_page_limit: u32,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

/// List envelope: the page of rows, its pagination summary, and request meta.
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T: Serialize> {
    pub results: usize,
    pub pagination: Pagination,
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }

    pub(super) fn validation(request_id: &str, message: impl Into<String>) -> Self {
        Self::new(request_id, "validation_error", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "forbidden" => StatusCode::FORBIDDEN,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_db_error(request_id: String, error: &DbError) -> ApiError {
    match error {
        DbError::NotFound => ApiError::new(request_id, "not_found", "resource not found"),
        DbError::Forbidden => ApiError::new(
            request_id,
            "forbidden",
            "the resource belongs to another user",
        ),
        DbError::InvalidOrExpiredCoupon => {
            ApiError::new(request_id, "bad_request", "coupon is invalid or expired")
        }
        DbError::Query(QueryError::UnknownField(field)) => ApiError::new(
            request_id,
            "validation_error",
            format!("unknown field '{field}'"),
        ),
        e if e.is_unique_violation() => {
            ApiError::new(request_id, "conflict", "a record with that value already exists")
        }
        e if e.is_foreign_key_violation() => ApiError::new(
            request_id,
            "conflict",
            "the record is still referenced by other records",
        ),
        e if e.is_invalid_input() => {
            ApiError::new(request_id, "validation_error", "a supplied value is invalid")
        }
        e => {
            tracing::error!(error = %e, "database query failed");
            ApiError::new(request_id, "internal_error", "database query failed")
        }
    }
}

/// Parse a path id, answering malformed ones with `validation_error`.
pub(super) fn parse_id(request_id: &str, raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw)
        .map_err(|_| ApiError::validation(request_id, format!("'{raw}' is not a valid id")))
}

/// Character-count bounds check for a trimmed text field.
pub(super) fn validate_length(
    request_id: &str,
    field: &str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ApiError> {
    let len = value.chars().count();
    if (min..=max).contains(&len) {
        Ok(())
    } else {
        Err(ApiError::validation(
            request_id,
            format!("{field} must be {min}-{max} characters"),
        ))
    }
}

/// Run a list request against `collection` and wrap the page in the list envelope.
pub(super) async fn list_collection(
    pool: &PgPool,
    req_id: RequestId,
    collection: Collection,
    features: &QueryFeatures,
) -> Result<Json<PaginatedResponse<Vec<serde_json::Value>>>, ApiError> {
    let page = storefront_db::find_page(pool, collection, features)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(PaginatedResponse {
        results: page.results.len(),
        pagination: page.pagination,
        data: page.results,
        meta: ResponseMeta::new(req_id.0),
    }))
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
            HeaderName::from_static(USER_ID_HEADER),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/products",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/api/v1/products/{id}",
            get(products::get_product)
                .patch(products::update_product)
                .delete(products::delete_product),
        )
        .route(
            "/api/v1/products/{id}/reviews",
            get(reviews::list_product_reviews).post(reviews::create_review),
        )
        .route(
            "/api/v1/reviews/{id}",
            get(reviews::get_review)
                .patch(reviews::update_review)
                .delete(reviews::delete_review),
        )
        .merge(taxonomy::routes(Taxonomy::Category))
        .merge(taxonomy::routes(Taxonomy::Brand))
        .route(
            "/api/v1/subcategories",
            get(subcategories::list_subcategories).post(subcategories::create_subcategory),
        )
        .route(
            "/api/v1/subcategories/{id}",
            get(subcategories::get_subcategory)
                .patch(subcategories::update_subcategory)
                .delete(subcategories::delete_subcategory),
        )
        .route(
            "/api/v1/coupons",
            get(coupons::list_coupons).post(coupons::create_coupon),
        )
        .route(
            "/api/v1/coupons/{id}",
            get(coupons::get_coupon)
                .patch(coupons::update_coupon)
                .delete(coupons::delete_coupon),
        )
        .route(
            "/api/v1/cart",
            get(cart::get_cart)
                .post(cart::add_to_cart)
                .delete(cart::clear_cart),
        )
        .route(
            "/api/v1/cart/items/{item_id}",
            patch(cart::update_item_quantity).delete(cart::remove_item),
        )
        .route("/api/v1/cart/apply-coupon", post(cart::apply_coupon))
        .route(
            "/api/v1/wishlist",
            get(wishlist::get_wishlist).post(wishlist::add_to_wishlist),
        )
        .route(
            "/api/v1/wishlist/{product_id}",
            delete(wishlist::remove_from_wishlist),
        )
        .route(
            "/api/v1/addresses",
            get(addresses::list_addresses).post(addresses::create_address),
        )
        .route("/api/v1/addresses/{id}", delete(addresses::delete_address))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match storefront_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}
