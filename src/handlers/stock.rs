use super::common::{map_service_error, success_response};
use crate::{
    auth::{consts, AuthRouterExt},
    errors::ApiError,
    handlers::AppState,
    services::stock::StockFilter,
    status::StockStatus,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LocationFilter {
    /// Only direct children of this location
    pub parent: Option<i32>,
}

/// Stock item and location endpoints
pub fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/api/stock/", get(list_stock))
        .route("/api/stock/status/", get(stock_status_codes))
        .route("/api/stock/:pk/", get(get_stock_item))
        .route("/api/stock/location/", get(list_locations))
        .route("/api/stock/location/:pk/", get(get_location))
        .with_permission(consts::STOCK_VIEW)
}

/// List stock items
#[utoipa::path(
    get,
    path = "/api/stock/",
    params(StockFilter),
    responses(
        (status = 200, description = "Stock items matching the filters"),
        (status = 400, description = "Unknown status code", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "stock"
)]
pub async fn list_stock(
    State(state): State<AppState>,
    Query(filter): Query<StockFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let items = state
        .services
        .stock
        .list(filter)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(items))
}

/// Get a stock item by primary key
#[utoipa::path(
    get,
    path = "/api/stock/{pk}/",
    params(("pk" = i32, Path, description = "Stock item primary key")),
    responses(
        (status = 200, description = "Stock item found"),
        (status = 404, description = "Stock item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "stock"
)]
pub async fn get_stock_item(
    State(state): State<AppState>,
    Path(pk): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let item = state
        .services
        .stock
        .item(pk)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(item))
}

/// List stock locations
#[utoipa::path(
    get,
    path = "/api/stock/location/",
    params(LocationFilter),
    responses((status = 200, description = "Stock locations")),
    tag = "stock"
)]
pub async fn list_locations(
    State(state): State<AppState>,
    Query(filter): Query<LocationFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let locations = state
        .services
        .stock
        .locations(filter.parent)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(locations))
}

/// Get a location with its ancestry
#[utoipa::path(
    get,
    path = "/api/stock/location/{pk}/",
    params(("pk" = i32, Path, description = "Location primary key")),
    responses(
        (status = 200, description = "Location found"),
        (status = 404, description = "Location not found", body = crate::errors::ErrorResponse)
    ),
    tag = "stock"
)]
pub async fn get_location(
    State(state): State<AppState>,
    Path(pk): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let stock = &state.services.stock;
    let path = stock.location_path(pk).await.map_err(map_service_error)?;
    let children = stock.locations(Some(pk)).await.map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({
        "location": path.last(),
        "path": path,
        "children": children,
    })))
}

/// Stock status codes with their labels
#[utoipa::path(
    get,
    path = "/api/stock/status/",
    responses((status = 200, description = "Status code table")),
    tag = "stock"
)]
pub async fn stock_status_codes() -> impl IntoResponse {
    success_response(serde_json::json!({
        "class": "StockStatus",
        "values": StockStatus::describe(),
        "available": StockStatus::available_codes(),
    }))
}
