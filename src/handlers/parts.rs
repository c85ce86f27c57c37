use super::common::{map_service_error, success_response};
use crate::{
    auth::{consts, AuthRouterExt},
    errors::ApiError,
    handlers::AppState,
    services::part::PartFilter,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};

/// Part catalog endpoints
pub fn part_routes() -> Router<AppState> {
    Router::new()
        .route("/api/part/", get(list_parts))
        .route("/api/part/:pk/", get(get_part))
        .route("/api/part/category/", get(list_categories))
        .route("/api/part/category/:pk/", get(get_category))
        .with_permission(consts::PART_VIEW)
}

/// List parts
#[utoipa::path(
    get,
    path = "/api/part/",
    params(PartFilter),
    responses(
        (status = 200, description = "Parts matching the filters"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "parts"
)]
pub async fn list_parts(
    State(state): State<AppState>,
    Query(filter): Query<PartFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let parts = state
        .services
        .parts
        .list(filter)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(parts))
}

/// Get a part by primary key
#[utoipa::path(
    get,
    path = "/api/part/{pk}/",
    params(("pk" = i32, Path, description = "Part primary key")),
    responses(
        (status = 200, description = "Part found"),
        (status = 404, description = "Part not found", body = crate::errors::ErrorResponse)
    ),
    tag = "parts"
)]
pub async fn get_part(
    State(state): State<AppState>,
    Path(pk): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let part = state.services.parts.get(pk).await.map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({
        "full_name": part.full_name(),
        "url": part.get_absolute_url(),
        "part": part,
    })))
}

/// List part categories
#[utoipa::path(
    get,
    path = "/api/part/category/",
    responses((status = 200, description = "All part categories")),
    tag = "parts"
)]
pub async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let categories = state
        .services
        .parts
        .categories()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(categories))
}

/// Get a category with its ancestry
#[utoipa::path(
    get,
    path = "/api/part/category/{pk}/",
    params(("pk" = i32, Path, description = "Category primary key")),
    responses(
        (status = 200, description = "Category found"),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    tag = "parts"
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(pk): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let path = state
        .services
        .parts
        .category_path(pk)
        .await
        .map_err(map_service_error)?;
    let children = state
        .services
        .parts
        .child_categories(pk)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({
        "category": path.last(),
        "path": path,
        "children": children,
    })))
}
