use super::common::{map_service_error, success_response};
use crate::{
    auth::{consts, AuthRouterExt},
    errors::ApiError,
    handlers::AppState,
    services::company::{CompanyFilter, SupplierPartFilter},
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};

/// Company and supplier part endpoints
pub fn company_routes() -> Router<AppState> {
    Router::new()
        .route("/api/company/", get(list_companies))
        .route("/api/company/:pk/", get(get_company))
        .route("/api/company/part/", get(list_supplier_parts))
        .route("/api/company/part/:pk/", get(get_supplier_part))
        .with_permission(consts::PART_VIEW)
}

/// List companies
#[utoipa::path(
    get,
    path = "/api/company/",
    params(CompanyFilter),
    responses(
        (status = 200, description = "Companies matching the filters"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "companies"
)]
pub async fn list_companies(
    State(state): State<AppState>,
    Query(filter): Query<CompanyFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let companies = state
        .services
        .companies
        .list(filter)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(companies))
}

/// Get a company by primary key
#[utoipa::path(
    get,
    path = "/api/company/{pk}/",
    params(("pk" = i32, Path, description = "Company primary key")),
    responses(
        (status = 200, description = "Company found"),
        (status = 404, description = "Company not found", body = crate::errors::ErrorResponse)
    ),
    tag = "companies"
)]
pub async fn get_company(
    State(state): State<AppState>,
    Path(pk): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let company = state
        .services
        .companies
        .get(pk)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({
        "url": company.get_absolute_url(),
        "roles": company.roles(),
        "company": company,
    })))
}

/// List supplier parts
#[utoipa::path(
    get,
    path = "/api/company/part/",
    params(SupplierPartFilter),
    responses((status = 200, description = "Supplier parts with their part and companies")),
    tag = "companies"
)]
pub async fn list_supplier_parts(
    State(state): State<AppState>,
    Query(filter): Query<SupplierPartFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state
        .services
        .companies
        .supplier_parts(filter)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(rows))
}

/// Get a supplier part by primary key
#[utoipa::path(
    get,
    path = "/api/company/part/{pk}/",
    params(("pk" = i32, Path, description = "Supplier part primary key")),
    responses(
        (status = 200, description = "Supplier part found"),
        (status = 404, description = "Supplier part not found", body = crate::errors::ErrorResponse)
    ),
    tag = "companies"
)]
pub async fn get_supplier_part(
    State(state): State<AppState>,
    Path(pk): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state
        .services
        .companies
        .supplier_part(pk)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(row))
}
