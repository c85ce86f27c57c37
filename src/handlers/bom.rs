use super::common::{attachment_disposition, map_service_error, success_response};
use crate::{
    auth::{consts, AuthRouterExt},
    errors::{ApiError, ServiceError},
    export::ExportFormat,
    handlers::AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::info;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BomListParams {
    /// Assembly whose BOM to list
    pub part: i32,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BomDownloadParams {
    /// `csv`, `tsv` or `json`; defaults to the configured format
    pub format: Option<String>,
}

/// BOM endpoints: `/api/bom/` and the per-part download
pub fn bom_routes() -> Router<AppState> {
    Router::new()
        .route("/api/bom/", get(list_bom_items))
        .route("/api/part/:pk/bom-download/", get(download_bom))
        .with_permission(consts::PART_VIEW)
}

/// List BOM lines of an assembly
#[utoipa::path(
    get,
    path = "/api/bom/",
    params(BomListParams),
    responses((status = 200, description = "BOM lines with their sub parts")),
    tag = "bom"
)]
pub async fn list_bom_items(
    State(state): State<AppState>,
    Query(params): Query<BomListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let lines = state
        .services
        .bom
        .items_for(params.part)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(lines))
}

/// Download the BOM of a part as a file
#[utoipa::path(
    get,
    path = "/api/part/{pk}/bom-download/",
    params(("pk" = i32, Path, description = "Assembly primary key"), BomDownloadParams),
    responses(
        (status = 200, description = "BOM file", content_type = "text/csv"),
        (status = 400, description = "Unsupported format", body = crate::errors::ErrorResponse),
        (status = 404, description = "Part not found", body = crate::errors::ErrorResponse)
    ),
    tag = "bom"
)]
pub async fn download_bom(
    State(state): State<AppState>,
    Path(pk): Path<i32>,
    Query(params): Query<BomDownloadParams>,
) -> Result<Response, ApiError> {
    let format: ExportFormat = params
        .format
        .as_deref()
        .unwrap_or(&state.config.bom_export_default_format)
        .parse()
        .map_err(ServiceError::from)?;

    let part = state.services.parts.get(pk).await.map_err(map_service_error)?;
    let dataset = state
        .services
        .bom
        .export(pk, format)
        .await
        .map_err(map_service_error)?;
    let body = dataset.into_body(format).map_err(ServiceError::from)?;

    info!(part_id = pk, format = %format, "Streaming BOM download");

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                attachment_disposition(&format!("{}_BOM", part.full_name()), format.extension()),
            ),
        ],
        body,
    )
        .into_response())
}
