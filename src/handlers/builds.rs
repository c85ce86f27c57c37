use super::common::{created_response, map_service_error, success_response};
use crate::{
    auth::{consts, AuthRouterExt, AuthUser},
    errors::ApiError,
    handlers::AppState,
    services::build::{
        BuildFilter, BuildView, CompleteOutput, CreateBuild, CreateOutput, UpdateBuild,
    },
    status::BuildStatus,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CancelBuildRequest {
    /// Delete outputs still in production
    #[serde(default)]
    pub remove_incomplete_outputs: bool,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CompleteBuildRequest {
    /// Allow completion with fewer units than ordered
    #[serde(default)]
    pub accept_incomplete: bool,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OutputFilter {
    /// `true` for finished outputs, `false` for those in production
    pub complete: Option<bool>,
}

/// Build order endpoints
pub fn build_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/api/build/", get(list_builds))
        .route("/api/build/status/", get(build_status_codes))
        .route("/api/build/:pk/", get(get_build))
        .route("/api/build/:pk/outputs/", get(list_outputs))
        .with_permission(consts::BUILD_VIEW);

    let add = Router::new()
        .route("/api/build/", post(create_build))
        .with_permission(consts::BUILD_ADD);

    let change = Router::new()
        .route("/api/build/:pk/", axum::routing::patch(update_build))
        .route("/api/build/:pk/cancel/", post(cancel_build))
        .route("/api/build/:pk/hold/", post(hold_build))
        .route("/api/build/:pk/issue/", post(issue_build))
        .route("/api/build/:pk/complete/", post(complete_build))
        .route("/api/build/:pk/create-output/", post(create_output))
        .route("/api/build/:pk/complete-output/", post(complete_output))
        .with_permission(consts::BUILD_CHANGE);

    read.merge(add).merge(change)
}

/// List build orders
#[utoipa::path(
    get,
    path = "/api/build/",
    params(BuildFilter),
    responses(
        (status = 200, description = "Build orders, newest reference first"),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "builds"
)]
pub async fn list_builds(
    State(state): State<AppState>,
    Query(filter): Query<BuildFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let builds: Vec<BuildView> = state
        .services
        .builds
        .list(filter)
        .await
        .map_err(map_service_error)?
        .into_iter()
        .map(BuildView::from)
        .collect();
    Ok(success_response(builds))
}

/// Create a build order
#[utoipa::path(
    post,
    path = "/api/build/",
    request_body = CreateBuild,
    responses(
        (status = 201, description = "Build order created"),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
        (status = 409, description = "Reference already in use", body = crate::errors::ErrorResponse)
    ),
    tag = "builds"
)]
pub async fn create_build(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateBuild>,
) -> Result<impl IntoResponse, ApiError> {
    let build = state
        .services
        .builds
        .create(payload, Some(user.user_id))
        .await
        .map_err(map_service_error)?;
    info!(reference = %build, user = %user.username, "Build created via API");
    Ok(created_response(BuildView::from(build)))
}

/// Get a build order
#[utoipa::path(
    get,
    path = "/api/build/{pk}/",
    params(("pk" = i32, Path, description = "Build primary key")),
    responses(
        (status = 200, description = "Build order found"),
        (status = 404, description = "Build order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "builds"
)]
pub async fn get_build(
    State(state): State<AppState>,
    Path(pk): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let build = state.services.builds.get(pk).await.map_err(map_service_error)?;
    Ok(success_response(BuildView::from(build)))
}

/// Update editable build fields
#[utoipa::path(
    patch,
    path = "/api/build/{pk}/",
    params(("pk" = i32, Path, description = "Build primary key")),
    request_body = UpdateBuild,
    responses(
        (status = 200, description = "Build order updated"),
        (status = 404, description = "Build order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "builds"
)]
pub async fn update_build(
    State(state): State<AppState>,
    Path(pk): Path<i32>,
    Json(payload): Json<UpdateBuild>,
) -> Result<impl IntoResponse, ApiError> {
    let build = state
        .services
        .builds
        .update(pk, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(BuildView::from(build)))
}

/// Cancel an active build order
#[utoipa::path(
    post,
    path = "/api/build/{pk}/cancel/",
    params(("pk" = i32, Path, description = "Build primary key")),
    request_body = CancelBuildRequest,
    responses(
        (status = 200, description = "Build order cancelled"),
        (status = 400, description = "Build order is not active", body = crate::errors::ErrorResponse)
    ),
    tag = "builds"
)]
pub async fn cancel_build(
    State(state): State<AppState>,
    Path(pk): Path<i32>,
    user: AuthUser,
    payload: Option<Json<CancelBuildRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let request = payload.map(|Json(p)| p).unwrap_or_default();
    let build = state
        .services
        .builds
        .cancel_build(pk, Some(user.user_id), request.remove_incomplete_outputs)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(BuildView::from(build)))
}

/// Put a build order on hold
#[utoipa::path(
    post,
    path = "/api/build/{pk}/hold/",
    params(("pk" = i32, Path, description = "Build primary key")),
    responses((status = 200, description = "Build order on hold")),
    tag = "builds"
)]
pub async fn hold_build(
    State(state): State<AppState>,
    Path(pk): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let build = state.services.builds.hold(pk).await.map_err(map_service_error)?;
    Ok(success_response(BuildView::from(build)))
}

/// Move a build order into production
#[utoipa::path(
    post,
    path = "/api/build/{pk}/issue/",
    params(("pk" = i32, Path, description = "Build primary key")),
    responses((status = 200, description = "Build order in production")),
    tag = "builds"
)]
pub async fn issue_build(
    State(state): State<AppState>,
    Path(pk): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let build = state.services.builds.issue(pk).await.map_err(map_service_error)?;
    Ok(success_response(BuildView::from(build)))
}

/// Complete a build order
#[utoipa::path(
    post,
    path = "/api/build/{pk}/complete/",
    params(("pk" = i32, Path, description = "Build primary key")),
    request_body = CompleteBuildRequest,
    responses(
        (status = 200, description = "Build order completed"),
        (status = 400, description = "Build order cannot be completed", body = crate::errors::ErrorResponse)
    ),
    tag = "builds"
)]
pub async fn complete_build(
    State(state): State<AppState>,
    Path(pk): Path<i32>,
    user: AuthUser,
    payload: Option<Json<CompleteBuildRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let request = payload.map(|Json(p)| p).unwrap_or_default();
    let build = state
        .services
        .builds
        .complete_build(pk, Some(user.user_id), request.accept_incomplete)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(BuildView::from(build)))
}

/// List stock items produced by a build
#[utoipa::path(
    get,
    path = "/api/build/{pk}/outputs/",
    params(("pk" = i32, Path, description = "Build primary key"), OutputFilter),
    responses((status = 200, description = "Build outputs")),
    tag = "builds"
)]
pub async fn list_outputs(
    State(state): State<AppState>,
    Path(pk): Path<i32>,
    Query(filter): Query<OutputFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let outputs = state
        .services
        .builds
        .outputs(pk, filter.complete)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(outputs))
}

/// Create a build output
#[utoipa::path(
    post,
    path = "/api/build/{pk}/create-output/",
    params(("pk" = i32, Path, description = "Build primary key")),
    request_body = CreateOutput,
    responses(
        (status = 201, description = "Output created"),
        (status = 400, description = "Invalid quantity or inactive build", body = crate::errors::ErrorResponse)
    ),
    tag = "builds"
)]
pub async fn create_output(
    State(state): State<AppState>,
    Path(pk): Path<i32>,
    Json(payload): Json<CreateOutput>,
) -> Result<impl IntoResponse, ApiError> {
    let output = state
        .services
        .builds
        .create_output(pk, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(output))
}

/// Complete a build output
#[utoipa::path(
    post,
    path = "/api/build/{pk}/complete-output/",
    params(("pk" = i32, Path, description = "Build primary key")),
    request_body = CompleteOutput,
    responses(
        (status = 200, description = "Output completed"),
        (status = 400, description = "Output is not in production", body = crate::errors::ErrorResponse)
    ),
    tag = "builds"
)]
pub async fn complete_output(
    State(state): State<AppState>,
    Path(pk): Path<i32>,
    Json(payload): Json<CompleteOutput>,
) -> Result<impl IntoResponse, ApiError> {
    let output = state
        .services
        .builds
        .complete_output(pk, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(output))
}

/// Build status codes with their labels
#[utoipa::path(
    get,
    path = "/api/build/status/",
    responses((status = 200, description = "Status code table")),
    tag = "builds"
)]
pub async fn build_status_codes() -> impl IntoResponse {
    success_response(serde_json::json!({
        "class": "BuildStatus",
        "values": BuildStatus::describe(),
        "active": BuildStatus::active_codes(),
    }))
}
