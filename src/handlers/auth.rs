use crate::{
    auth::{AuthRouterExt, AuthUser, LoginCredentials, TokenResponse},
    errors::{ApiError, ServiceError},
    handlers::{common::success_response, AppState},
};
use axum::{
    extract::{Json, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tracing::{info, warn};

/// Authentication endpoints
pub fn auth_routes() -> Router<AppState> {
    let me = Router::new()
        .route("/api/auth/me/", get(current_user))
        .with_auth();

    Router::new()
        .route("/api/auth/login/", post(login))
        .merge(me)
}

/// Exchange credentials for a bearer token
///
/// The token is also set as the session cookie so the same login works for
/// page views.
#[utoipa::path(
    post,
    path = "/api/auth/login/",
    request_body = LoginCredentials,
    responses(
        (status = 200, description = "Logged in", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<LoginCredentials>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = &state.services.auth;
    let user = auth
        .authenticate(&credentials.username, &credentials.password)
        .await
        .map_err(|e| {
            warn!(username = %credentials.username, "API login failed");
            ServiceError::from(e)
        })?;
    let token = auth.generate_token(&user).map_err(ServiceError::from)?;

    info!(username = %user.username, "API login");
    Ok((
        [(header::SET_COOKIE, auth.session_cookie(&token.token))],
        success_response(token),
    ))
}

/// The authenticated user with expanded permissions
#[utoipa::path(
    get,
    path = "/api/auth/me/",
    responses(
        (status = 200, description = "Current user", body = AuthUser),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn current_user(user: AuthUser) -> impl IntoResponse {
    success_response(user)
}
