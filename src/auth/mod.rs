/*!
 * # Authentication and Authorization Module
 *
 * Users authenticate with a username and password and receive a signed JWT.
 * The token is accepted either as a `Bearer` authorization header (API
 * clients) or in the session cookie (browser page views).
 *
 * Authorization uses rule-set permissions, see [`rbac`].
 */

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::form_urlencoded;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::entities::user::{self, Entity as UserEntity};

pub mod rbac;

pub use rbac::consts;

/// Path of the login page unauthenticated page requests are sent to
pub const LOGIN_URL: &str = "/accounts/login/";

const JWT_ISSUER: &str = "mrp-api";

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,      // user id
    pub username: String, // login name
    pub superuser: bool,
    pub roles: Vec<String>, // raw roles, expanded on validation
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    pub iss: String,
}

/// Authenticated user attached to the request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthUser {
    pub user_id: i32,
    pub username: String,
    pub is_superuser: bool,
    pub roles: Vec<String>,
    /// Rule-set permissions after role expansion
    pub permissions: Vec<String>,
}

impl AuthUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Superusers hold every permission
    pub fn has_permission(&self, permission: &str) -> bool {
        self.is_superuser || rbac::permits(&self.permissions, permission)
    }

    pub fn is_admin(&self) -> bool {
        self.is_superuser || self.has_role("admin")
    }
}

impl From<&user::Model> for AuthUser {
    fn from(user: &user::Model) -> Self {
        let roles = user.role_list();
        Self {
            user_id: user.id,
            username: user.username.clone(),
            is_superuser: user.is_superuser,
            permissions: rbac::expand_roles(&roles),
            roles,
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub token_expiration: Duration,
    pub session_cookie_name: String,
}

impl AuthConfig {
    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self {
            jwt_secret: cfg.jwt_secret.clone(),
            jwt_issuer: JWT_ISSUER.to_string(),
            token_expiration: Duration::from_secs(cfg.jwt_expiration as u64),
            session_cookie_name: cfg.session_cookie_name.clone(),
        }
    }
}

/// Login request body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Fields needed to register a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub is_superuser: bool,
    pub roles: Vec<String>,
}

/// Authentication service that handles credentials and tokens
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    db: Arc<DatabaseConnection>,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self { config, db }
    }

    pub fn session_cookie_name(&self) -> &str {
        &self.config.session_cookie_name
    }

    pub fn hash_password(password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut rand::thread_rng());
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::HashError(e.to_string()))
    }

    pub fn verify_password(password: &str, password_hash: &str) -> bool {
        match PasswordHash::new(password_hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                warn!("Stored password hash is malformed: {}", e);
                false
            }
        }
    }

    pub async fn create_user(&self, new_user: NewUser) -> Result<user::Model, AuthError> {
        let existing = UserEntity::find()
            .filter(user::Column::Username.eq(new_user.username.as_str()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(AuthError::UserExists(new_user.username));
        }

        let created = user::ActiveModel {
            username: Set(new_user.username),
            email: Set(new_user.email),
            password_hash: Set(Self::hash_password(&new_user.password)?),
            is_superuser: Set(new_user.is_superuser),
            is_active: Set(true),
            roles: Set(new_user.roles.join(",")),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(user_id = created.id, username = %created.username, "User created");
        Ok(created)
    }

    /// Check credentials; unknown users and wrong passwords are indistinguishable
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<user::Model, AuthError> {
        let user = UserEntity::find()
            .filter(user::Column::Username.eq(username))
            .one(&*self.db)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !Self::verify_password(password, &user.password_hash) {
            debug!(username, "Password mismatch");
            return Err(AuthError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(AuthError::InactiveUser);
        }
        Ok(user)
    }

    pub fn generate_token(&self, user: &user::Model) -> Result<TokenResponse, AuthError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.token_expiration)
                .map_err(|_| AuthError::TokenCreation("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            superuser: user.is_superuser,
            roles: user.role_list(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        Ok(TokenResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.token_expiration.as_secs() as i64,
        })
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })
    }

    /// Resolve a token to its user, rejecting users deactivated since it was issued
    pub async fn user_from_token(&self, token: &str) -> Result<AuthUser, AuthError> {
        let claims = self.validate_token(token)?;
        let user_id: i32 = claims.sub.parse().map_err(|_| AuthError::InvalidToken)?;

        let user = UserEntity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        if !user.is_active {
            return Err(AuthError::InactiveUser);
        }
        Ok(AuthUser::from(&user))
    }

    /// Token from the `Authorization: Bearer` header, falling back to the session cookie
    pub fn token_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|t| t.trim().to_string());
        bearer.or_else(|| cookie_value(headers, &self.config.session_cookie_name))
    }

    /// `Set-Cookie` value carrying `token`
    pub fn session_cookie(&self, token: &str) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.config.session_cookie_name,
            token,
            self.config.token_expiration.as_secs()
        )
    }

    /// `Set-Cookie` value that removes the session cookie
    pub fn clear_session_cookie(&self) -> String {
        format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
            self.config.session_cookie_name
        )
    }
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingAuth,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("User account is disabled")]
    InactiveUser,
    #[error("Insufficient permissions")]
    InsufficientPermissions,
    #[error("User {0} already exists")]
    UserExists(String),
    #[error("Token creation failed: {0}")]
    TokenCreation(String),
    #[error("Password hashing failed: {0}")]
    HashError(String),
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingAuth
            | Self::InvalidToken
            | Self::TokenExpired
            | Self::InvalidCredentials
            | Self::InactiveUser => StatusCode::UNAUTHORIZED,
            Self::InsufficientPermissions => StatusCode::FORBIDDEN,
            Self::UserExists(_) => StatusCode::CONFLICT,
            Self::TokenCreation(_)
            | Self::HashError(_)
            | Self::DatabaseError(_)
            | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingAuth => "AUTH_MISSING",
            Self::InvalidToken => "AUTH_INVALID_TOKEN",
            Self::TokenExpired => "AUTH_TOKEN_EXPIRED",
            Self::InvalidCredentials => "AUTH_INVALID_CREDENTIALS",
            Self::InactiveUser => "AUTH_INACTIVE_USER",
            Self::InsufficientPermissions => "AUTH_INSUFFICIENT_PERMISSIONS",
            Self::UserExists(_) => "AUTH_USER_EXISTS",
            Self::TokenCreation(_) => "AUTH_TOKEN_CREATION_FAILED",
            Self::HashError(_) => "AUTH_HASH_FAILED",
            Self::DatabaseError(_) => "AUTH_DATABASE_ERROR",
            Self::InternalError(_) => "AUTH_INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "authentication failure");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(serde_json::json!({
            "error": {
                "code": self.error_code(),
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

fn auth_service(request: &Request) -> Result<Arc<AuthService>, AuthError> {
    request
        .extensions()
        .get::<Arc<AuthService>>()
        .cloned()
        .ok_or_else(|| AuthError::InternalError("Authentication service not available".into()))
}

/// Resolve the caller from owned headers
async fn authenticate(
    service: Arc<AuthService>,
    headers: HeaderMap,
) -> Result<AuthUser, AuthError> {
    let token = service
        .token_from_headers(&headers)
        .ok_or(AuthError::MissingAuth)?;
    service.user_from_token(&token).await
}

/// Owned copies of what authentication needs, taken before any await
fn credentials(request: &Request) -> Result<(Arc<AuthService>, HeaderMap), AuthError> {
    Ok((auth_service(request)?, request.headers().clone()))
}

/// API authentication: unauthenticated requests get 401
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let credentials = credentials(&request);
    let outcome = match credentials {
        Ok((service, headers)) => authenticate(service, headers).await,
        Err(e) => Err(e),
    };
    match outcome {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Page authentication: unauthenticated requests are redirected to the login page
pub async fn login_required_middleware(mut request: Request, next: Next) -> Response {
    let credentials = credentials(&request);
    let outcome = match credentials {
        Ok((service, headers)) => authenticate(service, headers).await,
        Err(e) => Err(e),
    };
    match outcome {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) if e.status_code() == StatusCode::UNAUTHORIZED => {
            let next_url = request
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or("/");
            Redirect::to(&login_redirect_url(next_url)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Permission middleware; superusers pass every check
pub async fn permission_middleware(
    State(required_permission): State<String>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingAuth)?;

    if !user.has_permission(&required_permission) {
        warn!(
            user = %user.username,
            permission = %required_permission,
            "Permission denied"
        );
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// `/accounts/login/?next=<encoded>`
pub fn login_redirect_url(next: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("next", next)
        .finish();
    format!("{}?{}", LOGIN_URL, query)
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    /// Require a valid token; 401 otherwise
    fn with_auth(self) -> Self;
    fn with_permission(self, permission: &str) -> Self;
    /// Require a logged in user; redirect to the login page otherwise
    fn with_login(self) -> Self;
    fn with_page_permission(self, permission: &str) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_permission(self, permission: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            permission.to_string(),
            permission_middleware,
        ))
        .with_auth()
    }

    fn with_login(self) -> Self {
        self.layer(axum::middleware::from_fn(login_required_middleware))
    }

    fn with_page_permission(self, permission: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            permission.to_string(),
            permission_middleware,
        ))
        .with_login()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn service() -> AuthService {
        AuthService::new(
            AuthConfig {
                jwt_secret: "unit_test_secret_that_is_long_enough_0123".into(),
                jwt_issuer: JWT_ISSUER.into(),
                token_expiration: Duration::from_secs(300),
                session_cookie_name: "mrp_session".into(),
            },
            Arc::new(DatabaseConnection::Disconnected),
        )
    }

    fn user(superuser: bool, roles: &str) -> user::Model {
        user::Model {
            id: 7,
            username: "testuser".into(),
            email: "test@example.com".into(),
            password_hash: String::new(),
            is_superuser: superuser,
            is_active: true,
            roles: roles.into(),
            date_joined: Utc::now(),
        }
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = AuthService::hash_password("password").unwrap();
        assert!(AuthService::verify_password("password", &hash));
        assert!(!AuthService::verify_password("Password", &hash));
        assert!(!AuthService::verify_password("password", "not-a-hash"));
    }

    #[test]
    fn token_claims_survive_validation() {
        let svc = service();
        let token = svc.generate_token(&user(false, "viewer")).unwrap();
        let claims = svc.validate_token(&token.token).unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.roles, vec!["viewer".to_string()]);
        assert!(matches!(
            svc.validate_token("garbage"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn permissions_follow_roles() {
        let viewer = AuthUser::from(&user(false, "viewer"));
        assert!(viewer.has_permission(consts::BUILD_VIEW));
        assert!(!viewer.has_permission(consts::BUILD_CHANGE));

        let admin = AuthUser::from(&user(true, ""));
        assert!(admin.has_permission(consts::BUILD_DELETE));
    }

    #[test]
    fn token_read_from_bearer_or_cookie() {
        let svc = service();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; mrp_session=abc"),
        );
        assert_eq!(svc.token_from_headers(&headers).as_deref(), Some("abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(svc.token_from_headers(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn login_redirect_encodes_next() {
        assert_eq!(
            login_redirect_url("/part/?search=a b"),
            "/accounts/login/?next=%2Fpart%2F%3Fsearch%3Da+b"
        );
        assert_eq!(
            login_redirect_url("/build/1/"),
            "/accounts/login/?next=%2Fbuild%2F1%2F"
        );
    }
}
