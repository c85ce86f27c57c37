#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{header, Method, Request},
    response::Response,
    Router,
};
use mrp_api::{
    config::AppConfig,
    db::{self, DbConfig},
    entities::user,
    fixtures,
    views::PageContext,
    AppState,
};
use sea_orm::EntityTrait;
use serde_json::Value;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";

/// Application backed by an in-memory SQLite database with every fixture set loaded.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        let cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_000,
            "test".to_string(),
        );

        let pool = db::establish_connection_with_config(&DbConfig::in_memory())
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        fixtures::load_all(&pool)
            .await
            .expect("failed to load fixtures");

        let state = AppState::new(Arc::new(pool), cfg);
        let router = mrp_api::app_router(state.clone());
        Self { router, state }
    }

    /// Bearer token for a fixture user
    pub async fn token_for(&self, user_id: i32) -> String {
        let user = user::Entity::find_by_id(user_id)
            .one(&*self.state.db)
            .await
            .expect("user lookup")
            .expect("fixture user");
        self.state
            .auth_service()
            .generate_token(&user)
            .expect("token")
            .token
    }

    pub async fn admin_token(&self) -> String {
        self.token_for(1).await
    }

    pub async fn testuser_token(&self) -> String {
        self.token_for(2).await
    }

    pub async fn viewer_token(&self) -> String {
        self.token_for(3).await
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// JSON API request, optionally authenticated with a bearer token
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(tok) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", tok));
        }

        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
            }
            None => Body::empty(),
        };

        self.send(builder.body(body).expect("failed to build request"))
            .await
    }

    /// Page request carrying the session cookie the login form sets
    pub async fn get_page(&self, uri: &str, token: Option<&str>) -> Response {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(tok) = token {
            builder = builder.header(
                header::COOKIE,
                format!("{}={}", self.state.config.session_cookie_name, tok),
            );
        }
        self.send(builder.body(Body::empty()).expect("failed to build request"))
            .await
    }
}

pub async fn response_text(response: Response) -> String {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Context the view rendered with
pub fn page_context(response: &Response) -> PageContext {
    response
        .extensions()
        .get::<PageContext>()
        .cloned()
        .expect("response carries a page context")
}

pub fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("redirect location")
}
