//! MRP API Library
//!
//! Part catalog, bills of materials and build orders, served as HTML pages
//! and a JSON API.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod export;
pub mod fixtures;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod reference;
pub mod services;
pub mod status;
pub mod tracing;
pub mod views;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
    Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::auth::{AuthConfig, AuthService};

/// Shared state handed to every handler and page view
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let auth_service = Arc::new(AuthService::new(
            AuthConfig::from_app_config(&config),
            db.clone(),
        ));
        let services = handlers::AppServices::new(db.clone(), auth_service);
        Self {
            db,
            config,
            services,
        }
    }

    pub fn auth_service(&self) -> Arc<AuthService> {
        self.services.auth.clone()
    }
}

/// Inject the AuthService into request extensions for the auth middleware
async fn inject_auth_service(
    State(auth): State<Arc<AuthService>>,
    mut req: Request,
    next: Next,
) -> Response {
    req.extensions_mut().insert(auth);
    next.run(req).await
}

/// Pages, JSON API, health and API docs with the shared middleware stack.
///
/// CORS and compression are left to the binary.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .merge(views::page_routes())
        .merge(handlers::api_routes())
        .merge(health::health_routes())
        .merge(openapi::swagger_ui())
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::security_headers_middleware,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.auth_service(),
            inject_auth_service,
        ))
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}
