/*!
 * # Health Check Module
 *
 * - `/health` - database ping plus row counts of the core tables
 * - `/health/live` - process liveness
 * - `/health/version` - build information
 */

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{debug, error};

use crate::AppState;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

/// Health check detail
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthDetail {
    pub status: HealthStatus,
    pub message: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthInfo {
    pub status: HealthStatus,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub details: BTreeMap<String, HealthDetail>,
}

impl HealthInfo {
    fn status_code(&self) -> StatusCode {
        match self.status {
            HealthStatus::Up => StatusCode::OK,
            HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Database connectivity and catalog size
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    debug!("Health check endpoint called");
    let mut details = BTreeMap::new();

    let database = match crate::db::check_connection(&state.db).await {
        Ok(()) => HealthDetail {
            status: HealthStatus::Up,
            message: None,
        },
        Err(e) => {
            error!("Database health check failed: {}", e);
            HealthDetail {
                status: HealthStatus::Down,
                message: Some(e.response_message()),
            }
        }
    };
    let db_up = database.status == HealthStatus::Up;
    details.insert("database".to_string(), database);

    if db_up {
        let parts = state.services.parts.count().await;
        let builds = state.services.builds.count().await;
        let companies = state.services.companies.count().await;
        let stock = state.services.stock.count().await;
        let message = match (parts, builds, companies, stock) {
            (Ok(parts), Ok(builds), Ok(companies), Ok(stock)) => Some(format!(
                "{} parts, {} builds, {} companies, {} stock items",
                parts, builds, companies, stock
            )),
            _ => None,
        };
        details.insert(
            "catalog".to_string(),
            HealthDetail {
                status: HealthStatus::Up,
                message,
            },
        );
    }

    let info = HealthInfo {
        status: if db_up {
            HealthStatus::Up
        } else {
            HealthStatus::Down
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        details,
    };

    (info.status_code(), Json(info))
}

/// Liveness check endpoint
pub async fn liveness_check() -> impl IntoResponse {
    Json(json!({
        "alive": true,
        "timestamp": Utc::now(),
    }))
}

/// Returns build and version information
pub async fn version_info() -> impl IntoResponse {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "commit": option_env!("GIT_HASH").unwrap_or("unknown"),
        "built": option_env!("BUILD_TIME").unwrap_or("unknown"),
    }))
}

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness_check))
        .route("/health/version", get(version_info))
}
