pub mod auth;
pub mod bom;
pub mod builds;
pub mod common;
pub mod companies;
pub mod parts;
pub mod stock;

use crate::{
    auth::AuthService,
    db::DbPool,
    services::{
        bom::BomService, build::BuildService, company::CompanyService, part::PartService,
        stock::StockService,
    },
};
use axum::Router;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub builds: Arc<BuildService>,
    pub parts: Arc<PartService>,
    pub bom: Arc<BomService>,
    pub companies: Arc<CompanyService>,
    pub stock: Arc<StockService>,
    pub auth: Arc<AuthService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, auth_service: Arc<AuthService>) -> Self {
        Self {
            builds: Arc::new(BuildService::new(db_pool.clone())),
            parts: Arc::new(PartService::new(db_pool.clone())),
            bom: Arc::new(BomService::new(db_pool.clone())),
            companies: Arc::new(CompanyService::new(db_pool.clone())),
            stock: Arc::new(StockService::new(db_pool)),
            auth: auth_service,
        }
    }
}

/// Every JSON API route
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(auth::auth_routes())
        .merge(parts::part_routes())
        .merge(bom::bom_routes())
        .merge(builds::build_routes())
        .merge(companies::company_routes())
        .merge(stock::stock_routes())
}
