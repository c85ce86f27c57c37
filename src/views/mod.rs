//! HTML page views.
//!
//! Every view builds a [`PageContext`] and renders it; the context travels
//! with the response (see [`page::Page::render`]).

pub mod accounts;
pub mod build;
pub mod company;
pub mod page;
pub mod part;
pub mod stock;

use axum::{response::Redirect, routing::get, Router};

pub use page::{Page, PageContext};

use crate::{
    auth::{consts, AuthRouterExt},
    AppState,
};

/// Page routes; every page except the account pages requires a login
pub fn page_routes() -> Router<AppState> {
    let part_pages = Router::new()
        .route("/part/", get(part::part_index))
        .route("/part/:pk/", get(part::part_detail))
        .route("/part/ipn/:ipn/", get(part::part_detail_from_ipn))
        .route("/part/category/:pk/", get(part::category_detail))
        .with_page_permission(consts::PART_VIEW);

    let build_pages = Router::new()
        .route("/build/", get(build::build_index))
        .route("/build/:pk/", get(build::build_detail))
        .with_page_permission(consts::BUILD_VIEW);

    let company_pages = Router::new()
        .route("/company/", get(company::company_index))
        .route("/company/suppliers/", get(company::supplier_index))
        .route("/company/manufacturers/", get(company::manufacturer_index))
        .route("/company/customers/", get(company::customer_index))
        .route("/company/:pk/", get(company::company_detail))
        .route("/supplier-part/:pk/", get(company::supplier_part_detail))
        .with_page_permission(consts::PART_VIEW);

    let stock_pages = Router::new()
        .route("/stock/", get(stock::stock_index))
        .route("/stock/location/:pk/", get(stock::location_detail))
        .route("/stock/item/:pk/", get(stock::stock_item_detail))
        .with_page_permission(consts::STOCK_VIEW);

    let accounts = Router::new()
        .route(
            "/accounts/login/",
            get(accounts::login_form).post(accounts::login_submit),
        )
        .route(
            "/accounts/logout/",
            get(accounts::logout).post(accounts::logout),
        );

    Router::new()
        .route("/", get(|| async { Redirect::to(part::PART_INDEX_URL) }))
        .merge(part_pages)
        .merge(build_pages)
        .merge(company_pages)
        .merge(stock_pages)
        .merge(accounts)
}
