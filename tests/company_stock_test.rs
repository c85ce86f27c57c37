//! Company, supplier part and stock pages and API.

mod common;

use axum::http::{Method, StatusCode};
use common::{page_context, response_json, response_text, TestApp};
use rstest::rstest;
use serde_json::json;

#[rstest]
#[case::all("/company/", 4)]
#[case::suppliers("/company/suppliers/", 3)]
#[case::manufacturers("/company/manufacturers/", 1)]
#[case::customers("/company/customers/", 1)]
#[tokio::test]
async fn company_indexes(#[case] url: &str, #[case] expected: usize) {
    let app = TestApp::new().await;
    let token = app.testuser_token().await;

    let response = app.get_page(url, Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let ctx = page_context(&response);
    assert!(ctx.contains_key("csrf_token"));
    assert_eq!(
        ctx.get("companies").and_then(|c| c.as_array()).map(Vec::len),
        Some(expected)
    );
}

#[tokio::test]
async fn company_detail_splits_supplied_and_manufactured() {
    let app = TestApp::new().await;
    let token = app.testuser_token().await;

    let acme = page_context(&app.get_page("/company/1/", Some(&token)).await);
    assert_eq!(acme.get("company").unwrap()["name"], "ACME");
    assert_eq!(acme.get("supplier_parts").and_then(|s| s.as_array()).map(Vec::len), Some(2));
    assert_eq!(
        acme.get("manufactured_parts").and_then(|s| s.as_array()).map(Vec::len),
        Some(0)
    );

    let zerg = page_context(&app.get_page("/company/3/", Some(&token)).await);
    assert_eq!(
        zerg.get("manufactured_parts").and_then(|s| s.as_array()).map(Vec::len),
        Some(2)
    );
}

#[tokio::test]
async fn supplier_part_detail_shows_mpn() {
    let app = TestApp::new().await;
    let token = app.testuser_token().await;

    let response = app.get_page("/supplier-part/3/", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let ctx = page_context(&response);
    assert_eq!(ctx.get("supplier_part").unwrap()["pk"], json!(3));
    assert_eq!(ctx.get("supplier").unwrap()["pk"], json!(1));
    assert_eq!(ctx.get("manufacturer").unwrap()["pk"], json!(3));
    assert_eq!(ctx.get("part").unwrap()["pk"], json!(2));

    let html = response_text(response).await;
    assert!(html.contains("ZERGM312"));
    assert!(html.contains("MPN-M3x12"));
}

#[tokio::test]
async fn missing_company_pages_are_not_found() {
    let app = TestApp::new().await;
    let token = app.testuser_token().await;

    for url in ["/company/99/", "/supplier-part/99/", "/stock/item/99/"] {
        let response = app.get_page(url, Some(&token)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{url}");
    }
}

#[tokio::test]
async fn stock_index_lists_items_and_root_locations() {
    let app = TestApp::new().await;
    let token = app.testuser_token().await;

    let response = app.get_page("/stock/", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let ctx = page_context(&response);
    assert_eq!(ctx.get("items").and_then(|i| i.as_array()).map(Vec::len), Some(7));
    let roots: Vec<&str> = ctx
        .get("locations")
        .and_then(|l| l.as_array())
        .unwrap()
        .iter()
        .filter_map(|l| l["name"].as_str())
        .collect();
    assert_eq!(roots, vec!["Home", "Office"]);
    assert!(ctx.contains_key("StockStatus"));

    let available = page_context(&app.get_page("/stock/?available=true", Some(&token)).await);
    assert_eq!(
        available.get("items").and_then(|i| i.as_array()).map(Vec::len),
        Some(5)
    );
}

#[tokio::test]
async fn stock_item_detail_renders_quantity_and_batch() {
    let app = TestApp::new().await;
    let token = app.testuser_token().await;

    let response = app.get_page("/stock/item/1/", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(page_context(&response).get("item").unwrap()["pk"], json!(1));

    let html = response_text(response).await;
    assert!(html.contains("Stock Item: M2x4 LPHS"));
    assert!(html.contains("<h5>Available Quantity</h5>"));
    assert!(html.contains("<h5>4000</h5>"));
    assert!(html.contains("<td>B123</td>"));
}

#[tokio::test]
async fn stock_item_actions_follow_permissions() {
    let app = TestApp::new().await;

    let viewer = app.viewer_token().await;
    let response = app.get_page("/stock/item/1/", Some(&viewer)).await;
    assert_eq!(page_context(&response).get("actions"), Some(&json!([])));
    let html = response_text(response).await;
    assert!(!html.contains("id=\"stock-count\""));

    let admin = app.admin_token().await;
    let response = app.get_page("/stock/item/1/", Some(&admin)).await;
    let html = response_text(response).await;
    for action in [
        "stock-count",
        "stock-add",
        "stock-remove",
        "stock-move",
        "stock-duplicate",
        "stock-edit",
        "stock-delete",
    ] {
        assert!(html.contains(&format!("id=\"{}\"", action)), "{action}");
    }
}

#[tokio::test]
async fn lost_stock_is_not_available() {
    let app = TestApp::new().await;
    let token = app.testuser_token().await;

    let html = response_text(app.get_page("/stock/item/5/", Some(&token)).await).await;
    assert!(!html.contains("Available Quantity"));

    let part = page_context(&app.get_page("/part/5/", Some(&token)).await);
    assert_eq!(part.get("available_stock").unwrap(), "0");
}

#[tokio::test]
async fn location_page_shows_path_and_items() {
    let app = TestApp::new().await;
    let token = app.testuser_token().await;

    let ctx = page_context(&app.get_page("/stock/location/5/", Some(&token)).await);
    let path: Vec<&str> = ctx
        .get("path")
        .and_then(|p| p.as_array())
        .unwrap()
        .iter()
        .filter_map(|l| l["name"].as_str())
        .collect();
    assert_eq!(path, vec!["Office", "Drawer_1"]);
    assert_eq!(ctx.get("items").and_then(|i| i.as_array()).map(Vec::len), Some(3));
}

#[tokio::test]
async fn part_detail_lists_suppliers() {
    let app = TestApp::new().await;
    let token = app.testuser_token().await;

    let response = app.get_page("/part/1/", Some(&token)).await;
    let ctx = page_context(&response);
    assert_eq!(
        ctx.get("supplier_parts").and_then(|s| s.as_array()).map(Vec::len),
        Some(2)
    );
    assert_eq!(ctx.get("available_stock").unwrap(), "4000");

    let html = response_text(response).await;
    assert!(html.contains("ACME0001"));
    assert!(html.contains("/supplier-part/1/"));
}

#[tokio::test]
async fn stock_api_filters() {
    let app = TestApp::new().await;
    let token = app.testuser_token().await;

    let body = response_json(
        app.request(Method::GET, "/api/stock/?part=1", None, Some(&token))
            .await,
    )
    .await;
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["status_label"], "OK");
    assert_eq!(body[0]["part"]["name"], "M2x4 LPHS");
    assert_eq!(body[0]["url"], "/stock/item/1/");

    let unavailable = response_json(
        app.request(Method::GET, "/api/stock/?available=false", None, Some(&token))
            .await,
    )
    .await;
    assert_eq!(unavailable.as_array().map(Vec::len), Some(2));

    let bad = app
        .request(Method::GET, "/api/stock/?status=999", None, Some(&token))
        .await;
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

    let children = response_json(
        app.request(Method::GET, "/api/stock/location/?parent=1", None, Some(&token))
            .await,
    )
    .await;
    assert_eq!(children.as_array().map(Vec::len), Some(2));

    let codes = response_json(
        app.request(Method::GET, "/api/stock/status/", None, Some(&token))
            .await,
    )
    .await;
    assert_eq!(codes["class"], "StockStatus");
    assert_eq!(codes["available"], json!([10, 50, 55]));
}

#[tokio::test]
async fn company_api_lists_supplier_parts() {
    let app = TestApp::new().await;
    let token = app.testuser_token().await;

    let suppliers = response_json(
        app.request(Method::GET, "/api/company/?is_supplier=true", None, Some(&token))
            .await,
    )
    .await;
    assert_eq!(suppliers.as_array().map(Vec::len), Some(3));

    let company = response_json(
        app.request(Method::GET, "/api/company/3/", None, Some(&token))
            .await,
    )
    .await;
    assert_eq!(company["roles"], "supplier, manufacturer");

    let rows = response_json(
        app.request(Method::GET, "/api/company/part/?part=1", None, Some(&token))
            .await,
    )
    .await;
    let skus: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["sku"].as_str())
        .collect();
    assert_eq!(skus, vec!["ACME0001", "ACME0002"]);

    let missing = app
        .request(Method::GET, "/api/company/part/99/", None, Some(&token))
        .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn anonymous_stock_page_redirects() {
    let app = TestApp::new().await;
    let response = app.get_page("/stock/", None).await;
    assert!(response.status().is_redirection());

    let api = app.request(Method::GET, "/api/stock/", None, None).await;
    assert_eq!(api.status(), StatusCode::UNAUTHORIZED);
}
