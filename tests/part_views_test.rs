//! Part pages, IPN redirects and BOM downloads.

mod common;

use axum::http::{header, Method, StatusCode};
use common::{location, page_context, response_json, response_text, TestApp};
use rstest::rstest;
use serde_json::json;

#[tokio::test]
async fn part_index_context() {
    let app = TestApp::new().await;
    let token = app.testuser_token().await;

    let response = app.get_page("/part/", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let ctx = page_context(&response);
    for key in ["csrf_token", "parts", "user", "categories"] {
        assert!(ctx.contains_key(key), "missing context variable {key}");
    }
    assert_eq!(ctx.get("parts").and_then(|p| p.as_array()).map(Vec::len), Some(8));
    assert_eq!(ctx.get("user").unwrap()["username"], "testuser");
}

#[tokio::test]
async fn part_index_as_json() {
    let app = TestApp::new().await;
    let token = app.testuser_token().await;

    let request = axum::http::Request::builder()
        .uri("/part/")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::ACCEPT, "application/json")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert!(body["csrf_token"].as_str().is_some_and(|t| t.len() == 64));
    assert_eq!(body["categories"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn part_detail_context() {
    let app = TestApp::new().await;
    let token = app.testuser_token().await;

    let response = app.get_page("/part/3/", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let ctx = page_context(&response);
    assert_eq!(ctx.get("part").unwrap()["pk"], json!(3));
    assert_eq!(ctx.get("category").unwrap()["pk"], json!(2));
    assert_eq!(ctx.get("category").unwrap()["name"], "Resistors");
    assert_eq!(ctx.get("bom_items").and_then(|b| b.as_array()).map(Vec::len), Some(0));
}

#[tokio::test]
async fn assembly_detail_lists_bom() {
    let app = TestApp::new().await;
    let token = app.testuser_token().await;

    let response = app.get_page("/part/100/", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        page_context(&response)
            .get("bom_items")
            .and_then(|b| b.as_array())
            .map(Vec::len),
        Some(3)
    );

    let html = response_text(response).await;
    assert!(html.contains("/api/part/100/bom-download/"));
    assert!(html.contains("Hand solder"));
}

#[tokio::test]
async fn missing_part_is_not_found() {
    let app = TestApp::new().await;
    let token = app.testuser_token().await;
    let response = app.get_page("/part/9999/", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[rstest]
#[case::unknown_ipn("NOT_A_PART", "/part/")]
#[case::unique_ipn("BOB", "/part/100/")]
#[case::resistor("R_2K2_0805", "/part/3/")]
#[tokio::test]
async fn ipn_redirects(#[case] ipn: &str, #[case] expected: &str) {
    let app = TestApp::new().await;
    let token = app.testuser_token().await;

    let response = app.get_page(&format!("/part/ipn/{}/", ipn), Some(&token)).await;
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), expected);
}

#[tokio::test]
async fn ambiguous_ipn_falls_back_to_index() {
    let app = TestApp::new().await;
    let token = app.testuser_token().await;

    let parts = &app.state.services.parts;
    parts.set_ipn(1, Some("DUP".into())).await.unwrap();
    parts.set_ipn(2, Some("DUP".into())).await.unwrap();

    let response = app.get_page("/part/ipn/DUP/", Some(&token)).await;
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/part/");

    parts.set_ipn(2, None).await.unwrap();
    let response = app.get_page("/part/ipn/DUP/", Some(&token)).await;
    assert_eq!(location(&response), "/part/1/");
}

#[tokio::test]
async fn category_page_shows_path_and_parts() {
    let app = TestApp::new().await;
    let token = app.testuser_token().await;

    let response = app.get_page("/part/category/5/", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let ctx = page_context(&response);
    let path: Vec<&str> = ctx
        .get("path")
        .and_then(|p| p.as_array())
        .unwrap()
        .iter()
        .filter_map(|c| c["name"].as_str())
        .collect();
    assert_eq!(path, vec!["Mechanical", "Fasteners"]);
    assert_eq!(ctx.get("parts").and_then(|p| p.as_array()).map(Vec::len), Some(2));
}

#[tokio::test]
async fn bom_download_is_an_attachment() {
    let app = TestApp::new().await;
    let token = app.testuser_token().await;

    let response = app
        .request(
            Method::GET,
            "/api/part/100/bom-download/?format=csv",
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename="));
    assert!(disposition.contains("Bob_BOM.csv"));

    let text = response_text(response).await;
    let mut lines = text.lines();
    assert!(lines
        .next()
        .unwrap()
        .starts_with("Part,Part_IPN,Sub_part,Sub_part_IPN,Quantity"));
    assert_eq!(lines.count(), 3);
}

#[tokio::test]
async fn bom_download_rejects_unknown_format() {
    let app = TestApp::new().await;
    let token = app.testuser_token().await;

    let response = app
        .request(
            Method::GET,
            "/api/part/100/bom-download/?format=xlsx",
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bom_api_lists_items_for_part() {
    let app = TestApp::new().await;
    let token = app.testuser_token().await;

    let response = app
        .request(Method::GET, "/api/bom/?part=25", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn part_api_returns_full_name() {
    let app = TestApp::new().await;
    let token = app.testuser_token().await;

    let body = response_json(
        app.request(Method::GET, "/api/part/25/", None, Some(&token))
            .await,
    )
    .await;
    assert_eq!(body["full_name"], "WIDGET | Widget");
    assert_eq!(body["url"], "/part/25/");
}
