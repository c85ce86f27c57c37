//! Login flow, session cookies and access control.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::{location, response_json, response_text, TestApp};
use mrp_api::fixtures::FIXTURE_PASSWORD;
use serde_json::json;

fn login_form(username: &str, password: &str, next: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/accounts/login/")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!(
            "username={}&password={}&next={}",
            username, password, next
        )))
        .unwrap()
}

#[tokio::test]
async fn anonymous_page_redirects_to_login() {
    let app = TestApp::new().await;

    let response = app.get_page("/build/1/", None).await;
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/accounts/login/?next=%2Fbuild%2F1%2F");

    let response = app.get_page("/part/?search=R%20K", None).await;
    assert_eq!(
        location(&response),
        "/accounts/login/?next=%2Fpart%2F%3Fsearch%3DR%2520K"
    );
}

#[tokio::test]
async fn login_redirect_round_trips_next() {
    let app = TestApp::new().await;

    let redirect = app.get_page("/part/category/5/", None).await;
    let login_url = location(&redirect).to_string();

    let form = app.get_page(&login_url, None).await;
    assert_eq!(form.status(), StatusCode::OK);
    let ctx = common::page_context(&form);
    assert_eq!(ctx.get("next").unwrap(), "/part/category/5/");
}

#[tokio::test]
async fn bearer_and_cookie_reach_protected_routes() {
    let app = TestApp::new().await;
    let token = app.testuser_token().await;

    let api = app.request(Method::GET, "/api/part/", None, Some(&token)).await;
    assert_eq!(api.status(), StatusCode::OK);

    let page = app.get_page("/part/", Some(&token)).await;
    assert_eq!(page.status(), StatusCode::OK);
}

#[tokio::test]
async fn anonymous_api_is_unauthorized() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/api/part/", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(Method::GET, "/api/part/", None, Some("not-a-token"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_form_renders() {
    let app = TestApp::new().await;
    let response = app.get_page("/accounts/login/?next=/build/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = response_text(response).await;
    assert!(html.contains("name=\"username\""));
    assert!(html.contains("/build/"));
}

#[tokio::test]
async fn login_sets_session_cookie() {
    let app = TestApp::new().await;

    let response = app
        .send(login_form("testuser", FIXTURE_PASSWORD, "/build/"))
        .await;
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/build/");

    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("mrp_session="));
    assert!(cookie.contains("HttpOnly"));
    let token = cookie
        .trim_start_matches("mrp_session=")
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let page = app.get_page("/build/", Some(&token)).await;
    assert_eq!(page.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_with_bad_password_shows_form_again() {
    let app = TestApp::new().await;
    let response = app.send(login_form("testuser", "wrong", "/part/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn login_ignores_external_next() {
    let app = TestApp::new().await;
    let response = app
        .send(login_form(
            "testuser",
            FIXTURE_PASSWORD,
            "https%3A%2F%2Fevil.test%2F",
        ))
        .await;
    assert_eq!(location(&response), "/part/");
}

#[tokio::test]
async fn login_ignores_backslash_next() {
    let app = TestApp::new().await;
    let response = app
        .send(login_form(
            "testuser",
            FIXTURE_PASSWORD,
            "%2F%5Cevil.test%2F",
        ))
        .await;
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/part/");
}

#[tokio::test]
async fn logout_clears_cookie() {
    let app = TestApp::new().await;
    let response = app.get_page("/accounts/logout/", None).await;
    assert_eq!(location(&response), "/accounts/login/");
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn api_login_and_me() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/auth/login/",
            Some(json!({ "username": "viewer", "password": FIXTURE_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["token_type"], "Bearer");
    let token = body["token"].as_str().unwrap().to_string();

    let me = response_json(
        app.request(Method::GET, "/api/auth/me/", None, Some(&token))
            .await,
    )
    .await;
    assert_eq!(me["username"], "viewer");
    assert_eq!(me["is_superuser"], false);
    assert!(me["permissions"]
        .as_array()
        .unwrap()
        .contains(&json!("build.view")));
}

#[tokio::test]
async fn api_login_rejects_bad_credentials() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::POST,
            "/api/auth/login/",
            Some(json!({ "username": "admin", "password": "nope" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn superuser_passes_every_permission() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let response = app
        .request(
            Method::POST,
            "/api/build/3/hold/",
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["status_label"], "On Hold");
}

#[tokio::test]
async fn health_reports_counts() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "up");
    assert_eq!(
        body["details"]["catalog"]["message"],
        "8 parts, 5 builds, 4 companies, 7 stock items"
    );
}
