//! Build order lifecycle, pages and API.

mod common;

use assert_matches::assert_matches;
use axum::http::{Method, StatusCode};
use chrono::{Duration, Local};
use common::{page_context, response_json, response_text, TestApp};
use mrp_api::{
    errors::ServiceError,
    services::build::{BuildFilter, CreateBuild, CreateOutput, UpdateBuild},
    status::BuildStatus,
};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn fixture_builds_are_loaded() {
    let app = TestApp::new().await;
    let builds = &app.state.services.builds;

    assert_eq!(builds.count().await.unwrap(), 5);

    let b2 = builds.get(2).await.unwrap();
    assert_eq!(b2.batch.as_deref(), Some("B2"));
    assert_eq!(b2.quantity, 21);
    assert_eq!(b2.to_string(), "BO-0002");
    assert_eq!(b2.get_absolute_url(), "/build/2/");
    assert!(b2.is_complete());

    let b1 = builds.get(1).await.unwrap();
    assert_eq!(b1.title, "Building 7 parts");
    assert_eq!(b1.status, BuildStatus::Pending);
    assert!(!b1.is_complete());
    assert!(b1.is_active());
    assert!(!b2.is_active());
}

#[tokio::test]
async fn reference_lookup_ignores_case() {
    let app = TestApp::new().await;
    let build = app
        .state
        .services
        .builds
        .get_by_reference("bo-0004")
        .await
        .unwrap();
    assert_eq!(build.id, 4);
}

#[tokio::test]
async fn overdue_follows_target_date() {
    let app = TestApp::new().await;
    let builds = &app.state.services.builds;
    let today = Local::now().date_naive();

    let b1 = builds
        .update(
            1,
            UpdateBuild {
                target_date: Some(Some(today - Duration::days(1))),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(b1.is_overdue(today));

    let b1 = builds
        .update(
            1,
            UpdateBuild {
                target_date: Some(Some(today + Duration::days(80))),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(!b1.is_overdue(today));

    let b1 = builds
        .update(
            1,
            UpdateBuild {
                target_date: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(b1.target_date, None);
    assert!(!b1.is_overdue(today));
}

#[tokio::test]
async fn overdue_filter_lists_only_late_active_builds() {
    let app = TestApp::new().await;
    let builds = &app.state.services.builds;
    let yesterday = Local::now().date_naive() - Duration::days(1);

    for pk in [3, 5] {
        builds
            .update(
                pk,
                UpdateBuild {
                    target_date: Some(Some(yesterday)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    let overdue = builds
        .list(BuildFilter {
            overdue: Some(true),
            ..Default::default()
        })
        .await
        .unwrap();
    let ids: Vec<i32> = overdue.iter().map(|b| b.id).collect();
    // build 5 is complete, so it is never overdue
    assert_eq!(ids, vec![3]);
}

#[tokio::test]
async fn cancel_pending_build() {
    let app = TestApp::new().await;
    let builds = &app.state.services.builds;

    let cancelled = builds.cancel_build(1, Some(2), false).await.unwrap();
    assert_eq!(cancelled.status, BuildStatus::Cancelled);
    assert_eq!(cancelled.completed_by, Some(2));
    assert!(cancelled.completion_date.is_some());

    let again = builds.cancel_build(1, Some(2), false).await;
    assert_matches!(again, Err(ServiceError::InvalidOperation(_)));
}

#[tokio::test]
async fn cancel_can_remove_incomplete_outputs() {
    let app = TestApp::new().await;
    let builds = &app.state.services.builds;

    builds
        .create_output(
            4,
            CreateOutput {
                quantity: dec!(2),
                batch: None,
                location_id: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(builds.outputs(4, Some(false)).await.unwrap().len(), 1);

    builds.cancel_build(4, None, true).await.unwrap();
    assert!(builds.outputs(4, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn complete_build_requires_finished_outputs() {
    let app = TestApp::new().await;
    let builds = &app.state.services.builds;

    let output = builds
        .create_output(
            1,
            CreateOutput {
                quantity: dec!(7),
                batch: None,
                location_id: None,
            },
        )
        .await
        .unwrap();
    assert!(output.is_building);
    assert_eq!(output.batch.as_deref(), Some("B1"));

    let blocked = builds.complete_build(1, None, false).await;
    assert_matches!(blocked, Err(ServiceError::InvalidOperation(_)));

    builds
        .complete_output(
            1,
            mrp_api::services::build::CompleteOutput {
                output_id: output.id,
                location_id: None,
                status: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(builds.get(1).await.unwrap().completed, 7);

    let done = builds.complete_build(1, Some(1), false).await.unwrap();
    assert!(done.is_complete());
    assert_eq!(done.remaining(), 0);
}

#[tokio::test]
async fn complete_short_build_needs_acceptance() {
    let app = TestApp::new().await;
    let builds = &app.state.services.builds;

    let refused = builds.complete_build(3, None, false).await;
    assert_matches!(refused, Err(ServiceError::InvalidOperation(_)));

    let accepted = builds.complete_build(3, None, true).await.unwrap();
    assert!(accepted.is_complete());
}

#[tokio::test]
async fn fractional_output_counts_whole_units() {
    let app = TestApp::new().await;
    let builds = &app.state.services.builds;
    let before = builds.get(1).await.unwrap().completed;

    let output = builds
        .create_output(
            1,
            CreateOutput {
                quantity: dec!(2.5),
                batch: None,
                location_id: None,
            },
        )
        .await
        .unwrap();
    builds
        .complete_output(
            1,
            mrp_api::services::build::CompleteOutput {
                output_id: output.id,
                location_id: None,
                status: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(builds.get(1).await.unwrap().completed, before + 2);
}

#[tokio::test]
async fn output_quantity_must_be_positive() {
    let app = TestApp::new().await;
    let result = app
        .state
        .services
        .builds
        .create_output(
            1,
            CreateOutput {
                quantity: dec!(0),
                batch: None,
                location_id: None,
            },
        )
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn trackable_outputs_must_be_whole_units() {
    let app = TestApp::new().await;
    // build 4 makes part 50, which is trackable
    let result = app
        .state
        .services
        .builds
        .create_output(
            4,
            CreateOutput {
                quantity: dec!(1.5),
                batch: None,
                location_id: None,
            },
        )
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn build_index_page_renders() {
    let app = TestApp::new().await;
    let token = app.testuser_token().await;

    let response = app.get_page("/build/", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let ctx = page_context(&response);
    let builds = ctx.get("builds").and_then(|b| b.as_array()).unwrap();
    assert_eq!(builds.len(), 5);
    assert!(builds.iter().all(|b| b.get("pk").is_some()));
    assert!(ctx.contains_key("BuildStatus"));
    assert!(ctx.contains_key("csrf_token"));
}

#[tokio::test]
async fn build_detail_page_shows_title() {
    let app = TestApp::new().await;
    let token = app.testuser_token().await;

    let response = app.get_page("/build/1/", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let ctx = page_context(&response);
    assert_eq!(ctx.get("build").unwrap()["pk"], json!(1));
    assert_eq!(ctx.get("part").unwrap()["pk"], json!(25));

    let html = response_text(response).await;
    assert!(html.contains("Build Order BO-0001"));
    assert!(html.contains("Building 7 parts"));
}

#[tokio::test]
async fn missing_build_page_is_not_found() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let response = app.get_page("/build/999/", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn api_cancel_and_status_codes() {
    let app = TestApp::new().await;
    let token = app.testuser_token().await;

    let response = app
        .request(
            Method::POST,
            "/api/build/1/cancel/",
            Some(json!({ "remove_incomplete_outputs": false })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status_label"], "Cancelled");
    assert_eq!(body["is_active"], false);

    let again = app
        .request(Method::POST, "/api/build/1/cancel/", Some(json!({})), Some(&token))
        .await;
    assert_eq!(again.status(), StatusCode::BAD_REQUEST);

    let codes = response_json(
        app.request(Method::GET, "/api/build/status/", None, Some(&token))
            .await,
    )
    .await;
    assert_eq!(codes["class"], "BuildStatus");
}

#[tokio::test]
async fn api_create_build_generates_reference() {
    let app = TestApp::new().await;
    let token = app.testuser_token().await;

    let response = app
        .request(
            Method::POST,
            "/api/build/",
            Some(json!({ "title": "More widgets", "part_id": 25, "quantity": 3 })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["reference"], "BO-0006");
    assert_eq!(body["status_label"], "Pending");
}

#[tokio::test]
async fn viewer_cannot_change_builds() {
    let app = TestApp::new().await;
    let token = app.viewer_token().await;

    let list = app
        .request(Method::GET, "/api/build/", None, Some(&token))
        .await;
    assert_eq!(list.status(), StatusCode::OK);

    let cancel = app
        .request(Method::POST, "/api/build/1/cancel/", Some(json!({})), Some(&token))
        .await;
    assert_eq!(cancel.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn api_rejects_reference_beyond_column_range() {
    let app = TestApp::new().await;
    let token = app.testuser_token().await;

    let response = app
        .request(
            Method::POST,
            "/api/build/",
            Some(json!({ "reference": "BO-2147483648", "part_id": 25, "quantity": 1 })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn generated_reference_stops_at_column_limit() {
    let app = TestApp::new().await;
    let builds = &app.state.services.builds;

    let last = builds
        .create(
            CreateBuild {
                reference: Some("BO-2147483647".into()),
                part_id: 25,
                quantity: 1,
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
    assert_eq!(last.reference_int, i32::MAX);

    let next = builds
        .create(
            CreateBuild {
                part_id: 25,
                quantity: 1,
                ..Default::default()
            },
            None,
        )
        .await;
    assert_matches!(next, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn duplicate_reference_is_a_conflict() {
    let app = TestApp::new().await;
    let token = app.testuser_token().await;

    let response = app
        .request(
            Method::POST,
            "/api/build/",
            Some(json!({ "reference": "BO-0003", "part_id": 25, "quantity": 1 })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
