mod common;

use axum::http::StatusCode;

#[tokio::test]
async fn health_check_works() {
    let app = common::app();

    let response = common::get(&app, "/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "access-service");
}

#[tokio::test]
async fn health_check_needs_no_session() {
    let app = common::app();

    let response = common::get(&app, "/health", None, None).await;

    assert!(response.cookie.is_none());
}
