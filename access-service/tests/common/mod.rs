#![allow(dead_code)]

use std::sync::Arc;

use access_service::config::AccessConfig;
use access_service::models::Identity;
use access_service::services::{Fixture, InMemoryDirectory, UserStore};
use access_service::{build_router, AppState};
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, Response, StatusCode},
    middleware::{from_fn_with_state, Next},
    Router,
};
use http_body_util::BodyExt;
use tower::util::ServiceExt;

/// Header naming the user a test request acts as.
pub const TEST_USER_HEADER: &str = "x-test-user-id";

pub const ROOT: i64 = 1;
pub const ALICE: i64 = 2;
pub const BOB: i64 = 3;
pub const CAROL: i64 = 4;
pub const DAVE: i64 = 5;

pub fn directory() -> Arc<InMemoryDirectory> {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/demo.json");
    let fixture = Fixture::from_path(path).expect("Failed to read demo fixture");
    Arc::new(InMemoryDirectory::from_fixture(fixture).expect("Failed to seed directory"))
}

async fn inject_test_user(
    State(directory): State<Arc<InMemoryDirectory>>,
    mut req: Request,
    next: Next,
) -> axum::response::Response {
    let user_id = req
        .headers()
        .get(TEST_USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i64>().ok());

    if let Some(user_id) = user_id {
        if let Ok(Some(user)) = directory.user_by_id(user_id).await {
            req.extensions_mut().insert(Identity::User(user));
        }
    }

    next.run(req).await
}

/// Router over the demo fixture. Requests carrying [`TEST_USER_HEADER`] act
/// as that user; the rest are anonymous.
pub fn app() -> Router {
    let directory = directory();
    let state = AppState::with_directory(AccessConfig::default(), directory.clone());
    build_router(state).layer(from_fn_with_state(directory, inject_test_user))
}

pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    /// `name=value` pair of the session cookie, when one was set.
    pub cookie: Option<String>,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("Response body is not JSON")
    }
}

pub async fn get(app: &Router, uri: &str, user: Option<i64>, cookie: Option<&str>) -> TestResponse {
    let mut builder = axum::http::Request::builder().uri(uri);
    if let Some(user) = user {
        builder = builder.header(TEST_USER_HEADER, user.to_string());
    }
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }

    let response = app
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();

    read(response).await
}

async fn read(response: Response<Body>) -> TestResponse {
    let status = response.status();
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.to_string());
    let body = response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec();

    TestResponse {
        status,
        location,
        cookie,
        body,
    }
}
