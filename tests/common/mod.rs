//! Common test utilities for black-box API tests

#![allow(unused)]

use std::sync::Arc;

use axum_test::TestServer;
use loyalty_broker::{routes, AppState, MemoryStorage, TokenService};
use serde_json::json;

pub const TEST_SECRET: &[u8] = b"integration-test-secret";

/// Test server with access to the underlying store
pub struct TestContext {
    pub server: TestServer,
    pub storage: Arc<MemoryStorage>,
    pub tokens: TokenService,
}

/// Create a test context over the in-memory store
pub fn create_test_context() -> TestContext {
    let storage = Arc::new(MemoryStorage::new());
    let tokens = TokenService::new(TEST_SECRET);

    let state = Arc::new(AppState::new_with_arc(storage.clone(), tokens.clone()));
    let server =
        TestServer::new(routes::create_router(state)).expect("Failed to create test server");

    TestContext {
        server,
        storage,
        tokens,
    }
}

pub fn create_test_server() -> TestServer {
    create_test_context().server
}

/// Register a user and return the auth cookie value.
pub async fn register_user(server: &TestServer, login: &str, password: &str) -> String {
    let response = server
        .post("/api/user/register")
        .json(&json!({
            "login": login,
            "password": password,
        }))
        .await;
    assert_eq!(response.status_code(), 200);

    response
        .maybe_cookie("auth_token")
        .expect("No auth cookie")
        .value()
        .to_string()
}

/// Authenticated cookie for requests.
pub fn auth_cookie(token: &str) -> cookie::Cookie<'static> {
    cookie::Cookie::new("auth_token", token.to_string())
}
