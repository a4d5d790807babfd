//! Tests for order submission and listing

mod common;

use common::{auth_cookie, create_test_context, create_test_server, register_user};
use loyalty_broker::store::{OrderStatus, Storage};
use rust_decimal::Decimal;
use serde_json::Value;

/// Test: the submission state machine over the wire
/// (202 new, 200 repeat, 409 other user, 422 bad number, 400 empty)
#[tokio::test]
async fn test_order_upload_state_machine() {
    let server = create_test_server();
    let alice = register_user(&server, "alice", "p@ssw0rd").await;
    let bob = register_user(&server, "bob", "p@ssw0rd").await;

    // New number is accepted for processing
    let response = server
        .post("/api/user/orders")
        .add_cookie(auth_cookie(&alice))
        .text("12345678903")
        .await;
    assert_eq!(response.status_code(), 202);

    // Same user resubmitting is the idempotent 200
    let response = server
        .post("/api/user/orders")
        .add_cookie(auth_cookie(&alice))
        .text("12345678903")
        .await;
    assert_eq!(response.status_code(), 200);

    // Another user citing the number is a conflict
    let response = server
        .post("/api/user/orders")
        .add_cookie(auth_cookie(&bob))
        .text("12345678903")
        .await;
    assert_eq!(response.status_code(), 409);

    // Checksum failure
    let response = server
        .post("/api/user/orders")
        .add_cookie(auth_cookie(&alice))
        .text("1")
        .await;
    assert_eq!(response.status_code(), 422);

    // Empty body
    let response = server
        .post("/api/user/orders")
        .add_cookie(auth_cookie(&alice))
        .text("")
        .await;
    assert_eq!(response.status_code(), 400);
}

/// Test: unauthenticated upload is rejected before anything else
#[tokio::test]
async fn test_order_upload_requires_auth() {
    let server = create_test_server();

    let response = server.post("/api/user/orders").text("12345678903").await;
    assert_eq!(response.status_code(), 401);
}

/// Test: listing with no orders is 204
#[tokio::test]
async fn test_order_list_empty() {
    let server = create_test_server();
    let alice = register_user(&server, "alice", "p@ssw0rd").await;

    let response = server
        .get("/api/user/orders")
        .add_cookie(auth_cookie(&alice))
        .await;
    assert_eq!(response.status_code(), 204);
}

/// Test: listing returns own orders newest first, with accrual only on
/// processed ones
#[tokio::test]
async fn test_order_list_contents() {
    let ctx = create_test_context();
    let alice = register_user(&ctx.server, "alice", "p@ssw0rd").await;
    let bob = register_user(&ctx.server, "bob", "p@ssw0rd").await;

    for number in ["12345678903", "2377225624"] {
        let response = ctx
            .server
            .post("/api/user/orders")
            .add_cookie(auth_cookie(&alice))
            .text(number)
            .await;
        assert_eq!(response.status_code(), 202);
    }
    ctx.server
        .post("/api/user/orders")
        .add_cookie(auth_cookie(&bob))
        .text("79927398713")
        .await;

    // The worker settles the first order out of band
    ctx.storage
        .update_order_status_and_accrual(
            "12345678903",
            OrderStatus::Processed,
            Some(Decimal::from(500)),
        )
        .unwrap();

    let response = ctx
        .server
        .get("/api/user/orders")
        .add_cookie(auth_cookie(&alice))
        .await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    let orders = body.as_array().unwrap();
    assert_eq!(orders.len(), 2);

    // Newest upload first; bob's order never appears
    assert_eq!(orders[0]["number"], "2377225624");
    assert_eq!(orders[0]["status"], "NEW");
    assert!(orders[0].get("accrual").is_none());

    assert_eq!(orders[1]["number"], "12345678903");
    assert_eq!(orders[1]["status"], "PROCESSED");
    assert_eq!(orders[1]["accrual"], 500.0);
    assert!(orders[1]["uploaded_at"].as_str().unwrap().contains('T'));
}
