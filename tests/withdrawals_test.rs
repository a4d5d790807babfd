//! Tests for the withdrawals listing

mod common;

use common::{auth_cookie, create_test_context, register_user};
use loyalty_broker::store::{OrderStatus, Storage};
use rust_decimal::Decimal;
use serde_json::{json, Value};

/// Test: no withdrawals yet is 204
#[tokio::test]
async fn test_withdrawals_empty() {
    let ctx = create_test_context();
    let alice = register_user(&ctx.server, "alice", "p@ssw0rd").await;

    let response = ctx
        .server
        .get("/api/user/withdrawals")
        .add_cookie(auth_cookie(&alice))
        .await;
    assert_eq!(response.status_code(), 204);
}

/// Test: withdrawals come back most recent first
#[tokio::test]
async fn test_withdrawals_listing() {
    let ctx = create_test_context();
    let alice = register_user(&ctx.server, "alice", "p@ssw0rd").await;

    ctx.server
        .post("/api/user/orders")
        .add_cookie(auth_cookie(&alice))
        .text("12345678903")
        .await;
    ctx.storage
        .update_order_status_and_accrual(
            "12345678903",
            OrderStatus::Processed,
            Some(Decimal::from(1000)),
        )
        .unwrap();

    for (order, sum) in [("2377225624", 100), ("79927398713", 200)] {
        let response = ctx
            .server
            .post("/api/user/balance/withdraw")
            .add_cookie(auth_cookie(&alice))
            .json(&json!({ "order": order, "sum": sum }))
            .await;
        assert_eq!(response.status_code(), 200);
    }

    let response = ctx
        .server
        .get("/api/user/withdrawals")
        .add_cookie(auth_cookie(&alice))
        .await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0]["order"], "79927398713");
    assert_eq!(rows[0]["sum"], 200.0);
    assert_eq!(rows[1]["order"], "2377225624");
    assert_eq!(rows[1]["sum"], 100.0);
    assert!(rows[0]["processed_at"].as_str().unwrap().contains('T'));
}

/// Test: withdrawals are per user
#[tokio::test]
async fn test_withdrawals_are_scoped_to_user() {
    let ctx = create_test_context();
    let alice = register_user(&ctx.server, "alice", "p@ssw0rd").await;
    let bob = register_user(&ctx.server, "bob", "p@ssw0rd").await;

    ctx.server
        .post("/api/user/orders")
        .add_cookie(auth_cookie(&alice))
        .text("12345678903")
        .await;
    ctx.storage
        .update_order_status_and_accrual(
            "12345678903",
            OrderStatus::Processed,
            Some(Decimal::from(100)),
        )
        .unwrap();
    ctx.server
        .post("/api/user/balance/withdraw")
        .add_cookie(auth_cookie(&alice))
        .json(&json!({ "order": "2377225624", "sum": 50 }))
        .await;

    let response = ctx
        .server
        .get("/api/user/withdrawals")
        .add_cookie(auth_cookie(&bob))
        .await;
    assert_eq!(response.status_code(), 204);
}
