//! Tests for balance reads and withdrawal admission

mod common;

use common::{auth_cookie, create_test_context, register_user};
use loyalty_broker::store::{OrderStatus, Storage};
use rust_decimal::Decimal;
use serde_json::{json, Value};

/// Test: a fresh user has an empty balance
#[tokio::test]
async fn test_balance_starts_at_zero() {
    let ctx = create_test_context();
    let alice = register_user(&ctx.server, "alice", "p@ssw0rd").await;

    let response = ctx
        .server
        .get("/api/user/balance")
        .add_cookie(auth_cookie(&alice))
        .await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    assert_eq!(body["current"], 0.0);
    assert_eq!(body["withdrawn"], 0.0);
}

/// Test: a processed accrual shows up in the balance
#[tokio::test]
async fn test_processed_order_credits_balance() {
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
            Some(Decimal::from(500)),
        )
        .unwrap();

    let response = ctx
        .server
        .get("/api/user/balance")
        .add_cookie(auth_cookie(&alice))
        .await;

    let body: Value = response.json();
    assert_eq!(body["current"], 500.0);
    assert_eq!(body["withdrawn"], 0.0);
}

/// Test: withdrawal admission against the current balance
/// (402 when short, then 200, and the balance moves)
#[tokio::test]
async fn test_withdrawal_admission() {
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
            Some(Decimal::from(500)),
        )
        .unwrap();

    // 751 > 500: refused, nothing changes
    let response = ctx
        .server
        .post("/api/user/balance/withdraw")
        .add_cookie(auth_cookie(&alice))
        .json(&json!({ "order": "2377225624", "sum": 751 }))
        .await;
    assert_eq!(response.status_code(), 402);

    // Another processed order lifts the balance to 1000
    ctx.server
        .post("/api/user/orders")
        .add_cookie(auth_cookie(&alice))
        .text("79927398713")
        .await;
    ctx.storage
        .update_order_status_and_accrual(
            "79927398713",
            OrderStatus::Processed,
            Some(Decimal::from(500)),
        )
        .unwrap();

    let response = ctx
        .server
        .post("/api/user/balance/withdraw")
        .add_cookie(auth_cookie(&alice))
        .json(&json!({ "order": "2377225624", "sum": 751 }))
        .await;
    assert_eq!(response.status_code(), 200);

    let response = ctx
        .server
        .get("/api/user/balance")
        .add_cookie(auth_cookie(&alice))
        .await;
    let body: Value = response.json();
    assert_eq!(body["current"], 249.0);
    assert_eq!(body["withdrawn"], 751.0);
}

/// Test: bad withdrawal requests
#[tokio::test]
async fn test_withdrawal_validation() {
    let ctx = create_test_context();
    let alice = register_user(&ctx.server, "alice", "p@ssw0rd").await;

    // Order number failing the checksum
    let response = ctx
        .server
        .post("/api/user/balance/withdraw")
        .add_cookie(auth_cookie(&alice))
        .json(&json!({ "order": "1", "sum": 10 }))
        .await;
    assert_eq!(response.status_code(), 422);

    // Non-positive sum
    let response = ctx
        .server
        .post("/api/user/balance/withdraw")
        .add_cookie(auth_cookie(&alice))
        .json(&json!({ "order": "2377225624", "sum": 0 }))
        .await;
    assert_eq!(response.status_code(), 400);

    // Malformed body
    let response = ctx
        .server
        .post("/api/user/balance/withdraw")
        .add_cookie(auth_cookie(&alice))
        .text("{}")
        .await;
    assert_eq!(response.status_code(), 400);
}

/// Test: a withdrawal order number cannot be spent twice
#[tokio::test]
async fn test_withdrawal_duplicate_number() {
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

    for expected in [200, 422] {
        let response = ctx
            .server
            .post("/api/user/balance/withdraw")
            .add_cookie(auth_cookie(&alice))
            .json(&json!({ "order": "2377225624", "sum": 100 }))
            .await;
        assert_eq!(response.status_code(), expected);
    }
}
