//! Order submission and listing endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::Serialize;

use super::session::AuthUser;
use crate::error::ServiceError;
use crate::state::AppState;
use crate::store::{Order, OrderStatus, Storage};

/// POST /api/user/orders
///
/// The body is the raw order number. 202 accepts a new number, 200 is
/// the idempotent answer for a resubmission by the same user, 409 when
/// someone else holds the number, 422 when the number fails the
/// checksum.
pub async fn upload<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user_id): AuthUser,
    body: String,
) -> Result<StatusCode, ServiceError> {
    if body.is_empty() {
        return Err(ServiceError::InvalidRequest);
    }

    state.orders.submit(user_id, &body)?;
    Ok(StatusCode::ACCEPTED)
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub number: String,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accrual: Option<Decimal>,
    pub uploaded_at: String,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            number: order.number,
            status: order.status,
            accrual: order.accrual,
            uploaded_at: order.uploaded_at.to_rfc3339(),
        }
    }
}

/// GET /api/user/orders — newest upload first; 204 when there are none.
pub async fn list<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<OrderResponse>>, ServiceError> {
    let orders = state.orders.list(user_id)?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}
