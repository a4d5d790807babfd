//! Balance and withdrawal endpoints

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::session::AuthUser;
use crate::error::ServiceError;
use crate::state::AppState;
use crate::store::{Storage, Withdrawal};

#[derive(Serialize)]
pub struct BalanceResponse {
    pub current: Decimal,
    pub withdrawn: Decimal,
}

/// GET /api/user/balance
pub async fn get_balance<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<BalanceResponse>, ServiceError> {
    let balance = state.balance.balance(user_id)?;
    Ok(Json(BalanceResponse {
        current: balance.current,
        withdrawn: balance.withdrawn,
    }))
}

#[derive(Deserialize)]
pub struct WithdrawRequest {
    pub order: String,
    pub sum: Decimal,
}

/// POST /api/user/balance/withdraw
///
/// 402 when the balance cannot cover the sum, 422 for a bad or reused
/// order number.
pub async fn withdraw<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<WithdrawRequest>, JsonRejection>,
) -> Result<StatusCode, ServiceError> {
    let Json(req) = payload.map_err(|_| ServiceError::InvalidRequest)?;

    state.balance.withdraw(user_id, &req.order, req.sum)?;
    Ok(StatusCode::OK)
}

#[derive(Serialize)]
pub struct WithdrawalResponse {
    pub order: String,
    pub sum: Decimal,
    pub processed_at: String,
}

impl From<Withdrawal> for WithdrawalResponse {
    fn from(withdrawal: Withdrawal) -> Self {
        Self {
            order: withdrawal.order_number,
            sum: withdrawal.sum,
            processed_at: withdrawal.processed_at.to_rfc3339(),
        }
    }
}

/// GET /api/user/withdrawals — most recent first; 204 when there are
/// none.
pub async fn withdrawals<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<WithdrawalResponse>>, ServiceError> {
    let withdrawals = state.balance.withdrawals(user_id)?;
    Ok(Json(
        withdrawals.into_iter().map(WithdrawalResponse::from).collect(),
    ))
}
