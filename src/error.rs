//! Service error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Malformed request")]
    InvalidRequest,

    #[error("Invalid login or password")]
    InvalidCredentials,

    #[error("Not authenticated")]
    Unauthorized,

    #[error("Invalid order number")]
    InvalidOrderNumber,

    #[error("Order already uploaded by this user")]
    OrderLoadedByUser,

    #[error("Order already uploaded by another user")]
    OrderLoadedByAnother,

    #[error("Data conflicts with existing data")]
    Conflict,

    #[error("Insufficient balance")]
    InsufficientBalance,

    #[error("Withdrawal order number already used")]
    WithdrawalExists,

    #[error("No data")]
    NoData,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Wrap an arbitrary backend failure.
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            // Sentinels that carry no error body
            ServiceError::OrderLoadedByUser => return StatusCode::OK.into_response(),
            ServiceError::NoData => return StatusCode::NO_CONTENT.into_response(),

            ServiceError::InvalidRequest => (StatusCode::BAD_REQUEST, "Malformed request"),
            ServiceError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid login or password")
            }
            ServiceError::Unauthorized => (StatusCode::UNAUTHORIZED, "Not authenticated"),
            ServiceError::InvalidOrderNumber => {
                (StatusCode::UNPROCESSABLE_ENTITY, "Invalid order number")
            }
            ServiceError::OrderLoadedByAnother => (
                StatusCode::CONFLICT,
                "Order already uploaded by another user",
            ),
            ServiceError::Conflict => (StatusCode::CONFLICT, "Data conflicts with existing data"),
            ServiceError::InsufficientBalance => {
                (StatusCode::PAYMENT_REQUIRED, "Insufficient balance")
            }
            ServiceError::WithdrawalExists => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Withdrawal order number already used",
            ),
            ServiceError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "success": false, "reason": message });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ServiceError::InvalidRequest, StatusCode::BAD_REQUEST),
            (ServiceError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (ServiceError::Unauthorized, StatusCode::UNAUTHORIZED),
            (
                ServiceError::InvalidOrderNumber,
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (ServiceError::OrderLoadedByUser, StatusCode::OK),
            (ServiceError::OrderLoadedByAnother, StatusCode::CONFLICT),
            (ServiceError::Conflict, StatusCode::CONFLICT),
            (
                ServiceError::InsufficientBalance,
                StatusCode::PAYMENT_REQUIRED,
            ),
            (
                ServiceError::WithdrawalExists,
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (ServiceError::NoData, StatusCode::NO_CONTENT),
            (
                ServiceError::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
