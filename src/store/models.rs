//! Data models for the loyalty store

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Unique user identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

/// A registered user. Append-only: never mutated, never deleted.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub login: String,
    pub password_hash: String,
}

/// Order processing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// Accepted, not yet picked up by the scorer
    New,
    /// Scoring in progress
    Processing,
    /// Scorer refused the order
    Invalid,
    /// Scored; accrual credited
    Processed,
}

impl OrderStatus {
    /// Terminal orders are never touched by the worker again.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Invalid | OrderStatus::Processed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::New => "NEW",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Invalid => "INVALID",
            OrderStatus::Processed => "PROCESSED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "NEW" => Some(OrderStatus::New),
            "PROCESSING" => Some(OrderStatus::Processing),
            "INVALID" => Some(OrderStatus::Invalid),
            "PROCESSED" => Some(OrderStatus::Processed),
            _ => None,
        }
    }
}

/// A submitted purchase order.
///
/// `accrual` is present exactly when `status` is `Processed`; only the
/// worker mutates `status`/`accrual`, everything else is write-once.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: u64,
    pub user_id: UserId,
    pub number: String,
    pub status: OrderStatus,
    pub accrual: Option<Decimal>,
    pub uploaded_at: DateTime<Utc>,
}

/// A committed spend of points against an order number. Append-only.
#[derive(Debug, Clone)]
pub struct Withdrawal {
    pub id: u64,
    pub user_id: UserId,
    pub order_number: String,
    pub sum: Decimal,
    pub processed_at: DateTime<Utc>,
}

/// Point balance, always derived from orders and withdrawals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Balance {
    /// Σ processed accruals − Σ withdrawals
    pub current: Decimal,
    /// Σ withdrawals
    pub withdrawn: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            OrderStatus::New,
            OrderStatus::Processing,
            OrderStatus::Invalid,
            OrderStatus::Processed,
        ] {
            assert_eq!(OrderStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::from_str("REGISTERED"), None);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!OrderStatus::New.is_terminal());
        assert!(!OrderStatus::Processing.is_terminal());
        assert!(OrderStatus::Invalid.is_terminal());
        assert!(OrderStatus::Processed.is_terminal());
    }

    #[test]
    fn test_status_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Processed).unwrap(),
            "\"PROCESSED\""
        );
    }
}
