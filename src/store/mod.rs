//! Storage abstractions for the loyalty backend

pub mod memory;
pub mod models;
pub mod sqlite;

pub use memory::MemoryStorage;
pub use models::*;
pub use sqlite::SqliteStorage;

use rust_decimal::Decimal;

use crate::error::ServiceError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, ServiceError>;

/// Transactional gateway to users, orders, and withdrawals.
///
/// Uniqueness violations surface as [`ServiceError::Conflict`], distinct
/// from generic storage faults. All multi-step invariants (unique order
/// numbers, balance adequacy) are enforced here under the store's own
/// serialization, never in application memory.
pub trait Storage: Send + Sync {
    /// Insert a new user; `Conflict` if the login is taken.
    fn create_user(&self, login: &str, password_hash: &str) -> StoreResult<User>;

    fn get_user_by_login(&self, login: &str) -> StoreResult<Option<User>>;

    fn get_user(&self, user_id: UserId) -> StoreResult<Option<User>>;

    /// Insert a new order with status `NEW`; `Conflict` if the number
    /// exists for any user.
    fn create_order(&self, user_id: UserId, number: &str) -> StoreResult<Order>;

    fn get_order_by_number(&self, number: &str) -> StoreResult<Option<Order>>;

    /// User's orders, most recently uploaded first.
    fn list_orders_by_user(&self, user_id: UserId) -> StoreResult<Vec<Order>>;

    /// Orders still awaiting a terminal status (`NEW` or `PROCESSING`),
    /// oldest upload first.
    fn list_non_terminal_orders(&self) -> StoreResult<Vec<Order>>;

    /// Rewrite status and accrual of the order with the given number.
    fn update_order_status_and_accrual(
        &self,
        number: &str,
        status: OrderStatus,
        accrual: Option<Decimal>,
    ) -> StoreResult<()>;

    /// Insert a withdrawal after re-checking `sum <= current` inside the
    /// same transaction. `InsufficientBalance` if the check fails,
    /// `Conflict` if the order number was already used.
    fn create_withdrawal(
        &self,
        user_id: UserId,
        order_number: &str,
        sum: Decimal,
    ) -> StoreResult<Withdrawal>;

    /// User's withdrawals, most recent first.
    fn list_withdrawals_by_user(&self, user_id: UserId) -> StoreResult<Vec<Withdrawal>>;

    /// Current and withdrawn totals from one consistent snapshot.
    fn balance_of_user(&self, user_id: UserId) -> StoreResult<Balance>;
}
