//! In-memory storage implementation
//!
//! Backs the test suites; keeps every invariant the SQLite store keeps.
//! A single lock stands in for the database transaction, so the balance
//! check and the withdrawal insert commit atomically here too.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use rust_decimal::Decimal;

use super::{Balance, Order, OrderStatus, StoreResult, Storage, User, UserId, Withdrawal};
use crate::error::ServiceError;

#[derive(Default)]
struct Inner {
    users: HashMap<UserId, User>,
    /// login -> user id
    logins: HashMap<String, UserId>,
    /// order number -> order
    orders: HashMap<String, Order>,
    withdrawals: Vec<Withdrawal>,
    next_user_id: u64,
    next_order_id: u64,
    next_withdrawal_id: u64,
}

impl Inner {
    fn balance_of(&self, user_id: UserId) -> Balance {
        let accrued: Decimal = self
            .orders
            .values()
            .filter(|o| o.user_id == user_id && o.status == OrderStatus::Processed)
            .filter_map(|o| o.accrual)
            .sum();
        let withdrawn: Decimal = self
            .withdrawals
            .iter()
            .filter(|w| w.user_id == user_id)
            .map(|w| w.sum)
            .sum();
        Balance {
            current: accrued - withdrawn,
            withdrawn,
        }
    }
}

/// In-memory [`Storage`] implementation
#[derive(Default)]
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn create_user(&self, login: &str, password_hash: &str) -> StoreResult<User> {
        let mut inner = self.inner.write().unwrap();
        if inner.logins.contains_key(login) {
            return Err(ServiceError::Conflict);
        }

        inner.next_user_id += 1;
        let user = User {
            id: UserId(inner.next_user_id),
            login: login.to_string(),
            password_hash: password_hash.to_string(),
        };
        inner.logins.insert(login.to_string(), user.id);
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn get_user_by_login(&self, login: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .logins
            .get(login)
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    fn get_user(&self, user_id: UserId) -> StoreResult<Option<User>> {
        Ok(self.inner.read().unwrap().users.get(&user_id).cloned())
    }

    fn create_order(&self, user_id: UserId, number: &str) -> StoreResult<Order> {
        let mut inner = self.inner.write().unwrap();
        if inner.orders.contains_key(number) {
            return Err(ServiceError::Conflict);
        }

        inner.next_order_id += 1;
        let order = Order {
            id: inner.next_order_id,
            user_id,
            number: number.to_string(),
            status: OrderStatus::New,
            accrual: None,
            uploaded_at: Utc::now(),
        };
        inner.orders.insert(number.to_string(), order.clone());
        Ok(order)
    }

    fn get_order_by_number(&self, number: &str) -> StoreResult<Option<Order>> {
        Ok(self.inner.read().unwrap().orders.get(number).cloned())
    }

    fn list_orders_by_user(&self, user_id: UserId) -> StoreResult<Vec<Order>> {
        let inner = self.inner.read().unwrap();
        let mut orders: Vec<Order> = inner
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| {
            b.uploaded_at
                .cmp(&a.uploaded_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(orders)
    }

    fn list_non_terminal_orders(&self) -> StoreResult<Vec<Order>> {
        let inner = self.inner.read().unwrap();
        let mut orders: Vec<Order> = inner
            .orders
            .values()
            .filter(|o| !o.status.is_terminal())
            .cloned()
            .collect();
        orders.sort_by(|a, b| {
            a.uploaded_at
                .cmp(&b.uploaded_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(orders)
    }

    fn update_order_status_and_accrual(
        &self,
        number: &str,
        status: OrderStatus,
        accrual: Option<Decimal>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().unwrap();
        match inner.orders.get_mut(number) {
            Some(order) => {
                order.status = status;
                order.accrual = accrual;
                Ok(())
            }
            None => Err(ServiceError::NoData),
        }
    }

    fn create_withdrawal(
        &self,
        user_id: UserId,
        order_number: &str,
        sum: Decimal,
    ) -> StoreResult<Withdrawal> {
        let mut inner = self.inner.write().unwrap();

        if sum > inner.balance_of(user_id).current {
            return Err(ServiceError::InsufficientBalance);
        }

        if inner
            .withdrawals
            .iter()
            .any(|w| w.order_number == order_number)
        {
            return Err(ServiceError::Conflict);
        }

        inner.next_withdrawal_id += 1;
        let withdrawal = Withdrawal {
            id: inner.next_withdrawal_id,
            user_id,
            order_number: order_number.to_string(),
            sum,
            processed_at: Utc::now(),
        };
        inner.withdrawals.push(withdrawal.clone());
        Ok(withdrawal)
    }

    fn list_withdrawals_by_user(&self, user_id: UserId) -> StoreResult<Vec<Withdrawal>> {
        let inner = self.inner.read().unwrap();
        let mut withdrawals: Vec<Withdrawal> = inner
            .withdrawals
            .iter()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect();
        withdrawals.sort_by(|a, b| {
            b.processed_at
                .cmp(&a.processed_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(withdrawals)
    }

    fn balance_of_user(&self, user_id: UserId) -> StoreResult<Balance> {
        Ok(self.inner.read().unwrap().balance_of(user_id))
    }
}
