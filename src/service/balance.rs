//! Balance reads and withdrawal admission

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::error::ServiceError;
use crate::luhn;
use crate::store::{Balance, Storage, UserId, Withdrawal};

/// Point balance and spending on top of [`Storage`].
///
/// The adequacy check itself lives in the store transaction; this layer
/// only validates the request shape and translates conflicts.
pub struct BalanceService<S: Storage> {
    storage: Arc<S>,
}

impl<S: Storage> BalanceService<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    pub fn balance(&self, user_id: UserId) -> Result<Balance, ServiceError> {
        self.storage.balance_of_user(user_id)
    }

    /// Spend `sum` points against `order_number`.
    ///
    /// A reused withdrawal number surfaces as
    /// [`ServiceError::WithdrawalExists`]; inadequate balance as
    /// [`ServiceError::InsufficientBalance`].
    pub fn withdraw(
        &self,
        user_id: UserId,
        order_number: &str,
        sum: Decimal,
    ) -> Result<Withdrawal, ServiceError> {
        if sum <= Decimal::ZERO {
            return Err(ServiceError::InvalidRequest);
        }
        if !luhn::is_valid(order_number) {
            return Err(ServiceError::InvalidOrderNumber);
        }

        match self.storage.create_withdrawal(user_id, order_number, sum) {
            Err(ServiceError::Conflict) => Err(ServiceError::WithdrawalExists),
            other => other,
        }
    }

    /// User's withdrawals, most recent first; empty is
    /// [`ServiceError::NoData`].
    pub fn withdrawals(&self, user_id: UserId) -> Result<Vec<Withdrawal>, ServiceError> {
        let withdrawals = self.storage.list_withdrawals_by_user(user_id)?;
        if withdrawals.is_empty() {
            return Err(ServiceError::NoData);
        }
        Ok(withdrawals)
    }
}
