//! Order submission and listing

use std::sync::Arc;

use crate::error::ServiceError;
use crate::luhn;
use crate::store::{Order, Storage, UserId};

/// Order intake and the submission state machine.
pub struct OrderService<S: Storage> {
    storage: Arc<S>,
}

impl<S: Storage> OrderService<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Submit an order number on behalf of a user.
    ///
    /// Resubmission by the owner is the [`ServiceError::OrderLoadedByUser`]
    /// sentinel; a number held by someone else is
    /// [`ServiceError::OrderLoadedByAnother`]. A `Conflict` from the
    /// insert means we lost a race to another submitter, so ownership is
    /// re-read rather than trusting the pre-check.
    pub fn submit(&self, user_id: UserId, number: &str) -> Result<Order, ServiceError> {
        if !luhn::is_valid(number) {
            return Err(ServiceError::InvalidOrderNumber);
        }

        if let Some(existing) = self.storage.get_order_by_number(number)? {
            return Err(classify(&existing, user_id));
        }

        match self.storage.create_order(user_id, number) {
            Ok(order) => Ok(order),
            Err(ServiceError::Conflict) => match self.storage.get_order_by_number(number)? {
                Some(existing) => Err(classify(&existing, user_id)),
                None => Err(ServiceError::Internal(
                    "order missing after uniqueness conflict".to_string(),
                )),
            },
            Err(err) => Err(err),
        }
    }

    /// User's orders, newest upload first; an empty result is reported
    /// as [`ServiceError::NoData`] so the boundary can answer 204.
    pub fn list(&self, user_id: UserId) -> Result<Vec<Order>, ServiceError> {
        let orders = self.storage.list_orders_by_user(user_id)?;
        if orders.is_empty() {
            return Err(ServiceError::NoData);
        }
        Ok(orders)
    }
}

fn classify(existing: &Order, caller: UserId) -> ServiceError {
    if existing.user_id == caller {
        ServiceError::OrderLoadedByUser
    } else {
        ServiceError::OrderLoadedByAnother
    }
}
