//! Shared application state

use std::sync::Arc;

use crate::service::{BalanceService, OrderService, UserService};
use crate::store::Storage;
use crate::token::TokenService;

/// Everything the HTTP handlers need, generic over the storage backend
/// so tests run against the in-memory store.
pub struct AppState<S: Storage> {
    pub users: UserService<S>,
    pub orders: OrderService<S>,
    pub balance: BalanceService<S>,
    pub tokens: TokenService,
}

impl<S: Storage> AppState<S> {
    pub fn new(storage: S, tokens: TokenService) -> Self {
        Self::new_with_arc(Arc::new(storage), tokens)
    }

    /// Build from a pre-wrapped store (the worker shares the same Arc).
    pub fn new_with_arc(storage: Arc<S>, tokens: TokenService) -> Self {
        Self {
            users: UserService::new(storage.clone(), tokens.clone()),
            orders: OrderService::new(storage.clone()),
            balance: BalanceService::new(storage),
            tokens,
        }
    }
}
