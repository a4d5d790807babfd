//! Registration and login

use std::sync::Arc;

use crate::error::ServiceError;
use crate::store::{Storage, User, UserId};
use crate::token::TokenService;

/// Default bcrypt cost factor
pub const BCRYPT_COST: u32 = 12;

/// User registration and authentication on top of [`Storage`].
pub struct UserService<S: Storage> {
    storage: Arc<S>,
    tokens: TokenService,
}

impl<S: Storage> UserService<S> {
    pub fn new(storage: Arc<S>, tokens: TokenService) -> Self {
        Self { storage, tokens }
    }

    /// Register a new user and return the stored row.
    ///
    /// The password is hashed with bcrypt before it reaches the store;
    /// a taken login surfaces as [`ServiceError::Conflict`].
    pub fn register(&self, login: &str, password: &str) -> Result<User, ServiceError> {
        if login.is_empty() || password.is_empty() {
            return Err(ServiceError::InvalidRequest);
        }

        let hash = bcrypt::hash(password, BCRYPT_COST).map_err(ServiceError::internal)?;
        self.storage.create_user(login, &hash)
    }

    /// Verify credentials and mint a session token.
    ///
    /// Unknown logins and wrong passwords are indistinguishable to the
    /// caller; bcrypt's comparison is constant-time.
    pub fn login(&self, login: &str, password: &str) -> Result<String, ServiceError> {
        let user = self
            .storage
            .get_user_by_login(login)?
            .ok_or(ServiceError::InvalidCredentials)?;

        let valid =
            bcrypt::verify(password, &user.password_hash).map_err(ServiceError::internal)?;
        if !valid {
            return Err(ServiceError::InvalidCredentials);
        }

        self.tokens.issue(user.id)
    }

    pub fn user_by_id(&self, user_id: UserId) -> Result<Option<User>, ServiceError> {
        self.storage.get_user(user_id)
    }
}
