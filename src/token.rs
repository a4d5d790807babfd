//! Stateless session tokens
//!
//! Issues and verifies the bearer credential carried by the auth cookie.
//! Tokens are HS256 JWTs signed with a process-wide symmetric secret, so
//! a request maps to a user id without a store lookup.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::store::UserId;

/// Token lifetime, matching the auth cookie expiry.
pub const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Subject: the user id, as a decimal string
    sub: String,
    /// Issued at (unix seconds)
    iat: i64,
    /// Expiration time (unix seconds)
    exp: i64,
}

/// Issues and verifies session tokens with a fixed symmetric secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenService {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Mint a token binding `user_id` for the next [`TOKEN_TTL_HOURS`].
    pub fn issue(&self, user_id: UserId) -> Result<String, ServiceError> {
        self.issue_with_ttl(user_id, Duration::hours(TOKEN_TTL_HOURS))
    }

    fn issue_with_ttl(&self, user_id: UserId, ttl: Duration) -> Result<String, ServiceError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.0.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding).map_err(ServiceError::internal)
    }

    /// Verify a token and return the user id it is bound to.
    ///
    /// Malformed, tampered, and expired tokens all come back as
    /// [`ServiceError::Unauthorized`]; the caller never learns which.
    pub fn verify(&self, token: &str) -> Result<UserId, ServiceError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|_| ServiceError::Unauthorized)?;

        let id: u64 = data
            .claims
            .sub
            .parse()
            .map_err(|_| ServiceError::Unauthorized)?;

        Ok(UserId(id))
    }
}
