//! Loyalty points backend
//!
//! Users register, submit purchase order numbers, and earn point
//! credits computed by an external accrual service; a background worker
//! drives every submitted order to a terminal status, and users spend
//! the accrued points through withdrawals. One balance per user, every
//! change tied to an order number.

pub mod accrual;
pub mod config;
pub mod error;
pub mod luhn;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;
pub mod token;
pub mod worker;

pub use accrual::{AccrualApi, AccrualClient};
pub use config::Config;
pub use error::ServiceError;
pub use state::AppState;
pub use store::{MemoryStorage, SqliteStorage, Storage};
pub use token::TokenService;
pub use worker::OrderProcessor;
