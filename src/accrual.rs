//! Client for the external accrual service
//!
//! The scorer exposes one endpoint, `GET {base}/api/orders/{number}`.
//! This module translates its HTTP contract into domain outcomes; the
//! worker never sees status codes or headers.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

/// Bound on a single request to the scorer.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Fallback when a 429 carries no usable Retry-After header.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Scoring status reported by the accrual service.
///
/// This is the upstream vocabulary; `REGISTERED` has no counterpart in
/// the order state machine and produces no order update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccrualStatus {
    Registered,
    Processing,
    Invalid,
    Processed,
}

#[derive(Debug, Deserialize)]
struct AccrualResponse {
    #[allow(dead_code)]
    order: String,
    status: AccrualStatus,
    accrual: Option<Decimal>,
}

/// Domain outcome of a scoring request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccrualOutcome {
    /// The scorer knows the order.
    Found {
        status: AccrualStatus,
        accrual: Option<Decimal>,
    },
    /// The scorer has never seen this number (HTTP 204).
    NotRegistered,
    /// Rate limited; the caller must pause for `retry_after`.
    TooManyRequests { retry_after: Duration },
}

/// Failures that leave the order untouched until a later cycle.
#[derive(Debug, Error)]
pub enum AccrualError {
    #[error("Accrual service internal error")]
    Internal,

    #[error("Accrual transport error: {0}")]
    Transport(String),
}

/// Seam between the worker and the scorer, so tests can substitute a
/// scripted responder.
#[async_trait]
pub trait AccrualApi: Send + Sync {
    async fn fetch(&self, number: &str) -> Result<AccrualOutcome, AccrualError>;
}

/// HTTP client for the accrual service. Stateless; holds only the
/// connection pool and the base URL.
pub struct AccrualClient {
    client: reqwest::Client,
    base_url: String,
}

impl AccrualClient {
    pub fn new(base_url: &str) -> Result<Self, AccrualError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AccrualError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AccrualApi for AccrualClient {
    async fn fetch(&self, number: &str) -> Result<AccrualOutcome, AccrualError> {
        let url = format!("{}/api/orders/{}", self.base_url, number);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AccrualError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {
                let body: AccrualResponse = response
                    .json()
                    .await
                    .map_err(|e| AccrualError::Transport(e.to_string()))?;
                Ok(AccrualOutcome::Found {
                    status: body.status,
                    accrual: body.accrual,
                })
            }
            StatusCode::NO_CONTENT => Ok(AccrualOutcome::NotRegistered),
            StatusCode::TOO_MANY_REQUESTS => Ok(AccrualOutcome::TooManyRequests {
                retry_after: retry_after_from(response.headers()),
            }),
            StatusCode::INTERNAL_SERVER_ERROR => Err(AccrualError::Internal),
            other => Err(AccrualError::Transport(format!(
                "unexpected status {other}"
            ))),
        }
    }
}

/// Retry-After is an integer seconds count; missing or unparseable
/// values fall back to the default.
fn retry_after_from(headers: &HeaderMap) -> Duration {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_after_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, "2".parse().unwrap());
        assert_eq!(retry_after_from(&headers), Duration::from_secs(2));
    }

    #[test]
    fn test_retry_after_defaults() {
        assert_eq!(retry_after_from(&HeaderMap::new()), DEFAULT_RETRY_AFTER);

        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, "soon".parse().unwrap());
        assert_eq!(retry_after_from(&headers), DEFAULT_RETRY_AFTER);
    }

    #[test]
    fn test_response_decoding() {
        let body: AccrualResponse =
            serde_json::from_str(r#"{"order":"12345678903","status":"PROCESSED","accrual":500}"#)
                .unwrap();
        assert_eq!(body.status, AccrualStatus::Processed);
        assert_eq!(body.accrual, Some(Decimal::from(500)));

        let body: AccrualResponse =
            serde_json::from_str(r#"{"order":"2377225624","status":"REGISTERED"}"#).unwrap();
        assert_eq!(body.status, AccrualStatus::Registered);
        assert!(body.accrual.is_none());
    }
}
