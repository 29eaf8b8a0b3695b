//! Database helpers
//!
//! Multi-row operations against the relational store run as one
//! all-or-nothing transaction. Serialization failures and deadlocks are
//! transient: the whole transaction is retried with bounded exponential
//! backoff, while non-transient errors fail immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::AppResult;

/// Maximum attempts for a transactional operation
const MAX_ATTEMPTS: u32 = 3;

/// Base delay before the first retry
const BASE_DELAY_MS: u64 = 50;

/// Run a transactional operation, retrying on transient database errors.
///
/// The closure must build and commit its own transaction so that every
/// attempt starts from a clean slate.
pub async fn with_transaction_retry<T, F, Fut>(operation_name: &str, mut operation: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        match operation().await {
            Err(err) if err.is_transient() && attempt + 1 < MAX_ATTEMPTS => {
                attempt += 1;
                let delay = Duration::from_millis(BASE_DELAY_MS << attempt);
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Transient database error, retrying: {}",
                    err
                );
                tokio::time::sleep(delay).await;
            }
            result => return result,
        }
    }
}
