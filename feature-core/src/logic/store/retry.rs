//! Bounded retry with exponential backoff for transient store failures

use std::future::Future;
use std::time::Duration;

use crate::constants::{DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BACKOFF_MS, DEFAULT_RETRY_MAX_BACKOFF_MS};

use super::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first one (min 1)
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
            base_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
            max_backoff: Duration::from_millis(DEFAULT_RETRY_MAX_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Wait before retry number `retry` (0-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base_backoff.saturating_mul(factor).min(self.max_backoff)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out
    pub async fn run<T, F, Fut>(&self, name: &str, mut op: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < attempts => {
                    let wait = self.backoff(attempt - 1);
                    log::warn!(
                        "[Store] {} failed (attempt {}/{}): {}; retrying in {:?}",
                        name,
                        attempt,
                        attempts,
                        err,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = fast(5);
        assert_eq!(policy.backoff(0), Duration::from_millis(1));
        assert_eq!(policy.backoff(1), Duration::from_millis(2));
        assert_eq!(policy.backoff(2), Duration::from_millis(4));
        assert_eq!(policy.backoff(10), Duration::from_millis(4));
        assert_eq!(policy.backoff(64), Duration::from_millis(4));
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = fast(3)
            .run("GET", || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(StoreError::Connection("reset".into()))
                } else {
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result, Ok(7));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = fast(2)
            .run("GET", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::Timeout { op: "GET", after_ms: 1 })
            })
            .await;

        assert!(matches!(result, Err(StoreError::Timeout { .. })));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = fast(5)
            .run("SET", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::Command("WRONGTYPE".into()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
