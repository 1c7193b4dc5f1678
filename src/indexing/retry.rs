//! Retry with exponential backoff for engine writes
//!
//! Only failures classified as transient by [`SearchError::is_transient`]
//! are retried; anything else is returned on the first attempt.

use crate::search::{SearchError, SearchResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Backoff schedule for one retried operation.
///
/// `max_retries` is the total number of attempts; `None` retries forever.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
    pub max_retries: Option<usize>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::batch_write()
    }
}

impl RetryConfig {
    /// Three attempts, 200ms doubling up to 5s
    #[must_use]
    pub fn batch_write() -> Self {
        Self {
            max_retries: Some(3),
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            factor: 2.0,
        }
    }

    /// No waiting and a single attempt
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_retries: Some(1),
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            factor: 1.0,
        }
    }

    /// Fast retry for tests (minimal delays)
    #[cfg(test)]
    pub fn test() -> Self {
        Self {
            max_retries: Some(3),
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            factor: 2.0,
        }
    }
}

/// Run `operation` until it succeeds, fails permanently, or attempts run out.
///
/// `on_retry` is called with the failed attempt number before each backoff.
pub async fn retry<F, Fut, T, R>(
    operation_name: &str,
    config: &RetryConfig,
    mut on_retry: R,
    mut operation: F,
) -> SearchResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SearchResult<T>>,
    R: FnMut(usize, &SearchError),
{
    let mut delay = config.initial_delay;
    let mut attempts = 0;

    loop {
        match operation().await {
            Ok(val) => {
                if attempts > 0 {
                    info!(
                        operation = operation_name,
                        retries = attempts,
                        "Operation succeeded after retries"
                    );
                }
                return Ok(val);
            }
            Err(err) => {
                attempts += 1;

                if !err.is_transient() {
                    return Err(err);
                }
                if let Some(max) = config.max_retries {
                    if attempts >= max {
                        warn!(
                            operation = operation_name,
                            attempts,
                            error = %err,
                            "Operation failed, giving up"
                        );
                        return Err(err);
                    }
                }

                warn!(
                    operation = operation_name,
                    attempt = attempts,
                    max_attempts = ?config.max_retries,
                    error = %err,
                    delay_ms = delay.as_millis() as u64,
                    "Operation failed, retrying"
                );
                on_retry(attempts, &err);

                sleep(delay).await;
                delay = delay.mul_f64(config.factor).min(config.max_delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_retry_succeeds_after_transient_failures() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();
        let mut retried = Vec::new();

        let result = retry(
            "write",
            &RetryConfig::test(),
            |attempt, _| retried.push(attempt),
            || {
                let a = attempts_clone.clone();
                async move {
                    let count = a.fetch_add(1, Ordering::SeqCst) + 1;
                    if count < 3 {
                        Err(SearchError::EngineUnavailable(format!("fail {}", count)))
                    } else {
                        Ok(42)
                    }
                }
            },
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(retried, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_retry_exhausts_attempts() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();

        let result: SearchResult<()> = retry("write", &RetryConfig::test(), |_, _| {}, || {
            let a = attempts_clone.clone();
            async move {
                a.fetch_add(1, Ordering::SeqCst);
                Err(SearchError::EngineRejected {
                    status: 503,
                    message: "busy".into(),
                })
            }
        })
        .await;

        assert!(result.unwrap_err().is_transient());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();

        let result: SearchResult<()> = retry("write", &RetryConfig::test(), |_, _| {}, || {
            let a = attempts_clone.clone();
            async move {
                a.fetch_add(1, Ordering::SeqCst);
                Err(SearchError::EngineRejected {
                    status: 400,
                    message: "invalid document".into(),
                })
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delay_caps_at_max() {
        let config = RetryConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            factor: 10.0,
            max_retries: Some(5),
        };
        let delay = config.initial_delay.mul_f64(config.factor).min(config.max_delay);
        assert_eq!(delay, Duration::from_secs(5));
        assert_eq!(RetryConfig::default().max_retries, Some(3));
    }
}
