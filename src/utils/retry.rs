//! Transaction retries and constraint translation.

use registrar_config::TransactionConfig;
use registrar_core::{AppError, AppResult, StoreError};
use std::future::Future;
use tracing::warn;

/// Runs `attempt` until it succeeds, fails with a non-retryable error, or
/// runs out of retries.
///
/// Each attempt must open and commit its own transaction, so a retried
/// attempt starts again from a fresh snapshot.
pub async fn with_retry<T, F, Fut>(
    config: &TransactionConfig,
    operation: &'static str,
    mut attempt: F,
) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut retries = 0;
    loop {
        match attempt().await {
            Err(err) if err.is_retryable() && retries < config.max_retries => {
                retries += 1;
                warn!(operation, retry = retries, "Transaction conflict, retrying");
                tokio::time::sleep(config.backoff(retries)).await;
            }
            result => return result,
        }
    }
}

/// Maps a violation of `constraint` to the error built by `on_violation`.
/// Any other storage error passes through unchanged.
pub fn on_constraint<F>(err: StoreError, constraint: &str, on_violation: F) -> AppError
where
    F: FnOnce() -> AppError,
{
    if err.violated_constraint() == Some(constraint) {
        on_violation()
    } else {
        AppError::from(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_retries_serialization_failures() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = with_retry(&TransactionConfig::default(), "test", || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(AppError::from(StoreError::SerializationFailure))
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let config = TransactionConfig {
            max_retries: 2,
            retry_backoff_ms: 5,
        };
        let result: AppResult<()> = with_retry(&config, "test", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::from(StoreError::SerializationFailure))
        })
        .await;

        assert!(result.unwrap_err().is_retryable());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rule_violations_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: AppResult<()> = with_retry(&TransactionConfig::default(), "test", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::conflict("taken"))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_on_constraint() {
        let err = on_constraint(StoreError::unique("subjects_code_key"), "subjects_code_key", || {
            AppError::conflict("code taken")
        });
        assert!(matches!(err, AppError::Conflict(_)));

        let err = on_constraint(StoreError::unique("other"), "subjects_code_key", || {
            AppError::conflict("code taken")
        });
        assert!(matches!(err, AppError::Storage(_)));
    }
}
