//! # Retry with Backoff
//!
//! Repeats a remote call while it fails with a transient error kind.
//!
//! Only [`BridgeError::is_transient`] decides whether a failure is retried;
//! permanent errors are returned after the first attempt. Backoff sleeps race
//! against a [`CancellationToken`] so a shutdown never waits out a long delay.

use crate::error::{Result, SyncError};
use crate::metrics::OperationMetrics;
use bridge_traits::error::BridgeError;
use bridge_traits::http::RetryPolicy;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Run `call` up to `policy.max_attempts` times.
///
/// Each retry is counted in `metrics`. The returned error is the last one
/// observed, so callers can still inspect its [`RemoteErrorKind`](bridge_traits::RemoteErrorKind)
/// to tell an exhausted transient failure from a permanent one.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    cancel: &CancellationToken,
    metrics: &OperationMetrics,
    mut call: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, BridgeError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        attempt += 1;
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let delay = policy.delay_for_attempt(attempt);
                metrics.record_retry();
                warn!(
                    operation,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient failure, retrying"
                );

                tokio::select! {
                    _ = cancel.cancelled() => return Err(SyncError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            Err(e) => {
                debug!(operation, attempt, error = %e, "Giving up");
                return Err(SyncError::Remote(e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::OperationMetrics;
    use bridge_traits::error::RemoteErrorKind;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            use_exponential_backoff: true,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_are_retried() {
        let metrics = OperationMetrics::default();
        let calls = AtomicU32::new(0);

        let result = retry_with_backoff(
            &policy(3),
            "get_playlist",
            &CancellationToken::new(),
            &metrics,
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(BridgeError::remote(RemoteErrorKind::RateLimited, "429"))
                    } else {
                        Ok(n)
                    }
                }
            },
        )
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(metrics.errors().retries, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_not_retried() {
        let metrics = OperationMetrics::default();
        let calls = AtomicU32::new(0);

        let result: Result<()> = retry_with_backoff(
            &policy(3),
            "edit_playlist",
            &CancellationToken::new(),
            &metrics,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(BridgeError::remote(RemoteErrorKind::PermissionDenied, "403")) }
            },
        )
        .await;

        assert_eq!(
            result.unwrap_err().remote_kind(),
            Some(RemoteErrorKind::PermissionDenied)
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(metrics.errors().retries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_keep_transient_kind() {
        let metrics = OperationMetrics::default();

        let result: Result<()> = retry_with_backoff(
            &policy(2),
            "add_playlist_items",
            &CancellationToken::new(),
            &metrics,
            || async { Err(BridgeError::remote(RemoteErrorKind::MalformedResponse, "empty")) },
        )
        .await;

        let err = result.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(metrics.errors().retries, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_aborts_backoff() {
        let metrics = OperationMetrics::default();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        let result: Result<()> = retry_with_backoff(
            &policy(5),
            "get_playlist",
            &cancel,
            &metrics,
            || {
                trigger.cancel();
                async { Err(BridgeError::remote(RemoteErrorKind::ServerError, "503")) }
            },
        )
        .await;

        assert!(matches!(result, Err(SyncError::Cancelled)));
    }
}
