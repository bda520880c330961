//! Flood-wait handling for rate-limited Telegram calls.
//!
//! A call that fails with a flood wait is retried exactly once after
//! sleeping for the requested time. A second flood wait is returned to the
//! caller, which bounds the worst-case latency of any single operation.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::TelegramError;

/// Single-retry flood-control policy.
#[derive(Debug, Clone)]
pub struct FloodControl {
    shutdown: CancellationToken,
}

impl FloodControl {
    /// Creates a policy whose waits end early when `shutdown` is cancelled.
    #[must_use]
    pub fn new(shutdown: CancellationToken) -> Self {
        Self { shutdown }
    }

    /// Runs `op`, retrying once if Telegram asks to wait.
    ///
    /// # Errors
    ///
    /// Returns the first non-rate-limit error, the rate-limit error of the
    /// retry, or the original rate-limit error if shutdown interrupts the
    /// wait.
    pub async fn call<T, F, Fut>(&self, mut op: F) -> Result<T, TelegramError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TelegramError>>,
    {
        match op().await {
            Err(err) => {
                let Some(wait) = err.flood_wait() else {
                    return Err(err);
                };
                warn!("Flood wait: sleeping {}s before retrying once", wait.as_secs());

                tokio::select! {
                    () = self.shutdown.cancelled() => return Err(err),
                    () = tokio::time::sleep(wait) => {}
                }

                op().await
            }
            ok => ok,
        }
    }

    /// Sleeps unless shutdown comes first. Returns false on shutdown.
    pub async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            () = self.shutdown.cancelled() => false,
            () = tokio::time::sleep(duration) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::time::Instant;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_retries_once_after_requested_wait() {
        let flood = FloodControl::new(CancellationToken::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let started = Instant::now();

        let result = flood
            .call(|| {
                let calls = Arc::clone(&calls);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(TelegramError::FloodWait { seconds: Some(2) })
                    } else {
                        Ok("sent")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "sent");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_flood_wait_is_surfaced() {
        let flood = FloodControl::new(CancellationToken::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let result: Result<(), _> = flood
            .call(|| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(TelegramError::FloodWait { seconds: Some(1) })
                }
            })
            .await;

        assert!(matches!(result, Err(TelegramError::FloodWait { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_wait_defaults_to_sixty_seconds() {
        let flood = FloodControl::new(CancellationToken::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let started = Instant::now();

        let result = flood
            .call(|| {
                let calls = Arc::clone(&calls);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(TelegramError::FloodWait { seconds: None })
                    } else {
                        Ok(())
                    }
                }
            })
            .await;

        assert!(result.is_ok());
        assert!(started.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let flood = FloodControl::new(CancellationToken::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let result: Result<(), _> = flood
            .call(|| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(TelegramError::NotFound("USERNAME_NOT_OCCUPIED".into()))
                }
            })
            .await;

        assert!(matches!(result, Err(TelegramError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_wait() {
        let shutdown = CancellationToken::new();
        let flood = FloodControl::new(shutdown.clone());
        let calls = Arc::new(AtomicUsize::new(0));
        shutdown.cancel();

        let result: Result<(), _> = flood
            .call(|| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(TelegramError::FloodWait { seconds: Some(3600) })
                }
            })
            .await;

        assert!(matches!(result, Err(TelegramError::FloodWait { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_ends_early_on_shutdown() {
        let shutdown = CancellationToken::new();
        let flood = FloodControl::new(shutdown.clone());

        assert!(flood.pause(Duration::from_secs(1)).await);

        shutdown.cancel();
        let started = Instant::now();
        assert!(!flood.pause(Duration::from_secs(30)).await);
        assert!(started.elapsed() < Duration::from_secs(30));
    }
}
