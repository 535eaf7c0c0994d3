//! Fixed-interval retry around a single provider network call

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::domain::DomainError;

/// Callback fired before each retry sleep
pub type RetryHook = Arc<dyn Fn(&RetryEvent) + Send + Sync>;

/// Details of a failed attempt that is about to be retried
#[derive(Debug, Clone, PartialEq)]
pub struct RetryEvent {
    pub provider: &'static str,
    /// 1-based number of the attempt that failed
    pub attempt: u32,
    pub wait: Duration,
    pub error: String,
}

/// Fixed-count, fixed-interval retry policy
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    interval: Duration,
    on_retry: Option<RetryHook>,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("interval", &self.interval)
            .field("on_retry", &self.on_retry.is_some())
            .finish()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(10))
    }
}

impl RetryPolicy {
    /// `max_attempts` counts the first try; zero is treated as one
    pub fn fixed(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
            on_retry: None,
        }
    }

    /// A single attempt, no retry
    pub fn none() -> Self {
        Self::fixed(1, Duration::ZERO)
    }

    pub fn with_hook(mut self, hook: impl Fn(&RetryEvent) + Send + Sync + 'static) -> Self {
        self.on_retry = Some(Arc::new(hook));
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempt budget is spent. The last error is returned.
    pub async fn run<T, F, Fut>(
        &self,
        provider: &'static str,
        mut operation: F,
    ) -> Result<T, DomainError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts && e.is_retryable() => {
                    warn!(
                        provider,
                        attempt,
                        max_attempts = self.max_attempts,
                        wait_ms = self.interval.as_millis() as u64,
                        error = %e,
                        "Provider call failed, backing off before retry"
                    );

                    if let Some(hook) = &self.on_retry {
                        hook(&RetryEvent {
                            provider,
                            attempt,
                            wait: self.interval,
                            error: e.to_string(),
                        });
                    }

                    tokio::time::sleep(self.interval).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProviderErrorKind;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn recording_policy(
        attempts: u32,
        interval: Duration,
    ) -> (RetryPolicy, Arc<Mutex<Vec<RetryEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let policy = RetryPolicy::fixed(attempts, interval)
            .with_hook(move |event| sink.lock().unwrap().push(event.clone()));
        (policy, events)
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let (policy, events) = recording_policy(3, Duration::from_secs(10));
        let calls = AtomicU32::new(0);
        let start = tokio::time::Instant::now();

        let result = policy
            .run("test", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(DomainError::transport("test", "connection reset"))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].attempt, 1);
        assert_eq!(events[1].attempt, 2);
        assert!(events.iter().all(|e| e.wait == Duration::from_secs(10)));
        assert!(start.elapsed() >= Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_last_error_when_exhausted() {
        let (policy, events) = recording_policy(3, Duration::from_millis(500));
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .run("test", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    Err(DomainError::provider(
                        "test",
                        ProviderErrorKind::Server,
                        format!("failure {}", n + 1),
                    ))
                }
            })
            .await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("failure 3"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(events.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_error_is_not_retried() {
        let (policy, events) = recording_policy(3, Duration::from_secs(10));
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(DomainError::provider("test", ProviderErrorKind::Auth, "401")) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_none_policy_makes_single_attempt() {
        let policy = RetryPolicy::none();
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(DomainError::transport("test", "timeout")) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        assert_eq!(RetryPolicy::fixed(0, Duration::ZERO).max_attempts(), 1);
    }
}
