use crate::error::Retryable;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Bounded retry with exponential backoff.
///
/// The operation runs at most `max_retries + 1` times. Before retry `n`
/// (0-indexed) the executor sleeps `base_delay * 2^n`. Errors that report
/// themselves as not retryable are returned straight away.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    pub async fn execute<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt >= self.max_retries => return Err(e),
                Err(e) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeedbackError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_third_attempt_with_growing_delays() {
        let calls = AtomicU32::new(0);
        let seen = Mutex::new(Vec::new());
        let start = Instant::now();

        let result: Result<&str, FeedbackError> = RetryPolicy::default()
            .execute(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                seen.lock().unwrap().push(start.elapsed());
                async move {
                    if n < 2 {
                        Err(FeedbackError::Network("connection reset".into()))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let seen = seen.lock().unwrap();
        assert!(seen[1] >= Duration::from_millis(1000));
        assert!(seen[2] - seen[1] >= Duration::from_millis(2000));
        assert!(seen[2] - seen[1] > seen[1] - seen[0]);
    }

    #[tokio::test(start_paused = true)]
    async fn credential_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), FeedbackError> = RetryPolicy::default()
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(FeedbackError::Api {
                        status: 500,
                        message: "Invalid API key provided".into(),
                    })
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();
        let result: Result<(), FeedbackError> = RetryPolicy::new(2, Duration::from_millis(100))
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(FeedbackError::RateLimited("slow down".into())) }
            })
            .await;

        assert!(matches!(result, Err(FeedbackError::RateLimited(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[test]
    fn delay_doubles() {
        let p = RetryPolicy::new(5, Duration::from_millis(250));
        assert_eq!(p.delay_for(0), Duration::from_millis(250));
        assert_eq!(p.delay_for(3), Duration::from_millis(2000));
    }
}
