use rand::{RngExt, rng};
use std::time::Duration;

/// Exponential backoff with jitter, applied to rate-limited Connect calls.
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Retry `f` while `should_retry` approves the error, up to
    /// `max_retries` extra attempts.
    pub async fn retry_async<F, Fut, T, E, P>(&self, mut f: F, should_retry: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let mut attempt = 0u32;
        loop {
            match f().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries || !should_retry(&e) {
                        return Err(e);
                    }
                    // exponential backoff with jitter
                    let max_delay = self.base_delay * (1u32 << attempt);
                    let delay = {
                        let mut rng = rng();
                        let jitter = rng.random_range(0..max_delay.as_millis() as u64);
                        Duration::from_millis(jitter.min(max_delay.as_millis() as u64))
                    };
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
