//! Bounded exponential backoff shared by all source clients.
//!
//! Policy: up to 3 attempts, delays 2 s / 4 s / 8 s capped at 10 s, no
//! jitter. Retries share the enclosing assessment deadline and are
//! abandoned once the next delay would cross it.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base: Duration,
    pub cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base: Duration::from_secs(2),
            cap: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts, ..Self::default() }
    }

    /// Delay before the retry following `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base.saturating_mul(1u32 << (attempt.saturating_sub(1)).min(16));
        exp.min(self.cap)
    }

    /// Runs `op`, retrying transient failures until the attempt budget or
    /// the deadline is exhausted. Permanent failures return immediately.
    pub async fn run<T, F, Fut>(&self, deadline: Instant, mut op: F) -> anyhow::Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    if attempt >= self.max_attempts || !is_transient(&e) {
                        return Err(e);
                    }
                    let delay = self.delay_for(attempt);
                    if Instant::now() + delay >= deadline {
                        debug!(attempt, "retry abandoned: deadline would expire");
                        return Err(e);
                    }
                    debug!(attempt, ?delay, "transient error, backing off");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Timeouts, connection resets, 5xx, and 429 are retryable; other HTTP
/// failures and parse errors are permanent.
pub fn is_transient(err: &anyhow::Error) -> bool {
    if let Some(re) = err.downcast_ref::<reqwest::Error>() {
        if re.is_timeout() || re.is_connect() {
            return true;
        }
        if let Some(status) = re.status() {
            return status.is_server_error() || status.as_u16() == 429;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_schedule() {
        let p = RetryPolicy::default();
        assert_eq!(p.delay_for(1), Duration::from_secs(2));
        assert_eq!(p.delay_for(2), Duration::from_secs(4));
        assert_eq!(p.delay_for(3), Duration::from_secs(8));
        assert_eq!(p.delay_for(4), Duration::from_secs(10)); // capped
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let calls = AtomicU32::new(0);
        let p = RetryPolicy::default();
        let deadline = Instant::now() + Duration::from_secs(60);
        let res: anyhow::Result<()> = p
            .run(deadline, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(anyhow::anyhow!("parse failure")) }
            })
            .await;
        assert!(res.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let p = RetryPolicy::default();
        let deadline = Instant::now() + Duration::from_secs(60);
        let res = p.run(deadline, || async { Ok(42u32) }).await;
        assert_eq!(res.unwrap(), 42);
    }
}
