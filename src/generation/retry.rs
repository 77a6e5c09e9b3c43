//! Per-call timeout and bounded retry with exponential backoff.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use super::{Capability, GenerationError, Result};
use crate::config::SearchConfig;

/// Timeout and retry settings applied to every external call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallPolicy {
    /// Deadline for a single attempt
    pub timeout: Duration,
    /// Attempts allowed after the first one
    pub retries: u32,
    /// Delay before the first retry, doubled for each later one
    pub backoff: Duration,
}

impl CallPolicy {
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            timeout: config.call_timeout(),
            retries: config.call_retries,
            backoff: config.retry_backoff(),
        }
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(1u32 << attempt.min(16))
    }
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self::from_config(&SearchConfig::default())
    }
}

/// Run `op` under `policy`, retrying retryable failures
///
/// Each attempt is bounded by `policy.timeout`; an attempt that runs past it
/// fails with [`GenerationError::Timeout`]. Non-retryable errors return
/// immediately.
pub async fn call_with_retry<T, F, Fut>(policy: &CallPolicy, capability: Capability, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        let outcome = match tokio::time::timeout(policy.timeout, op()).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout(policy.timeout)),
        };

        match outcome {
            Ok(value) => {
                if attempt > 0 {
                    debug!(capability = %capability, attempts = attempt + 1, "call succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_retryable() && attempt < policy.retries => {
                let delay = policy.delay_for(attempt);
                warn!(
                    capability = %capability,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "generation call failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                warn!(
                    capability = %capability,
                    attempts = attempt + 1,
                    error = %err,
                    "generation call gave up"
                );
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(retries: u32) -> CallPolicy {
        CallPolicy {
            timeout: Duration::from_secs(1),
            retries,
            backoff: Duration::from_millis(100),
        }
    }

    #[test]
    fn test_backoff_doubles() {
        let p = policy(3);
        assert_eq!(p.delay_for(0), Duration::from_millis(100));
        assert_eq!(p.delay_for(1), Duration::from_millis(200));
        assert_eq!(p.delay_for(2), Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let attempts = AtomicU32::new(0);
        let result = call_with_retry(&policy(2), Capability::Branch, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(GenerationError::Transport("reset".into()))
                } else {
                    Ok("ok")
                }
            }
        })
        .await;
        assert_eq!(result, Ok("ok"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_retry_cap() {
        let attempts = AtomicU32::new(0);
        let result: Result<()> = call_with_retry(&policy(2), Capability::Score, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(GenerationError::Transport("down".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_returns_immediately() {
        let attempts = AtomicU32::new(0);
        let result: Result<()> = call_with_retry(&policy(5), Capability::Explain, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(GenerationError::Unsupported("explain_selection")) }
        })
        .await;
        assert_eq!(result, Err(GenerationError::Unsupported("explain_selection")));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_attempt_times_out() {
        let result: Result<()> = call_with_retry(&policy(0), Capability::Reaction, || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert_eq!(result, Err(GenerationError::Timeout(Duration::from_secs(1))));
    }
}
