use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Spacing between consecutive attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same wait before every retry; used to poll a server that is still starting.
    Fixed(Duration),
    /// Wait `first`, then twice as long each time, never more than `cap`.
    Doubling { first: Duration, cap: Duration },
}

/// How often a request is attempted and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryConfig {
    /// Poll up to `max_attempts` times, `interval` apart.
    pub fn polling(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::Fixed(interval),
        }
    }

    /// Try up to `max_attempts` times with doubling waits capped at `cap`.
    pub fn doubling(max_attempts: u32, first: Duration, cap: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::Doubling { first, cap },
        }
    }

    /// Readiness poll for a server that was just started: every 500ms for 45s.
    pub fn server_ready() -> Self {
        Self::polling(91, Duration::from_millis(500))
    }

    /// A single page or redirect check: waits 250ms, then 500ms.
    pub fn page_fetch() -> Self {
        Self::doubling(3, Duration::from_millis(250), Duration::from_secs(1))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Longest time spent sleeping if every attempt fails.
    pub fn total_wait(&self) -> Duration {
        (1..self.max_attempts).map(|attempt| self.delay_before(attempt)).sum()
    }

    /// Sleep before attempt number `attempt` (0 is the first try).
    fn delay_before(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        match self.backoff {
            Backoff::Fixed(interval) => interval,
            Backoff::Doubling { first, cap } => {
                let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
                first.saturating_mul(factor).min(cap)
            }
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::page_fetch()
    }
}

/// Execute an async operation with retries
pub async fn with_retry<T, E, F, Fut>(
    config: &RetryConfig,
    operation_name: &str,
    operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    with_retry_if(config, operation_name, operation, |_| true).await
}

/// Execute an async operation with retries, using a predicate to determine if retry is appropriate
///
/// Connection failures are worth retrying; a page that answered with the wrong
/// content is not.
pub async fn with_retry_if<T, E, F, Fut, P>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0;
    loop {
        // Wait before retry (except for first attempt)
        let delay = config.delay_before(attempt);
        if !delay.is_zero() {
            debug!(
                "{}: Retry attempt {}/{} after {:?}",
                operation_name,
                attempt + 1,
                config.max_attempts,
                delay
            );
            sleep(delay).await;
        }

        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(
                        "{}: Succeeded on attempt {}/{}",
                        operation_name,
                        attempt + 1,
                        config.max_attempts
                    );
                }
                return Ok(result);
            }
            Err(e) => {
                if !should_retry(&e) {
                    debug!(
                        "{}: Error is not retryable, failing immediately: {}",
                        operation_name, e
                    );
                    return Err(e);
                }

                let remaining = config.max_attempts - attempt - 1;
                if remaining == 0 {
                    warn!(
                        "{}: All {} attempts failed. Last error: {}",
                        operation_name, config.max_attempts, e
                    );
                    return Err(e);
                }

                debug!(
                    "{}: Attempt {}/{} failed ({}), {} retries remaining",
                    operation_name,
                    attempt + 1,
                    config.max_attempts,
                    e,
                    remaining
                );
                attempt += 1;
            }
        }
    }
}
