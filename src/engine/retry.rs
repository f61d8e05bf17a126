//! Bounded retry with a fixed backoff.

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

/// Attempts per account task within one round.
pub const MAX_ATTEMPTS: u32 = 3;
/// Pause between a failed attempt and the next one.
pub const RETRY_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            backoff: RETRY_BACKOFF,
        }
    }
}

/// Final result of a retried operation and how many attempts it took.
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: Result<T>,
    pub attempts: u32,
}

impl RetryPolicy {
    /// Run `op` until it succeeds or `max_attempts` is spent.
    ///
    /// `op` receives the 1-based attempt number. No backoff follows the
    /// final failure.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Attempted<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => {
                    return Attempted {
                        result: Ok(value),
                        attempts: attempt,
                    }
                }
                Err(e) => {
                    warn!(task = label, attempt, max, error = %e, "Attempt failed");
                    if attempt >= max {
                        error!(task = label, attempts = attempt, "Max retries reached");
                        return Attempted {
                            result: Err(e),
                            attempts: attempt,
                        };
                    }
                    info!(
                        task = label,
                        backoff_secs = self.backoff.as_secs_f64(),
                        "Retrying after backoff"
                    );
                    tokio::time::sleep(self.backoff).await;
                    attempt += 1;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
