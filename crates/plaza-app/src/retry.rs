//! Bounded retry for transient backend failures. The behavior when a
//! failure sticks is unchanged (callers still degrade), but a flaky store
//! call gets a second chance before they do.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::debug;

/// Errors that can say whether retrying is worthwhile.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for plaza_db::StoreError {
    fn is_transient(&self) -> bool {
        self.is_transient()
    }
}

impl Transient for plaza_realtime::ChannelError {
    fn is_transient(&self) -> bool {
        self.is_transient()
    }
}

impl Transient for crate::AppError {
    fn is_transient(&self) -> bool {
        self.is_transient()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Clamped to at least 1.
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 2,
            backoff: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    pub const fn none() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::ZERO,
        }
    }
}

/// Run `op`, retrying transient failures up to the policy's attempt budget.
/// Non-transient failures return immediately.
pub async fn with_retry<T, E, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, E>
where
    E: Transient + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < attempts && err.is_transient() => {
                debug!(attempt, error = %err, "transient failure, retrying");
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
