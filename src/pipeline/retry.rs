use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Fixed-delay retry applied to each pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: usize,
    pub delay: Duration,
}

/// Retries an async stage with configurable attempts and delays
///
/// # Parameters
/// - `stage`: Stage name used in log messages
/// - `operation`: Closure returning a future
/// - `policy`: Number of retry attempts (total runs = 1 initial + retries) and
///   the fixed delay between them
///
/// # Returns
/// Either the successful result or the error of the last attempt
pub async fn with_retry<F, Fut, T>(stage: &str, mut operation: F, policy: RetryPolicy) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) => {
                if attempt > policy.retries {
                    return Err(err);
                }
                warn!(
                    "Stage {} attempt {}/{} failed: {:#}. Retrying in {:?}...",
                    stage,
                    attempt,
                    policy.retries + 1,
                    err,
                    policy.delay
                );
                attempt += 1;
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}
