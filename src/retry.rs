use anyhow::{anyhow, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::settings::Settings;

/// Fixed-delay retry budget for one logical model operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            attempts: settings.retry_attempts.max(1),
            delay: settings.retry_delay,
        }
    }
}

/// Runs `op` until it succeeds or the attempt budget is spent, sleeping
/// `policy.delay` between attempts. Returns the last error on exhaustion.
pub async fn with_retries<T, F, Fut>(policy: RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut last_error = None;
    for attempt in 1..=attempts {
        info!("{}: attempt {}/{}", label, attempt, attempts);
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                warn!("{}: attempt {} failed: {:#}", label, attempt, err);
                last_error = Some(err);
            }
        }
        if attempt < attempts {
            warn!(
                "{}: retrying in {:.1}s (attempt {}/{})",
                label,
                policy.delay.as_secs_f32(),
                attempt + 1,
                attempts
            );
            sleep(policy.delay).await;
        }
    }
    Err(last_error.unwrap_or_else(|| anyhow!("{}: no attempts made", label)))
}
