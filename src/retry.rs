//! Bounded retry of fallible UI actions.
//!
//! Tool-window content can blink in and out while the application indexes or
//! repaints, so a single-shot click is flaky. [`retry_action`] makes that
//! flakiness bounded and observable: transient failures are swallowed between
//! attempts, and if the budget runs out the final failure is reported with
//! its root cause. Actions must be safe to repeat, since an earlier attempt
//! may have partially taken effect before failing.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;

/// Retry budget for one action: how many attempts, and how long to pause
/// between them.
#[derive(Debug, Clone)]
pub struct RetrySpec {
    max_attempts: u32,
    delay: Duration,
}

/// Outcome of a single attempt. Aggregated transiently by [`retry_action`]
/// to decide whether to retry and what to report; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptResult {
    pub attempt: u32,
    pub error: Option<String>,
}

impl AttemptResult {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Errors surfaced by the executor.
#[derive(Debug, Error)]
pub enum RetryError {
    #[error("invalid retry spec: {reason}")]
    InvalidSpec { reason: String },
    #[error("action failed after {attempts} attempt(s): {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

impl RetrySpec {
    pub fn new(max_attempts: u32, delay: Duration) -> Result<Self, RetryError> {
        if max_attempts == 0 {
            return Err(RetryError::InvalidSpec {
                reason: "max attempts must be at least 1".into(),
            });
        }
        Ok(Self {
            max_attempts,
            delay,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

/// Attempt `action` up to the spec's budget, sleeping between failures.
///
/// Returns the successful [`AttemptResult`] so callers can log how many
/// attempts were needed. If every attempt fails, the last captured error is
/// wrapped in [`RetryError::Exhausted`].
pub async fn retry_action<F, Fut, E>(
    spec: &RetrySpec,
    mut action: F,
) -> Result<AttemptResult, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: fmt::Display,
{
    let mut last: Option<AttemptResult> = None;

    for attempt in 1..=spec.max_attempts {
        match action().await {
            Ok(()) => {
                return Ok(AttemptResult {
                    attempt,
                    error: None,
                });
            }
            Err(err) => {
                last = Some(AttemptResult {
                    attempt,
                    error: Some(err.to_string()),
                });
                if attempt < spec.max_attempts {
                    sleep(spec.delay).await;
                }
            }
        }
    }

    // max_attempts >= 1, so at least one attempt was recorded.
    let last = last.expect("at least one attempt must have run");
    Err(RetryError::Exhausted {
        attempts: last.attempt,
        last_error: last.error.unwrap_or_else(|| "unknown error".into()),
    })
}
