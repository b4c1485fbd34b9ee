//! Condition polling against a deadline.
//!
//! The agent renders UI state asynchronously, so every "is the panel open
//! yet?" style question is answered by re-evaluating a predicate at a fixed
//! interval until it holds or a deadline passes. [`WaitSpec`] carries the
//! budget plus human-readable descriptions that end up in diagnostics, and
//! [`wait_for`] runs the loop.
//!
//! Predicate errors during polling are treated as transient: the loop keeps
//! going until the deadline and the last error is surfaced inside
//! [`WaitError::Timeout`]. Callers that only need an operation to eventually
//! succeed (readiness pings) use [`wait_for_ok`].

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, sleep};

/// Describes one wait: deadline, poll interval, and diagnostics.
#[derive(Debug, Clone)]
pub struct WaitSpec {
    timeout: Duration,
    interval: Duration,
    waiting: String,
    failure: String,
}

/// Errors surfaced by the poll loop.
#[derive(Debug, Error)]
pub enum WaitError {
    #[error("invalid wait spec: {reason}")]
    InvalidSpec { reason: String },
    #[error("timed out after {elapsed:?}: {failure}")]
    Timeout {
        failure: String,
        elapsed: Duration,
        /// Last transient predicate error observed before the deadline.
        last_error: Option<String>,
    },
}

impl WaitSpec {
    /// Build a spec, rejecting degenerate budgets up front. A zero timeout or
    /// an interval larger than the timeout would collapse the loop to at most
    /// one evaluation.
    pub fn new(timeout: Duration, interval: Duration) -> Result<Self, WaitError> {
        if timeout.is_zero() {
            return Err(WaitError::InvalidSpec {
                reason: "timeout must be greater than zero".into(),
            });
        }
        if interval.is_zero() {
            return Err(WaitError::InvalidSpec {
                reason: "poll interval must be greater than zero".into(),
            });
        }
        if interval > timeout {
            return Err(WaitError::InvalidSpec {
                reason: format!(
                    "poll interval {interval:?} must not exceed timeout {timeout:?}"
                ),
            });
        }
        Ok(Self {
            timeout,
            interval,
            waiting: "waiting for condition".into(),
            failure: "condition was not met".into(),
        })
    }

    /// Attach waiting/failure descriptions used in logs and timeout errors.
    pub fn describing(mut self, waiting: impl Into<String>, failure: impl Into<String>) -> Self {
        self.waiting = waiting.into();
        self.failure = failure.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn waiting(&self) -> &str {
        &self.waiting
    }

    pub fn failure(&self) -> &str {
        &self.failure
    }
}

/// Evaluate `predicate` until it yields `Ok(true)` or the deadline passes.
///
/// The predicate is evaluated immediately; if it already holds, no sleeping
/// happens. Errors from the predicate do not abort the loop.
pub async fn wait_for<F, Fut, E>(spec: &WaitSpec, mut predicate: F) -> Result<(), WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: fmt::Display,
{
    log::debug!("{}", spec.waiting);
    let start = Instant::now();
    let mut last_error: Option<String> = None;

    loop {
        match predicate().await {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(err) => last_error = Some(err.to_string()),
        }

        if start.elapsed() >= spec.timeout {
            return Err(WaitError::Timeout {
                failure: spec.failure.clone(),
                elapsed: start.elapsed(),
                last_error,
            });
        }

        sleep(spec.interval).await;
    }
}

/// Evaluate `op` until it returns `Ok`, yielding its value.
///
/// Variant of [`wait_for`] for operations whose success itself is the
/// condition, e.g. the first `ping` answered by an agent that is still
/// starting up.
pub async fn wait_for_ok<F, Fut, T, E>(spec: &WaitSpec, mut op: F) -> Result<T, WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    log::debug!("{}", spec.waiting);
    let start = Instant::now();
    let mut last_error: Option<String> = None;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => last_error = Some(err.to_string()),
        }

        if start.elapsed() >= spec.timeout {
            return Err(WaitError::Timeout {
                failure: spec.failure.clone(),
                elapsed: start.elapsed(),
                last_error,
            });
        }

        sleep(spec.interval).await;
    }
}
