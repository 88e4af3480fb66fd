// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Bounded retry with exponential backoff for DNS provider calls.
//!
//! Transient provider failures (timeouts, `SERVFAIL`, HTTP 429/5xx from the zone
//! API) are retried with exponential backoff and jitter; permanent failures fail
//! immediately. Retrying is bounded both by attempt count and by total elapsed
//! time so that a failing domain never holds up the notification stream for long.

use crate::errors::ProviderError;
use rand::Rng;
use reqwest::StatusCode;
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::constants::DEFAULT_PROVIDER_MAX_ATTEMPTS;

/// Initial retry interval (200ms)
const INITIAL_INTERVAL_MILLIS: u64 = 200;

/// Maximum interval between retries (5 seconds)
const MAX_INTERVAL_SECS: u64 = 5;

/// Give up on a call this long after its first attempt
const MAX_ELAPSED_TIME_SECS: u64 = 30;

/// Each delay is this many times the previous one
const BACKOFF_MULTIPLIER: f64 = 2.0;

/// Jitter applied to each delay (±10%)
const RANDOMIZATION_FACTOR: f64 = 0.1;

/// How hard the reconciler tries a single provider call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one; `1` disables retry
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_interval: Duration,
    /// Upper bound for a single delay
    pub max_interval: Duration,
    /// Upper bound for the time spent on one call including delays
    pub max_elapsed_time: Option<Duration>,
    /// Backoff multiplier
    pub multiplier: f64,
    /// Jitter factor
    pub randomization_factor: f64,
}

impl Default for RetryPolicy {
    /// # Retry Schedule
    ///
    /// With the default of 3 attempts, retries occur after approximately
    /// 200ms and 400ms, and never later than 30 seconds after the first attempt.
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_PROVIDER_MAX_ATTEMPTS,
            initial_interval: Duration::from_millis(INITIAL_INTERVAL_MILLIS),
            max_interval: Duration::from_secs(MAX_INTERVAL_SECS),
            max_elapsed_time: Some(Duration::from_secs(MAX_ELAPSED_TIME_SECS)),
            multiplier: BACKOFF_MULTIPLIER,
            randomization_factor: RANDOMIZATION_FACTOR,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Default schedule with a different attempt bound (minimum 1).
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Start a fresh delay sequence for one call.
    #[must_use]
    pub fn backoff(&self) -> Backoff {
        Backoff {
            interval: self.initial_interval,
            started: Instant::now(),
            policy: self.clone(),
        }
    }
}

/// Delay sequence for the retries of one call.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: RetryPolicy,
    interval: Duration,
    started: Instant,
}

impl Backoff {
    /// Delay before the next attempt, or `None` once the elapsed-time budget is spent.
    ///
    /// The delay never extends past the end of the budget.
    pub fn next_delay(&mut self) -> Option<Duration> {
        let remaining = match self.policy.max_elapsed_time {
            Some(budget) => match budget.checked_sub(self.started.elapsed()) {
                Some(remaining) if !remaining.is_zero() => Some(remaining),
                _ => return None,
            },
            None => None,
        };

        let mut delay = jitter(self.interval, self.policy.randomization_factor);
        if let Some(remaining) = remaining {
            delay = delay.min(remaining);
        }
        self.interval = self
            .interval
            .mul_f64(self.policy.multiplier)
            .min(self.policy.max_interval);
        Some(delay)
    }

    /// Restart the sequence from the initial interval and a fresh budget.
    pub fn reset(&mut self) {
        self.interval = self.policy.initial_interval;
        self.started = Instant::now();
    }

    /// Time since the sequence started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Spread `interval` uniformly over `interval * (1 ± factor)`.
fn jitter(interval: Duration, factor: f64) -> Duration {
    if factor <= 0.0 || interval.is_zero() {
        return interval;
    }

    let secs = interval.as_secs_f64();
    let spread = secs * factor;
    let jittered = rand::thread_rng().gen_range((secs - spread)..=(secs + spread));
    Duration::from_secs_f64(jittered.max(0.0))
}

/// A provider call that did not succeed within the retry budget.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{source} (after {attempts} attempt(s))")]
pub struct RetryError {
    /// Attempts made
    pub attempts: u32,
    /// Error from the last attempt
    #[source]
    pub source: ProviderError,
}

/// Whether a zone API response with `status` is worth another attempt.
///
/// Rate limiting (429) and the transient 5xx codes are; 501 and everything
/// else is not.
#[must_use]
pub fn is_retryable_http_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Run a provider call, retrying transient failures according to `policy`.
///
/// # Errors
///
/// Returns [`RetryError`] carrying the last provider error when:
/// - the error is not retryable
/// - `policy.max_attempts` attempts have been made
/// - the elapsed-time budget is exhausted
pub async fn retry_provider_call<T, F, Fut>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut backoff = policy.backoff();
    let mut attempt = 0;

    let last_error = loop {
        attempt += 1;

        let e = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt,
                        elapsed = ?backoff.elapsed(),
                        "DNS provider call succeeded after retries"
                    );
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if !e.is_retryable() {
            error!(operation = operation_name, error = %e, "Permanent DNS provider error");
            break e;
        }
        if attempt >= policy.max_attempts {
            error!(operation = operation_name, attempt, error = %e, "Out of attempts");
            break e;
        }
        let Some(delay) = backoff.next_delay() else {
            error!(
                operation = operation_name,
                attempt,
                elapsed = ?backoff.elapsed(),
                error = %e,
                "Out of retry time"
            );
            break e;
        };

        warn!(
            operation = operation_name,
            attempt,
            retry_in = ?delay,
            error = %e,
            "Transient DNS provider error, retrying"
        );
        tokio::time::sleep(delay).await;
    };

    Err(RetryError {
        attempts: attempt,
        source: last_error,
    })
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
