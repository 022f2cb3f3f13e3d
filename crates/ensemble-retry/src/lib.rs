//! ---
//! ens_section: "07-readiness"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Bounded interval retry engine."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Bounded polling primitive: call an async probe every interval until it reports
//! success or a deadline elapses.
//!
//! The engine never runs two probe calls at once. Probes that can fail transiently
//! must catch their own errors and return a value the predicate rejects (for
//! example `None`), otherwise a failure is indistinguishable from "not ready yet".

use std::future::Future;
use std::time::Duration;

use ensemble_common::{WaitDefaults, DEFAULT_POLL_INTERVAL};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Details handed to the timeout handler once the deadline has been reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryTimeout {
    /// Time elapsed since the first attempt started.
    pub elapsed: Duration,
    /// Number of probe calls made.
    pub attempts: usize,
}

/// Retry engine polling at a fixed interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalRetry {
    interval: Duration,
}

impl IntervalRetry {
    /// Create an engine waiting `interval` between two attempts.
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Configured interval between attempts.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Invoke `probe` until `predicate` accepts its result or `timeout` elapses.
    ///
    /// The first attempt happens immediately and at least one attempt is always made.
    /// The deadline is measured from the start of the first attempt. Between two
    /// attempts the engine sleeps for the interval, shortened to whatever remains of
    /// the deadline. When the deadline is reached the error produced by `on_timeout`
    /// is returned as-is.
    ///
    /// The deadline is checked between attempts only. An attempt in flight is
    /// never cancelled, so a slow one can finish past the deadline and the
    /// reported `elapsed` then exceeds `timeout` by up to one attempt. Callers that
    /// need a hard bound wrap each attempt in `tokio::time::timeout`.
    pub async fn retry_until<T, E, P, Fut, Pred, H>(
        &self,
        mut probe: P,
        predicate: Pred,
        on_timeout: H,
        timeout: Duration,
    ) -> Result<T, E>
    where
        P: FnMut() -> Fut,
        Fut: Future<Output = T>,
        Pred: Fn(&T) -> bool,
        H: FnOnce(RetryTimeout) -> E,
    {
        let started = Instant::now();
        let mut attempts = 0usize;

        loop {
            attempts += 1;
            let result = probe().await;
            if predicate(&result) {
                debug!(
                    attempts,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "retry predicate satisfied"
                );
                return Ok(result);
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                break;
            }
            debug!(
                attempt = attempts,
                elapsed_ms = elapsed.as_millis() as u64,
                "retry predicate not satisfied; waiting for next attempt"
            );
            sleep(self.interval.min(timeout - elapsed)).await;
            if started.elapsed() >= timeout {
                break;
            }
        }

        let elapsed = started.elapsed();
        warn!(
            attempts,
            elapsed_ms = elapsed.as_millis() as u64,
            timeout_ms = timeout.as_millis() as u64,
            "retry deadline reached"
        );
        Err(on_timeout(RetryTimeout { elapsed, attempts }))
    }
}

impl Default for IntervalRetry {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl From<&WaitDefaults> for IntervalRetry {
    fn from(defaults: &WaitDefaults) -> Self {
        Self::new(defaults.poll_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> Arc<Mutex<Vec<Instant>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_third_call_with_interval_spacing() {
        let calls = recorder();
        let probe_calls = calls.clone();
        let engine = IntervalRetry::new(Duration::from_millis(100));

        let result: Result<usize, String> = engine
            .retry_until(
                move || {
                    let calls = probe_calls.clone();
                    async move {
                        let mut calls = calls.lock().unwrap();
                        calls.push(Instant::now());
                        calls.len()
                    }
                },
                |count| *count == 3,
                |timeout| format!("timed out after {:?}", timeout.elapsed),
                Duration::from_millis(1000),
            )
            .await;

        assert_eq!(result.unwrap(), 3);
        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        for pair in calls.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(100));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_after_at_most_four_attempts() {
        let calls = recorder();
        let probe_calls = calls.clone();
        let engine = IntervalRetry::new(Duration::from_millis(100));
        let started = Instant::now();

        let result: Result<bool, RetryTimeout> = engine
            .retry_until(
                move || {
                    let calls = probe_calls.clone();
                    async move {
                        calls.lock().unwrap().push(Instant::now());
                        false
                    }
                },
                |ready| *ready,
                |timeout| timeout,
                Duration::from_millis(350),
            )
            .await;

        let timeout = result.unwrap_err();
        let calls = calls.lock().unwrap();
        assert!(calls.len() <= 4, "made {} attempts", calls.len());
        assert_eq!(timeout.attempts, calls.len());
        assert!(timeout.elapsed >= Duration::from_millis(350));
        assert!(started.elapsed() < Duration::from_millis(400));
        let offsets: Vec<u128> = calls
            .iter()
            .map(|at| (*at - started).as_millis())
            .collect();
        assert_eq!(offsets, vec![0, 100, 200, 300]);
    }

    #[tokio::test(start_paused = true)]
    async fn first_attempt_is_immediate() {
        let engine = IntervalRetry::new(Duration::from_secs(10));
        let started = Instant::now();
        let result: Result<u8, ()> = engine
            .retry_until(
                || async { 7u8 },
                |value| *value == 7,
                |_| (),
                Duration::from_secs(30),
            )
            .await;
        assert_eq!(result, Ok(7));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_deadline_still_attempts_once() {
        let calls = recorder();
        let probe_calls = calls.clone();
        let engine = IntervalRetry::default();
        let result: Result<(), usize> = engine
            .retry_until(
                move || {
                    let calls = probe_calls.clone();
                    async move {
                        calls.lock().unwrap().push(Instant::now());
                    }
                },
                |_| false,
                |timeout| timeout.attempts,
                Duration::ZERO,
            )
            .await;
        assert_eq!(result, Err(1));
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried_through_sentinel() {
        let calls = recorder();
        let probe_calls = calls.clone();
        let engine = IntervalRetry::new(Duration::from_millis(50));
        let result: Result<Option<&'static str>, String> = engine
            .retry_until(
                move || {
                    let calls = probe_calls.clone();
                    async move {
                        let attempt = {
                            let mut calls = calls.lock().unwrap();
                            calls.push(Instant::now());
                            calls.len()
                        };
                        let outcome: Result<&'static str, &'static str> = if attempt < 2 {
                            Err("connection refused")
                        } else {
                            Ok("RUNNING")
                        };
                        outcome.ok()
                    }
                },
                |state| *state == Some("RUNNING"),
                |_| "unreachable".to_owned(),
                Duration::from_secs(1),
            )
            .await;
        assert_eq!(result.unwrap(), Some("RUNNING"));
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_attempt_finishes_past_the_deadline() {
        let engine = IntervalRetry::new(Duration::from_millis(10));
        let result: Result<(), RetryTimeout> = engine
            .retry_until(
                || sleep(Duration::from_millis(200)),
                |_| false,
                |timeout| timeout,
                Duration::from_millis(300),
            )
            .await;
        let timeout = result.unwrap_err();
        // 200 ms attempt, 10 ms pause, then a second 200 ms attempt that is
        // allowed to run to completion.
        assert_eq!(timeout.attempts, 2);
        assert_eq!(timeout.elapsed, Duration::from_millis(410));
    }

    #[test]
    fn interval_follows_configured_defaults() {
        assert_eq!(IntervalRetry::default().interval(), DEFAULT_POLL_INTERVAL);
        let defaults = WaitDefaults {
            poll_interval: Duration::from_millis(25),
            ..WaitDefaults::default()
        };
        assert_eq!(IntervalRetry::from(&defaults).interval(), Duration::from_millis(25));
    }
}
